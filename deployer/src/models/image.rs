//! Container image references

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::DeployError;

/// A `[registry/]repository:tag` image reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub registry: Option<String>,
    pub repository: String,
    pub tag: String,
}

impl ImageRef {
    pub fn new(registry: Option<String>, repository: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            registry,
            repository: repository.into(),
            tag: tag.into(),
        }
    }

    /// Parse a reference, using `default_tag` when the reference has none.
    ///
    /// The first path segment is a registry host when it contains a `.` or a
    /// `:` or is `localhost`.
    pub fn parse(reference: &str, default_tag: &str) -> Result<Self, DeployError> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(DeployError::ConfigError("Empty image reference".to_string()));
        }

        let (registry, remainder) = match reference.split_once('/') {
            Some((first, rest))
                if first.contains('.') || first.contains(':') || first == "localhost" =>
            {
                (Some(first.to_string()), rest)
            }
            _ => (None, reference),
        };

        let (repository, tag) = match remainder.rsplit_once(':') {
            Some((repository, tag)) => {
                if tag.is_empty() {
                    return Err(DeployError::ConfigError(format!(
                        "Image reference '{}' has an empty tag",
                        reference
                    )));
                }
                (repository, tag)
            }
            None => (remainder, default_tag),
        };

        if repository.is_empty() || repository.split('/').any(str::is_empty) {
            return Err(DeployError::ConfigError(format!(
                "Invalid image repository in '{}'",
                reference
            )));
        }

        Ok(Self::new(registry, repository, tag))
    }

    /// Same image under another registry and repository, keeping the tag
    pub fn retarget(&self, registry: Option<String>, repository: impl Into<String>) -> Self {
        Self::new(registry, repository, self.tag.clone())
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(registry) = &self.registry {
            write!(f, "{}/", registry)?;
        }
        write!(f, "{}:{}", self.repository, self.tag)
    }
}
