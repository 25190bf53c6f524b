//! Deployment configuration

pub mod settings;
