//! Container engine commands

use std::path::Path;

use secrecy::SecretString;

use crate::deploy::engine::ContainerEngine;
use crate::deploy::runner::CommandSpec;
use crate::models::image::ImageRef;

/// `<engine> build -f <dockerfile> -t <image> <context>`
pub fn build(engine: ContainerEngine, dockerfile: &Path, image: &ImageRef, context: &Path) -> CommandSpec {
    CommandSpec::new(engine.command())
        .arg("build")
        .arg("-f")
        .arg(dockerfile.display().to_string())
        .arg("-t")
        .arg(image.to_string())
        .arg(context.display().to_string())
}

pub fn tag(engine: ContainerEngine, source: &ImageRef, target: &ImageRef) -> CommandSpec {
    CommandSpec::new(engine.command())
        .arg("tag")
        .arg(source.to_string())
        .arg(target.to_string())
}

pub fn push(engine: ContainerEngine, image: &ImageRef) -> CommandSpec {
    CommandSpec::new(engine.command())
        .arg("push")
        .arg(image.to_string())
}

/// Non-interactive login with the password written to stdin.
/// No registry means Docker Hub.
pub fn login_password_stdin(
    engine: ContainerEngine,
    registry: Option<&str>,
    username: &str,
    password: SecretString,
) -> CommandSpec {
    let mut spec = CommandSpec::new(engine.command())
        .arg("login")
        .arg("--username")
        .arg(username)
        .arg("--password-stdin");
    if let Some(registry) = registry {
        spec = spec.arg(registry);
    }
    spec.stdin_secret(password)
}

/// Interactive login, prompting on the terminal for the password
pub fn login(engine: ContainerEngine, registry: Option<&str>, username: &str) -> CommandSpec {
    let mut spec = CommandSpec::new(engine.command())
        .arg("login")
        .arg("--username")
        .arg(username);
    if let Some(registry) = registry {
        spec = spec.arg(registry);
    }
    spec
}

/// `<engine> --version`, used to probe for the CLI
pub fn version(engine: ContainerEngine) -> CommandSpec {
    CommandSpec::new(engine.command()).arg("--version").quiet()
}
