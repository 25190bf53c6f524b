//! Docker Compose commands

use crate::config::settings::ComposeSettings;
use crate::deploy::engine::ContainerEngine;
use crate::deploy::runner::CommandSpec;

fn with_file(base: CommandSpec, settings: &ComposeSettings) -> CommandSpec {
    base.arg("-f")
        .arg(settings.file.display().to_string())
        .current_dir(&settings.project_dir)
}

/// `compose up -d [--build]`, one candidate per compose flavour
pub fn up(engine: ContainerEngine, settings: &ComposeSettings, build: bool) -> Vec<CommandSpec> {
    engine
        .compose_commands()
        .into_iter()
        .map(|base| {
            let spec = with_file(base, settings).args(["up", "-d"]);
            if build {
                spec.arg("--build")
            } else {
                spec
            }
        })
        .collect()
}

/// Run a one-off command in the running service container
pub fn exec(
    engine: ContainerEngine,
    settings: &ComposeSettings,
    service: &str,
    command: &[String],
) -> Vec<CommandSpec> {
    engine
        .compose_commands()
        .into_iter()
        .map(|base| {
            with_file(base, settings)
                .args(["exec", "-T", service])
                .args(command.iter().cloned())
        })
        .collect()
}

pub fn down(engine: ContainerEngine, settings: &ComposeSettings) -> Vec<CommandSpec> {
    engine
        .compose_commands()
        .into_iter()
        .map(|base| with_file(base, settings).arg("down"))
        .collect()
}

/// `compose version`, used to probe for the CLI
pub fn version(engine: ContainerEngine) -> Vec<CommandSpec> {
    engine
        .compose_commands()
        .into_iter()
        .map(|base| base.arg("version").quiet())
        .collect()
}
