use std::path::Path;

use anyhow::{Context, Result, bail};
use server_provision::process::ProcessRunner;
use server_provision::{Workspace, sources};

use crate::config::Settings;

pub fn run(root: &Path, settings: &Settings) -> Result<()> {
    let workspace = Workspace::new(root);
    let server_jar = workspace.server_jar();
    if !server_jar.is_file() {
        bail!(
            "{} not found (run download-spigot or download-paper first)",
            server_jar.display()
        );
    }

    println!("Starting test server...");
    let command = sources::launch_command(
        &settings.java,
        &settings.jvm_args,
        workspace.server_jar_name(),
    );
    ProcessRunner::default()
        .run(&command, workspace.server_dir())?
        .ensure_success()
        .context("Test server exited with an error")?;
    println!("Test server stopped.");
    Ok(())
}
