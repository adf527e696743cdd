use std::path::Path;

use anyhow::{Context, Result};
use server_provision::process::ProcessRunner;
use server_provision::workspace::copy_artifact;
use server_provision::{Fetcher, Workspace, sources};

use crate::config::Settings;

pub fn spigot(root: &Path, settings: &Settings, minecraft_version: &str) -> Result<()> {
    let workspace = Workspace::new(root);
    workspace.ensure_prepared()?;

    println!("Downloading Spigot for Minecraft {minecraft_version}...");
    let fetcher = Fetcher::new(settings.retries)?;
    fetcher
        .download_to(&settings.build_tools_url, &workspace.build_tools_jar())
        .context("Failed to download BuildTools")?;

    println!("Building Spigot {minecraft_version} with BuildTools...");
    let command = sources::build_tools_command(
        &settings.java,
        workspace.build_tools_jar_name(),
        minecraft_version,
    );
    ProcessRunner::new(settings.build_timeout)
        .run(&command, &workspace.build_tools_dir())?
        .ensure_success()
        .context("BuildTools did not complete")?;

    let built = workspace
        .build_tools_dir()
        .join(sources::spigot_jar_name(minecraft_version));
    copy_artifact(&built, &workspace.server_jar())?;

    println!("Spigot for Minecraft {minecraft_version} has been downloaded.");
    Ok(())
}

pub fn paper(
    root: &Path,
    settings: &Settings,
    minecraft_version: &str,
    paper_build: &str,
) -> Result<()> {
    let workspace = Workspace::new(root);
    workspace.ensure_prepared()?;

    println!("Downloading Paper b{paper_build} for Minecraft {minecraft_version}...");
    let url = sources::paper_download_url(
        &settings.paper_url_template,
        minecraft_version,
        paper_build,
    );
    Fetcher::new(settings.retries)?
        .download_to(&url, &workspace.server_jar())
        .with_context(|| {
            format!("Failed to download Paper b{paper_build} for Minecraft {minecraft_version}")
        })?;

    println!("Paper b{paper_build} for Minecraft {minecraft_version} has been downloaded.");
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use std::fs;

    use super::*;
    use crate::commands::testing::{serve_once, settings, write_script};

    #[test]
    fn spigot_is_built_from_build_tools_and_installed() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let root = dir.path();
        let workspace = Workspace::new(root);
        workspace.prepare().expect("prepare");

        let java = root.join("java");
        write_script(
            &java,
            "[ \"$1 $3\" = \"-jar --rev\" ] || exit 8\n\
             [ -f \"$2\" ] || exit 7\n\
             printf spigot > \"spigot-$4.jar\"\n",
        );
        let mut settings = settings(&java.to_string_lossy());
        settings.build_tools_url = format!("{}/BuildTools.jar", serve_once(200, b"tools"));

        spigot(root, &settings, "1.20.4").expect("download spigot");

        let build_tools = fs::read(workspace.build_tools_jar()).expect("read BuildTools");
        assert_eq!(build_tools, b"tools");
        let server_jar = fs::read(workspace.server_jar()).expect("read server jar");
        assert_eq!(server_jar, b"spigot");
    }

    #[test]
    fn failed_build_tools_run_installs_nothing() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let root = dir.path();
        let workspace = Workspace::new(root);
        workspace.prepare().expect("prepare");

        let java = root.join("java");
        write_script(&java, "exit 3\n");
        let mut settings = settings(&java.to_string_lossy());
        settings.build_tools_url = format!("{}/BuildTools.jar", serve_once(200, b"tools"));

        let err = spigot(root, &settings, "1.20.4").expect_err("BuildTools fails");

        let message = format!("{err:#}");
        assert!(message.contains("BuildTools did not complete"), "{message}");
        assert!(message.contains("exit code 3"), "{message}");
        assert!(!workspace.server_jar().exists());
    }

    #[test]
    fn paper_is_fetched_from_the_expanded_template() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let root = dir.path();
        let workspace = Workspace::new(root);
        workspace.prepare().expect("prepare");

        let mut settings = settings("java");
        settings.paper_url_template = format!(
            "{}/{{minecraft_version}}/{{paper_build}}/paper.jar",
            serve_once(200, b"paper")
        );

        paper(root, &settings, "1.20.4", "496").expect("download paper");

        assert_eq!(fs::read(workspace.server_jar()).expect("read server jar"), b"paper");
    }

    #[test]
    fn missing_paper_build_keeps_the_current_server_jar() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let root = dir.path();
        let workspace = Workspace::new(root);
        workspace.prepare().expect("prepare");
        fs::write(workspace.server_jar(), b"old").expect("write server jar");

        let mut settings = settings("java");
        settings.paper_url_template = format!("{}/paper.jar", serve_once(404, b"no such build"));

        let err = paper(root, &settings, "1.20.4", "9999").expect_err("404 must fail");

        let message = format!("{err:#}");
        assert!(message.contains("Paper b9999 for Minecraft 1.20.4"), "{message}");
        assert!(message.contains("404"), "{message}");
        assert_eq!(fs::read(workspace.server_jar()).expect("read server jar"), b"old");
    }

    #[test]
    fn downloads_require_prepared_workspace() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let err = paper(dir.path(), &settings("java"), "1.20.4", "496")
            .expect_err("workspace missing");
        assert!(err.to_string().contains("prepare"));
        assert!(!dir.path().join("server").exists());
    }
}
