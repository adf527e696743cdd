use std::path::Path;

use anyhow::{Context, Result};
use server_provision::process::ProcessRunner;
use server_provision::workspace::copy_artifact;
use server_provision::{BuildConfig, Workspace};

use crate::config::Settings;

/// Builds the Gradle project in `root` and drops its jar into the server's
/// plugin directory.
pub fn copy(root: &Path, settings: &Settings) -> Result<()> {
    let workspace = Workspace::new(root);
    workspace.ensure_prepared()?;

    let config = BuildConfig::load(root).context("Failed to resolve plugin artifact")?;
    let artifact = config.artifact();
    let file_name = &artifact.output_file_name;

    println!(
        "Building {} {}...",
        config.project_name, config.project_version
    );
    ProcessRunner::new(settings.build_timeout)
        .run(&artifact.command_in(root), root)?
        .ensure_success()
        .context("Plugin build failed")?;

    println!("Copying plugin jar, {file_name}, to test server files...");
    copy_artifact(
        &artifact.output_path(root),
        &workspace.plugins_dir().join(file_name),
    )?;
    println!("Plugin jar, {file_name}, has been copied to test server files.");
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::*;
    use crate::commands::testing::{settings, write_script};

    const BUILD_SCRIPT: &str = r#"plugins {
    id("com.github.johnrengelman.shadow") version "8.1.1"
}

version = "1.2.3"
"#;

    fn write_project(root: &Path, wrapper: &str) {
        fs::write(root.join("settings.gradle.kts"), "rootProject.name = \"foo\"\n")
            .expect("write settings");
        fs::write(root.join("build.gradle.kts"), BUILD_SCRIPT).expect("write build");
        write_script(&root.join("gradlew"), wrapper);
    }

    #[test]
    fn builds_and_copies_fat_jar() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let root = dir.path();
        write_project(
            root,
            "[ \"$3\" = shadowJar ] || exit 9\n\
             mkdir -p build/libs\n\
             printf plugin > build/libs/foo-1.2.3-all.jar\n",
        );
        Workspace::new(root).prepare().expect("prepare");

        copy(root, &settings("java")).expect("copy plugin");

        let copied = root.join("server").join("plugins").join("foo-1.2.3-all.jar");
        assert_eq!(fs::read(copied).expect("read copied jar"), b"plugin");
    }

    #[test]
    fn failed_build_is_reported_and_nothing_is_copied() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let root = dir.path();
        write_project(root, "exit 1\n");
        Workspace::new(root).prepare().expect("prepare");

        let err = copy(root, &settings("java")).expect_err("build fails");
        assert!(format!("{err:#}").contains("exit code 1"));
        assert!(
            fs::read_dir(root.join("server").join("plugins"))
                .expect("read plugins")
                .next()
                .is_none()
        );
    }

    #[test]
    fn requires_prepared_workspace() {
        let dir = tempfile::tempdir().expect("create temp dir");
        write_project(dir.path(), "exit 0\n");
        let err = copy(dir.path(), &settings("java")).expect_err("workspace missing");
        assert!(err.to_string().contains("prepare"));
    }
}
