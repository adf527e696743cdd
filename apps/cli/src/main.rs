use std::ffi::OsString;
use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use commands::{download, plugin, start, workspace};

const USAGE: &str = "\
Available commands:
 * download-spigot <Minecraft version>
 * download-paper  <Minecraft version> <build>
 * copy-plugin
 * start
 * delete
 * prepare";

#[derive(Parser)]
#[command(
    name = "testserver",
    version,
    about = "Local Minecraft plugin test server",
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Build Spigot with BuildTools and install it as server.jar
    DownloadSpigot { minecraft_version: String },
    /// Download a prebuilt Paper jar as server.jar
    DownloadPaper {
        minecraft_version: String,
        paper_build: String,
    },
    /// Build the plugin in the current project and copy it into server/plugins
    #[command(alias = "copy")]
    CopyPlugin,
    /// Run the test server in the foreground
    Start,
    /// Delete the server directory
    #[command(alias = "clean")]
    Delete,
    /// Create the empty server directory layout
    Prepare,
    #[command(external_subcommand)]
    Unknown(Vec<String>),
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse_from(normalize_args(std::env::args_os()));
    let root = std::env::current_dir().context("Failed to resolve working directory")?;
    debug!(root = %root.display(), command = ?cli.command, "dispatching");
    run(cli.command, &root)
}

fn run(command: Option<Commands>, root: &Path) -> Result<()> {
    match command {
        Some(Commands::DownloadSpigot { minecraft_version }) => {
            download::spigot(root, &config::load_settings(root)?, &minecraft_version)
        }
        Some(Commands::DownloadPaper {
            minecraft_version,
            paper_build,
        }) => download::paper(
            root,
            &config::load_settings(root)?,
            &minecraft_version,
            &paper_build,
        ),
        Some(Commands::CopyPlugin) => plugin::copy(root, &config::load_settings(root)?),
        Some(Commands::Start) => start::run(root, &config::load_settings(root)?),
        Some(Commands::Delete) => workspace::delete(root),
        Some(Commands::Prepare) => workspace::prepare(root),
        Some(Commands::Unknown(_)) | None => {
            println!("{USAGE}");
            Ok(())
        }
    }
}

/// Verbs are matched case-insensitively, so `Prepare` and `PREPARE` work too.
fn normalize_args(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    let mut args = args.into_iter().collect::<Vec<_>>();
    let lowered = args
        .get(1)
        .and_then(|verb| verb.to_str())
        .filter(|verb| !verb.starts_with('-'))
        .map(str::to_lowercase);
    if let Some(verb) = lowered {
        args[1] = OsString::from(verb);
    }
    args
}
