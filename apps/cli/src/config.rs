use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use server_provision::fetch::DEFAULT_MAX_RETRIES;
use server_provision::sources::{BUILD_TOOLS_URL, PAPER_URL_TEMPLATE};

pub const CONFIG_FILE: &str = "testserver.toml";

const DEFAULT_JAVA: &str = "java";

pub struct Settings {
    pub java: String,
    pub jvm_args: Vec<String>,
    pub build_tools_url: String,
    pub paper_url_template: String,
    pub retries: usize,
    /// Applies to BuildTools and Gradle; the server itself is never timed out.
    pub build_timeout: Option<Duration>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    server: ServerSection,
    downloads: DownloadsSection,
    process: ProcessSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ServerSection {
    java: Option<String>,
    jvm_args: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct DownloadsSection {
    build_tools_url: Option<String>,
    paper_url_template: Option<String>,
    retries: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ProcessSection {
    timeout_secs: Option<u64>,
}

pub fn load_settings(root: &Path) -> Result<Settings> {
    resolve_settings(root, |key| std::env::var(key).ok())
}

fn resolve_settings(root: &Path, env: impl Fn(&str) -> Option<String>) -> Result<Settings> {
    let file = load_file_config(root)?;

    let java = normalize_optional(env("TESTSERVER_JAVA"))
        .or_else(|| normalize_optional(file.server.java))
        .unwrap_or_else(|| DEFAULT_JAVA.to_string());

    let build_tools_url = normalize_optional(env("TESTSERVER_BUILD_TOOLS_URL"))
        .or_else(|| normalize_optional(file.downloads.build_tools_url))
        .unwrap_or_else(|| BUILD_TOOLS_URL.to_string());

    let paper_url_template = normalize_optional(env("TESTSERVER_PAPER_URL"))
        .or_else(|| normalize_optional(file.downloads.paper_url_template))
        .unwrap_or_else(|| PAPER_URL_TEMPLATE.to_string());

    let build_timeout = file
        .process
        .timeout_secs
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs);

    Ok(Settings {
        java,
        jvm_args: file.server.jvm_args,
        build_tools_url,
        paper_url_template,
        retries: file.downloads.retries.unwrap_or(DEFAULT_MAX_RETRIES),
        build_timeout,
    })
}

fn load_file_config(root: &Path) -> Result<FileConfig> {
    let path = root.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(FileConfig::default());
    }

    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value.and_then(|val| {
        let trimmed = val.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}
