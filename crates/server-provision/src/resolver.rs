//! Works out which jar a Gradle plugin project builds, and how to build it.
//!
//! The Kotlin build scripts are not evaluated. The resolver only looks at
//! top-level `key = "value"` statements, which is the form Gradle's project
//! templates use for `rootProject.name` and `version`.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{ConfigParseError, ConfigParseReason, FilesystemError, ProvisionError};

pub const SETTINGS_FILE: &str = "settings.gradle.kts";
pub const BUILD_FILE: &str = "build.gradle.kts";
pub const BUILD_OUTPUT_DIR: &str = "build/libs";

const PROJECT_NAME_KEY: &str = "rootProject.name";
const VERSION_KEY: &str = "version";

/// Plugin ids of the Shadow plugin and its maintained forks.
const FAT_JAR_PLUGIN_IDS: &[&str] = &[
    "com.github.johnrengelman.shadow",
    "io.github.goooler.shadow",
    "com.gradleup.shadow",
];

const FAT_JAR_TASK: &str = "shadowJar";
const FAT_JAR_CLASSIFIER: &str = "all";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    pub project_name: String,
    pub project_version: String,
    pub has_fat_jar_plugin: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDescriptor {
    pub output_file_name: String,
    pub build_command: Vec<String>,
}

impl BuildConfig {
    /// Reads both build scripts from `project_root` and parses them.
    pub fn load(project_root: &Path) -> Result<Self, ProvisionError> {
        let settings = read_script(&project_root.join(SETTINGS_FILE))?;
        let build = read_script(&project_root.join(BUILD_FILE))?;
        let config = Self::parse(&settings, &build)?;
        debug!(
            name = %config.project_name,
            version = %config.project_version,
            fat_jar = config.has_fat_jar_plugin,
            "resolved plugin build config"
        );
        Ok(config)
    }

    pub fn parse(settings: &str, build: &str) -> Result<Self, ConfigParseError> {
        let project_name = find_assignment(settings, PROJECT_NAME_KEY, SETTINGS_FILE)?;
        let project_version = find_assignment(build, VERSION_KEY, BUILD_FILE)?;
        let has_fat_jar_plugin = code_lines(build)
            .into_iter()
            .any(|(_, line, _)| applies_fat_jar_plugin(line));

        Ok(Self {
            project_name,
            project_version,
            has_fat_jar_plugin,
        })
    }

    pub fn artifact(&self) -> ArtifactDescriptor {
        let mut build_command = vec![
            gradle_wrapper().to_string(),
            "clean".to_string(),
            "build".to_string(),
        ];

        let output_file_name = if self.has_fat_jar_plugin {
            build_command.push(FAT_JAR_TASK.to_string());
            format!(
                "{}-{}-{}.jar",
                self.project_name, self.project_version, FAT_JAR_CLASSIFIER
            )
        } else {
            format!("{}-{}.jar", self.project_name, self.project_version)
        };

        ArtifactDescriptor {
            output_file_name,
            build_command,
        }
    }
}

impl ArtifactDescriptor {
    /// The build command with the Gradle wrapper made absolute, so it does not
    /// depend on the directory the tool itself was started from.
    pub fn command_in(&self, project_root: &Path) -> Vec<String> {
        let mut command = self.build_command.clone();
        if let Some(program) = command.first_mut() {
            *program = project_root.join(&*program).to_string_lossy().into_owned();
        }
        command
    }

    /// Where Gradle leaves the jar, relative to the project it was built in.
    pub fn output_path(&self, project_root: &Path) -> PathBuf {
        project_root
            .join(BUILD_OUTPUT_DIR)
            .join(&self.output_file_name)
    }
}

fn gradle_wrapper() -> &'static str {
    if cfg!(windows) {
        "gradlew.bat"
    } else {
        "./gradlew"
    }
}

fn read_script(path: &Path) -> Result<String, ProvisionError> {
    fs::read_to_string(path)
        .map_err(|err| FilesystemError::io("read", path, err).into())
}

fn find_assignment(
    text: &str,
    key: &'static str,
    file: &str,
) -> Result<String, ConfigParseError> {
    for (index, line, depth) in code_lines(text) {
        if depth != 0 {
            continue;
        }
        if let Some(rest) = strip_assignment(line, key) {
            return parse_quoted(rest, index + 1).map_err(|reason| ConfigParseError {
                key,
                file: file.to_string(),
                reason,
            });
        }
    }

    Err(ConfigParseError {
        key,
        file: file.to_string(),
        reason: ConfigParseReason::KeyNotFound,
    })
}

/// Returns the right-hand side of `key = ...`, or `None` when the line
/// assigns something else.
fn strip_assignment<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let rest = line.trim_start().strip_prefix(key)?;
    if !rest.starts_with(|c: char| c == '=' || c.is_whitespace()) {
        return None;
    }
    let rest = rest.trim_start().strip_prefix('=')?;
    if rest.starts_with('=') {
        return None;
    }
    Some(rest.trim_start())
}

fn parse_quoted(rest: &str, line: usize) -> Result<String, ConfigParseReason> {
    if rest.starts_with("\"\"\"") {
        return Err(ConfigParseReason::Unsupported { line });
    }
    let body = rest
        .strip_prefix('"')
        .ok_or(ConfigParseReason::NotQuoted { line })?;

    let mut value = String::new();
    let mut remainder = None;
    for (offset, c) in body.char_indices() {
        match c {
            '"' => {
                remainder = Some(&body[offset + 1..]);
                break;
            }
            '\\' | '$' => return Err(ConfigParseReason::Unsupported { line }),
            _ => value.push(c),
        }
    }

    let remainder = remainder.ok_or(ConfigParseReason::Unterminated { line })?;
    let remainder = remainder.trim_start();
    let remainder = remainder.strip_prefix(';').unwrap_or(remainder).trim();
    if !remainder.is_empty() && !remainder.starts_with("//") {
        return Err(ConfigParseReason::TrailingText { line });
    }
    if value.trim().is_empty() {
        return Err(ConfigParseReason::Empty { line });
    }

    Ok(value)
}

/// Lines that start outside block comments and raw strings, with their
/// zero-based index and the `{ }` nesting depth at the start of the line.
fn code_lines(text: &str) -> Vec<(usize, &str, usize)> {
    let mut nesting = Nesting::default();
    let mut lines = Vec::new();
    for (index, line) in text.lines().enumerate() {
        if !nesting.in_block_comment && !nesting.in_raw_string {
            lines.push((index, line, nesting.depth));
        }
        nesting.advance(line);
    }
    lines
}

/// Block nesting carried from line to line, so assignments inside
/// `bukkit { }`, `tasks { }` and similar blocks are not mistaken for project
/// properties. Braces inside strings and comments do not count.
#[derive(Debug, Default)]
struct Nesting {
    depth: usize,
    in_block_comment: bool,
    in_raw_string: bool,
}

impl Nesting {
    fn advance(&mut self, line: &str) {
        let chars = line.chars().collect::<Vec<_>>();
        let mut in_string = false;
        let mut i = 0;

        while i < chars.len() {
            let rest = &chars[i..];
            if self.in_block_comment {
                if rest.starts_with(&['*', '/']) {
                    self.in_block_comment = false;
                    i += 2;
                } else {
                    i += 1;
                }
                continue;
            }
            if self.in_raw_string {
                if rest.starts_with(&RAW_QUOTE) {
                    self.in_raw_string = false;
                    i += 3;
                } else {
                    i += 1;
                }
                continue;
            }
            if in_string {
                match rest[0] {
                    '\\' => i += 2,
                    '"' => {
                        in_string = false;
                        i += 1;
                    }
                    _ => i += 1,
                }
                continue;
            }

            if rest.starts_with(&['/', '/']) {
                break;
            }
            if rest.starts_with(&['/', '*']) {
                self.in_block_comment = true;
                i += 2;
                continue;
            }
            if rest.starts_with(&RAW_QUOTE) {
                self.in_raw_string = true;
                i += 3;
                continue;
            }
            match rest[0] {
                '"' => in_string = true,
                '{' => self.depth += 1,
                '}' => self.depth = self.depth.saturating_sub(1),
                _ => {}
            }
            i += 1;
        }
    }
}

const RAW_QUOTE: [char; 3] = ['"', '"', '"'];

fn applies_fat_jar_plugin(line: &str) -> bool {
    let code = match line.find("//") {
        Some(comment) => &line[..comment],
        None => line,
    };
    let code = code.trim();
    // `apply false` only puts the plugin on the classpath for subprojects.
    if code.ends_with("apply false") {
        return false;
    }
    FAT_JAR_PLUGIN_IDS
        .iter()
        .any(|id| code.contains(&format!("\"{id}\"")))
}
