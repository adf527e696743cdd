use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::FilesystemError;

const SERVER_DIR: &str = "server";
const BUILD_TOOLS_DIR: &str = "buildtools";
const PLUGINS_DIR: &str = "plugins";
const BUILD_TOOLS_JAR: &str = "BuildTools.jar";
const SERVER_JAR: &str = "server.jar";

/// The `server/` tree a test server runs from.
#[derive(Debug, Clone)]
pub struct Workspace {
    server_dir: PathBuf,
}

impl Workspace {
    /// Workspace rooted at `base/server`.
    pub fn new(base: &Path) -> Self {
        Self {
            server_dir: base.join(SERVER_DIR),
        }
    }

    pub fn server_dir(&self) -> &Path {
        &self.server_dir
    }

    pub fn build_tools_dir(&self) -> PathBuf {
        self.server_dir.join(BUILD_TOOLS_DIR)
    }

    pub fn plugins_dir(&self) -> PathBuf {
        self.server_dir.join(PLUGINS_DIR)
    }

    pub fn build_tools_jar_name(&self) -> &'static str {
        BUILD_TOOLS_JAR
    }

    pub fn build_tools_jar(&self) -> PathBuf {
        self.build_tools_dir().join(BUILD_TOOLS_JAR)
    }

    pub fn server_jar_name(&self) -> &'static str {
        SERVER_JAR
    }

    pub fn server_jar(&self) -> PathBuf {
        self.server_dir.join(SERVER_JAR)
    }

    /// Directories in creation order.
    pub fn layout(&self) -> [PathBuf; 3] {
        [
            self.server_dir.clone(),
            self.build_tools_dir(),
            self.plugins_dir(),
        ]
    }

    /// Creates each missing directory of the layout and returns the ones it
    /// had to create.
    pub fn prepare(&self) -> Result<Vec<PathBuf>, FilesystemError> {
        let mut created = Vec::new();
        for dir in self.layout() {
            if dir.is_dir() {
                continue;
            }
            fs::create_dir(&dir).map_err(|err| FilesystemError::io("create", &dir, err))?;
            debug!(path = %dir.display(), "created workspace directory");
            created.push(dir);
        }
        Ok(created)
    }

    /// Removes the whole tree. Returns `false` when there was nothing to remove.
    pub fn clean(&self) -> Result<bool, FilesystemError> {
        if !self.server_dir.exists() {
            return Ok(false);
        }
        fs::remove_dir_all(&self.server_dir)
            .map_err(|err| FilesystemError::io("delete", &self.server_dir, err))?;
        debug!(path = %self.server_dir.display(), "removed workspace");
        Ok(true)
    }

    pub fn ensure_prepared(&self) -> Result<(), FilesystemError> {
        match self.layout().into_iter().find(|dir| !dir.is_dir()) {
            Some(path) => Err(FilesystemError::MissingWorkspace { path }),
            None => Ok(()),
        }
    }
}

/// Copies `from` over `to`, failing with `MissingArtifact` when the source
/// was never produced.
pub fn copy_artifact(from: &Path, to: &Path) -> Result<u64, FilesystemError> {
    if !from.is_file() {
        return Err(FilesystemError::MissingArtifact {
            path: from.to_path_buf(),
        });
    }
    let bytes = fs::copy(from, to).map_err(|err| FilesystemError::io("copy to", to, err))?;
    debug!(from = %from.display(), to = %to.display(), bytes, "copied artifact");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(dir: &Path) -> Vec<String> {
        let mut names = fs::read_dir(dir)
            .expect("read dir")
            .map(|entry| entry.expect("dir entry").file_name().to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        names.sort();
        names
    }

    #[test]
    fn prepare_creates_layout_once() {
        let base = tempfile::tempdir().expect("create temp dir");
        let workspace = Workspace::new(base.path());

        let created = workspace.prepare().expect("first prepare");
        assert_eq!(created, workspace.layout().to_vec());

        let created = workspace.prepare().expect("second prepare");
        assert!(created.is_empty());
        assert_eq!(entries(workspace.server_dir()), ["buildtools", "plugins"]);
        workspace.ensure_prepared().expect("layout present");
    }

    #[test]
    fn prepare_fills_in_partial_layout() {
        let base = tempfile::tempdir().expect("create temp dir");
        let workspace = Workspace::new(base.path());
        fs::create_dir_all(workspace.plugins_dir()).expect("create plugins dir");

        let created = workspace.prepare().expect("prepare");
        assert_eq!(created, vec![workspace.build_tools_dir()]);
    }

    #[test]
    fn clean_then_prepare_yields_empty_layout() {
        let base = tempfile::tempdir().expect("create temp dir");
        let workspace = Workspace::new(base.path());
        workspace.prepare().expect("prepare");
        fs::write(workspace.server_jar(), b"jar").expect("write server jar");
        fs::write(workspace.plugins_dir().join("foo-1.0.jar"), b"jar").expect("write plugin");

        assert!(workspace.clean().expect("clean"));
        assert!(!workspace.server_dir().exists());

        workspace.prepare().expect("prepare again");
        assert_eq!(entries(workspace.server_dir()), ["buildtools", "plugins"]);
        assert!(entries(&workspace.plugins_dir()).is_empty());
        assert!(entries(&workspace.build_tools_dir()).is_empty());
    }

    #[test]
    fn clean_without_workspace_is_a_no_op() {
        let base = tempfile::tempdir().expect("create temp dir");
        let workspace = Workspace::new(base.path());
        assert!(!workspace.clean().expect("clean"));
        assert!(!workspace.clean().expect("clean again"));
    }

    #[test]
    fn ensure_prepared_names_missing_directory() {
        let base = tempfile::tempdir().expect("create temp dir");
        let workspace = Workspace::new(base.path());
        fs::create_dir_all(workspace.build_tools_dir()).expect("create buildtools");

        match workspace.ensure_prepared() {
            Err(FilesystemError::MissingWorkspace { path }) => {
                assert_eq!(path, workspace.plugins_dir())
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn copy_artifact_requires_source() {
        let base = tempfile::tempdir().expect("create temp dir");
        let missing = base.path().join("missing.jar");
        let err = copy_artifact(&missing, &base.path().join("out.jar")).expect_err("no source");
        assert!(matches!(err, FilesystemError::MissingArtifact { .. }));

        let source = base.path().join("plugin.jar");
        fs::write(&source, b"plugin").expect("write source");
        let target = base.path().join("out.jar");
        fs::write(&target, b"stale").expect("write stale target");
        assert_eq!(copy_artifact(&source, &target).expect("copy"), 6);
        assert_eq!(fs::read(&target).expect("read target"), b"plugin");
    }
}
