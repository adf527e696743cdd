use std::path::Path;

use anyhow::Result;
use server_provision::Workspace;

pub fn prepare(root: &Path) -> Result<()> {
    println!("Preparing test server's empty core directories...");
    let workspace = Workspace::new(root);
    for dir in workspace.prepare()? {
        println!("Created {}", dir.display());
    }
    println!("Test server's empty core directories prepared.");
    Ok(())
}

pub fn delete(root: &Path) -> Result<()> {
    println!("Deleting test server files...");
    let workspace = Workspace::new(root);
    if workspace.clean()? {
        println!("Deleted {}", workspace.server_dir().display());
    }
    println!("Test server files deleted.");
    Ok(())
}
