pub mod download;
pub mod plugin;
pub mod start;
pub mod workspace;
