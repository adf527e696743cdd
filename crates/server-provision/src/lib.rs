pub mod errors;

pub mod fetch;
pub mod process;
pub mod resolver;
pub mod sources;
pub mod workspace;

pub use errors::{ConfigParseError, FilesystemError, NetworkError, ProvisionError, SubprocessError};
pub use fetch::Fetcher;
pub use process::{ProcessOutcome, ProcessRunner};
pub use resolver::{ArtifactDescriptor, BuildConfig};
pub use workspace::Workspace;
