//! CLI commands implementation

pub mod archive;
pub mod init;
pub mod jobs;
pub mod query;
pub mod reindex;
pub mod verify;

pub use archive::*;
pub use init::*;
pub use jobs::*;
pub use query::*;
pub use reindex::*;
pub use verify::*;
