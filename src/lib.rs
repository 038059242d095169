pub mod backend;
pub mod config;
pub mod error;
pub mod fs;
pub mod mounts;
pub mod session;
pub mod shell;
pub mod vfs;

pub use error::{BackendError, DavError, DavResult};
