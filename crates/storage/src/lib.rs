pub mod backend;
pub mod error;
pub mod file;
pub mod lease;
mod path;

pub use crate::backend::StorageBackend;
pub use crate::file::{Entry, EntryKind};
pub use crate::path::{is_hidden, validate as validate_path};
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
