//! SQLite library store.
//!
//! Tracks the known state of the library: one row per book folder, one row
//! per audio or image file inside it. The files on disk are the source of
//! truth; deleting the database loses nothing that a scan can't rebuild,
//! except for the `added` timestamps.

mod db;
pub mod error;
mod last_scan;
mod models;
mod records;
mod repo;
mod store;

pub use crate::db::Database;
pub use crate::last_scan::LastScan;
pub use crate::records::{Book, File, SortKey};
pub use crate::repo::{Counts, Repository};
pub use crate::store::{LibraryStore, StoreHandle};
