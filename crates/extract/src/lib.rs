//! What the scanner needs to know about a single file: whether it matters at
//! all ([`FileKind`]) and, for audio, what its tags say ([`read_media`]).
//!
//! Cover art needs no parsing, its bytes are the artwork.

mod consts;
pub mod error;
mod kind;
pub mod models;
mod tags;

pub use crate::consts::{IMAGE_EXTENSIONS, MEDIA_EXTENSIONS};
pub use crate::kind::FileKind;
pub use crate::models::MediaMetadata;
pub use crate::tags::read_media;
