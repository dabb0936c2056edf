use crate::consts::{IMAGE_EXTENSIONS, MEDIA_EXTENSIONS};
use derive_more::Display;
use std::path::Path;

/// What a library file is for. Anything that isn't one of these is ignored
/// by the scanner.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    #[display("media")]
    Media,
    #[display("image")]
    Image,
}
impl FileKind {
    /// Classify by extension (without the leading dot), ignoring ASCII case.
    pub fn from_extension(extension: impl AsRef<str>) -> Option<Self> {
        let extension = extension.as_ref();
        if MEDIA_EXTENSIONS.iter().any(|known| known.eq_ignore_ascii_case(extension)) {
            return Some(Self::Media);
        }
        if IMAGE_EXTENSIONS.iter().any(|known| known.eq_ignore_ascii_case(extension)) {
            return Some(Self::Image);
        }
        None
    }

    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref().extension().and_then(|ext| ext.to_str()).and_then(Self::from_extension)
    }
}
