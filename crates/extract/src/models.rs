/// Everything pulled out of a single audio file's tags and stream info.
///
/// Text fields are `None` rather than empty when a tag is missing or blank.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    /// Taken from the album-artist tag, which audiobook rippers use for the
    /// writer while "artist" holds the narrator.
    pub author: Option<String>,
    /// Embedded picture bytes, front cover preferred.
    pub artwork: Option<Vec<u8>>,
    /// Total duration in seconds, `0.0` when the stream info doesn't say.
    pub duration: f64,
}
impl MediaMetadata {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.artist.is_none()
            && self.album.is_none()
            && self.author.is_none()
            && self.artwork.is_none()
            && self.duration == 0.0
    }
}
