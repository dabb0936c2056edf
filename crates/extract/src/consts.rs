/// Audio containers routed to tag extraction.
pub const MEDIA_EXTENSIONS: [&str; 3] = ["m4a", "m4b", "mp3"];
/// Cover art captured verbatim as a book's artwork.
pub const IMAGE_EXTENSIONS: [&str; 4] = ["gif", "jpg", "jpeg", "png"];
