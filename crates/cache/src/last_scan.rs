use time::UtcDateTime;

/// When the library was last scanned to completion.
///
/// `Never` sorts before every timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum LastScan {
    #[default]
    Never,
    At(UtcDateTime),
}
impl LastScan {
    pub fn at(self) -> Option<UtcDateTime> {
        match self {
            Self::Never => None,
            Self::At(at) => Some(at),
        }
    }

    /// Short human label relative to `now`, e.g. "Updated 3 hours ago".
    pub fn describe(self, now: UtcDateTime) -> String {
        let Self::At(at) = self else {
            return "Never Updated".to_string();
        };
        // Clock skew can put the scan in the future; treat that as now.
        let seconds = (now - at).whole_seconds().max(0);
        let (count, unit) = match seconds {
            0..60 => return "Just Now".to_string(),
            60..3_600 => (seconds / 60, "minute"),
            3_600..86_400 => (seconds / 3_600, "hour"),
            _ => (seconds / 86_400, "day"),
        };
        let plural = if count == 1 { "" } else { "s" };
        format!("Updated {count} {unit}{plural} ago")
    }
}
impl From<Option<UtcDateTime>> for LastScan {
    fn from(at: Option<UtcDateTime>) -> Self {
        at.map_or(Self::Never, Self::At)
    }
}
