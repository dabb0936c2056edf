mod book;
mod file;

pub(crate) use self::book::BookRow;
pub(crate) use self::file::FileRow;
use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use std::path::Path;
use time::UtcDateTime;

// Seconds lose the sub-second part of file modification times, and a change
// within the same second would then go unnoticed. Nanoseconds fit in an i64
// until the year 2262.
pub(crate) fn to_nanos(at: UtcDateTime, field: &'static str) -> Result<i64> {
    i64::try_from(at.unix_timestamp_nanos()).or_raise(|| ErrorKind::InvalidData(field))
}

pub(crate) fn from_nanos(nanos: i64, field: &'static str) -> Result<UtcDateTime> {
    UtcDateTime::from_unix_timestamp_nanos(i128::from(nanos)).or_raise(|| ErrorKind::InvalidData(field))
}

pub(crate) fn path_text(path: &Path, field: &'static str) -> Result<String> {
    Ok(path.to_str().ok_or_raise(|| ErrorKind::InvalidData(field))?.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nanosecond_precision_survives() {
        let at = UtcDateTime::from_unix_timestamp_nanos(1_700_000_000_123_456_789).unwrap();
        assert_eq!(from_nanos(to_nanos(at, "at").unwrap(), "at").unwrap(), at);
    }

    #[test]
    fn test_out_of_range_timestamp_is_invalid() {
        let far = UtcDateTime::from_unix_timestamp(i64::from(i32::MAX) * 10).unwrap();
        let err = to_nanos(far, "at").unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidData("at")));
    }
}
