pub mod error;
pub mod scan;

pub use crate::scan::{
    AbortReason, ChannelObserver, ScanEvent, ScanHandle, ScanObserver, ScanOptions, ScanOutcome, ScanState,
    ScanSummary, Scanner,
};
