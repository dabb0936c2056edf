use crate::scan::coordinator::ScanSummary;
use audiohub_storage::lease::Denial;
use derive_more::Display;
use tokio::sync::mpsc;

/// Why a scan stopped before completing.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum AbortReason {
    /// Cancelled by its caller, or preempted by a newer scan.
    #[display("scan cancelled")]
    Cancelled,
    /// The library location couldn't be leased; it has to be selected or
    /// mounted again before another scan can succeed.
    #[display("connection to the library needs to be re-established ({_0})")]
    ReconnectRequired(Denial),
}

/// Receives scan notifications, in order, from the scan task.
///
/// Exactly one of [`on_complete`](Self::on_complete) and
/// [`on_aborted`](Self::on_aborted) is called per scan, and always last.
pub trait ScanObserver: Send + Sync {
    /// After each extraction job resolves. `completed` never decreases.
    fn on_progress(&self, _completed: usize, _total: usize) {}

    /// A single item failed; the scan carries on.
    fn on_error(&self, _message: &str) {}

    fn on_complete(&self, _summary: &ScanSummary) {}

    fn on_aborted(&self, _reason: &AbortReason) {}
}

/// Ignores everything.
pub struct NoopObserver;
impl ScanObserver for NoopObserver {}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    Progress { completed: usize, total: usize },
    Error(String),
    Complete(ScanSummary),
    Aborted(AbortReason),
}

/// Forwards notifications as [`ScanEvent`]s over an unbounded channel, so
/// they can be consumed on another task without blocking the scan.
pub struct ChannelObserver {
    sender: mpsc::UnboundedSender<ScanEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ScanEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    fn send(&self, event: ScanEvent) {
        // Nobody listening any more is fine.
        _ = self.sender.send(event);
    }
}

impl ScanObserver for ChannelObserver {
    fn on_progress(&self, completed: usize, total: usize) {
        self.send(ScanEvent::Progress { completed, total });
    }

    fn on_error(&self, message: &str) {
        self.send(ScanEvent::Error(message.to_string()));
    }

    fn on_complete(&self, summary: &ScanSummary) {
        self.send(ScanEvent::Complete(summary.clone()));
    }

    fn on_aborted(&self, reason: &AbortReason) {
        self.send(ScanEvent::Aborted(reason.clone()));
    }
}
