use derive_more::Display;
use tokio::sync::watch;

/// Where a scan is up to.
///
/// ```text
/// Idle -> Leasing -> Walking -> Classifying -> Extracting <-> Reconciling -> Completing -> Idle
/// ```
///
/// Any state other than `Idle` may move to `Aborted`. `Aborted` ends the run;
/// the next run starts leasing from there.
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ScanState {
    #[default]
    Idle,
    Leasing,
    Walking,
    Classifying,
    Extracting,
    Reconciling,
    Completing,
    Aborted,
}

impl ScanState {
    pub fn can_transition_to(self, next: Self) -> bool {
        use ScanState::*;
        match (self, next) {
            (Idle, Aborted) => false,
            (_, Aborted) => true,
            (Idle | Aborted, Leasing) => true,
            (Leasing, Walking) => true,
            (Walking, Classifying) => true,
            (Classifying, Extracting | Completing) => true,
            (Extracting, Reconciling) => true,
            (Reconciling, Extracting | Completing) => true,
            (Completing, Idle) => true,
            _ => false,
        }
    }

    /// Whether a scan is currently running.
    pub fn is_active(self) -> bool {
        !matches!(self, Self::Idle | Self::Aborted)
    }
}

/// Publishes the current [`ScanState`] to any number of watchers.
#[derive(Debug)]
pub(crate) struct StateCell {
    sender: watch::Sender<ScanState>,
}

impl StateCell {
    pub(crate) fn new() -> Self {
        Self {
            sender: watch::Sender::new(ScanState::Idle),
        }
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<ScanState> {
        self.sender.subscribe()
    }

    pub(crate) fn get(&self) -> ScanState {
        *self.sender.borrow()
    }

    /// Move to `next`; illegal moves are refused and logged.
    pub(crate) fn advance(&self, next: ScanState) -> bool {
        let mut moved = false;
        self.sender.send_if_modified(|current| {
            if current.can_transition_to(next) {
                tracing::trace!(from = %current, to = %next, "scan state");
                *current = next;
                moved = true;
            } else if *current != next {
                tracing::error!(from = %current, to = %next, "refusing illegal scan state transition");
            }
            moved
        });
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use ScanState::*;

    #[rstest]
    #[case(Idle, Leasing, true)]
    #[case(Leasing, Walking, true)]
    #[case(Walking, Classifying, true)]
    #[case(Classifying, Extracting, true)]
    #[case(Classifying, Completing, true)]
    #[case(Extracting, Reconciling, true)]
    #[case(Reconciling, Extracting, true)]
    #[case(Reconciling, Completing, true)]
    #[case(Completing, Idle, true)]
    #[case(Aborted, Leasing, true)]
    #[case(Leasing, Aborted, true)]
    #[case(Reconciling, Aborted, true)]
    #[case(Completing, Aborted, true)]
    #[case(Idle, Aborted, false)]
    #[case(Idle, Walking, false)]
    #[case(Leasing, Extracting, false)]
    #[case(Walking, Completing, false)]
    #[case(Extracting, Completing, false)]
    #[case(Aborted, Completing, false)]
    #[case(Aborted, Idle, false)]
    #[case(Completing, Leasing, false)]
    fn test_transitions(#[case] from: ScanState, #[case] to: ScanState, #[case] allowed: bool) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[tokio::test]
    async fn test_cell_publishes_legal_moves_only() {
        let cell = StateCell::new();
        let mut watcher = cell.subscribe();
        assert!(cell.advance(Leasing));
        assert!(watcher.has_changed().unwrap());
        assert_eq!(*watcher.borrow_and_update(), Leasing);
        assert!(!cell.advance(Completing));
        assert!(!watcher.has_changed().unwrap());
        assert_eq!(cell.get(), Leasing);
    }

    #[test]
    fn test_is_active() {
        assert!(!Idle.is_active());
        assert!(!Aborted.is_active());
        assert!(Walking.is_active());
    }
}
