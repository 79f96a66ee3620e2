//! In-process change notification
//!
//! Fans [`ChangeSignal`]s out to any number of subscribers over a
//! `tokio::sync::broadcast` channel. Slow subscribers that fall behind the
//! channel capacity observe `RecvError::Lagged` and keep going.

use tokio::sync::broadcast;
use tracing::trace;
use unical_core::ChangeNotifier;
use unical_domain::ChangeSignal;

/// Default channel capacity.
pub const DEFAULT_NOTIFIER_CAPACITY: usize = 256;

/// Broadcast-backed [`ChangeNotifier`].
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<ChangeSignal>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// New receiver observing every signal published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeSignal> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_NOTIFIER_CAPACITY)
    }
}

impl ChangeNotifier for BroadcastNotifier {
    fn publish(&self, signal: ChangeSignal) {
        // Err only means nobody is listening.
        if self.sender.send(signal).is_err() {
            trace!("change signal dropped, no subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::broadcast::error::TryRecvError;
    use unical_domain::Provider;

    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_signals() {
        let notifier = BroadcastNotifier::default();
        let mut first = notifier.subscribe();
        let mut second = notifier.subscribe();

        notifier.publish(ChangeSignal::EventsChanged {
            account_email: "a@example.com".into(),
            source: Some(Provider::Google),
        });

        for rx in [&mut first, &mut second] {
            match rx.recv().await.unwrap() {
                ChangeSignal::EventsChanged { account_email, source } => {
                    assert_eq!(account_email, "a@example.com");
                    assert_eq!(source, Some(Provider::Google));
                }
                other => panic!("unexpected signal {other:?}"),
            }
        }
    }

    #[test]
    fn publish_without_subscribers_is_ignored() {
        let notifier = BroadcastNotifier::new(4);
        assert_eq!(notifier.subscriber_count(), 0);
        notifier.publish(ChangeSignal::AccountsChanged);

        let mut late = notifier.subscribe();
        assert_eq!(late.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let notifier = BroadcastNotifier::new(0);
        let mut rx = notifier.subscribe();
        notifier.publish(ChangeSignal::SyncStarted);
        assert_eq!(rx.try_recv(), Ok(ChangeSignal::SyncStarted));
    }
}
