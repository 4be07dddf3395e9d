use std::collections::HashMap;

use async_broadcast::{broadcast, InactiveReceiver, Receiver, Sender, TrySendError};
use tokio::sync::RwLock;

use crate::domain::repositories::StateChange;

/// Buffered changes per match before slow subscribers start losing the oldest
const FEED_CAPACITY: usize = 64;

struct Channel {
    sender: Sender<StateChange>,
    // Keeps the channel open while nobody is listening
    _keepalive: InactiveReceiver<StateChange>,
}

impl Channel {
    fn new() -> Self {
        let (mut sender, receiver) = broadcast(FEED_CAPACITY);
        sender.set_overflow(true);
        Self {
            sender,
            _keepalive: receiver.deactivate(),
        }
    }
}

/// Per-match broadcast of committed state changes
#[derive(Default)]
pub struct ChangeFeed {
    channels: RwLock<HashMap<String, Channel>>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// New receiver for a match, opening its channel on first use
    pub async fn subscribe(&self, match_id: &str) -> Receiver<StateChange> {
        {
            let channels = self.channels.read().await;
            if let Some(channel) = channels.get(match_id) {
                return channel.sender.new_receiver();
            }
        }

        let mut channels = self.channels.write().await;
        channels
            .entry(match_id.to_string())
            .or_insert_with(Channel::new)
            .sender
            .new_receiver()
    }

    /// Publish a committed change to every current subscriber
    pub async fn publish(&self, change: StateChange) {
        let channels = self.channels.read().await;
        let Some(channel) = channels.get(&change.match_id) else {
            return;
        };

        tracing::debug!(
            "Publishing match {} v{} to {} receivers",
            change.match_id,
            change.version,
            channel.sender.receiver_count()
        );
        match channel.sender.try_broadcast(change) {
            Ok(None) => {}
            Ok(Some(dropped)) => {
                tracing::debug!("Feed overflow, dropped v{}", dropped.version);
            }
            Err(TrySendError::Inactive(_)) => {
                tracing::debug!("Change committed with no active subscribers");
            }
            Err(e) => {
                tracing::warn!("Failed to publish change: {:?}", e);
            }
        }
    }

    /// Close a match's channel; receivers drain what was published, then see
    /// the end of the stream
    pub async fn close(&self, match_id: &str) {
        let mut channels = self.channels.write().await;
        if let Some(channel) = channels.remove(match_id) {
            channel.sender.close();
            tracing::debug!("Closed change feed for match {}", match_id);
        }
    }

    /// Receiver for a match that will never change again
    pub fn ended() -> Receiver<StateChange> {
        let (sender, receiver) = broadcast(1);
        sender.close();
        receiver
    }

    #[cfg(test)]
    pub(crate) async fn is_open(&self, match_id: &str) -> bool {
        self.channels.read().await.contains_key(match_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{GameState, MatchSettings, Player};
    use std::sync::Arc;

    fn change(version: u64) -> StateChange {
        let players = vec![Player::new("a", "A", false), Player::new("b", "B", false)];
        StateChange {
            match_id: "m1".to_string(),
            version,
            state: Arc::new(GameState::new(players, MatchSettings::default(), 1)),
        }
    }

    #[tokio::test]
    async fn test_subscribers_receive_in_order() {
        let feed = ChangeFeed::new();
        let mut first = feed.subscribe("m1").await;
        let mut second = feed.subscribe("m1").await;

        feed.publish(change(1)).await;
        feed.publish(change(2)).await;

        assert_eq!(first.recv().await.unwrap().version, 1);
        assert_eq!(first.recv().await.unwrap().version, 2);
        assert_eq!(second.recv().await.unwrap().version, 1);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_quiet() {
        let feed = ChangeFeed::new();
        let receiver = feed.subscribe("m1").await;
        drop(receiver);

        feed.publish(change(1)).await;

        let mut late = feed.subscribe("m1").await;
        feed.publish(change(2)).await;
        assert_eq!(late.recv().await.unwrap().version, 2);
    }

    #[tokio::test]
    async fn test_close_ends_stream() {
        let feed = ChangeFeed::new();
        let mut receiver = feed.subscribe("m1").await;
        feed.close("m1").await;
        assert!(receiver.recv().await.is_err());
        assert!(!feed.is_open("m1").await);
    }

    #[tokio::test]
    async fn test_close_delivers_last_change_first() {
        let feed = ChangeFeed::new();
        let mut receiver = feed.subscribe("m1").await;

        feed.publish(change(4)).await;
        feed.close("m1").await;

        assert_eq!(receiver.recv().await.unwrap().version, 4);
        assert!(receiver.recv().await.is_err());
    }

    #[tokio::test]
    async fn test_ended_receiver_is_closed() {
        let feed = ChangeFeed::new();
        let mut receiver = ChangeFeed::ended();
        assert!(receiver.recv().await.is_err());
        assert!(!feed.is_open("m1").await);
    }
}
