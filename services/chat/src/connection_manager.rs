use std::sync::Arc;

use dashmap::DashMap;
use futures::{Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use uuid::Uuid;

use campusmentor_database::{ConversationKey, Message};

/// In-process live delivery. Every stored message is broadcast once; each
/// socket keeps only the messages of its own pair.
#[derive(Clone)]
pub struct ConnectionManager {
    sender: broadcast::Sender<Message>,
    // User connections: user_id -> open sockets
    connections: Arc<DashMap<Uuid, usize>>,
}

/// Keeps a socket counted until it is dropped.
pub struct ConnectionGuard {
    manager: ConnectionManager,
    user_id: Uuid,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.manager.release(self.user_id);
    }
}

impl ConnectionManager {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            connections: Arc::new(DashMap::new()),
        }
    }

    /// Hands a message to local subscribers. Returns how many received it;
    /// nobody listening is not an error.
    pub fn deliver(&self, message: Message) -> usize {
        self.sender.send(message).unwrap_or(0)
    }

    /// Live messages exchanged between `user_id` and `other_user_id`, in
    /// arrival order. A lagging subscriber skips what it missed; the next
    /// history read fills the gap.
    pub fn subscribe(&self, user_id: Uuid, other_user_id: Uuid) -> impl Stream<Item = Message> + Send + 'static {
        let key = ConversationKey::new(user_id, other_user_id);

        BroadcastStream::new(self.sender.subscribe()).filter_map(move |received| async move {
            match received {
                Ok(message) if ConversationKey::of(&message) == key => Some(message),
                Ok(_) => None,
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Live subscriber lagged behind");
                    None
                }
            }
        })
    }

    pub fn register(&self, user_id: Uuid) -> ConnectionGuard {
        *self.connections.entry(user_id).or_insert(0) += 1;
        tracing::debug!(user_id = %user_id, "Socket registered");
        ConnectionGuard {
            manager: self.clone(),
            user_id,
        }
    }

    fn release(&self, user_id: Uuid) {
        self.connections.remove_if_mut(&user_id, |_, count| {
            *count = count.saturating_sub(1);
            *count == 0
        });
        tracing::debug!(user_id = %user_id, "Socket released");
    }

    pub fn connection_count(&self, user_id: Uuid) -> usize {
        self.connections.get(&user_id).map(|count| *count).unwrap_or(0)
    }

    pub fn online_users(&self) -> Vec<Uuid> {
        self.connections.iter().map(|entry| *entry.key()).collect()
    }
}
