use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};

/// Tracks one live WebSocket connection per online user.
///
/// Single-process only: presence is held in memory and is lost on restart,
/// which matches the realtime endpoint's contract (no durable presence
/// beyond the in-memory pending-message buffer).
#[derive(Clone)]
pub struct ConnectionManager {
    outbound_queue_depth: usize,
    channels: Arc<RwLock<HashMap<String, mpsc::Sender<String>>>>,
}

impl ConnectionManager {
    pub fn new(outbound_queue_depth: usize) -> Self {
        Self {
            outbound_queue_depth: outbound_queue_depth.max(1),
            channels: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Registers `username` as online, returning the receiving half of its
    /// outbound queue. Any previously registered connection for the same
    /// user is displaced (its sender is dropped, which ends its send task).
    pub async fn register(&self, username: &str) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(self.outbound_queue_depth);
        self.channels.write().await.insert(username.to_string(), tx);
        rx
    }

    /// Idempotent: unregistering a user who isn't registered is a no-op.
    pub async fn unregister(&self, username: &str) {
        self.channels.write().await.remove(username);
    }

    pub async fn is_online(&self, username: &str) -> bool {
        self.channels.read().await.contains_key(username)
    }

    async fn get(&self, username: &str) -> Option<mpsc::Sender<String>> {
        self.channels.read().await.get(username).cloned()
    }

    /// Sends `payload` to `username` if currently online, unregistering the
    /// connection on delivery failure (the channel is closed because the
    /// connection's send task has already exited). Returns whether the
    /// payload was accepted by the channel.
    pub async fn send_personal(&self, username: &str, payload: String) -> bool {
        let Some(sender) = self.get(username).await else {
            return false;
        };
        if sender.send(payload).await.is_err() {
            self.unregister(username).await;
            return false;
        }
        true
    }
}
