//! Topic-filtered subscribe/publish on top of the connection manager.
//!
//! Views never see raw frames: they subscribe to a [`Topic`] and get a
//! stream of envelopes, and they publish payloads without knowing how
//! the wire works. A single dispatcher task fans each inbound envelope
//! out to every subscription whose topic matches.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, broadcast, mpsc};
use tokio::task::JoinHandle;

use classline_protocol::{Envelope, UserId};

use crate::{ClasslineError, ConnectionManager};

/// What a subscription listens for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Topic {
    /// Envelopes addressed to this user, plus broadcasts.
    Direct(UserId),
    /// Everything, addressed or not.
    Broadcast,
}

impl Topic {
    fn matches(&self, recipient: Option<&UserId>) -> bool {
        match (self, recipient) {
            (Topic::Broadcast, _) => true,
            // An unaddressed envelope reaches every subscriber.
            (Topic::Direct(_), None) => true,
            (Topic::Direct(id), Some(recipient)) => id == recipient,
        }
    }
}

struct Registry {
    next_id: u64,
    subscribers: HashMap<u64, (Topic, mpsc::UnboundedSender<Envelope>)>,
}

/// The messaging surface handed to views.
///
/// Holds its own clone of the [`ConnectionManager`] handle and the local
/// user's id, so publishing needs neither. Dropping the channel stops
/// its dispatcher; live [`Subscription`]s then simply run dry.
pub struct MessageChannel {
    manager: ConnectionManager,
    local_id: UserId,
    registry: Arc<Mutex<Registry>>,
    dispatcher: JoinHandle<()>,
}

impl MessageChannel {
    /// Attaches a channel to a running manager.
    ///
    /// `local_id` is stamped as the sender on every published envelope.
    pub fn attach(manager: ConnectionManager, local_id: UserId) -> Self {
        let registry = Arc::new(Mutex::new(Registry {
            next_id: 1,
            subscribers: HashMap::new(),
        }));
        let dispatcher = tokio::spawn(dispatch_loop(
            manager.inbound(),
            Arc::clone(&registry),
        ));
        Self {
            manager,
            local_id,
            registry,
            dispatcher,
        }
    }

    /// The id published envelopes are sent as.
    pub fn local_id(&self) -> &UserId {
        &self.local_id
    }

    /// Registers a subscription for `topic`.
    ///
    /// Messages that arrived before this call are not replayed.
    pub async fn subscribe(&self, topic: Topic) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut registry = self.registry.lock().await;
        let id = registry.next_id;
        registry.next_id += 1;
        registry.subscribers.insert(id, (topic, tx));
        Subscription {
            id,
            rx,
            registry: Arc::clone(&self.registry),
            detached: false,
        }
    }

    /// Publishes `payload`, addressed to `recipient` or to everyone.
    ///
    /// Fails with [`ClasslineError::NotConnected`] when the connection
    /// is down; nothing is queued.
    pub async fn publish(
        &self,
        recipient: Option<UserId>,
        payload: Vec<u8>,
    ) -> Result<(), ClasslineError> {
        let envelope =
            Envelope::new(self.local_id.clone(), recipient, payload);
        self.manager.send(envelope).await
    }
}

impl Drop for MessageChannel {
    fn drop(&mut self) {
        self.dispatcher.abort();
    }
}

async fn dispatch_loop(
    mut inbound: broadcast::Receiver<Envelope>,
    registry: Arc<Mutex<Registry>>,
) {
    loop {
        match inbound.recv().await {
            Ok(envelope) => {
                let mut registry = registry.lock().await;
                let mut dead = Vec::new();
                for (id, (topic, tx)) in registry.subscribers.iter() {
                    if topic.matches(envelope.recipient_id())
                        && tx.send(envelope.clone()).is_err()
                    {
                        dead.push(*id);
                    }
                }
                for id in dead {
                    registry.subscribers.remove(&id);
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "dispatcher lagging, frames skipped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// A live subscription. Unregisters itself when dropped.
pub struct Subscription {
    id: u64,
    rx: mpsc::UnboundedReceiver<Envelope>,
    registry: Arc<Mutex<Registry>>,
    detached: bool,
}

impl Subscription {
    /// The next matching envelope, or `None` once the channel is gone.
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.rx.recv().await
    }

    /// A matching envelope if one is already queued.
    pub fn try_recv(&mut self) -> Option<Envelope> {
        self.rx.try_recv().ok()
    }

    /// Unregisters immediately rather than on drop.
    pub async fn unsubscribe(mut self) {
        self.detached = true;
        self.registry.lock().await.subscribers.remove(&self.id);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.detached {
            return;
        }
        // Drop is sync; removal rides on a detached task. Until it runs
        // the dispatcher just hits a closed sender and prunes the entry
        // itself.
        let registry = Arc::clone(&self.registry);
        let id = self.id;
        tokio::spawn(async move {
            registry.lock().await.subscribers.remove(&id);
        });
    }
}

// =========================================================================
// Tests
// =========================================================================
