/**
 * Delivery Groups
 *
 * This module owns the per-user delivery group ("room") model. A delivery
 * group is the set of one user's currently active real-time connections,
 * and it is the sole addressing primitive: "deliver to user X" means
 * "broadcast to delivery group X", which transparently fans out to however
 * many sessions X currently has open.
 *
 * # Broadcasting
 *
 * Each group is a `tokio::sync::broadcast` channel created lazily on first
 * join. Joining is idempotent — every session of the same user subscribes
 * to the same channel, so no separate session registry is needed.
 */
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::shared::event::ServerEvent;

/// Broadcast channel capacity per delivery group
const GROUP_CAPACITY: usize = 256;

/// Registry of per-user delivery groups
///
/// Cloning is cheap and shares the underlying registry; one instance lives
/// in the application state and every connection handler holds a clone.
#[derive(Clone, Default)]
pub struct DeliveryGroups {
    channels: Arc<Mutex<HashMap<Uuid, broadcast::Sender<ServerEvent>>>>,
}

impl DeliveryGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join `user`'s delivery group, returning this session's receiver
    ///
    /// Creates the group on first join; subsequent sessions of the same
    /// user subscribe to the same channel. Dropping the receiver leaves the
    /// group, and [`DeliveryGroups::sweep`] eventually reclaims empty ones.
    pub fn join(&self, user: Uuid) -> broadcast::Receiver<ServerEvent> {
        let mut channels = self.channels.lock().expect("delivery group lock poisoned");
        channels
            .entry(user)
            .or_insert_with(|| broadcast::channel(GROUP_CAPACITY).0)
            .subscribe()
    }

    /// Broadcast an event to one user's delivery group
    ///
    /// Returns the number of sessions that received the event; 0 when the
    /// user has no group or no live sessions — that is not an error, the
    /// user is simply offline.
    pub fn broadcast(&self, user: Uuid, event: ServerEvent) -> usize {
        let sender = {
            let channels = self.channels.lock().expect("delivery group lock poisoned");
            channels.get(&user).cloned()
        };

        match sender.map(|tx| tx.send(event)) {
            Some(Ok(session_count)) => {
                tracing::debug!(%user, session_count, "event delivered to group");
                session_count
            }
            _ => 0,
        }
    }

    /// Broadcast an event to several delivery groups, once per group
    ///
    /// Duplicate targets are delivered only once — a self-addressed send
    /// names the same group twice but each session still receives exactly
    /// one copy.
    pub fn broadcast_to(&self, targets: &[Uuid], event: ServerEvent) -> usize {
        let mut delivered = 0;
        for (position, target) in targets.iter().enumerate() {
            if targets[..position].contains(target) {
                continue;
            }
            delivered += self.broadcast(*target, event.clone());
        }
        delivered
    }

    /// Drop groups with no live sessions
    pub fn sweep(&self) {
        let mut channels = self.channels.lock().expect("delivery group lock poisoned");
        channels.retain(|_, tx| tx.receiver_count() > 0);
    }

    /// Number of currently known groups
    pub fn group_count(&self) -> usize {
        self.channels
            .lock()
            .expect("delivery group lock poisoned")
            .len()
    }
}
