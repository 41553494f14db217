//! Per-debate event bus with bounded replay.
//!
//! One channel per debate ID: a broadcast sender for live delivery and
//! a ring of the last [`REPLAY_CAPACITY`] events for reconnection
//! replay. Emission is synchronous in-process; a failed or lagging
//! subscriber never breaks the publisher. No cross-debate ordering is
//! guaranteed, only per-debate emission order.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use tokio::sync::broadcast;

use da_domain::events::{BusEvent, DebateEvent};

/// Retained events per debate for replay. Tunable.
pub const REPLAY_CAPACITY: usize = 100;

/// Live broadcast buffer per subscriber before lagging kicks in.
const BROADCAST_CAPACITY: usize = 256;

struct Channel {
    sender: broadcast::Sender<BusEvent>,
    history: VecDeque<BusEvent>,
    last_emit: DateTime<Utc>,
}

impl Channel {
    fn new() -> Self {
        let (sender, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            sender,
            history: VecDeque::with_capacity(REPLAY_CAPACITY),
            last_emit: Utc::now(),
        }
    }
}

/// The process-wide bus, partitioned internally by debate ID.
#[derive(Default)]
pub struct EventBus {
    channels: RwLock<HashMap<String, Channel>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish one event to a debate's channel.
    ///
    /// Subscribers observe events in emission order. Send failures
    /// (no live subscribers) are not errors.
    pub fn emit(&self, debate_id: &str, event: DebateEvent) -> BusEvent {
        let bus_event = BusEvent::new(debate_id, event);

        let mut channels = self.channels.write();
        let channel = channels
            .entry(debate_id.to_string())
            .or_insert_with(Channel::new);

        channel.history.push_back(bus_event.clone());
        while channel.history.len() > REPLAY_CAPACITY {
            channel.history.pop_front();
        }
        channel.last_emit = bus_event.timestamp;

        // No receivers is fine; replay covers late subscribers.
        let _ = channel.sender.send(bus_event.clone());

        bus_event
    }

    /// Subscribe to a debate: returns the replay snapshot (optionally
    /// only events strictly after `since`) plus a live receiver.
    pub fn subscribe(
        &self,
        debate_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> (Vec<BusEvent>, broadcast::Receiver<BusEvent>) {
        let mut channels = self.channels.write();
        let channel = channels
            .entry(debate_id.to_string())
            .or_insert_with(Channel::new);

        let replay = filter_since(&channel.history, since);
        (replay, channel.sender.subscribe())
    }

    /// Retained events for a debate, optionally strictly after `since`.
    pub fn recent(&self, debate_id: &str, since: Option<DateTime<Utc>>) -> Vec<BusEvent> {
        let channels = self.channels.read();
        match channels.get(debate_id) {
            Some(channel) => filter_since(&channel.history, since),
            None => Vec::new(),
        }
    }

    /// Debates with at least one live subscriber.
    pub fn active_debates(&self) -> Vec<String> {
        self.channels
            .read()
            .iter()
            .filter(|(_, ch)| ch.sender.receiver_count() > 0)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Drop channels with no subscribers whose last emission is older
    /// than `max_age`. Returns how many were dropped.
    pub fn cleanup(&self, max_age: Duration) -> usize {
        let cutoff = Utc::now() - max_age;
        let mut channels = self.channels.write();
        let before = channels.len();
        channels.retain(|_, ch| ch.sender.receiver_count() > 0 || ch.last_emit > cutoff);
        before - channels.len()
    }
}

fn filter_since(history: &VecDeque<BusEvent>, since: Option<DateTime<Utc>>) -> Vec<BusEvent> {
    match since {
        None => history.iter().cloned().collect(),
        Some(ts) => history.iter().filter(|e| e.timestamp > ts).cloned().collect(),
    }
}
