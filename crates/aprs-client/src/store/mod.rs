// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Bounded, insertion-ordered message store.
//!
//! The store is the single source of truth for retained reports. Each report
//! is wrapped in a [`Message`] with a monotonically increasing id assigned at
//! insertion; id order equals arrival order and ids are never reused. The
//! store never grows beyond its capacity: inserting past the bound evicts the
//! oldest message through the same removal path as a manual delete, so
//! derived views observe evictions exactly like deletions.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::protocol::Report;

/// Default retention bound.
pub const DEFAULT_CAPACITY: usize = 100;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Monotonic message identifier.
pub type MessageId = u64;

/// Errors that can occur when inserting a report.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The report is missing its mandatory sender callsign.
    #[error("report has no sender callsign")]
    InvalidReport,
}

/// A stored report plus assigned id and arrival time.
#[derive(Debug, Clone)]
pub struct Message {
    /// Insertion-ordered id, unique for the session.
    pub id: MessageId,
    /// The report payload as received.
    pub report: Report,
    /// When the report was inserted.
    pub received_at: DateTime<Utc>,
}

/// Events emitted by the store when its contents change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// A message was inserted.
    Inserted(MessageId),
    /// A message was deleted (manual delete or eviction).
    Deleted(MessageId),
    /// All messages were removed at once.
    Cleared,
}

/// Outcome of a successful insert.
#[derive(Debug)]
pub struct Insertion {
    /// Id assigned to the new message.
    pub id: MessageId,
    /// Messages evicted to restore the retention bound, oldest first.
    pub evicted: Vec<Message>,
}

/// Bounded message store keyed by monotonic id.
pub struct MessageStore {
    messages: VecDeque<Message>,
    next_id: MessageId,
    capacity: usize,
    event_tx: broadcast::Sender<StoreEvent>,
}

impl std::fmt::Debug for MessageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageStore")
            .field("message_count", &self.messages.len())
            .field("capacity", &self.capacity)
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl MessageStore {
    /// Create a new store retaining at most `capacity` messages.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            messages: VecDeque::new(),
            next_id: 1,
            capacity: capacity.max(1),
            event_tx,
        }
    }

    /// Insert a report, assigning the next id.
    ///
    /// Fails with [`StoreError::InvalidReport`] when the report has no sender
    /// callsign; nothing is stored in that case. Inserting past the retention
    /// bound evicts the oldest message; the evicted messages are returned so
    /// the caller can run the same cleanup it runs for deletions.
    pub fn insert(&mut self, report: Report) -> Result<Insertion, StoreError> {
        if !report.has_callsign() {
            return Err(StoreError::InvalidReport);
        }

        let id = self.next_id;
        self.next_id += 1;

        self.messages.push_back(Message {
            id,
            report,
            received_at: Utc::now(),
        });
        let _ = self.event_tx.send(StoreEvent::Inserted(id));

        let mut evicted = Vec::new();
        while self.messages.len() > self.capacity {
            let oldest = self.messages.front().map(|m| m.id);
            match oldest.and_then(|id| self.delete(id)) {
                Some(message) => evicted.push(message),
                None => break,
            }
        }

        Ok(Insertion { id, evicted })
    }

    /// Remove a message by id. Idempotent; returns the removed message if it
    /// was present.
    pub fn delete(&mut self, id: MessageId) -> Option<Message> {
        let index = self.messages.binary_search_by_key(&id, |m| m.id).ok()?;
        let removed = self.messages.remove(index);
        if removed.is_some() {
            let _ = self.event_tx.send(StoreEvent::Deleted(id));
        }
        removed
    }

    /// Remove all messages, returning them in arrival order.
    pub fn clear(&mut self) -> Vec<Message> {
        let drained: Vec<Message> = self.messages.drain(..).collect();
        if !drained.is_empty() {
            let _ = self.event_tx.send(StoreEvent::Cleared);
        }
        drained
    }

    /// Look up a message by id.
    #[must_use]
    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages
            .binary_search_by_key(&id, |m| m.id)
            .ok()
            .and_then(|index| self.messages.get(index))
    }

    /// Iterate over all retained messages in arrival order.
    pub fn all(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    /// Number of retained messages from `callsign` that carry coordinates.
    #[must_use]
    pub fn positioned_count(&self, callsign: &str) -> usize {
        self.messages
            .iter()
            .filter(|m| m.report.from == callsign && m.report.position().is_some())
            .count()
    }

    /// Number of retained messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Retention bound.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Subscribe to store change events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.event_tx.subscribe()
    }
}
