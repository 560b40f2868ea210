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

//! APRS client library for consuming and projecting APRS report feeds.
//!
//! This library provides a modular architecture for receiving a live stream
//! of callsign-tagged position/telemetry reports and maintaining a bounded,
//! queryable view of them. It supports multiple layers that can be used
//! independently or composed together:
//!
//! - **Protocol layer**: JSON frame parsing into [`Report`] payloads
//! - **Store layer**: bounded, insertion-ordered message retention
//! - **Projection layers**: per-callsign map markers, substring filtering,
//!   and single-message focus
//! - **Alerting layers**: watch-list notification trigger and the
//!   gesture-gated audio unlock lifecycle
//! - **Connection layer**: async WebSocket with automatic reconnection and
//!   endpoint hot-reload
//!
//! # Quick Start
//!
//! The [`Engine`] type wires all layers together behind presentation seams
//! ([`MarkerSink`], [`AlertSink`], [`SoundSink`]) supplied by the caller. It
//! is the single mutation surface: every insert, delete, clear or criteria
//! change re-establishes the derived-view invariants before returning.
//!
//! # Using Individual Layers
//!
//! ## Protocol Layer Only
//!
//! ```
//! use aprs_client::protocol::parse_frame;
//!
//! let report = parse_frame(r#"{"From":"TA1ABC","latitude":39.0,"longitude":32.0}"#).unwrap();
//! assert_eq!(report.position(), Some((39.0, 32.0)));
//! ```
//!
//! ## Store Layer Only
//!
//! ```
//! use aprs_client::protocol::parse_frame;
//! use aprs_client::store::MessageStore;
//!
//! let mut store = MessageStore::new(100);
//! let report = parse_frame(r#"{"From":"TA1ABC","Data":"test"}"#).unwrap();
//! let inserted = store.insert(report).unwrap();
//! assert!(store.get(inserted.id).is_some());
//! ```

pub mod alert;
pub mod audio;
pub mod filter;
pub mod focus;
pub mod markers;
pub mod protocol;
pub mod store;
pub mod ws;

use log::{debug, info, warn};
use tokio::sync::broadcast;

pub use alert::{AlertEvent, AlertOutcome, AlertSink, NotificationTrigger};
pub use audio::{AudioUnlock, PlaybackError, SoundSink, UnlockState};
pub use filter::{FilterCriteria, FilterResult};
pub use focus::FocusTracker;
pub use markers::{Marker, MarkerRegistry, MarkerSink};
pub use protocol::{parse_frame, ParseError, Report};
pub use store::{Message, MessageId, MessageStore, StoreError, StoreEvent};
pub use ws::{Connection, ConnectionConfig, ConnectionEvent, ConnectionState};

/// Configuration for the full-stack engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Feed connection configuration.
    pub connection: ConnectionConfig,
    /// Retention bound for the message store.
    pub max_messages: usize,
    /// Callsigns to alert on (matched against sender and recipient).
    pub watch_list: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            max_messages: store::DEFAULT_CAPACITY,
            watch_list: Vec::new(),
        }
    }
}

/// Full-stack engine that keeps the store and every derived projection
/// consistent under continuous mutation.
///
/// All mutation is synchronous and runs to completion; the engine is meant to
/// be owned by a single task, with suspension only at event boundaries
/// (awaiting the next frame or a probe outcome).
pub struct Engine {
    store: MessageStore,
    markers: MarkerRegistry,
    criteria: FilterCriteria,
    visible: FilterResult,
    focus: FocusTracker,
    trigger: NotificationTrigger,
    unlock: AudioUnlock,
    marker_sink: Box<dyn MarkerSink + Send>,
    alert_sink: Box<dyn AlertSink + Send>,
    sound_sink: Box<dyn SoundSink>,
    connection_config: ConnectionConfig,
    connection: Option<Connection>,
    connection_state: ConnectionState,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("store", &self.store)
            .field("marker_count", &self.markers.len())
            .field("criteria", &self.criteria)
            .field("focused", &self.focus.focused())
            .field("unlock", &self.unlock.state())
            .field("connection_state", &self.connection_state)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Create an engine that is not yet connected to a feed.
    #[must_use]
    pub fn new(
        config: EngineConfig,
        marker_sink: Box<dyn MarkerSink + Send>,
        alert_sink: Box<dyn AlertSink + Send>,
        sound_sink: Box<dyn SoundSink>,
    ) -> Self {
        Self {
            store: MessageStore::new(config.max_messages),
            markers: MarkerRegistry::new(),
            criteria: FilterCriteria::default(),
            visible: FilterResult::default(),
            focus: FocusTracker::new(),
            trigger: NotificationTrigger::new(config.watch_list),
            unlock: AudioUnlock::new(),
            marker_sink,
            alert_sink,
            sound_sink,
            connection_config: config.connection,
            connection: None,
            connection_state: ConnectionState::Disconnected,
        }
    }

    /// Spawn the feed connection task. Replaces any previous connection.
    pub fn connect(&mut self) {
        self.connection = Some(Connection::spawn(self.connection_config.clone()));
    }

    /// Process the next connection event.
    ///
    /// Returns `false` when there is no connection or it has shut down:
    ///
    /// ```no_run
    /// # use aprs_client::Engine;
    /// # async fn example(mut engine: Engine) {
    /// engine.connect();
    /// while engine.process_next().await {}
    /// # }
    /// ```
    pub async fn process_next(&mut self) -> bool {
        let Some(connection) = self.connection.as_mut() else {
            return false;
        };
        let Some(event) = connection.recv().await else {
            return false;
        };

        match event {
            ConnectionEvent::StateChanged(state) => {
                debug!("Feed state: {:?}", state);
                self.connection_state = state;
            }
            ConnectionEvent::FrameReceived(frame) => self.ingest_frame(&frame),
        }
        true
    }

    /// Parse and insert one raw frame. Malformed frames are dropped with a
    /// diagnostic and change no state.
    pub fn ingest_frame(&mut self, frame: &str) {
        match protocol::parse_frame(frame) {
            Ok(report) => {
                if let Err(e) = self.insert(report) {
                    warn!("Dropping report: {}", e);
                }
            }
            Err(e) => warn!("Dropping frame: {}", e),
        }
    }

    /// Insert a report and update every derived projection.
    pub fn insert(&mut self, report: Report) -> Result<MessageId, StoreError> {
        let insertion = self.store.insert(report)?;

        // Evictions run the same cleanup as manual deletes.
        for evicted in &insertion.evicted {
            self.focus.on_deleted(evicted.id);
            let remaining = self.store.positioned_count(&evicted.report.from);
            self.markers
                .on_message_deleted(&evicted.report.from, remaining, &mut *self.marker_sink);
        }

        if let Some(report) = self.store.get(insertion.id).map(|m| m.report.clone()) {
            self.markers.upsert(
                &report.from,
                report.position(),
                report.data.as_deref().unwrap_or(""),
                &mut *self.marker_sink,
            );
            if self.trigger.check(&report, &mut *self.alert_sink) {
                self.play_alert_sound();
            }
        }

        self.refresh_visibility();
        Ok(insertion.id)
    }

    /// Delete a message by id. Idempotent.
    pub fn delete(&mut self, id: MessageId) {
        let Some(removed) = self.store.delete(id) else {
            return;
        };
        self.focus.on_deleted(removed.id);
        let remaining = self.store.positioned_count(&removed.report.from);
        self.markers
            .on_message_deleted(&removed.report.from, remaining, &mut *self.marker_sink);
        self.refresh_visibility();
    }

    /// Remove all messages, markers and focus.
    pub fn clear(&mut self) {
        self.store.clear();
        self.focus.unfocus();
        self.markers.clear(&mut *self.marker_sink);
        self.refresh_visibility();
    }

    /// Replace the filter criteria and recompute visibility.
    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;
        self.refresh_visibility();
    }

    /// Focus a message for inspection. Focusing an id that is not in the
    /// store clears focus instead.
    pub fn focus(&mut self, id: MessageId) {
        if self.store.get(id).is_some() {
            self.focus.focus(id);
        } else {
            self.focus.unfocus();
        }
    }

    /// Clear the focused message.
    pub fn unfocus(&mut self) {
        self.focus.unfocus();
    }

    /// Attempt to unlock audio playback from a user gesture.
    ///
    /// Runs at most one probe; requests while a probe is in flight or once
    /// already unlocked are no-ops.
    pub async fn request_unlock(&mut self) {
        if !self.unlock.begin() {
            return;
        }
        match self.sound_sink.probe().await {
            Ok(()) => {
                info!("Audio playback unlocked");
                self.unlock.probe_succeeded();
            }
            Err(e) => {
                warn!("Audio unlock probe failed: {}", e);
                self.unlock.probe_failed();
            }
        }
    }

    /// Present an alert for a report unconditionally, with sound if unlocked.
    pub fn attempt_alert(&mut self, report: &Report) {
        self.trigger.dispatch(report, &mut *self.alert_sink);
        self.play_alert_sound();
    }

    fn play_alert_sound(&mut self) {
        if !self.unlock.is_unlocked() {
            return;
        }
        if let Err(e) = self.sound_sink.play() {
            warn!("Alert playback failed, re-locking audio: {}", e);
            self.unlock.playback_failed();
        }
    }

    fn refresh_visibility(&mut self) {
        self.visible = filter::recompute(self.store.all(), &self.criteria);

        let callsigns: Vec<String> = self.markers.callsigns().map(str::to_string).collect();
        for callsign in callsigns {
            let visible = self.visible.callsign_visible(&callsign);
            self.markers
                .set_visible(&callsign, visible, &mut *self.marker_sink);
        }
    }

    // Read accessors

    /// All retained messages in arrival order.
    #[must_use]
    pub fn messages(&self) -> Vec<&Message> {
        self.store.all().collect()
    }

    /// Look up a message by id.
    #[must_use]
    pub fn message(&self, id: MessageId) -> Option<&Message> {
        self.store.get(id)
    }

    /// Number of retained messages.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.store.len()
    }

    /// All current markers.
    #[must_use]
    pub fn markers(&self) -> Vec<(&str, &Marker)> {
        self.markers.all().collect()
    }

    /// Marker for a callsign, if any.
    #[must_use]
    pub fn marker(&self, callsign: &str) -> Option<&Marker> {
        self.markers.get(callsign)
    }

    /// Current visibility sets.
    #[must_use]
    pub fn visibility(&self) -> &FilterResult {
        &self.visible
    }

    /// Active filter criteria.
    #[must_use]
    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    /// Currently focused message id, if any.
    #[must_use]
    pub fn focused(&self) -> Option<MessageId> {
        self.focus.focused()
    }

    /// Current audio unlock state.
    #[must_use]
    pub fn unlock_state(&self) -> UnlockState {
        self.unlock.state()
    }

    /// Current feed connection state.
    #[must_use]
    pub fn connection_state(&self) -> &ConnectionState {
        &self.connection_state
    }

    /// Subscribe to store change events.
    #[must_use]
    pub fn subscribe_store(&self) -> broadcast::Receiver<StoreEvent> {
        self.store.subscribe()
    }

    /// Subscribe to alert events.
    #[must_use]
    pub fn subscribe_alerts(&self) -> broadcast::Receiver<AlertEvent> {
        self.trigger.subscribe()
    }

    /// Change the feed endpoint; reconnects immediately when connected.
    pub fn set_endpoint(&mut self, url: String) {
        self.connection_config.url = url.clone();
        if let Some(connection) = &self.connection {
            connection.set_url(url);
        }
    }

    /// Shut down the feed connection.
    pub fn shutdown(&self) {
        if let Some(connection) = &self.connection {
            connection.shutdown();
        }
    }
}
