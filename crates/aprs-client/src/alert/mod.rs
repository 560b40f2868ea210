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

//! Watch-list matching and alert dispatch.
//!
//! The trigger holds a static watch-list of callsigns, compared
//! case-insensitively against both sender and recipient of every inserted
//! message. A match emits an [`AlertEvent`] carrying the full report
//! unmodified and asks the presentation layer's [`AlertSink`] to show it.
//! Alerting is fire-and-forget: a sink refusal is logged and never touches
//! store state.

use log::warn;
use tokio::sync::broadcast;

use crate::protocol::Report;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Result of asking the platform to present an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertOutcome {
    /// The alert was presented.
    Granted,
    /// Permission to present was denied.
    Denied,
    /// No presentation mechanism is available.
    Unavailable,
}

/// Presentation seam supplied by the excluded view layer.
pub trait AlertSink {
    fn present(&mut self, title: &str, body: &str) -> AlertOutcome;
}

/// Emitted for every watch-list match, carrying the report unmodified.
#[derive(Debug, Clone)]
pub struct AlertEvent {
    pub report: Report,
}

/// Watches inserted reports for configured callsigns.
pub struct NotificationTrigger {
    // Uppercased at construction so matching is a plain comparison.
    watch_list: Vec<String>,
    event_tx: broadcast::Sender<AlertEvent>,
}

impl std::fmt::Debug for NotificationTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationTrigger")
            .field("watch_list", &self.watch_list)
            .finish_non_exhaustive()
    }
}

impl NotificationTrigger {
    /// Create a trigger for the given watch-list.
    #[must_use]
    pub fn new<I, S>(watch_list: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            watch_list: watch_list
                .into_iter()
                .map(|s| s.into().trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect(),
            event_tx,
        }
    }

    /// Whether the report's sender or recipient is on the watch-list.
    #[must_use]
    pub fn matches(&self, report: &Report) -> bool {
        let from = report.from.to_uppercase();
        let to = report.to.as_deref().map(str::to_uppercase);
        self.watch_list
            .iter()
            .any(|w| *w == from || to.as_deref() == Some(w.as_str()))
    }

    /// Check an inserted report against the watch-list and alert on a match.
    pub fn check(&self, report: &Report, sink: &mut dyn AlertSink) -> bool {
        if !self.matches(report) {
            return false;
        }
        self.dispatch(report, sink);
        true
    }

    /// Emit an alert for the report unconditionally.
    pub fn dispatch(&self, report: &Report, sink: &mut dyn AlertSink) {
        let _ = self.event_tx.send(AlertEvent {
            report: report.clone(),
        });

        let title = format!("APRS: {}", report.from);
        let body = report.data.as_deref().unwrap_or("(no data)");
        match sink.present(&title, body) {
            AlertOutcome::Granted => {}
            AlertOutcome::Denied => {
                warn!("Alert for {} not shown: permission denied", report.from);
            }
            AlertOutcome::Unavailable => {
                warn!("Alert for {} not shown: no presenter available", report.from);
            }
        }
    }

    /// Subscribe to alert events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AlertEvent> {
        self.event_tx.subscribe()
    }

    /// The configured watch-list, normalized to uppercase.
    #[must_use]
    pub fn watch_list(&self) -> &[String] {
        &self.watch_list
    }
}
