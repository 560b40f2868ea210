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

//! Console implementations of the engine's presentation seams.
//!
//! A map renderer would draw markers and a desktop shell would raise native
//! notifications; headless, we log marker movements, print alerts to stderr
//! and ring the terminal bell for sound.

use std::io::Write;

use aprs_client::{AlertOutcome, AlertSink, MarkerSink, PlaybackError, SoundSink};
use async_trait::async_trait;
use log::info;

/// Logs marker placement, movement and visibility changes.
#[derive(Debug, Default)]
pub struct LogMarkers;

impl MarkerSink for LogMarkers {
    fn place_or_move(&mut self, callsign: &str, lat: f64, lon: f64, label: &str) {
        info!("Marker {callsign} at {lat:.4},{lon:.4}: {label}");
    }

    fn remove(&mut self, callsign: &str) {
        info!("Marker {callsign} removed");
    }

    fn set_visible(&mut self, callsign: &str, visible: bool) {
        info!(
            "Marker {callsign} {}",
            if visible { "shown" } else { "hidden" }
        );
    }
}

/// Prints alerts to stderr. Printing cannot be refused, so presenting
/// always reports `Granted`.
#[derive(Debug, Default)]
pub struct ConsoleAlerts;

impl AlertSink for ConsoleAlerts {
    fn present(&mut self, title: &str, body: &str) -> AlertOutcome {
        eprintln!("*** {title}: {body}");
        AlertOutcome::Granted
    }
}

/// Rings the terminal bell. The console needs no gesture, so the probe
/// succeeds as long as stdout is writable.
#[derive(Debug, Default)]
pub struct TerminalBell;

impl TerminalBell {
    fn ring(&self) -> Result<(), PlaybackError> {
        let mut stdout = std::io::stdout();
        stdout
            .write_all(b"\x07")
            .and_then(|()| stdout.flush())
            .map_err(|e| PlaybackError(e.to_string()))
    }
}

#[async_trait]
impl SoundSink for TerminalBell {
    async fn probe(&mut self) -> Result<(), PlaybackError> {
        self.ring()
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        self.ring()
    }

    fn stop(&mut self) {}
}
