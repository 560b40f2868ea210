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

//! Protocol layer for APRS report frames.
//!
//! The feed delivers UTF-8 text frames, each a JSON object describing one
//! decoded packet. This module owns the [`Report`] payload type and the
//! frame parsing entry point. Parsing returns an explicit result; a frame
//! that is not valid JSON or carries no sender callsign is rejected here
//! and never reaches the message store.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while parsing a frame.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("frame is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("frame has no sender callsign")]
    MissingCallsign,
}

/// One telemetry/position update as received from the stream.
///
/// All fields except the sender callsign are optional. Coordinates are only
/// meaningful as a pair; [`Report::position`] returns `None` unless both are
/// present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Sender callsign (e.g. "TA1ABC-7"). The only mandatory field.
    #[serde(rename = "From", default)]
    pub from: String,

    /// Recipient callsign.
    #[serde(rename = "To", default)]
    pub to: Option<String>,

    /// Relay path; empty or absent when the packet was heard directly.
    #[serde(rename = "Via", default)]
    pub via: Option<String>,

    /// Date the packet was received, as formatted by the feed.
    #[serde(rename = "Date", default)]
    pub date: Option<String>,

    /// Time the packet was received, as formatted by the feed.
    #[serde(rename = "Time", default)]
    pub time: Option<String>,

    /// Frame classification (e.g. "UI").
    #[serde(rename = "Type", default)]
    pub frame_type: Option<String>,

    /// Protocol id byte, hex formatted (e.g. "0xf0").
    #[serde(rename = "PID", default)]
    pub pid: Option<String>,

    /// Free-text payload.
    #[serde(rename = "Data", default)]
    pub data: Option<String>,

    /// Raw payload bytes, hex encoded.
    #[serde(rename = "Data_Hex", default)]
    pub data_hex: Option<String>,

    /// Decoded latitude in degrees.
    #[serde(default)]
    pub latitude: Option<f64>,

    /// Decoded longitude in degrees.
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl Report {
    /// Position carried by this report, present only when the frame decoded
    /// both coordinates.
    #[must_use]
    pub fn position(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }

    /// Whether the report has a usable sender callsign.
    #[must_use]
    pub fn has_callsign(&self) -> bool {
        !self.from.trim().is_empty()
    }
}

/// Parse one text frame into a [`Report`].
///
/// Returns [`ParseError::MissingCallsign`] when the frame decodes but the
/// `From` field is absent or empty.
pub fn parse_frame(frame: &str) -> Result<Report, ParseError> {
    let report: Report = serde_json::from_str(frame)?;
    if !report.has_callsign() {
        return Err(ParseError::MissingCallsign);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_frame() {
        let frame = r#"{
            "Date": "2025-06-01", "Time": "12:34:56",
            "From": "TA1ABC", "To": "APRS", "Via": "WIDE1-1",
            "Type": "UI", "PID": "0xf0",
            "Data": "!3900.00N/03200.00E-test",
            "Data_Hex": "2133",
            "latitude": 39.0, "longitude": 32.0
        }"#;

        let report = parse_frame(frame).unwrap();
        assert_eq!(report.from, "TA1ABC");
        assert_eq!(report.to.as_deref(), Some("APRS"));
        assert_eq!(report.position(), Some((39.0, 32.0)));
    }

    #[test]
    fn test_parse_minimal_frame() {
        let report = parse_frame(r#"{"From":"TB2XYZ"}"#).unwrap();
        assert_eq!(report.from, "TB2XYZ");
        assert!(report.to.is_none());
        assert!(report.position().is_none());
    }

    #[test]
    fn test_missing_callsign_rejected() {
        assert!(matches!(
            parse_frame(r#"{"To":"X"}"#),
            Err(ParseError::MissingCallsign)
        ));
        assert!(matches!(
            parse_frame(r#"{"From":"  "}"#),
            Err(ParseError::MissingCallsign)
        ));
    }

    #[test]
    fn test_invalid_json_rejected() {
        assert!(matches!(
            parse_frame("not json"),
            Err(ParseError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_half_position_is_no_position() {
        let report = parse_frame(r#"{"From":"TA1ABC","latitude":39.0}"#).unwrap();
        assert!(report.position().is_none());

        let report =
            parse_frame(r#"{"From":"TA1ABC","latitude":null,"longitude":32.0}"#).unwrap();
        assert!(report.position().is_none());
    }
}
