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

//! Derived per-callsign last-known-position layer.
//!
//! The registry maintains at most one marker per sender callsign. A marker
//! exists while at least one retained message from that callsign carries
//! coordinates, and its position is the most recently arrived pair of
//! coordinates; a later message without coordinates does not move or erase
//! it. Map rendering itself lives behind the [`MarkerSink`] seam; the
//! registry keeps marker identity stable and only ever moves an existing
//! marker in place.

use std::collections::HashMap;

/// Rendering seam supplied by the presentation layer.
pub trait MarkerSink {
    /// Place a new marker or move an existing one, updating its label.
    fn place_or_move(&mut self, callsign: &str, lat: f64, lon: f64, label: &str);
    /// Remove the marker for `callsign` from the layer.
    fn remove(&mut self, callsign: &str);
    /// Toggle whether the marker participates in the rendered layer.
    fn set_visible(&mut self, callsign: &str, visible: bool);
}

/// Last-known position and display content for one callsign.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub latitude: f64,
    pub longitude: f64,
    pub label: String,
    pub visible: bool,
}

/// Registry of per-callsign markers.
#[derive(Debug, Default)]
pub struct MarkerRegistry {
    markers: HashMap<String, Marker>,
}

impl MarkerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a newly arrived report's coordinates.
    ///
    /// A report without a position leaves the registry untouched, so the
    /// marker keeps showing the last coordinate-bearing message. With a
    /// position, the marker is created if absent or moved in place if
    /// present.
    pub fn upsert(
        &mut self,
        callsign: &str,
        position: Option<(f64, f64)>,
        label: &str,
        sink: &mut dyn MarkerSink,
    ) {
        let Some((lat, lon)) = position else { return };

        match self.markers.get_mut(callsign) {
            Some(marker) => {
                marker.latitude = lat;
                marker.longitude = lon;
                marker.label = label.to_string();
            }
            None => {
                self.markers.insert(
                    callsign.to_string(),
                    Marker {
                        latitude: lat,
                        longitude: lon,
                        label: label.to_string(),
                        visible: true,
                    },
                );
            }
        }
        sink.place_or_move(callsign, lat, lon, label);
    }

    /// React to a message leaving the store.
    ///
    /// `remaining_positioned` is the number of retained coordinate-bearing
    /// messages still present for `callsign`; when it reaches zero the marker
    /// is removed. Otherwise the marker is left as-is: its position already
    /// reflects the latest coordinates seen, so no recomputation is needed.
    pub fn on_message_deleted(
        &mut self,
        callsign: &str,
        remaining_positioned: usize,
        sink: &mut dyn MarkerSink,
    ) {
        if remaining_positioned == 0 && self.markers.remove(callsign).is_some() {
            sink.remove(callsign);
        }
    }

    /// Toggle marker visibility without destroying it. No-op when the marker
    /// is absent or already in the requested state.
    pub fn set_visible(&mut self, callsign: &str, visible: bool, sink: &mut dyn MarkerSink) {
        if let Some(marker) = self.markers.get_mut(callsign) {
            if marker.visible != visible {
                marker.visible = visible;
                sink.set_visible(callsign, visible);
            }
        }
    }

    /// Remove every marker, mirroring a store clear.
    pub fn clear(&mut self, sink: &mut dyn MarkerSink) {
        for callsign in self.markers.keys() {
            sink.remove(callsign);
        }
        self.markers.clear();
    }

    #[must_use]
    pub fn get(&self, callsign: &str) -> Option<&Marker> {
        self.markers.get(callsign)
    }

    /// Iterate over all markers.
    pub fn all(&self) -> impl Iterator<Item = (&str, &Marker)> {
        self.markers.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Callsigns that currently have a marker.
    pub fn callsigns(&self) -> impl Iterator<Item = &str> {
        self.markers.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct RecordingSink {
        placed: Vec<(String, f64, f64)>,
        removed: Vec<String>,
        visibility: Vec<(String, bool)>,
    }

    impl MarkerSink for RecordingSink {
        fn place_or_move(&mut self, callsign: &str, lat: f64, lon: f64, _label: &str) {
            self.placed.push((callsign.to_string(), lat, lon));
        }

        fn remove(&mut self, callsign: &str) {
            self.removed.push(callsign.to_string());
        }

        fn set_visible(&mut self, callsign: &str, visible: bool) {
            self.visibility.push((callsign.to_string(), visible));
        }
    }

    #[test]
    fn test_one_marker_per_callsign_moved_in_place() {
        let mut registry = MarkerRegistry::new();
        let mut sink = RecordingSink::default();

        registry.upsert("TA1ABC", Some((39.0, 32.0)), "a", &mut sink);
        registry.upsert("TA1ABC", Some((39.5, 32.5)), "b", &mut sink);

        assert_eq!(registry.len(), 1);
        let marker = registry.get("TA1ABC").unwrap();
        assert_eq!((marker.latitude, marker.longitude), (39.5, 32.5));
        assert_eq!(marker.label, "b");
        // Two sink calls, no removal in between: identity is stable.
        assert_eq!(sink.placed.len(), 2);
        assert!(sink.removed.is_empty());
    }

    #[test]
    fn test_report_without_coordinates_keeps_last_position() {
        let mut registry = MarkerRegistry::new();
        let mut sink = RecordingSink::default();

        registry.upsert("TA1ABC", Some((39.0, 32.0)), "a", &mut sink);
        registry.upsert("TA1ABC", None, "b", &mut sink);

        let marker = registry.get("TA1ABC").unwrap();
        assert_eq!((marker.latitude, marker.longitude), (39.0, 32.0));
        assert_eq!(marker.label, "a");
    }

    #[test]
    fn test_no_marker_without_coordinates() {
        let mut registry = MarkerRegistry::new();
        let mut sink = RecordingSink::default();

        registry.upsert("TA1ABC", None, "a", &mut sink);
        assert!(registry.is_empty());
        assert!(sink.placed.is_empty());
    }

    #[test]
    fn test_removed_when_last_positioned_message_gone() {
        let mut registry = MarkerRegistry::new();
        let mut sink = RecordingSink::default();
        registry.upsert("TA1ABC", Some((39.0, 32.0)), "a", &mut sink);

        registry.on_message_deleted("TA1ABC", 1, &mut sink);
        assert!(registry.get("TA1ABC").is_some());

        registry.on_message_deleted("TA1ABC", 0, &mut sink);
        assert!(registry.get("TA1ABC").is_none());
        assert_eq!(sink.removed, vec!["TA1ABC".to_string()]);
    }

    #[test]
    fn test_set_visible_only_fires_on_change() {
        let mut registry = MarkerRegistry::new();
        let mut sink = RecordingSink::default();
        registry.upsert("TA1ABC", Some((39.0, 32.0)), "a", &mut sink);

        registry.set_visible("TA1ABC", true, &mut sink);
        registry.set_visible("TA1ABC", false, &mut sink);
        registry.set_visible("TA1ABC", false, &mut sink);
        registry.set_visible("TB2XYZ", false, &mut sink);

        assert_eq!(sink.visibility, vec![("TA1ABC".to_string(), false)]);
    }
}
