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

//! Pure filter computation over the message store.
//!
//! [`recompute`] maps the current store contents and criteria to the set of
//! visible message ids and visible callsigns. It is a full O(n) pass with no
//! incremental state, rerun after every store mutation and criteria change.
//! That cost is fine at the default retention bound; it would need revisiting
//! for much larger stores.

use std::collections::HashSet;

use crate::store::{Message, MessageId};

/// Substring criteria, AND-combined. An empty field matches everything;
/// matching is case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    /// Matched against the sender callsign.
    pub from: String,
    /// Matched against the recipient callsign.
    pub to: String,
    /// Matched against the free-text payload.
    pub data: String,
}

impl FilterCriteria {
    /// Whether every field is empty, i.e. everything matches.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.from.is_empty() && self.to.is_empty() && self.data.is_empty()
    }
}

/// Visibility sets derived from one recomputation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterResult {
    /// Ids of messages matching all active criteria.
    pub visible_messages: HashSet<MessageId>,
    /// Sender callsigns with at least one visible message.
    pub visible_callsigns: HashSet<String>,
}

impl FilterResult {
    #[must_use]
    pub fn message_visible(&self, id: MessageId) -> bool {
        self.visible_messages.contains(&id)
    }

    #[must_use]
    pub fn callsign_visible(&self, callsign: &str) -> bool {
        self.visible_callsigns.contains(callsign)
    }
}

fn field_matches(value: Option<&str>, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    value.is_some_and(|v| v.to_lowercase().contains(needle))
}

/// Recompute visibility for the given messages under the given criteria.
///
/// Pure and deterministic: identical inputs yield identical sets.
#[must_use]
pub fn recompute<'a>(
    messages: impl IntoIterator<Item = &'a Message>,
    criteria: &FilterCriteria,
) -> FilterResult {
    let from_needle = criteria.from.to_lowercase();
    let to_needle = criteria.to.to_lowercase();
    let data_needle = criteria.data.to_lowercase();

    let mut result = FilterResult::default();
    for message in messages {
        let report = &message.report;
        let visible = field_matches(Some(&report.from), &from_needle)
            && field_matches(report.to.as_deref(), &to_needle)
            && field_matches(report.data.as_deref(), &data_needle);

        if visible {
            result.visible_messages.insert(message.id);
            result.visible_callsigns.insert(report.from.clone());
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Report;
    use chrono::Utc;

    fn message(id: MessageId, from: &str, to: Option<&str>, data: Option<&str>) -> Message {
        Message {
            id,
            report: Report {
                from: from.to_string(),
                to: to.map(str::to_string),
                data: data.map(str::to_string),
                ..Report::default()
            },
            received_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_criteria_match_everything() {
        let messages = vec![
            message(1, "TA1ABC", Some("APRS"), Some("hello")),
            message(2, "TB2XYZ", None, None),
        ];

        let result = recompute(&messages, &FilterCriteria::default());
        assert_eq!(result.visible_messages.len(), 2);
        assert!(result.callsign_visible("TA1ABC"));
        assert!(result.callsign_visible("TB2XYZ"));
    }

    #[test]
    fn test_case_insensitive_substring() {
        let messages = vec![message(1, "TA1ABC", None, Some("Test Beacon"))];

        let criteria = FilterCriteria {
            from: "ta1".to_string(),
            data: "beacon".to_string(),
            ..FilterCriteria::default()
        };
        assert!(recompute(&messages, &criteria).message_visible(1));
    }

    #[test]
    fn test_criteria_are_and_combined() {
        let messages = vec![message(1, "TA1ABC", Some("APRS"), Some("hello"))];

        let criteria = FilterCriteria {
            from: "TA1".to_string(),
            data: "nomatch".to_string(),
            ..FilterCriteria::default()
        };
        assert!(!recompute(&messages, &criteria).message_visible(1));
    }

    #[test]
    fn test_absent_field_fails_active_criterion() {
        // No recipient at all: a "to" criterion cannot match it.
        let messages = vec![message(1, "TA1ABC", None, None)];

        let criteria = FilterCriteria {
            to: "aprs".to_string(),
            ..FilterCriteria::default()
        };
        let result = recompute(&messages, &criteria);
        assert!(!result.message_visible(1));
        assert!(!result.callsign_visible("TA1ABC"));
    }

    #[test]
    fn test_callsign_visible_iff_any_message_visible() {
        let messages = vec![
            message(1, "TA1ABC", None, Some("alpha")),
            message(2, "TA1ABC", None, Some("bravo")),
            message(3, "TB2XYZ", None, Some("alpha")),
        ];

        let criteria = FilterCriteria {
            data: "bravo".to_string(),
            ..FilterCriteria::default()
        };
        let result = recompute(&messages, &criteria);
        assert_eq!(result.visible_messages, HashSet::from([2]));
        assert!(result.callsign_visible("TA1ABC"));
        assert!(!result.callsign_visible("TB2XYZ"));
    }

    #[test]
    fn test_recompute_is_pure() {
        let messages = vec![
            message(1, "TA1ABC", Some("APRS"), Some("hello")),
            message(2, "TB2XYZ", None, None),
        ];
        let criteria = FilterCriteria {
            from: "t".to_string(),
            ..FilterCriteria::default()
        };

        assert_eq!(recompute(&messages, &criteria), recompute(&messages, &criteria));
    }
}
