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

//! Tracks which single message, if any, is focused for inspection.
//!
//! Validity against the store is the engine's job; this type only guarantees
//! that focus is dropped when its target message is removed.

use crate::store::MessageId;

/// Focus state for the detail inspector.
#[derive(Debug, Default)]
pub struct FocusTracker {
    focused: Option<MessageId>,
}

impl FocusTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focus(&mut self, id: MessageId) {
        self.focused = Some(id);
    }

    pub fn unfocus(&mut self) {
        self.focused = None;
    }

    #[must_use]
    pub fn focused(&self) -> Option<MessageId> {
        self.focused
    }

    /// Clear focus if the deleted message was the focused one.
    pub fn on_deleted(&mut self, id: MessageId) {
        if self.focused == Some(id) {
            self.focused = None;
        }
    }
}
