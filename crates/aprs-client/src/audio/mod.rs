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

//! Gesture-gated audio unlock lifecycle.
//!
//! Platforms may refuse to start sound playback without a direct user
//! gesture. [`AudioUnlock`] is the pure transition core for that lifecycle:
//! `Locked -> Unlocking -> Unlocked`, with a failed probe falling back to
//! `Locked`. The asynchronous probe itself lives behind the [`SoundSink`]
//! seam and is driven by the engine; at most one probe is in flight because
//! `begin` refuses to start another while one is pending.

use async_trait::async_trait;
use thiserror::Error;

/// Playback was rejected by the underlying audio platform.
#[derive(Debug, Error)]
#[error("playback rejected: {0}")]
pub struct PlaybackError(pub String);

/// Audio seam supplied by the presentation layer.
#[async_trait]
pub trait SoundSink: Send {
    /// Attempt a playback probe, resolving once the platform accepts or
    /// rejects it.
    async fn probe(&mut self) -> Result<(), PlaybackError>;
    /// Play the alert sound.
    fn play(&mut self) -> Result<(), PlaybackError>;
    /// Stop any playing sound.
    fn stop(&mut self);
}

/// Unlock state for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnlockState {
    /// Playback requires a user gesture before it may start.
    #[default]
    Locked,
    /// A probe is in flight.
    Unlocking,
    /// Playback may start freely.
    Unlocked,
}

/// Pure unlock state machine.
#[derive(Debug, Default)]
pub struct AudioUnlock {
    state: UnlockState,
}

impl AudioUnlock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> UnlockState {
        self.state
    }

    #[must_use]
    pub fn is_unlocked(&self) -> bool {
        self.state == UnlockState::Unlocked
    }

    /// Begin an unlock attempt from a user gesture.
    ///
    /// Returns `true` when the caller should start a probe. Requests while a
    /// probe is in flight, or once already unlocked, are no-ops.
    pub fn begin(&mut self) -> bool {
        if self.state == UnlockState::Locked {
            self.state = UnlockState::Unlocking;
            true
        } else {
            false
        }
    }

    /// A probe settled successfully. Ignored unless a probe was in flight.
    pub fn probe_succeeded(&mut self) {
        if self.state == UnlockState::Unlocking {
            self.state = UnlockState::Unlocked;
        }
    }

    /// A probe settled with failure; gesture listening should be re-armed.
    pub fn probe_failed(&mut self) {
        if self.state == UnlockState::Unlocking {
            self.state = UnlockState::Locked;
        }
    }

    /// Real alert playback failed. The platform may have revoked the unlock,
    /// so demote back to `Locked`.
    pub fn playback_failed(&mut self) {
        self.state = UnlockState::Locked;
    }
}
