// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::PlayerError;

/// Default ceiling on voices across every player sharing a registry.
pub const DEFAULT_MAX_SOUNDS_TOTAL: usize = 128;

/// Default number of overlapping voices a single player may hold.
pub const DEFAULT_MAX_SOUNDS_PER_PLAYER: usize = 16;

/// Voice budget settings.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct VoiceLimits {
    #[serde(default = "default_max_sounds_total")]
    max_sounds_total: usize,

    #[serde(default = "default_max_sounds_per_player")]
    max_sounds_per_player: usize,
}

fn default_max_sounds_total() -> usize {
    DEFAULT_MAX_SOUNDS_TOTAL
}

fn default_max_sounds_per_player() -> usize {
    DEFAULT_MAX_SOUNDS_PER_PLAYER
}

impl Default for VoiceLimits {
    fn default() -> Self {
        VoiceLimits {
            max_sounds_total: DEFAULT_MAX_SOUNDS_TOTAL,
            max_sounds_per_player: DEFAULT_MAX_SOUNDS_PER_PLAYER,
        }
    }
}

impl VoiceLimits {
    pub fn new(max_sounds_total: usize, max_sounds_per_player: usize) -> Self {
        VoiceLimits {
            max_sounds_total,
            max_sounds_per_player,
        }
    }

    /// Gets the ceiling on voices across all players.
    pub fn max_sounds_total(&self) -> usize {
        self.max_sounds_total
    }

    /// Gets the initial per-player voice limit.
    pub fn max_sounds_per_player(&self) -> usize {
        self.max_sounds_per_player
    }
}

/// Counts the voices held by every player created against it.
///
/// Each loaded player holds one voice for its primary voice, plus one per overlapping voice
/// added by multiplay. Overlapping voices are only granted while the total stays under
/// `max_sounds_total`.
#[derive(Debug, Default)]
pub struct VoiceRegistry {
    active: AtomicUsize,
    limits: VoiceLimits,
}

impl VoiceRegistry {
    pub fn new(limits: VoiceLimits) -> Self {
        VoiceRegistry {
            active: AtomicUsize::new(0),
            limits,
        }
    }

    pub fn limits(&self) -> VoiceLimits {
        self.limits
    }

    /// Number of voices currently held.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Registers a primary voice. Always succeeds, so a loaded player can always play.
    pub(super) fn acquire(&self) {
        self.active.fetch_add(1, Ordering::AcqRel);
    }

    /// Registers an overlapping voice if the total budget allows it.
    pub(super) fn try_acquire(&self) -> Result<(), PlayerError> {
        let limit = self.limits.max_sounds_total;
        self.active
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |active| {
                (active < limit).then_some(active + 1)
            })
            .map(|_| ())
            .map_err(|active| {
                debug!(active, limit, "Voice registry is full");
                PlayerError::CapacityExceeded { limit }
            })
    }

    /// Returns `count` voices to the budget.
    pub(super) fn release(&self, count: usize) {
        if count == 0 {
            return;
        }
        // Saturate rather than wrap if a caller over-releases.
        let _ = self
            .active
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |active| {
                Some(active.saturating_sub(count))
            });
    }
}
