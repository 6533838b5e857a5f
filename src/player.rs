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

//! Multi-voice sound playback.
//!
//! This module provides:
//! - Resident (fully decoded) and streaming sources
//! - Overlapping voices with per-voice speed, pan and volume
//! - A shared voice budget across players
//! - Observers for rendered voice buffers

mod engine;
mod error;
mod limits;
mod observer;
mod pan;
mod state;
mod voice;


pub use engine::{SoundPlayer, SPEED_EPSILON};
pub use error::PlayerError;
pub use limits::{
    VoiceLimits, VoiceRegistry, DEFAULT_MAX_SOUNDS_PER_PLAYER, DEFAULT_MAX_SOUNDS_TOTAL,
};
pub use observer::{BufferObserver, ChannelObserver};
pub use pan::stereo_volumes;
pub use state::PlaybackState;
pub use voice::{Voice, VoiceSet};
