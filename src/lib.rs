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

//! A multi-voice sound player.
//!
//! A [`player::SoundPlayer`] loads one sound, either decoded fully into memory or streamed
//! from disk, and mixes one or more playback voices of it into buffers handed to it by an
//! audio host.

pub mod audio;
pub mod config;
pub mod player;
pub mod util;

#[cfg(test)]
mod testutil;

pub use audio::SoundBuffer;
pub use player::{PlaybackState, PlayerError, SoundPlayer, VoiceLimits, VoiceRegistry};
