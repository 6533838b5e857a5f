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
use std::fmt;

/// Where a player is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// No source loaded. Every control operation is a no-op.
    #[default]
    Unloaded,
    /// A source is loaded and nothing is being rendered.
    Stopped,
    /// A source is loaded and render passes produce audio.
    Playing,
}

impl PlaybackState {
    pub fn is_loaded(self) -> bool {
        self != PlaybackState::Unloaded
    }

    pub fn is_playing(self) -> bool {
        self == PlaybackState::Playing
    }

    /// The state after a trigger. Unloaded players stay unloaded.
    pub fn play(self) -> Self {
        match self {
            PlaybackState::Unloaded => PlaybackState::Unloaded,
            PlaybackState::Stopped | PlaybackState::Playing => PlaybackState::Playing,
        }
    }

    /// The state after a stop, pause, or the end of the source.
    pub fn stop(self) -> Self {
        match self {
            PlaybackState::Unloaded => PlaybackState::Unloaded,
            PlaybackState::Stopped | PlaybackState::Playing => PlaybackState::Stopped,
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlaybackState::Unloaded => "unloaded",
            PlaybackState::Stopped => "stopped",
            PlaybackState::Playing => "playing",
        };
        f.write_str(name)
    }
}
