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

//! Playback positions within a single source.
//!
//! A player always holds at least one voice. The first one is the primary voice: it carries
//! pending parameter changes while nothing plays and is retargeted by non-overlapping
//! triggers.

use super::pan::stereo_volumes;

/// One playback position in the source, with its own speed and stereo gains.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Voice {
    /// Position in source frames. May be fractional when resampling.
    position: f64,
    /// Source frames consumed per output frame.
    relative_speed: f64,
    gain_left: f32,
    gain_right: f32,
}

impl Default for Voice {
    fn default() -> Self {
        let (gain_left, gain_right) = stereo_volumes(1.0, 0.0);
        Voice {
            position: 0.0,
            relative_speed: 1.0,
            gain_left,
            gain_right,
        }
    }
}

impl Voice {
    /// Creates a voice at the start of the source.
    pub fn new(relative_speed: f64, gains: (f32, f32)) -> Self {
        Voice {
            position: 0.0,
            relative_speed,
            gain_left: gains.0,
            gain_right: gains.1,
        }
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    /// The integer frame the voice is currently on.
    pub fn frame_index(&self) -> usize {
        self.position as usize
    }

    pub fn relative_speed(&self) -> f64 {
        self.relative_speed
    }

    pub fn gains(&self) -> (f32, f32) {
        (self.gain_left, self.gain_right)
    }

    pub(super) fn set_position(&mut self, position: f64) {
        self.position = position.max(0.0);
    }

    pub(super) fn set_relative_speed(&mut self, relative_speed: f64) {
        self.relative_speed = relative_speed;
    }

    pub(super) fn set_gains(&mut self, gains: (f32, f32)) {
        self.gain_left = gains.0;
        self.gain_right = gains.1;
    }

    /// Moves the voice forward by `frames` output frames.
    ///
    /// Looping voices wrap modulo `total_frames`. Others are clamped to `[0, total_frames]`.
    pub(super) fn advance(&mut self, frames: usize, total_frames: usize, looping: bool) {
        if total_frames == 0 {
            self.position = 0.0;
            return;
        }
        let total = total_frames as f64;
        let next = self.position + frames as f64 * self.relative_speed;
        self.position = if looping {
            next.rem_euclid(total)
        } else {
            next.clamp(0.0, total)
        };
    }

    /// True once a non-looping voice sits exactly on the end of the source.
    pub fn has_ended(&self, total_frames: usize) -> bool {
        self.position == total_frames as f64
    }
}

/// The ordered set of active voices. Never empty.
#[derive(Debug, Clone)]
pub struct VoiceSet {
    voices: Vec<Voice>,
}

impl Default for VoiceSet {
    fn default() -> Self {
        VoiceSet {
            voices: vec![Voice::default()],
        }
    }
}

impl VoiceSet {
    pub fn len(&self) -> usize {
        self.voices.len()
    }

    /// Always false.
    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn primary(&self) -> &Voice {
        &self.voices[0]
    }

    pub(super) fn primary_mut(&mut self) -> &mut Voice {
        &mut self.voices[0]
    }

    /// The most recently triggered voice.
    pub fn last(&self) -> &Voice {
        // The set is never empty.
        &self.voices[self.voices.len() - 1]
    }

    pub(super) fn last_mut(&mut self) -> &mut Voice {
        let last = self.voices.len() - 1;
        &mut self.voices[last]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Voice> {
        self.voices.iter()
    }

    pub(super) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Voice> {
        self.voices.iter_mut()
    }

    pub(super) fn push(&mut self, voice: Voice) {
        self.voices.push(voice);
    }

    /// Drops every voice but the primary one. Returns how many were dropped.
    pub(super) fn truncate_to_primary(&mut self) -> usize {
        let dropped = self.voices.len() - 1;
        self.voices.truncate(1);
        dropped
    }

    /// Replaces the set with a fresh primary voice. Returns how many extra voices were dropped.
    pub(super) fn reset(&mut self) -> usize {
        let dropped = self.truncate_to_primary();
        self.voices[0] = Voice::default();
        dropped
    }

    /// Advances every voice and retires the ones that reached the end of a non-looping
    /// source, never dropping below one voice. Returns the number of voices retired.
    pub(super) fn advance(&mut self, frames: usize, total_frames: usize, looping: bool) -> usize {
        let mut retired = 0;
        let mut i = 0;
        while i < self.voices.len() {
            self.voices[i].advance(frames, total_frames, looping);
            if !looping && self.voices.len() > 1 && self.voices[i].has_ended(total_frames) {
                self.voices.remove(i);
                retired += 1;
                continue;
            }
            i += 1;
        }
        retired
    }

    /// True when the only remaining voice has played to the end of a non-looping source.
    pub fn finished(&self, total_frames: usize, looping: bool) -> bool {
        !looping && self.voices.len() == 1 && self.voices[0].has_ended(total_frames)
    }
}
