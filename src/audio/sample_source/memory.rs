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
use super::error::SampleSourceError;
use super::traits::SampleSource;
use crate::audio::{SampleFormat, SoundBuffer};

/// A sample source that produces samples from memory.
/// Useful for generated material and for driving the player in tests.
pub struct MemorySampleSource {
    buffer: SoundBuffer,
    /// Current position in frames
    current_frame: usize,
}

impl MemorySampleSource {
    /// Creates a new memory sample source from interleaved samples.
    pub fn new(interleaved_samples: Vec<f32>, channel_count: u16, sample_rate: u32) -> Self {
        Self::from_buffer(SoundBuffer::from_interleaved(
            interleaved_samples,
            channel_count,
            sample_rate,
        ))
    }

    pub fn from_buffer(buffer: SoundBuffer) -> Self {
        Self {
            buffer,
            current_frame: 0,
        }
    }

    /// The frame the next read starts at.
    pub fn position(&self) -> u64 {
        self.current_frame as u64
    }
}

impl SampleSource for MemorySampleSource {
    fn read_into(
        &mut self,
        buffer: &mut SoundBuffer,
        max_frames: usize,
    ) -> Result<usize, SampleSourceError> {
        buffer.set_format(self.buffer.channel_count(), self.buffer.sample_rate());

        let channels = self.buffer.channel_count() as usize;
        let available = self.buffer.frames().saturating_sub(self.current_frame);
        let to_copy = available.min(max_frames);

        if to_copy > 0 {
            let start = self.current_frame * channels;
            buffer.extend_interleaved(&self.buffer.samples()[start..start + to_copy * channels]);
            self.current_frame += to_copy;
        }

        Ok(to_copy)
    }

    fn seek(&mut self, frame: u64) -> Result<(), SampleSourceError> {
        let total = self.buffer.frames() as u64;
        if frame > total {
            return Err(SampleSourceError::SeekOutOfRange(frame, total));
        }
        self.current_frame = frame as usize;
        Ok(())
    }

    fn channel_count(&self) -> u16 {
        self.buffer.channel_count()
    }

    fn sample_rate(&self) -> u32 {
        self.buffer.sample_rate()
    }

    fn sample_format(&self) -> SampleFormat {
        SampleFormat::Float
    }

    fn is_compressed(&self) -> bool {
        false
    }

    fn total_frames(&self) -> Option<u64> {
        Some(self.buffer.frames() as u64)
    }
}
