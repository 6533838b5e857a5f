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
use std::time::Duration;

use super::error::SampleSourceError;
use crate::audio::{SampleFormat, SoundBuffer};

/// A decoder producing interleaved f32 frames on demand.
///
/// Dropping a source closes it.
pub trait SampleSource: Send {
    /// Replaces the contents of `buffer` with up to `max_frames` decoded frames in this
    /// source's channel layout and sample rate.
    /// Returns the number of frames written (0 = end of stream).
    fn read_into(
        &mut self,
        buffer: &mut SoundBuffer,
        max_frames: usize,
    ) -> Result<usize, SampleSourceError>;

    /// Moves the read cursor to the given frame.
    fn seek(&mut self, frame: u64) -> Result<(), SampleSourceError>;

    /// Get the number of channels in this source
    fn channel_count(&self) -> u16;

    /// Get the sample rate of this source
    fn sample_rate(&self) -> u32;

    /// Get the sample format of this source
    fn sample_format(&self) -> SampleFormat;

    /// Whether the underlying data is stored with a compressing codec.
    fn is_compressed(&self) -> bool;

    /// Total length in frames, if the container reports it.
    fn total_frames(&self) -> Option<u64>;

    /// Get the duration of this source (if known)
    fn duration(&self) -> Option<Duration> {
        let sample_rate = self.sample_rate();
        if sample_rate == 0 {
            return None;
        }
        self.total_frames()
            .map(|frames| Duration::from_secs_f64(frames as f64 / sample_rate as f64))
    }

    /// Snapshot of the source's metadata.
    fn info(&self) -> SourceInfo {
        SourceInfo {
            sample_rate: self.sample_rate(),
            channel_count: self.channel_count(),
            sample_format: self.sample_format(),
            is_compressed: self.is_compressed(),
            total_frames: self.total_frames().unwrap_or(0),
            duration_ms: self.duration().map_or(0, |d| d.as_millis() as u64),
        }
    }
}

/// Blanket implementation for Box<dyn SampleSource>
/// This allows Box<dyn SampleSource> to be used directly with generic functions
/// that require S: SampleSource.
impl SampleSource for Box<dyn SampleSource> {
    fn read_into(
        &mut self,
        buffer: &mut SoundBuffer,
        max_frames: usize,
    ) -> Result<usize, SampleSourceError> {
        (**self).read_into(buffer, max_frames)
    }

    fn seek(&mut self, frame: u64) -> Result<(), SampleSourceError> {
        (**self).seek(frame)
    }

    fn channel_count(&self) -> u16 {
        (**self).channel_count()
    }

    fn sample_rate(&self) -> u32 {
        (**self).sample_rate()
    }

    fn sample_format(&self) -> SampleFormat {
        (**self).sample_format()
    }

    fn is_compressed(&self) -> bool {
        (**self).is_compressed()
    }

    fn total_frames(&self) -> Option<u64> {
        (**self).total_frames()
    }

    fn duration(&self) -> Option<Duration> {
        (**self).duration()
    }
}

/// Metadata read from a source when it is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceInfo {
    pub sample_rate: u32,
    pub channel_count: u16,
    pub sample_format: SampleFormat,
    pub is_compressed: bool,
    /// Zero when the container does not report a length.
    pub total_frames: u64,
    pub duration_ms: u64,
}

impl SourceInfo {
    /// Replaces the frame count (and duration) with the number of frames actually decoded.
    pub fn with_total_frames(self, total_frames: u64) -> Self {
        let duration_ms = if self.sample_rate == 0 {
            0
        } else {
            total_frames * 1000 / self.sample_rate as u64
        };
        SourceInfo {
            total_frames,
            duration_ms,
            ..self
        }
    }
}

/// Decodes the rest of a source into one buffer, `chunk_frames` frames at a time.
pub fn read_all<S: SampleSource>(
    source: &mut S,
    chunk_frames: usize,
) -> Result<SoundBuffer, SampleSourceError> {
    let mut all = SoundBuffer::new(source.channel_count(), source.sample_rate());
    if let Some(frames) = source.total_frames() {
        all.reserve_frames(frames as usize);
    }

    let mut chunk = SoundBuffer::default();
    loop {
        let read = source.read_into(&mut chunk, chunk_frames)?;
        if read == 0 {
            break;
        }
        all.append(&chunk);
    }
    Ok(all)
}
