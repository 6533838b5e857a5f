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
use std::{
    error::Error,
    fs::File,
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use hound::{SampleFormat, WavSpec, WavWriter};
use parking_lot::Mutex;

use crate::audio::sample_source::{MemorySampleSource, SampleSource, SampleSourceError};
use crate::audio::{SampleFormat as SourceSampleFormat, SoundBuffer};

/// Writes one vector of samples per channel to a 32-bit float WAV file.
pub fn write_wav(
    path: &Path,
    channels: &[Vec<f32>],
    sample_rate: u32,
) -> Result<(), Box<dyn Error>> {
    let file = File::create(path)?;

    let num_channels = channels.len();
    assert!(num_channels <= u16::MAX.into(), "Too many channels!");
    let mut writer = WavWriter::new(
        file,
        WavSpec {
            channels: num_channels as u16,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        },
    )?;

    let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
    for frame in 0..frames {
        for channel in channels {
            writer.write_sample(channel[frame])?;
        }
    }
    writer.finalize()?;

    Ok(())
}

/// Writes 16-bit integer samples, one vector per channel.
pub fn write_wav_i16(
    path: &Path,
    channels: &[Vec<i16>],
    sample_rate: u32,
) -> Result<(), Box<dyn Error>> {
    let mut writer = WavWriter::create(
        path,
        WavSpec {
            channels: channels.len() as u16,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        },
    )?;
    let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
    for frame in 0..frames {
        for channel in channels {
            writer.write_sample(channel[frame])?;
        }
    }
    writer.finalize()?;
    Ok(())
}

/// A ramp where frame `n` has the value `n * step`.
pub fn ramp(frames: usize, step: f32) -> Vec<f32> {
    (0..frames).map(|n| n as f32 * step).collect()
}

/// Calculate RMS (Root Mean Square) of a signal
pub fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|&x| x * x).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Wraps a memory source and records what the player asks of it.
pub struct TrackingSource {
    inner: MemorySampleSource,
    seeks: Arc<Mutex<Vec<u64>>>,
    reads: Arc<AtomicUsize>,
    /// When set, every read reports end of stream.
    exhausted: bool,
}

/// Handles for inspecting a [`TrackingSource`] after it has been moved into a player.
#[derive(Clone)]
pub struct TrackingHandles {
    pub seeks: Arc<Mutex<Vec<u64>>>,
    pub reads: Arc<AtomicUsize>,
}

impl TrackingHandles {
    pub fn last_seek(&self) -> Option<u64> {
        self.seeks.lock().last().copied()
    }

    pub fn seek_count(&self) -> usize {
        self.seeks.lock().len()
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }
}

impl TrackingSource {
    pub fn new(interleaved: Vec<f32>, channels: u16, sample_rate: u32) -> (Self, TrackingHandles) {
        let handles = TrackingHandles {
            seeks: Arc::new(Mutex::new(Vec::new())),
            reads: Arc::new(AtomicUsize::new(0)),
        };
        (
            TrackingSource {
                inner: MemorySampleSource::new(interleaved, channels, sample_rate),
                seeks: handles.seeks.clone(),
                reads: handles.reads.clone(),
                exhausted: false,
            },
            handles,
        )
    }

    /// A source that reports a length but never produces a frame.
    pub fn exhausted(frames: usize, channels: u16, sample_rate: u32) -> (Self, TrackingHandles) {
        let (mut source, handles) =
            Self::new(vec![0.0; frames * channels as usize], channels, sample_rate);
        source.exhausted = true;
        (source, handles)
    }
}

impl SampleSource for TrackingSource {
    fn read_into(
        &mut self,
        buffer: &mut SoundBuffer,
        max_frames: usize,
    ) -> Result<usize, SampleSourceError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        if self.exhausted {
            buffer.set_format(self.channel_count(), self.sample_rate());
            return Ok(0);
        }
        self.inner.read_into(buffer, max_frames)
    }

    fn seek(&mut self, frame: u64) -> Result<(), SampleSourceError> {
        self.seeks.lock().push(frame);
        self.inner.seek(frame)
    }

    fn channel_count(&self) -> u16 {
        self.inner.channel_count()
    }

    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }

    fn sample_format(&self) -> SourceSampleFormat {
        self.inner.sample_format()
    }

    fn is_compressed(&self) -> bool {
        false
    }

    fn total_frames(&self) -> Option<u64> {
        self.inner.total_frames()
    }
}
