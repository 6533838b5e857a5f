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

//! Interleaved sample buffers and the primitives the player renders with.
//!
//! All copy, resample and mix operations convert between channel layouts the same way:
//! destination channel `c` reads source channel `min(c, source_channels - 1)`. A mono
//! source therefore feeds every output channel, and a stereo source folded into mono
//! keeps its left channel.

/// How samples between two source frames are computed when resampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpolationKind {
    /// Use the nearest earlier source frame.
    Nearest,
    /// Interpolate linearly between neighbouring source frames.
    #[default]
    Linear,
}

/// A block of interleaved f32 samples with its channel count and sample rate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SoundBuffer {
    samples: Vec<f32>,
    channels: u16,
    sample_rate: u32,
}

impl SoundBuffer {
    /// Creates an empty buffer with the given format.
    pub fn new(channels: u16, sample_rate: u32) -> Self {
        Self {
            samples: Vec::new(),
            channels,
            sample_rate,
        }
    }

    /// Creates a buffer holding `frames` frames of silence.
    pub fn silence(frames: usize, channels: u16, sample_rate: u32) -> Self {
        Self {
            samples: vec![0.0; frames * channels as usize],
            channels,
            sample_rate,
        }
    }

    /// Wraps interleaved samples. A trailing partial frame is dropped.
    pub fn from_interleaved(mut samples: Vec<f32>, channels: u16, sample_rate: u32) -> Self {
        let channel_count = channels as usize;
        if channel_count == 0 {
            samples.clear();
        } else {
            samples.truncate(samples.len() - samples.len() % channel_count);
        }
        Self {
            samples,
            channels,
            sample_rate,
        }
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }

    pub fn channel_count(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
    }

    /// Length of the buffer in milliseconds at its sample rate.
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.frames() as u64 * 1000 / self.sample_rate as u64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    /// Drops all samples, keeping the format.
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Drops all samples and switches to a new format.
    pub fn set_format(&mut self, channels: u16, sample_rate: u32) {
        self.samples.clear();
        self.channels = channels;
        self.sample_rate = sample_rate;
    }

    /// Resizes to `frames` frames of `channels` channels, all silent.
    pub fn resize(&mut self, frames: usize, channels: u16) {
        self.channels = channels;
        self.samples.clear();
        self.samples.resize(frames * channels as usize, 0.0);
    }

    /// Makes room for at least `frames` frames without reallocating during rendering.
    pub fn reserve_frames(&mut self, frames: usize) {
        let wanted = frames * self.channels as usize;
        self.samples
            .reserve(wanted.saturating_sub(self.samples.len()));
    }

    /// Zeroes every sample in place.
    pub fn fill_silence(&mut self) {
        self.samples.fill(0.0);
    }

    /// Appends interleaved samples in this buffer's channel layout.
    pub fn extend_interleaved(&mut self, samples: &[f32]) {
        self.samples.extend_from_slice(samples);
    }

    /// Appends another buffer with the same channel count.
    pub fn append(&mut self, other: &SoundBuffer) {
        debug_assert_eq!(self.channels, other.channels);
        self.samples.extend_from_slice(&other.samples);
    }

    /// The largest absolute sample value.
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |peak, s| peak.max(s.abs()))
    }

    #[inline]
    fn sample(&self, frame: usize, channel: usize) -> f32 {
        let channels = self.channels as usize;
        self.samples[frame * channels + channel.min(channels - 1)]
    }

    /// Copies `frames` frames starting at `from_frame` into `dest`, converting to `channels`
    /// channels. When `looping`, reads past the end wrap to the start; otherwise the
    /// remainder of `dest` is silent.
    pub fn copy_into(
        &self,
        dest: &mut SoundBuffer,
        frames: usize,
        channels: u16,
        from_frame: usize,
        looping: bool,
    ) {
        dest.sample_rate = self.sample_rate;
        dest.resize(frames, channels);

        let total = self.frames();
        if total == 0 || channels == 0 || (!looping && from_frame >= total) {
            return;
        }

        let mut src = from_frame % total;
        for frame in dest.samples.chunks_exact_mut(channels as usize) {
            if src >= total {
                if !looping {
                    break;
                }
                src = 0;
            }
            for (channel, out) in frame.iter_mut().enumerate() {
                *out = self.sample(src, channel);
            }
            src += 1;
        }
    }

    /// Resamples `frames` output frames into `dest`, reading the source from the fractional
    /// position `from_position` and stepping `speed` source frames per output frame.
    ///
    /// Non-looping reads past the end leave silence. Looping reads wrap, and interpolation
    /// at the last frame blends with the first.
    #[allow(clippy::too_many_arguments)]
    pub fn resample_into(
        &self,
        dest: &mut SoundBuffer,
        from_position: f64,
        frames: usize,
        channels: u16,
        speed: f64,
        looping: bool,
        kind: InterpolationKind,
    ) {
        dest.sample_rate = self.sample_rate;
        dest.resize(frames, channels);

        let total = self.frames();
        if total == 0 || channels == 0 {
            return;
        }
        let total_frames = total as f64;

        for (i, frame) in dest.samples.chunks_exact_mut(channels as usize).enumerate() {
            let mut position = from_position + i as f64 * speed;
            if looping {
                position = position.rem_euclid(total_frames);
            } else if position >= total_frames {
                break;
            }

            let index = (position.floor() as usize).min(total - 1);
            let fraction = (position - index as f64) as f32;
            let next = if index + 1 < total {
                Some(index + 1)
            } else if looping {
                Some(0)
            } else {
                None
            };

            for (channel, out) in frame.iter_mut().enumerate() {
                let current = self.sample(index, channel);
                *out = match kind {
                    InterpolationKind::Nearest => current,
                    InterpolationKind::Linear => {
                        let following = next.map_or(current, |n| self.sample(n, channel));
                        current + (following - current) * fraction
                    }
                };
            }
        }
    }

    /// Adds this buffer into `dest`, reading from `from_frame` and filling `dest.frames()`
    /// frames, wrapping to the start when `looping`.
    pub fn mix_into(&self, dest: &mut SoundBuffer, from_frame: usize, looping: bool) {
        self.mix_scaled(dest, from_frame, looping, None);
    }

    /// Like [`SoundBuffer::mix_into`], with stereo gains applied while adding. Content
    /// already in `dest` is left unscaled.
    pub fn mix_panned_into(
        &self,
        dest: &mut SoundBuffer,
        from_frame: usize,
        looping: bool,
        gain_left: f32,
        gain_right: f32,
    ) {
        self.mix_scaled(dest, from_frame, looping, Some((gain_left, gain_right)));
    }

    fn mix_scaled(
        &self,
        dest: &mut SoundBuffer,
        from_frame: usize,
        looping: bool,
        gains: Option<(f32, f32)>,
    ) {
        let total = self.frames();
        let out_channels = dest.channels as usize;
        if total == 0 || out_channels == 0 || (!looping && from_frame >= total) {
            return;
        }

        let mut src = from_frame % total;
        for frame in dest.samples.chunks_exact_mut(out_channels) {
            if src >= total {
                if !looping {
                    break;
                }
                src = 0;
            }
            for (channel, out) in frame.iter_mut().enumerate() {
                *out += self.sample(src, channel) * channel_gain(channel, out_channels, gains);
            }
            src += 1;
        }
    }

    /// Scales the buffer in place by stereo gains.
    ///
    /// Stereo buffers scale left and right independently. Mono buffers, and any channel past
    /// the second, are scaled by the combined power `sqrt(left² + right²)`, which equals the
    /// volume under a constant-power pan law.
    pub fn apply_stereo_pan(&mut self, gain_left: f32, gain_right: f32) {
        let channels = self.channels as usize;
        if channels == 0 {
            return;
        }
        let gains = Some((gain_left, gain_right));
        for frame in self.samples.chunks_exact_mut(channels) {
            for (channel, sample) in frame.iter_mut().enumerate() {
                *sample *= channel_gain(channel, channels, gains);
            }
        }
    }
}

#[inline]
fn channel_gain(channel: usize, channels: usize, gains: Option<(f32, f32)>) -> f32 {
    match gains {
        None => 1.0,
        Some((left, _)) if channels >= 2 && channel == 0 => left,
        Some((_, right)) if channels >= 2 && channel == 1 => right,
        Some((left, right)) => (left * left + right * right).sqrt(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(frames: usize) -> SoundBuffer {
        SoundBuffer::from_interleaved((0..frames).map(|i| i as f32).collect(), 1, 44100)
    }

    #[test]
    fn test_from_interleaved_drops_partial_frame() {
        let buffer = SoundBuffer::from_interleaved(vec![0.1, 0.2, 0.3], 2, 48000);
        assert_eq!(buffer.frames(), 1);
        assert_eq!(buffer.samples(), &[0.1, 0.2]);
    }

    #[test]
    fn test_duration_ms() {
        let buffer = SoundBuffer::silence(22050, 2, 44100);
        assert_eq!(buffer.duration_ms(), 500);
        assert_eq!(SoundBuffer::silence(10, 2, 0).duration_ms(), 0);
    }

    #[test]
    fn test_copy_into_wraps_when_looping() {
        let source = ramp(4);
        let mut dest = SoundBuffer::default();

        source.copy_into(&mut dest, 6, 1, 2, true);
        assert_eq!(dest.samples(), &[2.0, 3.0, 0.0, 1.0, 2.0, 3.0]);

        source.copy_into(&mut dest, 6, 1, 2, false);
        assert_eq!(dest.samples(), &[2.0, 3.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_copy_into_converts_mono_to_stereo() {
        let source = ramp(3);
        let mut dest = SoundBuffer::default();
        source.copy_into(&mut dest, 3, 2, 0, false);
        assert_eq!(dest.channel_count(), 2);
        assert_eq!(dest.samples(), &[0.0, 0.0, 1.0, 1.0, 2.0, 2.0]);
        assert_eq!(dest.sample_rate(), 44100);
    }

    #[test]
    fn test_resample_double_speed_skips_frames() {
        let source = ramp(8);
        let mut dest = SoundBuffer::default();
        source.resample_into(&mut dest, 0.0, 4, 1, 2.0, false, InterpolationKind::Linear);
        assert_eq!(dest.samples(), &[0.0, 2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_resample_half_speed_interpolates() {
        let source = ramp(4);
        let mut dest = SoundBuffer::default();
        source.resample_into(&mut dest, 1.0, 4, 1, 0.5, false, InterpolationKind::Linear);
        assert_eq!(dest.samples(), &[1.0, 1.5, 2.0, 2.5]);

        source.resample_into(&mut dest, 1.0, 4, 1, 0.5, false, InterpolationKind::Nearest);
        assert_eq!(dest.samples(), &[1.0, 1.0, 2.0, 2.0]);
    }

    #[test]
    fn test_resample_past_end() {
        let source = ramp(4);
        let mut dest = SoundBuffer::default();

        // Holds the last frame rather than blending towards silence.
        source.resample_into(&mut dest, 2.0, 4, 1, 1.5, false, InterpolationKind::Linear);
        assert_eq!(dest.samples(), &[2.0, 3.0, 0.0, 0.0]);

        // Blends the last frame into the first when looping.
        source.resample_into(&mut dest, 3.5, 2, 1, 0.5, true, InterpolationKind::Linear);
        assert_eq!(dest.samples(), &[1.5, 0.0]);
    }

    #[test]
    fn test_mix_into_adds() {
        let source = SoundBuffer::from_interleaved(vec![0.25, 0.5], 2, 44100);
        let mut dest = SoundBuffer::from_interleaved(vec![0.5, 0.5, 0.5, 0.5], 2, 44100);

        source.mix_into(&mut dest, 0, false);
        assert_eq!(dest.samples(), &[0.75, 1.0, 0.5, 0.5]);

        source.mix_into(&mut dest, 0, true);
        assert_eq!(dest.samples(), &[1.0, 1.5, 0.75, 1.0]);
    }

    #[test]
    fn test_mix_panned_into_leaves_existing_content() {
        let source = SoundBuffer::from_interleaved(vec![1.0, 1.0], 1, 44100);
        let mut dest = SoundBuffer::from_interleaved(vec![0.5, 0.5, 0.5, 0.5], 2, 44100);
        source.mix_panned_into(&mut dest, 0, false, 0.25, 0.75);
        assert_eq!(dest.samples(), &[0.75, 1.25, 0.75, 1.25]);
    }

    #[test]
    fn test_apply_stereo_pan() {
        let mut stereo = SoundBuffer::from_interleaved(vec![1.0, 1.0, -1.0, -1.0], 2, 44100);
        stereo.apply_stereo_pan(0.5, 0.25);
        assert_eq!(stereo.samples(), &[0.5, 0.25, -0.5, -0.25]);

        let mut mono = SoundBuffer::from_interleaved(vec![1.0], 1, 44100);
        mono.apply_stereo_pan(0.6, 0.8);
        assert!((mono.samples()[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_peak() {
        let buffer = SoundBuffer::from_interleaved(vec![0.1, -0.7, 0.3], 1, 44100);
        assert_eq!(buffer.peak(), 0.7);
        assert_eq!(SoundBuffer::default().peak(), 0.0);
    }
}
