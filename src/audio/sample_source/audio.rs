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
use std::fs::File;
use std::path::Path;

use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{self, CodecType, Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, Packet, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::get_codecs;
use symphonia::default::get_probe;
use tracing::debug;

use super::error::SampleSourceError;
use super::traits::SampleSource;
use crate::audio::{SampleFormat, SoundBuffer};

/// Uncompressed codecs. Anything else is reported as compressed.
const PCM_CODECS: &[CodecType] = &[
    codecs::CODEC_TYPE_PCM_S8,
    codecs::CODEC_TYPE_PCM_S16LE,
    codecs::CODEC_TYPE_PCM_S16BE,
    codecs::CODEC_TYPE_PCM_S24LE,
    codecs::CODEC_TYPE_PCM_S24BE,
    codecs::CODEC_TYPE_PCM_S32LE,
    codecs::CODEC_TYPE_PCM_S32BE,
    codecs::CODEC_TYPE_PCM_U8,
    codecs::CODEC_TYPE_PCM_U16LE,
    codecs::CODEC_TYPE_PCM_U16BE,
    codecs::CODEC_TYPE_PCM_U24LE,
    codecs::CODEC_TYPE_PCM_U24BE,
    codecs::CODEC_TYPE_PCM_U32LE,
    codecs::CODEC_TYPE_PCM_U32BE,
    codecs::CODEC_TYPE_PCM_F32LE,
    codecs::CODEC_TYPE_PCM_F32BE,
    codecs::CODEC_TYPE_PCM_F64LE,
    codecs::CODEC_TYPE_PCM_F64BE,
];

/// A sample source that decodes audio files (WAV, MP3, FLAC, OGG, etc.) with symphonia.
pub struct AudioSampleSource {
    /// Used in logs and errors.
    file_path: String,
    format_reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    is_finished: bool,
    // Interleaved samples from the last decoded packet that have not been handed out yet
    leftover_samples: Vec<f32>,
    channels: u16,
    sample_rate: u32,
    sample_format: SampleFormat,
    compressed: bool,
    total_frames: Option<u64>,
}

impl SampleSource for AudioSampleSource {
    fn read_into(
        &mut self,
        buffer: &mut SoundBuffer,
        max_frames: usize,
    ) -> Result<usize, SampleSourceError> {
        buffer.set_format(self.channels, self.sample_rate);

        let channels = self.channels as usize;
        let wanted = max_frames * channels;
        let mut written = 0;

        while written < wanted {
            if self.leftover_samples.is_empty() {
                if self.is_finished {
                    break;
                }
                match Self::read_and_decode_next_packet_for_track(
                    self.format_reader.as_mut(),
                    self.decoder.as_mut(),
                    self.track_id,
                )? {
                    Some((samples, decoded_channels)) => {
                        if decoded_channels != channels {
                            return Err(SampleSourceError::ChannelMismatch {
                                expected: channels,
                                found: decoded_channels,
                            });
                        }
                        self.leftover_samples = samples;
                    }
                    None => self.is_finished = true,
                }
                continue;
            }

            let to_take = (wanted - written).min(self.leftover_samples.len());
            buffer.extend_interleaved(&self.leftover_samples[..to_take]);
            self.leftover_samples.drain(..to_take);
            written += to_take;
        }

        Ok(written / channels)
    }

    fn seek(&mut self, frame: u64) -> Result<(), SampleSourceError> {
        let seeked = self.format_reader.seek(
            SeekMode::Accurate,
            SeekTo::TimeStamp {
                ts: frame,
                track_id: self.track_id,
            },
        )?;
        self.decoder.reset();
        self.leftover_samples.clear();
        self.is_finished = false;

        // Accurate seeks may land on the packet before the target; decode and discard up to it.
        let channels = self.channels as usize;
        let mut to_skip = seeked.required_ts.saturating_sub(seeked.actual_ts) as usize * channels;
        while to_skip > 0 {
            match Self::read_and_decode_next_packet_for_track(
                self.format_reader.as_mut(),
                self.decoder.as_mut(),
                self.track_id,
            )? {
                Some((samples, _)) if samples.len() <= to_skip => to_skip -= samples.len(),
                Some((samples, _)) => {
                    self.leftover_samples = samples[to_skip..].to_vec();
                    to_skip = 0;
                }
                None => {
                    self.is_finished = true;
                    break;
                }
            }
        }

        debug!(
            file = self.file_path,
            frame,
            actual = seeked.actual_ts,
            "Seeked audio source"
        );
        Ok(())
    }

    fn channel_count(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn sample_format(&self) -> SampleFormat {
        self.sample_format
    }

    fn is_compressed(&self) -> bool {
        self.compressed
    }

    fn total_frames(&self) -> Option<u64> {
        self.total_frames
    }
}

impl AudioSampleSource {
    /// Opens an audio file and prepares its first audio track for decoding.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SampleSourceError> {
        // Open the file (include path in error so user sees which file failed)
        let path_ref = path.as_ref();
        let file_path = path_ref.to_string_lossy().to_string();
        let file = File::open(path_ref).map_err(|e| {
            SampleSourceError::IoError(std::io::Error::new(
                e.kind(),
                format!("{}: {}", path_ref.display(), e),
            ))
        })?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        // Create a hint to help the format registry guess the format
        let mut hint = Hint::new();
        if let Some(extension) = path_ref.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(extension);
        }

        let meta_opts: MetadataOptions = Default::default();
        let fmt_opts: FormatOptions = Default::default();
        let probed = get_probe()
            .format(&hint, mss, &fmt_opts, &meta_opts)
            .map_err(|e| SampleSourceError::UnsupportedFormat(file_path.clone(), e.to_string()))?;

        let mut format_reader = probed.format;

        let track = format_reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| SampleSourceError::NoAudioTrack(file_path.clone()))?;

        let track_id = track.id;
        let params = track.codec_params.clone();

        let sample_rate = params
            .sample_rate
            .ok_or_else(|| SampleSourceError::MissingSampleRate(file_path.clone()))?;

        let sample_format = if params.codec == codecs::CODEC_TYPE_PCM_F32LE
            || params.codec == codecs::CODEC_TYPE_PCM_F32BE
            || params.codec == codecs::CODEC_TYPE_PCM_F64LE
            || params.codec == codecs::CODEC_TYPE_PCM_F64BE
        {
            SampleFormat::Float
        } else {
            SampleFormat::Int
        };
        let compressed = !PCM_CODECS.contains(&params.codec);

        let decoder_opts: DecoderOptions = Default::default();
        let mut decoder = get_codecs()
            .make(&params, &decoder_opts)
            .map_err(|e| SampleSourceError::UnsupportedFormat(file_path.clone(), e.to_string()))?;

        // Prefer container/codec metadata for the channel count. If it's missing, decode the
        // first audio packet and derive it from there; those samples become the first read.
        let channels = params.channels.map(|c| c.count() as u16).unwrap_or(0);
        let (channels, initial_leftover) = if channels > 0 {
            (channels, Vec::new())
        } else {
            Self::detect_channels_and_prime_buffer(
                format_reader.as_mut(),
                decoder.as_mut(),
                track_id,
                &file_path,
            )?
        };

        Ok(Self {
            file_path,
            format_reader,
            decoder,
            track_id,
            is_finished: false,
            leftover_samples: initial_leftover,
            channels,
            sample_rate,
            sample_format,
            compressed,
            total_frames: params.n_frames,
        })
    }

    /// Helper function to read the next packet with common error handling.
    /// Returns:
    /// - `Ok(Some(packet))` if a packet was successfully read
    /// - `Ok(None)` if EOF was reached (UnexpectedEof or DecodeError)
    /// - `Err(...)` if an error occurred that should be returned
    ///
    /// ResetRequired errors are propagated so callers can reset the decoder.
    fn read_next_packet(
        format_reader: &mut dyn FormatReader,
    ) -> Result<Option<Packet>, SampleSourceError> {
        match format_reader.next_packet() {
            Ok(packet) => Ok(Some(packet)),
            Err(SymphoniaError::ResetRequired) => {
                Err(SampleSourceError::AudioError(SymphoniaError::ResetRequired))
            }
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                Ok(None)
            }
            Err(SymphoniaError::DecodeError(_)) => {
                // Some decoders return DecodeError at EOF instead of IoError
                Ok(None)
            }
            Err(e) => Err(SampleSourceError::AudioError(e)),
        }
    }

    /// Reads and decodes the next packet for the given track. Handles ResetRequired by
    /// resetting the decoder and retrying. Returns `Ok(Some((samples, channels)))` when
    /// a packet was decoded, `Ok(None)` on EOF, or `Err` on other errors.
    fn read_and_decode_next_packet_for_track(
        format_reader: &mut dyn FormatReader,
        decoder: &mut dyn Decoder,
        track_id: u32,
    ) -> Result<Option<(Vec<f32>, usize)>, SampleSourceError> {
        loop {
            let packet = match Self::read_next_packet(format_reader) {
                Ok(Some(packet)) => packet,
                Ok(None) => return Ok(None),
                Err(SampleSourceError::AudioError(SymphoniaError::ResetRequired)) => {
                    decoder.reset();
                    continue;
                }
                Err(e) => return Err(e),
            };
            if packet.track_id() != track_id {
                continue;
            }
            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::ResetRequired) => {
                    decoder.reset();
                    decoder.decode(&packet)?
                }
                Err(e) => return Err(SampleSourceError::AudioError(e)),
            };
            let (samples, channels) = Self::decode_buffer_to_f32(decoded);
            // Header packets (e.g. Ogg/Vorbis) decode to nothing; keep going.
            if channels > 0 && !samples.is_empty() {
                return Ok(Some((samples, channels)));
            }
        }
    }

    /// When codec/channel metadata is missing, decode until the first audio buffer for our
    /// track and take the channel count from it.
    fn detect_channels_and_prime_buffer(
        format_reader: &mut dyn FormatReader,
        decoder: &mut dyn Decoder,
        track_id: u32,
        file_path: &str,
    ) -> Result<(u16, Vec<f32>), SampleSourceError> {
        match Self::read_and_decode_next_packet_for_track(format_reader, decoder, track_id)? {
            Some((samples, channels)) => Ok((channels as u16, samples)),
            None => Err(SampleSourceError::MissingChannels(file_path.to_string())),
        }
    }

    /// Converts a decoded AudioBufferRef to interleaved f32 samples and returns the channel
    /// count as observed in the decoded buffer.
    fn decode_buffer_to_f32(decoded: AudioBufferRef) -> (Vec<f32>, usize) {
        match decoded {
            AudioBufferRef::F32(buf) => Self::interleave_planar_samples(&buf, |sample| sample),
            AudioBufferRef::F64(buf) => {
                Self::interleave_planar_samples(&buf, |sample| sample as f32)
            }
            AudioBufferRef::S8(buf) => Self::interleave_planar_samples(&buf, Self::scale_s8),
            AudioBufferRef::S16(buf) => Self::interleave_planar_samples(&buf, Self::scale_s16),
            AudioBufferRef::S24(buf) => {
                Self::interleave_planar_samples(&buf, |sample| Self::scale_s24(sample.inner()))
            }
            AudioBufferRef::S32(buf) => Self::interleave_planar_samples(&buf, Self::scale_s32),
            AudioBufferRef::U8(buf) => Self::interleave_planar_samples(&buf, Self::scale_u8),
            AudioBufferRef::U16(buf) => Self::interleave_planar_samples(&buf, Self::scale_u16),
            AudioBufferRef::U24(buf) => {
                Self::interleave_planar_samples(&buf, |sample| Self::scale_u24(sample.inner()))
            }
            AudioBufferRef::U32(buf) => Self::interleave_planar_samples(&buf, Self::scale_u32),
        }
    }

    /// Interleaves the planes of a decoded buffer, converting each sample with `convert`.
    fn interleave_planar_samples<T, F>(buf: &AudioBuffer<T>, convert: F) -> (Vec<f32>, usize)
    where
        T: symphonia::core::sample::Sample,
        F: Fn(T) -> f32,
    {
        let frames = buf.frames();
        let channels = buf.spec().channels.count();
        let planes = buf.planes();
        let mut samples = Vec::with_capacity(frames * channels);
        for frame_idx in 0..frames {
            for plane in planes.planes() {
                samples.push(convert(plane[frame_idx]));
            }
        }
        (samples, channels)
    }

    #[inline]
    pub(crate) fn scale_s8(sample: i8) -> f32 {
        sample as f32 / (1i64 << 7) as f32
    }

    #[inline]
    pub(crate) fn scale_s16(sample: i16) -> f32 {
        sample as f32 / (1i64 << 15) as f32
    }

    #[inline]
    pub(crate) fn scale_s24(sample: i32) -> f32 {
        sample as f32 / (1i64 << 23) as f32
    }

    #[inline]
    pub(crate) fn scale_s32(sample: i32) -> f32 {
        sample as f32 / (1i64 << 31) as f32
    }

    #[inline]
    pub(crate) fn scale_u8(sample: u8) -> f32 {
        (sample as f32 / u8::MAX as f32) * 2.0 - 1.0
    }

    #[inline]
    pub(crate) fn scale_u16(sample: u16) -> f32 {
        (sample as f32 / u16::MAX as f32) * 2.0 - 1.0
    }

    #[inline]
    pub(crate) fn scale_u24(sample: u32) -> f32 {
        let max = (1u32 << 24) - 1;
        (sample as f32 / max as f32) * 2.0 - 1.0
    }

    #[inline]
    pub(crate) fn scale_u32(sample: u32) -> f32 {
        (sample as f32 / u32::MAX as f32) * 2.0 - 1.0
    }
}
