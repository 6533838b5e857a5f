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

use tempfile::tempdir;

use super::audio::AudioSampleSource;
use super::error::SampleSourceError;
use super::memory::MemorySampleSource;
use super::traits::{read_all, SampleSource};
use super::{create_sample_source_from_file, probe_file};
use crate::audio::{SampleFormat, SoundBuffer};
use crate::testutil::{ramp, write_wav, write_wav_i16};

// ---------------------------------------------------------------------
// Scaling helpers
// ---------------------------------------------------------------------

#[test]
fn test_integer_scaling_signed_ranges() {
    assert!((AudioSampleSource::scale_s8(0) - 0.0).abs() < 1e-7);
    assert!(AudioSampleSource::scale_s8(i8::MAX) <= 1.0 + 1e-7);
    assert!(AudioSampleSource::scale_s8(i8::MIN) >= -1.0 - 1e-7);

    assert!((AudioSampleSource::scale_s16(0) - 0.0).abs() < 1e-7);
    assert!(AudioSampleSource::scale_s16(i16::MAX) <= 1.0 + 1e-7);
    assert!((AudioSampleSource::scale_s16(i16::MIN) + 1.0).abs() < 1e-7);

    assert!(AudioSampleSource::scale_s24((1 << 23) - 1) <= 1.0 + 1e-7);
    assert!(AudioSampleSource::scale_s32(i32::MIN) >= -1.0 - 1e-7);
}

#[test]
fn test_integer_scaling_unsigned_ranges() {
    assert!((AudioSampleSource::scale_u8(0) + 1.0).abs() < 1e-7);
    assert!((AudioSampleSource::scale_u8(u8::MAX) - 1.0).abs() < 1e-7);

    let mid_u16 = AudioSampleSource::scale_u16(u16::MAX / 2);
    assert!(mid_u16 > -0.01 && mid_u16 < 0.01);

    let max_u24 = (1u32 << 24) - 1;
    assert!((AudioSampleSource::scale_u24(max_u24) - 1.0).abs() < 1e-7);
    assert!((AudioSampleSource::scale_u32(0) + 1.0).abs() < 1e-7);
}

// ---------------------------------------------------------------------
// Memory source
// ---------------------------------------------------------------------

#[test]
fn test_memory_sample_source_reads_in_chunks() {
    let mut source = MemorySampleSource::new(vec![1.0, 2.0, 3.0, 4.0, 5.0], 1, 44100);
    let mut buffer = SoundBuffer::default();

    assert_eq!(source.read_into(&mut buffer, 2).unwrap(), 2);
    assert_eq!(buffer.samples(), &[1.0, 2.0]);
    assert_eq!(buffer.sample_rate(), 44100);

    assert_eq!(source.read_into(&mut buffer, 10).unwrap(), 3);
    assert_eq!(buffer.samples(), &[3.0, 4.0, 5.0]);

    assert_eq!(source.read_into(&mut buffer, 10).unwrap(), 0);
    assert!(buffer.is_empty());
}

#[test]
fn test_memory_sample_source_seek() {
    let mut source = MemorySampleSource::new(vec![0.0, 0.5, 1.0, 1.5, 2.0, 2.5], 2, 48000);
    let mut buffer = SoundBuffer::default();

    source.seek(2).unwrap();
    assert_eq!(source.position(), 2);
    assert_eq!(source.read_into(&mut buffer, 4).unwrap(), 1);
    assert_eq!(buffer.samples(), &[2.0, 2.5]);

    source.seek(0).unwrap();
    assert_eq!(source.read_into(&mut buffer, 1).unwrap(), 1);
    assert_eq!(buffer.samples(), &[0.0, 0.5]);

    assert!(matches!(
        source.seek(4),
        Err(SampleSourceError::SeekOutOfRange(4, 3))
    ));
}

#[test]
fn test_memory_sample_source_info() {
    let source = MemorySampleSource::new(vec![0.0; 2 * 22050], 2, 44100);
    let info = source.info();
    assert_eq!(info.channel_count, 2);
    assert_eq!(info.sample_rate, 44100);
    assert_eq!(info.total_frames, 22050);
    assert_eq!(info.duration_ms, 500);
    assert!(!info.is_compressed);
    assert_eq!(source.duration(), Some(Duration::from_millis(500)));
}

#[test]
fn test_read_all_collects_every_frame() {
    let mut source = MemorySampleSource::new(ramp(1000, 0.001), 1, 8000);
    let all = read_all(&mut source, 64).unwrap();
    assert_eq!(all.frames(), 1000);
    assert_eq!(all.channel_count(), 1);
    assert!((all.samples()[999] - 0.999).abs() < 1e-6);
}

// ---------------------------------------------------------------------
// Decoding files
// ---------------------------------------------------------------------

#[test]
fn test_wav_float_stereo_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("stereo.wav");
    let left = ramp(2000, 0.0005);
    let right: Vec<f32> = left.iter().map(|s| -s).collect();
    write_wav(&path, &[left.clone(), right.clone()], 44100)?;

    let mut source = create_sample_source_from_file(&path)?;
    assert_eq!(source.channel_count(), 2);
    assert_eq!(source.sample_rate(), 44100);
    assert_eq!(source.sample_format(), SampleFormat::Float);
    assert!(!source.is_compressed());
    assert_eq!(source.total_frames(), Some(2000));

    let all = read_all(&mut source, 256)?;
    assert_eq!(all.frames(), 2000);
    for frame in [0, 1, 777, 1999] {
        assert!((all.samples()[frame * 2] - left[frame]).abs() < 1e-6);
        assert!((all.samples()[frame * 2 + 1] - right[frame]).abs() < 1e-6);
    }
    Ok(())
}

#[test]
fn test_wav_int16_is_scaled() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("int.wav");
    write_wav_i16(&path, &[vec![0, i16::MAX, i16::MIN, 16384]], 22050)?;

    let mut source = create_sample_source_from_file(&path)?;
    assert_eq!(source.sample_format(), SampleFormat::Int);

    let all = read_all(&mut source, 16)?;
    let samples = all.samples();
    assert_eq!(samples.len(), 4);
    assert!(samples[0].abs() < 1e-6);
    assert!((samples[1] - 1.0).abs() < 1e-3);
    assert!((samples[2] + 1.0).abs() < 1e-6);
    assert!((samples[3] - 0.5).abs() < 1e-3);
    Ok(())
}

#[test]
fn test_wav_seek_is_frame_accurate() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("seek.wav");
    let samples = ramp(10000, 0.0001);
    write_wav(&path, &[samples.clone()], 48000)?;

    let mut source = create_sample_source_from_file(&path)?;
    let mut buffer = SoundBuffer::default();

    // Read into the middle, then go back.
    assert_eq!(source.read_into(&mut buffer, 5000)?, 5000);
    source.seek(1234)?;
    assert_eq!(source.read_into(&mut buffer, 4)?, 4);
    assert!((buffer.samples()[0] - samples[1234]).abs() < 1e-6);
    assert!((buffer.samples()[3] - samples[1237]).abs() < 1e-6);

    // Seeking after end of stream makes the source readable again.
    while source.read_into(&mut buffer, 4096)? > 0 {}
    source.seek(0)?;
    assert_eq!(source.read_into(&mut buffer, 1)?, 1);
    assert!(buffer.samples()[0].abs() < 1e-6);
    Ok(())
}

#[test]
fn test_probe_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("probe.wav");
    write_wav(&path, &[vec![0.0; 4410], vec![0.0; 4410]], 44100)?;

    let info = probe_file(&path)?;
    assert_eq!(info.channel_count, 2);
    assert_eq!(info.total_frames, 4410);
    assert_eq!(info.duration_ms, 100);
    Ok(())
}

#[test]
fn test_missing_file_is_io_error() {
    let result = create_sample_source_from_file("/definitely/not/here.wav");
    assert!(matches!(result, Err(SampleSourceError::IoError(_))));
}

#[test]
fn test_non_audio_file_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("notes.wav");
    std::fs::write(&path, b"this is not a riff file at all")?;

    let result = create_sample_source_from_file(&path);
    assert!(matches!(
        result,
        Err(SampleSourceError::UnsupportedFormat(_, _))
    ));
    Ok(())
}
