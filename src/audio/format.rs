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
use std::{error::Error, fmt, str::FromStr};

use super::buffer::SoundBuffer;

/// Sample format enumeration for audio processing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// Integer samples (e.g., 16-bit, 24-bit, 32-bit)
    Int,
    /// Floating point samples (e.g., 32-bit float, 64-bit float)
    Float,
}

impl FromStr for SampleFormat {
    /// Convert from string representation
    fn from_str(s: &str) -> Result<Self, Box<dyn Error>> {
        match s {
            "float" | "Float" => Ok(SampleFormat::Float),
            "int" | "Int" => Ok(SampleFormat::Int),
            _ => Err(format!("Unsupported sample format: {}", s).into()),
        }
    }

    type Err = Box<dyn Error>;
}

impl SampleFormat {
    /// Convert to string representation
    pub fn as_str(self) -> &'static str {
        match self {
            SampleFormat::Float => "float",
            SampleFormat::Int => "int",
        }
    }

    /// Bit depth used when writing this format to a file.
    pub fn default_bits_per_sample(self) -> u16 {
        match self {
            SampleFormat::Float => 32,
            SampleFormat::Int => 16,
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The shape of the buffers the host asks the player to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutputFormat {
    /// Frames per render call
    pub frames: usize,
    /// Interleaved channel count
    pub channels: u16,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl OutputFormat {
    pub fn new(frames: usize, channels: u16, sample_rate: u32) -> Self {
        OutputFormat {
            frames,
            channels,
            sample_rate,
        }
    }

    /// The format of an output buffer about to be rendered into.
    pub fn of(buffer: &SoundBuffer) -> Self {
        OutputFormat {
            frames: buffer.frames(),
            channels: buffer.channel_count(),
            sample_rate: buffer.sample_rate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_format_from_str() {
        assert_eq!(
            SampleFormat::from_str("float").unwrap(),
            SampleFormat::Float
        );
        assert_eq!(SampleFormat::from_str("Int").unwrap(), SampleFormat::Int);
        assert!(SampleFormat::from_str("double").is_err());
        assert!(SampleFormat::from_str("").is_err());
    }

    #[test]
    fn test_sample_format_display() {
        assert_eq!(format!("{}", SampleFormat::Float), "float");
        assert_eq!(format!("{}", SampleFormat::Int), "int");
    }

    #[test]
    fn test_default_bits_per_sample() {
        assert_eq!(SampleFormat::Float.default_bits_per_sample(), 32);
        assert_eq!(SampleFormat::Int.default_bits_per_sample(), 16);
    }

    #[test]
    fn test_output_format_of_buffer() {
        let buffer = SoundBuffer::silence(256, 2, 48000);
        assert_eq!(OutputFormat::of(&buffer), OutputFormat::new(256, 2, 48000));
        assert_ne!(OutputFormat::of(&buffer), OutputFormat::new(512, 2, 48000));
    }
}
