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
use std::path::Path;

use config::{Config, File};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::ConfigError;
use crate::player::{PlayerError, SoundPlayer, VoiceLimits};

/// Frames rendered per output buffer when nothing else is configured.
pub const DEFAULT_BUFFER_SIZE: usize = 512;

/// A YAML representation of a player setup.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct Player {
    /// Decode incrementally instead of loading the whole file into memory.
    #[serde(default)]
    streaming: bool,

    volume: Option<f32>,

    /// -1.0 is hard left, 1.0 is hard right.
    pan: Option<f32>,

    speed: Option<f32>,

    #[serde(default, rename = "loop")]
    looping: bool,

    /// Allow overlapping voices when triggered while playing.
    #[serde(default)]
    multiplay: bool,

    /// Per-player voice limit. Defaults to `limits.max_sounds_per_player`.
    max_sounds: Option<usize>,

    /// Frames per render call.
    buffer_size: Option<usize>,

    #[serde(default)]
    limits: VoiceLimits,
}

impl Player {
    /// Parse a player config from a YAML file.
    pub fn deserialize(path: &Path) -> Result<Player, ConfigError> {
        let player = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Player>()?;
        player.validate()?;
        Ok(player)
    }

    /// Checks that the values can be applied to a player.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.volume() < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "volume must not be negative, got {}",
                self.volume()
            )));
        }
        if !(-1.0..=1.0).contains(&self.pan()) {
            return Err(ConfigError::Invalid(format!(
                "pan must be between -1.0 and 1.0, got {}",
                self.pan()
            )));
        }
        if self.speed().is_nan() || self.speed() <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "speed must be positive, got {}",
                self.speed()
            )));
        }
        if self.streaming && (self.multiplay || self.speed() != 1.0) {
            return Err(ConfigError::Invalid(
                "streaming players support neither multiplay nor speed changes".to_string(),
            ));
        }
        if self.buffer_size() == 0 {
            return Err(ConfigError::Invalid("buffer_size must not be 0".to_string()));
        }
        Ok(())
    }

    pub fn streaming(&self) -> bool {
        self.streaming
    }

    pub fn volume(&self) -> f32 {
        self.volume.unwrap_or(1.0)
    }

    pub fn pan(&self) -> f32 {
        self.pan.unwrap_or(0.0)
    }

    pub fn speed(&self) -> f32 {
        self.speed.unwrap_or(1.0)
    }

    pub fn looping(&self) -> bool {
        self.looping
    }

    pub fn multiplay(&self) -> bool {
        self.multiplay
    }

    pub fn max_sounds(&self) -> usize {
        self.max_sounds
            .unwrap_or_else(|| self.limits.max_sounds_per_player())
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size.unwrap_or(DEFAULT_BUFFER_SIZE)
    }

    pub fn limits(&self) -> VoiceLimits {
        self.limits
    }

    /// Pushes these settings into a loaded player.
    pub fn apply(&self, player: &SoundPlayer) -> Result<(), PlayerError> {
        debug!(config = ?self, "Applying player config");
        player.set_max_sounds(self.max_sounds());
        player.set_loop(self.looping);
        player.set_volume(self.volume());
        player.set_pan(self.pan());
        player.set_speed(self.speed())?;
        player.set_multi_play(self.multiplay)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use config::{Config, File, FileFormat};

    use super::*;
    use crate::audio::sample_source::MemorySampleSource;

    fn parse(yaml: &str) -> Result<Player, ConfigError> {
        let player = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize::<Player>()?;
        player.validate()?;
        Ok(player)
    }

    #[test]
    fn test_defaults() -> Result<(), Box<dyn Error>> {
        let player = parse("{}")?;
        assert!(!player.streaming());
        assert_eq!(player.volume(), 1.0);
        assert_eq!(player.pan(), 0.0);
        assert_eq!(player.speed(), 1.0);
        assert!(!player.looping());
        assert!(!player.multiplay());
        assert_eq!(player.max_sounds(), 16);
        assert_eq!(player.buffer_size(), DEFAULT_BUFFER_SIZE);
        assert_eq!(player.limits(), VoiceLimits::default());
        Ok(())
    }

    #[test]
    fn test_full_config() -> Result<(), Box<dyn Error>> {
        let player = parse(
            r#"
            volume: 0.5
            pan: -0.25
            speed: 1.5
            loop: true
            multiplay: true
            buffer_size: 256
            limits:
              max_sounds_total: 32
              max_sounds_per_player: 8
            "#,
        )?;
        assert_eq!(player.volume(), 0.5);
        assert_eq!(player.pan(), -0.25);
        assert_eq!(player.speed(), 1.5);
        assert!(player.looping());
        assert!(player.multiplay());
        assert_eq!(player.max_sounds(), 8);
        assert_eq!(player.buffer_size(), 256);
        assert_eq!(player.limits(), VoiceLimits::new(32, 8));
        Ok(())
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(parse("pan: 2.0"), Err(ConfigError::Invalid(_))));
        assert!(matches!(parse("speed: 0"), Err(ConfigError::Invalid(_))));
        assert!(matches!(parse("volume: -1"), Err(ConfigError::Invalid(_))));
        assert!(matches!(
            parse("streaming: true\nmultiplay: true"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(parse("volume: loud"), Err(ConfigError::Load(_))));
    }

    #[test]
    fn test_deserialize_file() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("player.yaml");
        std::fs::write(&path, "streaming: true\nvolume: 0.75\n")?;

        let player = Player::deserialize(&path)?;
        assert!(player.streaming());
        assert_eq!(player.volume(), 0.75);

        assert!(Player::deserialize(&dir.path().join("missing.yaml")).is_err());
        Ok(())
    }

    #[test]
    fn test_apply() -> Result<(), Box<dyn Error>> {
        let config =
            parse("volume: 0.5\npan: 1.0\nspeed: 2.0\nloop: true\nmultiplay: true\nmax_sounds: 3")?;
        let player = SoundPlayer::default();
        player.load_source(
            Box::new(MemorySampleSource::new(vec![0.0; 100], 1, 1000)),
            "silence",
            false,
        )?;
        config.apply(&player)?;

        assert_eq!(player.volume(), 0.5);
        assert_eq!(player.pan(), 1.0);
        assert_eq!(player.speed(), 2.0);
        assert!(player.is_looping());
        assert!(player.is_multi_play());
        assert_eq!(player.max_sounds(), 3);
        Ok(())
    }
}
