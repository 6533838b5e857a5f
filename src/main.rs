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
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{crate_version, Parser, Subcommand};
use duration_string::DurationString;
use hound::{WavSpec, WavWriter};
use tracing::info;

use soundplayer::audio::sample_source::probe_file;
use soundplayer::audio::{SampleFormat, SoundBuffer};
use soundplayer::config;
use soundplayer::player::{ChannelObserver, SoundPlayer, VoiceRegistry};
use soundplayer::util::{duration_minutes_seconds, filename_display, frames_for_duration};

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A multi-voice sound player."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prints the format of an audio file.
    Info {
        /// The audio file to inspect.
        path: String,
    },
    /// Plays an audio file through the player and writes the result to a WAV file.
    Render {
        /// The audio file to play.
        path: String,
        /// The WAV file to write.
        output: String,
        /// The path to a player config.
        #[arg[short, long]]
        config: Option<String>,
        /// Stream the file instead of decoding it into memory first.
        #[arg[long]]
        stream: bool,
        /// Playback volume.
        #[arg[long]]
        volume: Option<f32>,
        /// Pan position, from -1.0 (left) to 1.0 (right).
        #[arg[long, allow_hyphen_values = true]]
        pan: Option<f32>,
        /// Playback speed.
        #[arg[long]]
        speed: Option<f32>,
        /// Loop the sound. Requires --duration.
        #[arg[short, long = "loop"]]
        looping: bool,
        /// Let triggers overlap.
        #[arg[short, long]]
        multiplay: bool,
        /// Times to trigger the sound at. Should be in the form <DURATION>,...
        /// For example, 0ms,250ms,1s. Triggers are rounded to the buffer size.
        #[arg[short, long]]
        triggers: Option<String>,
        /// How much audio to render. Defaults to until playback ends.
        #[arg[short, long]]
        duration: Option<String>,
        /// Frames per render call.
        #[arg[short, long]]
        buffer_size: Option<usize>,
        /// Output sample rate. Defaults to the file's sample rate.
        #[arg[long]]
        sample_rate: Option<u32>,
        /// Output channel count.
        #[arg[long, default_value_t = 2]]
        channels: u16,
        /// Output sample format, int or float.
        #[arg[short, long, default_value = "int"]]
        format: String,
        /// Report the peak level of the rendered voice buffers.
        #[arg[long]]
        peaks: bool,
    },
}

/// Output settings for a render.
struct RenderTarget {
    output: PathBuf,
    buffer_size: usize,
    channels: u16,
    sample_rate: u32,
    format: SampleFormat,
    /// Frames to render. Renders until playback ends when absent.
    frames: Option<u64>,
    /// Frames at which to trigger the sound.
    triggers: Vec<u64>,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Info { path } => {
            let path = Path::new(&path);
            let info = probe_file(path)?;
            println!("{}:", filename_display(path));
            println!("  Sample rate: {} Hz", info.sample_rate);
            println!("  Channels: {}", info.channel_count);
            println!("  Sample format: {}", info.sample_format);
            println!(
                "  Compressed: {}",
                if info.is_compressed { "yes" } else { "no" }
            );
            println!("  Frames: {}", info.total_frames);
            println!(
                "  Duration: {}",
                duration_minutes_seconds(Duration::from_millis(info.duration_ms))
            );
        }
        Commands::Render {
            path,
            output,
            config: config_path,
            stream,
            volume,
            pan,
            speed,
            looping,
            multiplay,
            triggers,
            duration,
            buffer_size,
            sample_rate,
            channels,
            format,
            peaks,
        } => {
            let settings = match config_path {
                Some(config_path) => config::Player::deserialize(Path::new(&config_path))?,
                None => config::Player::default(),
            };

            let registry = Arc::new(VoiceRegistry::new(settings.limits()));
            let player = SoundPlayer::new(registry);
            player.load(&path, stream || settings.streaming())?;
            settings.apply(&player)?;
            if let Some(volume) = volume {
                player.set_volume(volume);
            }
            if let Some(pan) = pan {
                player.set_pan(pan);
            }
            if let Some(speed) = speed {
                player.set_speed(speed)?;
            }
            if looping {
                player.set_loop(true);
            }
            if multiplay {
                player.set_multi_play(true)?;
            }

            let source_info = player.source_info().ok_or("sound failed to load")?;
            let sample_rate = sample_rate.unwrap_or(source_info.sample_rate);
            let frames = match duration {
                Some(duration) => Some(frames_for_duration(
                    parse_duration(&duration)?,
                    sample_rate,
                )),
                None if player.is_looping() => {
                    return Err("a looping sound needs --duration".into());
                }
                None => None,
            };
            let triggers = match triggers {
                Some(triggers) => triggers
                    .split(',')
                    .map(|trigger| {
                        Ok(frames_for_duration(
                            parse_duration(trigger.trim())?,
                            sample_rate,
                        ))
                    })
                    .collect::<Result<Vec<u64>, Box<dyn Error>>>()?,
                None => vec![0],
            };

            let target = RenderTarget {
                output: PathBuf::from(&output),
                buffer_size: buffer_size.unwrap_or_else(|| settings.buffer_size()),
                channels,
                sample_rate,
                format: format.parse()?,
                frames,
                triggers,
            };
            render(&player, target, peaks)?;
        }
    }

    Ok(())
}

fn parse_duration(duration: &str) -> Result<Duration, Box<dyn Error>> {
    Ok(DurationString::from_string(duration.to_string())?.into())
}

/// Drives the player the way an audio host would, one buffer at a time, and writes the
/// mixed output to a WAV file.
fn render(player: &SoundPlayer, target: RenderTarget, peaks: bool) -> Result<(), Box<dyn Error>> {
    if target.buffer_size == 0 || target.channels == 0 || target.sample_rate == 0 {
        return Err("buffer size, channels and sample rate must all be non-zero".into());
    }

    let mut triggers = target.triggers;
    triggers.sort_unstable();

    let observed = if peaks {
        let (observer, receiver) = ChannelObserver::bounded(1024);
        let observer = Arc::new(observer);
        player.add_observer(observer.clone());
        Some((observer, receiver))
    } else {
        None
    };

    let mut writer = WavWriter::create(
        &target.output,
        WavSpec {
            channels: target.channels,
            sample_rate: target.sample_rate,
            bits_per_sample: target.format.default_bits_per_sample(),
            sample_format: match target.format {
                SampleFormat::Int => hound::SampleFormat::Int,
                SampleFormat::Float => hound::SampleFormat::Float,
            },
        },
    )?;

    player.notify_format_changed(target.buffer_size, target.channels, target.sample_rate);
    let mut buffer = SoundBuffer::new(target.channels, target.sample_rate);
    let mut rendered: u64 = 0;
    let mut next_trigger = 0;
    let mut voice_buffers: u64 = 0;
    let mut peak: f32 = 0.0;

    loop {
        let frames = match target.frames {
            Some(total) if rendered >= total => break,
            Some(total) => (total - rendered).min(target.buffer_size as u64) as usize,
            None if next_trigger >= triggers.len() && !player.is_playing() => break,
            None => target.buffer_size,
        };

        let buffer_end = rendered + frames as u64;
        while next_trigger < triggers.len() && triggers[next_trigger] < buffer_end {
            player.play();
            next_trigger += 1;
        }

        buffer.resize(frames, target.channels);
        player.render_into(&mut buffer);
        match target.format {
            SampleFormat::Float => {
                for sample in buffer.samples() {
                    writer.write_sample(*sample)?;
                }
            }
            SampleFormat::Int => {
                for sample in buffer.samples() {
                    writer.write_sample((sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
                }
            }
        }
        rendered = buffer_end;

        if let Some((_, receiver)) = &observed {
            for voice_buffer in receiver.try_iter() {
                voice_buffers += 1;
                peak = peak.max(voice_buffer.peak());
            }
        }
    }
    writer.finalize()?;

    info!(
        output = ?target.output,
        frames = rendered,
        "Render complete"
    );
    println!(
        "Rendered {} ({} frames) to {}",
        duration_minutes_seconds(Duration::from_secs(rendered / target.sample_rate as u64)),
        rendered,
        target.output.display()
    );
    if let Some((observer, _)) = observed {
        println!(
            "Voice buffers: {}, peak: {:.3}, dropped: {}",
            voice_buffers,
            peak,
            observer.dropped()
        );
    }

    Ok(())
}
