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
use std::{fmt, path::Path, sync::Arc};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use super::{
    error::PlayerError,
    limits::VoiceRegistry,
    observer::BufferObserver,
    pan::stereo_volumes,
    state::PlaybackState,
    voice::{Voice, VoiceSet},
};
use crate::audio::{
    sample_source::{create_sample_source_from_file, read_all, SampleSource, SourceInfo},
    InterpolationKind, OutputFormat, SoundBuffer,
};
use crate::util::filename_display;

/// Speeds this close to 1.0 are played without resampling.
pub const SPEED_EPSILON: f64 = f32::EPSILON as f64;

/// Frames decoded per read when loading a source into memory.
const LOAD_CHUNK_FRAMES: usize = 4096;

/// Where a loaded source's samples come from.
enum SourceBuffer {
    /// The whole source, decoded at load time.
    Resident(SoundBuffer),
    /// An open decoder read incrementally, one output buffer at a time.
    Streaming {
        decoder: Box<dyn SampleSource>,
        /// The frames read for the current render pass.
        window: SoundBuffer,
        /// Holds the frames read after a loop wraps, before they join the window.
        spill: SoundBuffer,
    },
}

impl SourceBuffer {
    fn is_streaming(&self) -> bool {
        matches!(self, SourceBuffer::Streaming { .. })
    }
}

struct LoadedSource {
    name: String,
    info: SourceInfo,
    buffer: SourceBuffer,
}

impl LoadedSource {
    /// Length of the source in frames. Zero for streams of unknown length.
    fn total_frames(&self) -> usize {
        match &self.buffer {
            SourceBuffer::Resident(buffer) => buffer.frames(),
            SourceBuffer::Streaming { .. } => self.info.total_frames as usize,
        }
    }

    fn seek_to_start(&mut self) {
        self.seek(0);
    }

    /// Moves the stream cursor. Does nothing for resident sources.
    fn seek(&mut self, frame: u64) {
        if let SourceBuffer::Streaming { decoder, .. } = &mut self.buffer {
            if let Err(e) = decoder.seek(frame) {
                warn!(name = self.name, frame, err = %e, "Unable to seek stream");
            }
        }
    }
}

/// Everything guarded by the player lock.
struct PlayerState {
    state: PlaybackState,
    source: Option<LoadedSource>,
    voices: VoiceSet,
    volume: f32,
    pan: f32,
    speed: f64,
    looping: bool,
    multiplay: bool,
    max_sounds: usize,
    /// The last output format seen. Before the first render this is the source's own rate.
    output: OutputFormat,
    /// Per-voice scratch: the resampled or channel-converted buffer about to be mixed.
    working: SoundBuffer,
    /// Whether `working` holds what the last render pass produced. The single-voice fast
    /// path mixes straight into the output and leaves it stale.
    working_current: bool,
    observers: Vec<Arc<dyn BufferObserver>>,
}

impl PlayerState {
    fn new(max_sounds: usize) -> Self {
        PlayerState {
            state: PlaybackState::Unloaded,
            source: None,
            voices: VoiceSet::default(),
            volume: 1.0,
            pan: 0.0,
            speed: 1.0,
            looping: false,
            multiplay: false,
            max_sounds,
            output: OutputFormat::default(),
            working: SoundBuffer::default(),
            working_current: false,
            observers: Vec::new(),
        }
    }

    fn is_streaming(&self) -> bool {
        self.source
            .as_ref()
            .is_some_and(|source| source.buffer.is_streaming())
    }

    fn total_frames(&self) -> usize {
        self.source.as_ref().map_or(0, LoadedSource::total_frames)
    }

    /// Source frames per output frame at the current user speed.
    fn relative_speed(&self) -> f64 {
        let source_rate = self.source.as_ref().map_or(0, |s| s.info.sample_rate);
        if source_rate == 0 || self.output.sample_rate == 0 {
            return self.speed;
        }
        self.speed * (source_rate as f64 / self.output.sample_rate as f64)
    }

    fn gains(&self) -> (f32, f32) {
        stereo_volumes(self.volume, self.pan)
    }

    fn unload(&mut self, registry: &VoiceRegistry) {
        let Some(source) = self.source.take() else {
            return;
        };
        let dropped = self.voices.reset();
        registry.release(dropped + 1);
        self.state = PlaybackState::Unloaded;
        self.working.clear();
        self.working_current = false;
        debug!(name = source.name, "Sound unloaded");
    }

    fn install(
        &mut self,
        registry: &VoiceRegistry,
        mut decoder: Box<dyn SampleSource>,
        name: &str,
        streaming: bool,
    ) -> Result<(), PlayerError> {
        let info = decoder.info();
        info!(
            name,
            duration_ms = info.duration_ms,
            channels = info.channel_count,
            sample_rate = info.sample_rate,
            frames = info.total_frames,
            compressed = info.is_compressed,
            streaming,
            "Loading sound"
        );

        let (info, buffer) = if streaming {
            let window = SoundBuffer::new(info.channel_count, info.sample_rate);
            let spill = window.clone();
            (
                info,
                SourceBuffer::Streaming {
                    decoder,
                    window,
                    spill,
                },
            )
        } else {
            debug!(name, "Not streaming, reading whole file into memory");
            let buffer = read_all(&mut decoder, LOAD_CHUNK_FRAMES).map_err(|source| {
                error!(name, err = %source, "Failed to decode sound");
                PlayerError::LoadFailure {
                    name: name.to_string(),
                    source,
                }
            })?;
            (
                info.with_total_frames(buffer.frames() as u64),
                SourceBuffer::Resident(buffer),
            )
        };

        if streaming {
            self.speed = 1.0;
            if self.multiplay {
                debug!(name, "Multiplay disabled for streaming sound");
                self.multiplay = false;
            }
        }

        self.source = Some(LoadedSource {
            name: name.to_string(),
            info,
            buffer,
        });
        self.output = OutputFormat::new(0, info.channel_count, info.sample_rate);
        self.working = SoundBuffer::new(info.channel_count, info.sample_rate);
        self.working_current = false;
        registry.acquire();

        let voice = Voice::new(self.relative_speed(), self.gains());
        *self.voices.primary_mut() = voice;
        self.state = PlaybackState::Stopped;
        Ok(())
    }

    fn apply_output_format(&mut self, format: OutputFormat) {
        let old_rate = self.output.sample_rate;
        if old_rate != format.sample_rate && old_rate > 0 && format.sample_rate > 0 {
            let ratio = old_rate as f64 / format.sample_rate as f64;
            for voice in self.voices.iter_mut() {
                voice.set_relative_speed(voice.relative_speed() * ratio);
            }
        }
        debug!(
            frames = format.frames,
            channels = format.channels,
            sample_rate = format.sample_rate,
            "Output format changed"
        );

        self.working.set_format(format.channels, format.sample_rate);
        self.working.resize(format.frames, format.channels);
        self.working_current = false;
        if let Some(LoadedSource {
            buffer: SourceBuffer::Streaming { window, .. },
            ..
        }) = &mut self.source
        {
            window.reserve_frames(format.frames);
        }
        self.output = format;
    }

    /// Returns the number of voices retired during the pass.
    fn render(&mut self, output: &mut SoundBuffer) -> usize {
        let format = OutputFormat::of(output);
        if format != self.output {
            self.apply_output_format(format);
        }
        if self.is_streaming() {
            self.render_streaming(output);
            0
        } else {
            self.render_resident(output)
        }
    }

    fn render_streaming(&mut self, output: &mut SoundBuffer) {
        let Some(source) = self.source.as_mut() else {
            return;
        };
        let SourceBuffer::Streaming {
            decoder,
            window,
            spill,
        } = &mut source.buffer
        else {
            return;
        };

        let frames = output.frames();
        let read = fill_window(
            &mut **decoder,
            window,
            spill,
            frames,
            self.looping,
            &source.name,
        );
        if read == 0 {
            debug!(name = source.name, "End of stream");
            self.state = self.state.stop();
            source.seek_to_start();
            self.voices.primary_mut().set_position(0.0);
            return;
        }

        window.copy_into(&mut self.working, read, output.channel_count(), 0, false);
        let (gain_left, gain_right) = self.voices.primary().gains();
        self.working.apply_stereo_pan(gain_left, gain_right);
        for observer in &self.observers {
            observer.on_buffer(&self.working);
        }
        self.working.mix_into(output, 0, false);
        self.working_current = true;

        let total = source.total_frames();
        let primary = self.voices.primary_mut();
        let mut position = primary.position() + read as f64;
        if total > 0 {
            position = if self.looping {
                position % total as f64
            } else {
                position.min(total as f64)
            };
        }
        primary.set_position(position);
    }

    fn render_resident(&mut self, output: &mut SoundBuffer) -> usize {
        let Some(LoadedSource {
            buffer: SourceBuffer::Resident(buffer),
            ..
        }) = &self.source
        else {
            return 0;
        };

        let frames = output.frames();
        let channels = output.channel_count();
        let primary = self.voices.primary();
        if self.voices.len() == 1
            && (primary.relative_speed() - 1.0).abs() < SPEED_EPSILON
            && self.observers.is_empty()
        {
            let (gain_left, gain_right) = primary.gains();
            buffer.mix_panned_into(
                output,
                primary.frame_index(),
                self.looping,
                gain_left,
                gain_right,
            );
            self.working_current = false;
        } else {
            for voice in self.voices.iter() {
                let speed = voice.relative_speed();
                if (speed - 1.0).abs() < SPEED_EPSILON {
                    buffer.copy_into(
                        &mut self.working,
                        frames,
                        channels,
                        voice.frame_index(),
                        self.looping,
                    );
                } else {
                    buffer.resample_into(
                        &mut self.working,
                        voice.position(),
                        frames,
                        channels,
                        speed,
                        self.looping,
                        InterpolationKind::Linear,
                    );
                }
                let (gain_left, gain_right) = voice.gains();
                self.working.apply_stereo_pan(gain_left, gain_right);
                for observer in &self.observers {
                    observer.on_buffer(&self.working);
                }
                self.working.mix_into(output, 0, false);
            }
            self.working_current = true;
        }

        let total = buffer.frames();
        let retired = self.voices.advance(frames, total, self.looping);
        if self.voices.finished(total, self.looping) {
            self.state = self.state.stop();
        }
        retired
    }
}

/// Reads up to `frames` frames into `window`. Looping streams that run out are rewound and
/// the read continues from the start. Decode errors are logged and end the read.
fn fill_window(
    decoder: &mut dyn SampleSource,
    window: &mut SoundBuffer,
    spill: &mut SoundBuffer,
    frames: usize,
    looping: bool,
    name: &str,
) -> usize {
    let mut read = read_logged(decoder, window, frames, name);
    if !looping {
        return read;
    }
    while read < frames {
        if let Err(e) = decoder.seek(0) {
            warn!(name, err = %e, "Unable to rewind looping stream");
            break;
        }
        let more = read_logged(decoder, spill, frames - read, name);
        if more == 0 {
            break;
        }
        if read == 0 {
            std::mem::swap(window, spill);
        } else {
            window.append(spill);
        }
        read += more;
    }
    read
}

fn read_logged(
    decoder: &mut dyn SampleSource,
    buffer: &mut SoundBuffer,
    frames: usize,
    name: &str,
) -> usize {
    match decoder.read_into(buffer, frames) {
        Ok(read) => read,
        Err(e) => {
            error!(name, err = %e, "Error decoding stream");
            buffer.clear();
            0
        }
    }
}

/// Plays one sound, optionally as several overlapping voices, into host-provided buffers.
///
/// Control methods may be called from any thread. [`SoundPlayer::render_into`] is meant for
/// the audio thread and holds the player lock for the whole pass.
pub struct SoundPlayer {
    inner: Mutex<PlayerState>,
    registry: Arc<VoiceRegistry>,
}

impl fmt::Debug for SoundPlayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("SoundPlayer")
            .field("name", &inner.source.as_ref().map(|s| s.name.as_str()))
            .field("state", &inner.state)
            .field("streaming", &inner.is_streaming())
            .field("voices", &inner.voices.len())
            .field("volume", &inner.volume)
            .field("pan", &inner.pan)
            .field("speed", &inner.speed)
            .field("looping", &inner.looping)
            .field("multiplay", &inner.multiplay)
            .finish()
    }
}

impl Default for SoundPlayer {
    fn default() -> Self {
        SoundPlayer::new(Arc::new(VoiceRegistry::default()))
    }
}

impl Drop for SoundPlayer {
    fn drop(&mut self) {
        self.inner.get_mut().unload(&self.registry);
    }
}

impl SoundPlayer {
    /// Creates an unloaded player that draws its voices from `registry`.
    pub fn new(registry: Arc<VoiceRegistry>) -> Self {
        let max_sounds = registry.limits().max_sounds_per_player();
        SoundPlayer {
            inner: Mutex::new(PlayerState::new(max_sounds)),
            registry,
        }
    }

    pub fn registry(&self) -> &Arc<VoiceRegistry> {
        &self.registry
    }

    /// Loads an audio file, replacing whatever was loaded before.
    ///
    /// On failure the player is left unloaded.
    pub fn load<P: AsRef<Path>>(&self, path: P, streaming: bool) -> Result<(), PlayerError> {
        let path = path.as_ref();
        let name = filename_display(path);
        let mut inner = self.inner.lock();
        inner.unload(&self.registry);

        let decoder = create_sample_source_from_file(path).map_err(|source| {
            error!(path = ?path, err = %source, "Failed to open sound");
            PlayerError::LoadFailure {
                name: name.to_string(),
                source,
            }
        })?;
        inner.install(&self.registry, decoder, name, streaming)
    }

    /// Loads an already opened source under the given name.
    pub fn load_source(
        &self,
        source: Box<dyn SampleSource>,
        name: &str,
        streaming: bool,
    ) -> Result<(), PlayerError> {
        let mut inner = self.inner.lock();
        inner.unload(&self.registry);
        inner.install(&self.registry, source, name, streaming)
    }

    /// Closes the source and returns every voice to the registry.
    pub fn unload(&self) {
        self.inner.lock().unload(&self.registry);
    }

    /// Starts playback from the beginning.
    ///
    /// With multiplay on, a new overlapping voice is added instead, as long as both the
    /// per-player and the registry limits allow it. Otherwise the trigger is dropped. Paused
    /// voices are kept and resume alongside the new one. A stopped player holding only an
    /// idle or finished primary voice restarts that voice in place.
    pub fn play(&self) {
        let mut inner = self.inner.lock();
        if !inner.state.is_loaded() {
            return;
        }
        let relative_speed = inner.relative_speed();
        let gains = inner.gains();

        let inner = &mut *inner;
        let Some(source) = inner.source.as_mut() else {
            return;
        };
        let primary = inner.voices.primary();
        let idle = inner.voices.len() == 1
            && !inner.state.is_playing()
            && (primary.position() == 0.0 || primary.has_ended(source.total_frames()));
        if inner.multiplay && !idle {
            if inner.voices.len() >= inner.max_sounds {
                debug!(
                    name = source.name,
                    max_sounds = inner.max_sounds,
                    "Per-player voice limit reached, dropping trigger"
                );
            } else {
                match self.registry.try_acquire() {
                    Ok(()) => inner.voices.push(Voice::new(relative_speed, gains)),
                    Err(e) => debug!(name = source.name, err = %e, "Dropping trigger"),
                }
            }
        } else {
            let dropped = inner.voices.truncate_to_primary();
            self.registry.release(dropped);
            source.seek_to_start();
            let primary = inner.voices.primary_mut();
            primary.set_position(0.0);
            primary.set_relative_speed(relative_speed);
            primary.set_gains(gains);
        }
        inner.state = inner.state.play();
    }

    /// Stops playback. Streams are rewound to the start.
    pub fn stop(&self) {
        let mut inner = self.inner.lock();
        if !inner.state.is_loaded() {
            return;
        }
        inner.state = inner.state.stop();
        if inner.is_streaming() {
            if let Some(source) = inner.source.as_mut() {
                source.seek_to_start();
            }
            inner.voices.primary_mut().set_position(0.0);
        }
    }

    /// Pauses without rewinding, or resumes from where playback left off.
    pub fn set_paused(&self, paused: bool) {
        let mut inner = self.inner.lock();
        if !inner.state.is_loaded() {
            return;
        }
        if paused {
            inner.state = inner.state.stop();
            return;
        }
        let total = inner.total_frames();
        if total > 0 && inner.voices.finished(total, inner.looping) {
            debug!("Not resuming, sound has played to the end");
            return;
        }
        inner.state = inner.state.play();
    }

    /// Renders one buffer of audio, adding it to whatever `output` already holds.
    pub fn render_into(&self, output: &mut SoundBuffer) {
        let mut inner = self.inner.lock();
        if !inner.state.is_playing() {
            return;
        }
        let retired = inner.render(output);
        self.registry.release(retired);
    }

    /// Tells the player the shape of the buffers it will be asked to render.
    pub fn notify_format_changed(&self, frames: usize, channels: u16, sample_rate: u32) {
        self.inner
            .lock()
            .apply_output_format(OutputFormat::new(frames, channels, sample_rate));
    }

    pub fn set_volume(&self, volume: f32) {
        let mut inner = self.inner.lock();
        if !inner.state.is_loaded() {
            return;
        }
        inner.volume = volume;
        let gains = inner.gains();
        inner.voices.last_mut().set_gains(gains);
    }

    pub fn set_pan(&self, pan: f32) {
        let mut inner = self.inner.lock();
        if !inner.state.is_loaded() {
            return;
        }
        inner.pan = pan;
        let gains = inner.gains();
        inner.voices.last_mut().set_gains(gains);
    }

    /// Sets the playback speed of the most recent voice and of future triggers.
    ///
    /// Streams only play at unity speed.
    pub fn set_speed(&self, speed: f32) -> Result<(), PlayerError> {
        let mut inner = self.inner.lock();
        if !inner.state.is_loaded() {
            return Ok(());
        }
        if !(speed.is_finite() && speed > 0.0) {
            warn!(speed, "Speed must be a positive number");
            return Err(PlayerError::UnsupportedOperation(format!(
                "invalid speed {}",
                speed
            )));
        }
        let speed = speed as f64;
        if inner.is_streaming() && (speed - 1.0).abs() >= SPEED_EPSILON {
            warn!(speed, "Setting speed is not supported on streaming sounds");
            return Err(PlayerError::UnsupportedOperation(
                "speed change on a streaming sound".to_string(),
            ));
        }
        inner.speed = speed;
        let relative_speed = inner.relative_speed();
        inner.voices.last_mut().set_relative_speed(relative_speed);
        Ok(())
    }

    pub fn set_loop(&self, looping: bool) {
        let mut inner = self.inner.lock();
        if inner.state.is_loaded() {
            inner.looping = looping;
        }
    }

    /// Allows overlapping voices. Turning it off cuts every voice but the first.
    pub fn set_multi_play(&self, multiplay: bool) -> Result<(), PlayerError> {
        let mut inner = self.inner.lock();
        if !inner.state.is_loaded() {
            return Ok(());
        }
        if multiplay && inner.is_streaming() {
            warn!("Multiplay is not supported on streaming sounds");
            return Err(PlayerError::UnsupportedOperation(
                "multiplay on a streaming sound".to_string(),
            ));
        }
        inner.multiplay = multiplay;
        if !multiplay {
            let dropped = inner.voices.truncate_to_primary();
            self.registry.release(dropped);
        }
        Ok(())
    }

    /// Moves the most recent voice to a fraction of the source length.
    pub fn set_position(&self, fraction: f32) {
        let mut inner = self.inner.lock();
        if !inner.state.is_loaded() {
            return;
        }
        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        let frame = fraction as f64 * inner.total_frames() as f64;
        inner.voices.last_mut().set_position(frame);
        if inner.is_streaming() {
            if let Some(source) = inner.source.as_mut() {
                source.seek(frame as u64);
            }
        }
    }

    pub fn set_position_ms(&self, ms: u64) {
        let duration_ms = self.duration_ms();
        if duration_ms == 0 {
            return;
        }
        self.set_position(ms as f32 / duration_ms as f32);
    }

    /// Sets how many overlapping voices this player may hold. Existing voices are kept.
    pub fn set_max_sounds(&self, max_sounds: usize) {
        self.inner.lock().max_sounds = max_sounds;
    }

    /// Adds an observer for rendered voice buffers.
    pub fn add_observer(&self, observer: Arc<dyn BufferObserver>) {
        self.inner.lock().observers.push(observer);
    }

    pub fn clear_observers(&self) {
        self.inner.lock().observers.clear();
    }

    pub fn state(&self) -> PlaybackState {
        self.inner.lock().state
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.lock().state.is_loaded()
    }

    pub fn is_playing(&self) -> bool {
        self.inner.lock().state.is_playing()
    }

    pub fn is_looping(&self) -> bool {
        let inner = self.inner.lock();
        inner.state.is_loaded() && inner.looping
    }

    pub fn is_multi_play(&self) -> bool {
        let inner = self.inner.lock();
        inner.state.is_loaded() && inner.multiplay
    }

    pub fn is_streaming(&self) -> bool {
        self.inner.lock().is_streaming()
    }

    /// Position of the most recent voice as a fraction of the source length.
    pub fn position(&self) -> f32 {
        let inner = self.inner.lock();
        let total = inner.total_frames();
        if !inner.state.is_loaded() || total == 0 {
            return 0.0;
        }
        (inner.voices.last().position() / total as f64) as f32
    }

    pub fn position_ms(&self) -> u64 {
        let inner = self.inner.lock();
        match &inner.source {
            Some(source) if source.info.sample_rate > 0 => {
                (inner.voices.last().position() * 1000.0 / source.info.sample_rate as f64) as u64
            }
            _ => 0,
        }
    }

    pub fn speed(&self) -> f32 {
        let inner = self.inner.lock();
        if inner.state.is_loaded() {
            inner.speed as f32
        } else {
            0.0
        }
    }

    pub fn pan(&self) -> f32 {
        let inner = self.inner.lock();
        if inner.state.is_loaded() {
            inner.pan
        } else {
            0.0
        }
    }

    pub fn volume(&self) -> f32 {
        self.inner.lock().volume
    }

    pub fn duration_ms(&self) -> u64 {
        self.inner
            .lock()
            .source
            .as_ref()
            .map_or(0, |source| source.info.duration_ms)
    }

    pub fn voice_count(&self) -> usize {
        self.inner.lock().voices.len()
    }

    pub fn max_sounds(&self) -> usize {
        self.inner.lock().max_sounds
    }

    pub fn source_info(&self) -> Option<SourceInfo> {
        self.inner.lock().source.as_ref().map(|source| source.info)
    }

    /// A copy of the last buffer rendered for a single voice, after panning.
    ///
    /// Returns `None` when the last pass took the single-voice fast path, which never fills
    /// the per-voice buffer. Adding an observer or changing the speed forces the per-voice path.
    pub fn last_rendered(&self) -> Option<SoundBuffer> {
        let inner = self.inner.lock();
        (inner.state.is_loaded() && inner.working_current).then(|| inner.working.clone())
    }
}
