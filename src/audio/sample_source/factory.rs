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

use super::audio::AudioSampleSource;
use super::error::SampleSourceError;
use super::traits::{SampleSource, SourceInfo};

/// Create a SampleSource from a file, automatically detecting the file type
pub fn create_sample_source_from_file<P: AsRef<Path>>(
    path: P,
) -> Result<Box<dyn SampleSource>, SampleSourceError> {
    let audio_source = AudioSampleSource::from_file(path.as_ref())?;
    Ok(Box::new(audio_source))
}

/// Opens a file just long enough to read its metadata.
pub fn probe_file<P: AsRef<Path>>(path: P) -> Result<SourceInfo, SampleSourceError> {
    let source = AudioSampleSource::from_file(path.as_ref())?;
    Ok(source.info())
}
