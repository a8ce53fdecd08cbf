// SPDX-FileCopyrightText: 2024 Keita Kita <maoutwo@gmail.com>
//
// SPDX-License-Identifier: MIT

//! The external transcoder.

use std::{
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
};

use crate::{command, conversion_error::ConversionError, format::EncoderParameters};

/// Decodes `input_file` and encodes it into `output_file`.
///
/// Blocks until the output file is written or an error occurs.
#[cfg_attr(test, mockall::automock)]
pub trait Transcoder {
    fn transcode(
        &self,
        input_file: &Path,
        output_file: &Path,
        parameters: &EncoderParameters,
    ) -> Result<(), ConversionError>;
}

/// A [`Transcoder`] backed by the FFmpeg command.
pub struct FfmpegTranscoder {
    executable: PathBuf,
}

impl FfmpegTranscoder {
    pub const COMMAND_NAME: &'static str = "ffmpeg";

    /// Sample rate of the encoded audio.
    pub const SAMPLE_RATE: u32 = 44100;

    /// Uses `executable`, or `ffmpeg` in `PATH` when it is `None`.
    pub fn new(executable: Option<PathBuf>) -> Self {
        FfmpegTranscoder {
            executable: executable.unwrap_or_else(|| PathBuf::from(Self::COMMAND_NAME)),
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        FfmpegTranscoder::new(None)
    }
}

fn build_arguments(
    input_file: &Path,
    output_file: &Path,
    parameters: &EncoderParameters,
) -> Vec<OsString> {
    let mut arguments: Vec<OsString> = ["-y", "-loglevel", "error", "-i"]
        .iter()
        .map(OsString::from)
        .collect();

    arguments.push(input_file.into());
    arguments.extend(
        ["-vn", "-acodec", parameters.codec_id, "-ar"]
            .iter()
            .map(OsString::from),
    );
    arguments.push(FfmpegTranscoder::SAMPLE_RATE.to_string().into());

    if let Some(bitrate) = parameters.bitrate {
        arguments.push("-b:a".into());
        arguments.push(bitrate.into());
    }

    arguments.push(output_file.into());

    arguments
}

/// Creates an empty file next to `output_file` with the same extension.
///
/// FFmpeg chooses the container from the extension.
fn create_staging_file(output_file: &Path) -> Result<tempfile::TempPath, ConversionError> {
    let directory = match output_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let suffix = {
        let mut suffix = OsString::from(".");

        suffix.push(output_file.extension().unwrap_or(OsStr::new("")));

        suffix
    };

    tempfile::Builder::new()
        .prefix(".converting-")
        .suffix(&suffix)
        .tempfile_in(directory)
        .map(|file| file.into_temp_path())
        .map_err(|error| ConversionError::IoError { error })
}

impl Transcoder for FfmpegTranscoder {
    fn transcode(
        &self,
        input_file: &Path,
        output_file: &Path,
        parameters: &EncoderParameters,
    ) -> Result<(), ConversionError> {
        let mut ffmpeg = command::get_command(&self.executable)?;

        // Removed on drop unless persisted.
        let staging_file = create_staging_file(output_file)?;

        let command = ffmpeg.args(build_arguments(input_file, &staging_file, parameters));

        command::run_command(command, Self::COMMAND_NAME)?;

        staging_file
            .persist(output_file)
            .map_err(|error| ConversionError::IoError { error: error.error })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::format::{resolve, Bitrate, TargetFormat};

    fn arguments_as_strings(arguments: &[OsString]) -> Vec<&str> {
        arguments
            .iter()
            .map(|argument| argument.to_str().unwrap())
            .collect()
    }

    #[test]
    fn arguments_for_lossy_format() {
        let arguments = build_arguments(
            Path::new("in.wav"),
            Path::new("out.mp3"),
            &resolve(TargetFormat::Mp3, Bitrate::High),
        );

        assert_eq!(
            vec![
                "-y",
                "-loglevel",
                "error",
                "-i",
                "in.wav",
                "-vn",
                "-acodec",
                "libmp3lame",
                "-ar",
                "44100",
                "-b:a",
                "320k",
                "out.mp3"
            ],
            arguments_as_strings(&arguments)
        );
    }

    #[test]
    fn arguments_for_lossless_format_have_no_bitrate() {
        let arguments = build_arguments(
            Path::new("in.mp3"),
            Path::new("out.flac"),
            &resolve(TargetFormat::Flac, Bitrate::Low),
        );
        let arguments = arguments_as_strings(&arguments);

        assert!(!arguments.contains(&"-b:a"));
        assert!(!arguments.contains(&"128k"));
        assert_eq!(Some(&"out.flac"), arguments.last());
    }

    #[test]
    fn staging_file_keeps_extension() {
        let directory = tempfile::tempdir().unwrap();
        let output_file = directory.path().join("song.m4a");

        let staging_file = create_staging_file(&output_file).unwrap();

        assert_eq!(Some(OsStr::new("m4a")), staging_file.extension());
        assert_eq!(Some(directory.path()), staging_file.parent());
        assert!(staging_file.is_file());
    }

    #[test]
    fn staging_file_is_removed_on_drop() {
        let directory = tempfile::tempdir().unwrap();

        let staging_path = {
            let staging_file = create_staging_file(&directory.path().join("song.ogg")).unwrap();

            staging_file.to_path_buf()
        };

        assert!(!staging_path.exists());
    }

    #[test]
    fn missing_executable_is_reported() {
        let directory = tempfile::tempdir().unwrap();
        let transcoder =
            FfmpegTranscoder::new(Some(directory.path().join("no-such-ffmpeg-binary")));

        let error = transcoder
            .transcode(
                Path::new("in.wav"),
                &directory.path().join("out.mp3"),
                &resolve(TargetFormat::Mp3, Bitrate::High),
            )
            .unwrap_err();

        assert!(matches!(error, ConversionError::CommandNotFound { .. }));
        assert!(!directory.path().join("out.mp3").exists());
    }

    #[test]
    fn default_executable_is_ffmpeg() {
        assert_eq!(Path::new("ffmpeg"), FfmpegTranscoder::default().executable());
    }
}
