// SPDX-FileCopyrightText: 2024 Keita Kita <maoutwo@gmail.com>
//
// SPDX-License-Identifier: MIT

//! This module has the function that called by the main function.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::Parser;
use log::{debug, error, info};
use thiserror::Error;

use crate::{
    format::{Bitrate, TargetFormat},
    job::ConversionOutcome,
    session::{
        FolderOpener, NullFolderOpener, Presenter, Session, StartError, Status,
        SystemFolderOpener,
    },
    transcoder::FfmpegTranscoder,
};

/// The struct for setting.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = "Convert an audio file to another format with FFmpeg."
)]
pub struct Setting {
    #[arg(
        required = true,
        value_name = "INPUT_FILE",
        value_parser = is_source_file_available,
        help = "An audio file to convert."
    )]
    input_file: PathBuf,

    #[arg(
        short,
        long,
        value_enum,
        default_value_t = TargetFormat::Mp3,
        help = "Output format."
    )]
    format: TargetFormat,

    #[arg(
        short,
        long,
        value_enum,
        default_value_t = Bitrate::High,
        help = "Audio quality: high (320k) or low (128k). Ignored for WAV and FLAC."
    )]
    quality: Bitrate,

    #[arg(
        short,
        long,
        value_name = "DIRECTORY",
        value_parser = is_destination_directory_or_not_found,
        help = "A directory that saving the converted file. The directory of the input file by default."
    )]
    output_directory: Option<PathBuf>,

    #[arg(
        long,
        value_name = "PATH",
        env = "AUDIO_CONVERTER_FFMPEG",
        help = "FFmpeg executable. Searched in PATH by default."
    )]
    ffmpeg: Option<PathBuf>,

    #[arg(long, help = "Do not open the output directory after conversion.")]
    no_open_folder: bool,
}

/// Error of convert_audio.
#[derive(Error, Debug)]
pub enum AudioConverterError {
    #[error("Conversion cannot be started: {0}")]
    CannotStart(StartError),

    #[error("Conversion is failed: {0}")]
    ConversionFailed(String),

    #[error("Conversion is not finished.")]
    NotFinished,
}

/// A [`Presenter`] that writes to the log.
pub struct LogPresenter;

impl Presenter for LogPresenter {
    fn show_status(&mut self, status: Status) {
        if status.is_error() {
            error!("{status}");
        } else {
            info!("{status}");
        }
    }

    fn show_input_file(&mut self, path: &Path) {
        let name = path.file_name().unwrap_or(path.as_os_str());

        info!("Selected: {}", name.to_string_lossy());
    }

    fn show_output_directory(&mut self, path: &Path) {
        info!("Save to: {}", path.display());
    }

    fn set_controls_enabled(&mut self, enabled: bool) {
        debug!("Controls enabled: {enabled}");
    }
}

fn is_destination_directory_or_not_found(argument: &str) -> Result<PathBuf, String> {
    let path = Path::new(argument);

    if path.is_dir() || !path.exists() {
        Ok(path.to_path_buf())
    } else {
        Err(format!(
            r#"The destination "{argument}" exists and is not a directory."#
        ))
    }
}

fn is_source_file_available(argument: &str) -> Result<PathBuf, String> {
    let path = Path::new(argument);

    if path.is_file() {
        Ok(path.to_path_buf())
    } else {
        Err(format!(r#"The file "{argument}" is not found."#))
    }
}

fn convert_audio_on_session(
    setting: &Setting,
    mut session: Session,
) -> Result<PathBuf, AudioConverterError> {
    info!(
        "Converts {:?} to {} ({}).",
        setting.input_file,
        setting.format,
        if setting.format.is_lossless() {
            "lossless"
        } else {
            setting.quality.as_str()
        }
    );

    session.set_format(setting.format);
    session.set_bitrate(setting.quality);
    session.select_input_file(Some(setting.input_file.clone()));
    session.select_output_directory(setting.output_directory.clone());

    session
        .start_conversion()
        .map_err(AudioConverterError::CannotStart)?;

    match session.wait_for_outcome() {
        Some(ConversionOutcome::Success(output_path)) => Ok(output_path),
        Some(ConversionOutcome::Failure(description)) => {
            Err(AudioConverterError::ConversionFailed(description))
        }
        None => Err(AudioConverterError::NotFinished),
    }
}

/// Converts the audio file in `setting`.
///
/// Returns the path of the converted file.
pub fn convert_audio(setting: &Setting) -> Result<PathBuf, AudioConverterError> {
    let folder_opener: Box<dyn FolderOpener> = if setting.no_open_folder {
        Box::new(NullFolderOpener)
    } else {
        Box::new(SystemFolderOpener)
    };

    let session = Session::new(
        Arc::new(FfmpegTranscoder::new(setting.ffmpeg.clone())),
        Box::new(LogPresenter),
        folder_opener,
    );

    convert_audio_on_session(setting, session)
}
