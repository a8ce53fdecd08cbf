// SPDX-FileCopyrightText: 2024 Keita Kita <maoutwo@gmail.com>
//
// SPDX-License-Identifier: MIT

//! A conversion job: from a request to an outcome.

use std::{
    env,
    ffi::OsString,
    fs::create_dir_all,
    panic::{self, AssertUnwindSafe},
    path::{Component, Path, PathBuf},
    sync::{mpsc::Sender, Arc},
    thread::{self, JoinHandle},
};

use log::{debug, error, info, warn};

use crate::{
    conversion_error::ConversionError,
    format::{self, Bitrate, TargetFormat},
    transcoder::Transcoder,
};

/// A transcoder shared with worker threads.
pub type SharedTranscoder = Arc<dyn Transcoder + Send + Sync>;

/// What to convert and how. Built once per conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    input_path: PathBuf,
    target_format: TargetFormat,
    target_bitrate: Bitrate,
    output_directory: Option<PathBuf>,
}

impl ConversionRequest {
    pub fn new<P: AsRef<Path>>(
        input_path: P,
        target_format: TargetFormat,
        target_bitrate: Bitrate,
    ) -> Self {
        ConversionRequest {
            input_path: input_path.as_ref().to_path_buf(),
            target_format,
            target_bitrate,
            output_directory: None,
        }
    }

    /// Saves the converted file in `output_directory` instead of next to the input.
    pub fn with_output_directory<P: AsRef<Path>>(mut self, output_directory: Option<P>) -> Self {
        self.output_directory = output_directory.map(|path| path.as_ref().to_path_buf());
        self
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn target_format(&self) -> TargetFormat {
        self.target_format
    }

    pub fn target_bitrate(&self) -> Bitrate {
        self.target_bitrate
    }

    pub fn output_directory(&self) -> Option<&Path> {
        self.output_directory.as_deref()
    }
}

/// Result of a conversion job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    /// The path of the converted file.
    Success(PathBuf),

    /// A description of the error.
    Failure(String),
}

impl ConversionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ConversionOutcome::Success(_))
    }
}

/// A message posted from a worker to the foreground.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    Finished(ConversionOutcome),
}

/// Makes `directory` absolute and removes `.` and `..`.
///
/// Existing directories are canonicalized. Others are resolved lexically.
fn normalize_directory(directory: &Path) -> PathBuf {
    let directory = if directory.as_os_str().is_empty() {
        Path::new(".")
    } else {
        directory
    };

    if let Ok(canonical) = directory.canonicalize() {
        return canonical;
    }

    let absolute = if directory.is_absolute() {
        directory.to_path_buf()
    } else {
        env::current_dir()
            .map(|current| current.join(directory))
            .unwrap_or_else(|_| directory.to_path_buf())
    };

    let mut normalized = PathBuf::new();

    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            component => normalized.push(component.as_os_str()),
        }
    }

    normalized
}

fn is_same_ignoring_case(path1: &Path, path2: &Path) -> bool {
    path1.to_string_lossy().to_lowercase() == path2.to_string_lossy().to_lowercase()
}

/// Whether `candidate` names the same file as `input_path`, ignoring case.
fn is_input_file(candidate: &Path, input_path: &Path) -> bool {
    let parent_of = |path: &Path| normalize_directory(path.parent().unwrap_or(Path::new("")));

    match (candidate.file_name(), input_path.file_name()) {
        (Some(candidate_name), Some(input_name)) => {
            is_same_ignoring_case(Path::new(candidate_name), Path::new(input_name))
                && is_same_ignoring_case(&parent_of(candidate), &parent_of(input_path))
        }
        _ => is_same_ignoring_case(candidate, input_path),
    }
}

/// Gets the path of the converted file.
///
/// The file is named after the stem of the input file. When that would
/// overwrite the input file, `_converted` is appended to the stem once.
pub fn output_path(request: &ConversionRequest) -> PathBuf {
    let input_path = request.input_path();
    let stem = input_path.file_stem().unwrap_or_default();
    let extension = request.target_format().extension();

    let destination_directory = request
        .output_directory()
        .or_else(|| input_path.parent())
        .unwrap_or(Path::new(""));

    let create_path = |suffix: &str| {
        let mut filename = OsString::from(stem);

        filename.push(suffix);
        filename.push(".");
        filename.push(extension);

        destination_directory.join(filename)
    };

    let candidate = create_path("");

    if is_input_file(&candidate, input_path) {
        create_path("_converted")
    } else {
        candidate
    }
}

fn convert(
    request: &ConversionRequest,
    transcoder: &dyn Transcoder,
) -> Result<PathBuf, ConversionError> {
    let input_path = request.input_path();

    if input_path.as_os_str().is_empty() {
        return Err(ConversionError::InputNotSelected);
    }

    if !input_path.is_file() {
        return Err(ConversionError::NotFile {
            path: input_path.to_path_buf(),
        });
    }

    let output_path = output_path(request);
    let parameters = format::resolve(request.target_format(), request.target_bitrate());

    if let Some(directory) = output_path.parent() {
        if !directory.as_os_str().is_empty() {
            create_dir_all(directory).map_err(|error| {
                ConversionError::DirectoryCannotBeCreated {
                    path: directory.to_path_buf(),
                    error,
                }
            })?;
        }
    }

    debug!(
        "Converts {input_path:?} to {output_path:?} with {:?}",
        parameters
    );

    transcoder.transcode(input_path, &output_path, &parameters)?;

    Ok(output_path)
}

/// Runs a conversion job and blocks until it finishes.
///
/// Errors never escape; they are logged and returned as [`ConversionOutcome::Failure`].
pub fn run(request: &ConversionRequest, transcoder: &dyn Transcoder) -> ConversionOutcome {
    match convert(request, transcoder) {
        Ok(output_path) => {
            info!("Converted to {output_path:?}.");

            ConversionOutcome::Success(output_path)
        }
        Err(error) => {
            error!("Conversion is failed. Detail: {error}");

            ConversionOutcome::Failure(error.to_string())
        }
    }
}

/// Runs a conversion job on a new worker thread.
///
/// Exactly one [`JobEvent::Finished`] is sent through `sender` when the job
/// finishes, even if the worker panics.
pub fn dispatch(
    request: ConversionRequest,
    transcoder: SharedTranscoder,
    sender: Sender<JobEvent>,
) -> Result<JoinHandle<()>, ConversionError> {
    thread::Builder::new()
        .name("conversion".to_owned())
        .spawn(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                run(&request, transcoder.as_ref())
            }))
            .unwrap_or_else(|_| {
                error!("Conversion of {:?} panicked.", request.input_path());

                ConversionOutcome::Failure(ConversionError::Unknown.to_string())
            });

            if sender.send(JobEvent::Finished(outcome)).is_err() {
                warn!("Nobody receives the result of the conversion.");
            }
        })
        .map_err(|error| ConversionError::IoError { error })
}
