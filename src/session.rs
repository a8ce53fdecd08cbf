// SPDX-FileCopyrightText: 2024 Keita Kita <maoutwo@gmail.com>
//
// SPDX-License-Identifier: MIT

//! The foreground side of the converter.
//!
//! [`Session`] holds what the user selected and whether a job is running.
//! It is owned by the foreground thread, which is the only one that changes
//! interface state. Workers report back through a channel.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::mpsc::{channel, Receiver, TryRecvError},
};

use anyhow::Context;
use log::{debug, error, warn};
use thiserror::Error;

use crate::{
    command,
    conversion_error::ConversionError,
    format::{Bitrate, TargetFormat},
    job::{self, ConversionOutcome, ConversionRequest, JobEvent, SharedTranscoder},
};

/// Whether a conversion job is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobState {
    #[default]
    Idle,
    Running,
}

/// The status shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ready,
    FileLoaded,
    NoFileSelected,
    Converting,
    Succeeded,
    Failed,
}

impl Status {
    pub fn message(self) -> &'static str {
        match self {
            Status::Ready => "Ready",
            Status::FileLoaded => "File Loaded",
            Status::NoFileSelected => "Please select a file first",
            Status::Converting => "Converting...",
            Status::Succeeded => "Successfully Converted!",
            Status::Failed => "Conversion Failed",
        }
    }

    pub fn is_error(self) -> bool {
        matches!(self, Status::NoFileSelected | Status::Failed)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Shows the state of a [`Session`] to the user.
#[cfg_attr(test, mockall::automock)]
pub trait Presenter {
    fn show_status(&mut self, status: Status);

    fn show_input_file(&mut self, path: &Path);

    fn show_output_directory(&mut self, path: &Path);

    /// Enables or disables the convert and file selection controls.
    fn set_controls_enabled(&mut self, enabled: bool);
}

/// Opens a directory in the file manager.
#[cfg_attr(test, mockall::automock)]
pub trait FolderOpener {
    fn open(&self, directory: &Path) -> anyhow::Result<()>;
}

#[cfg(target_os = "windows")]
const FILE_MANAGER: &str = "explorer";

#[cfg(target_os = "macos")]
const FILE_MANAGER: &str = "open";

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const FILE_MANAGER: &str = "xdg-open";

/// A [`FolderOpener`] with the file manager of the platform.
pub struct SystemFolderOpener;

impl FolderOpener for SystemFolderOpener {
    fn open(&self, directory: &Path) -> anyhow::Result<()> {
        let mut file_manager = command::get_command(FILE_MANAGER)?;
        let command = file_manager.arg(directory);

        // explorer exits with 1 even when the window is opened.
        if cfg!(target_os = "windows") {
            command
                .spawn()
                .map(|_| ())
                .with_context(|| format!("{FILE_MANAGER} cannot be executed"))
        } else {
            command::run_command(command, FILE_MANAGER)?;

            Ok(())
        }
    }
}

/// A [`FolderOpener`] that opens nothing.
pub struct NullFolderOpener;

impl FolderOpener for NullFolderOpener {
    fn open(&self, _: &Path) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Error of [`Session::start_conversion`].
#[derive(Error, Debug)]
pub enum StartError {
    #[error("No file is selected.")]
    NoFileSelected,

    #[error("A conversion is already running.")]
    AlreadyRunning,

    #[error("The conversion cannot be started: {0}")]
    CannotDispatch(ConversionError),
}

pub struct Session {
    input_path: Option<PathBuf>,
    output_directory: Option<PathBuf>,
    target_format: TargetFormat,
    target_bitrate: Bitrate,
    state: JobState,
    transcoder: SharedTranscoder,
    presenter: Box<dyn Presenter>,
    folder_opener: Box<dyn FolderOpener>,

    /// Receives from the worker of the running job. Only the worker holds the sender.
    receiver: Option<Receiver<JobEvent>>,
}

impl Session {
    pub fn new(
        transcoder: SharedTranscoder,
        mut presenter: Box<dyn Presenter>,
        folder_opener: Box<dyn FolderOpener>,
    ) -> Self {
        presenter.show_status(Status::Ready);

        Session {
            input_path: None,
            output_directory: None,
            target_format: TargetFormat::default(),
            target_bitrate: Bitrate::default(),
            state: JobState::Idle,
            transcoder,
            presenter,
            folder_opener,
            receiver: None,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn input_path(&self) -> Option<&Path> {
        self.input_path.as_deref()
    }

    pub fn output_directory(&self) -> Option<&Path> {
        self.output_directory.as_deref()
    }

    pub fn target_format(&self) -> TargetFormat {
        self.target_format
    }

    pub fn target_bitrate(&self) -> Bitrate {
        self.target_bitrate
    }

    /// Selects the file to convert.
    ///
    /// `None` means the selection was cancelled and keeps the previous file.
    /// Ignored while a job is running.
    pub fn select_input_file(&mut self, path: Option<PathBuf>) {
        let Some(path) = path else {
            return;
        };

        if self.state == JobState::Running {
            debug!("Input file is not changed while converting.");
            return;
        }

        self.presenter.show_input_file(&path);
        self.presenter.show_status(Status::FileLoaded);
        self.input_path = Some(path);
    }

    /// Selects the directory where converted files are saved.
    ///
    /// `None` means the selection was cancelled and keeps the previous directory.
    pub fn select_output_directory(&mut self, path: Option<PathBuf>) {
        if let Some(path) = path {
            self.presenter.show_output_directory(&path);
            self.output_directory = Some(path);
        }
    }

    pub fn set_format(&mut self, target_format: TargetFormat) {
        self.target_format = target_format;
    }

    pub fn set_bitrate(&mut self, target_bitrate: Bitrate) {
        self.target_bitrate = target_bitrate;
    }

    fn create_request(&self) -> Option<ConversionRequest> {
        self.input_path.as_ref().map(|input_path| {
            ConversionRequest::new(input_path, self.target_format, self.target_bitrate)
                .with_output_directory(self.output_directory.as_ref())
        })
    }

    /// Starts converting the selected file on a worker thread.
    pub fn start_conversion(&mut self) -> Result<(), StartError> {
        if self.state == JobState::Running {
            return Err(StartError::AlreadyRunning);
        }

        let Some(request) = self.create_request() else {
            self.presenter.show_status(Status::NoFileSelected);
            return Err(StartError::NoFileSelected);
        };

        debug!("Starts conversion: {request:?}");

        self.state = JobState::Running;
        self.presenter.show_status(Status::Converting);
        self.presenter.set_controls_enabled(false);

        let (sender, receiver) = channel();

        match job::dispatch(request, self.transcoder.clone(), sender) {
            Ok(_) => {
                self.receiver = Some(receiver);

                Ok(())
            }
            Err(error) => {
                self.finish(ConversionOutcome::Failure(error.to_string()));

                Err(StartError::CannotDispatch(error))
            }
        }
    }

    fn finish(&mut self, outcome: ConversionOutcome) {
        match &outcome {
            ConversionOutcome::Success(output_path) => {
                self.presenter.show_status(Status::Succeeded);

                let directory = containing_directory(output_path);

                if let Err(error) = self.folder_opener.open(directory) {
                    warn!("{directory:?} cannot be opened. Detail: {error:#}");
                }
            }
            ConversionOutcome::Failure(_) => {
                self.presenter.show_status(Status::Failed);
            }
        }

        self.state = JobState::Idle;
        self.presenter.set_controls_enabled(true);
    }

    /// Applies a message from a worker.
    ///
    /// Returns the outcome of the finished job, or `None` when no job was running.
    pub fn handle_event(&mut self, event: JobEvent) -> Option<ConversionOutcome> {
        match event {
            JobEvent::Finished(outcome) => {
                if self.state != JobState::Running {
                    warn!("Ignores a result without a running conversion: {outcome:?}");
                    return None;
                }

                self.finish(outcome.clone());

                Some(outcome)
            }
        }
    }

    /// Fails the running job whose worker has gone without a result.
    fn abandon_job(&mut self) -> Option<ConversionOutcome> {
        self.receiver = None;

        if self.state != JobState::Running {
            return None;
        }

        error!("The conversion worker stopped without a result.");

        let outcome = ConversionOutcome::Failure(ConversionError::Unknown.to_string());

        self.finish(outcome.clone());

        Some(outcome)
    }

    /// Handles the messages that have arrived, without blocking.
    pub fn poll_events(&mut self) -> Vec<ConversionOutcome> {
        let Some(receiver) = &self.receiver else {
            return Vec::new();
        };

        let mut events = Vec::new();
        let is_disconnected = loop {
            match receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) => break false,
                Err(TryRecvError::Disconnected) => break true,
            }
        };

        let mut outcomes: Vec<_> = events
            .into_iter()
            .filter_map(|event| self.handle_event(event))
            .collect();

        if is_disconnected {
            outcomes.extend(self.abandon_job());
        }

        outcomes
    }

    /// Blocks until the running job finishes.
    ///
    /// Returns `None` immediately when no job is running. A worker that stops
    /// without a result yields a failure.
    pub fn wait_for_outcome(&mut self) -> Option<ConversionOutcome> {
        while self.state == JobState::Running {
            let event = match &self.receiver {
                Some(receiver) => receiver.recv().ok(),
                None => None,
            };

            let Some(event) = event else {
                return self.abandon_job();
            };

            if let Some(outcome) = self.handle_event(event) {
                return Some(outcome);
            }
        }

        None
    }
}

/// The directory to open after a conversion. A bare file name is in the current directory.
fn containing_directory(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}
