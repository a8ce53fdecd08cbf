// SPDX-FileCopyrightText: 2024 Keita Kita <maoutwo@gmail.com>
//
// SPDX-License-Identifier: MIT

use std::{path::PathBuf, process::ExitStatus};

use thiserror::Error;

/// Error about conversion.
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("No input file is selected.")]
    InputNotSelected,

    #[error("{path} is not a file.")]
    NotFile { path: PathBuf },

    #[error("The directory {path} cannot be created: {error}")]
    DirectoryCannotBeCreated {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("Command {command} is not found: {error}")]
    CommandNotFound {
        command: String,
        error: which::Error,
    },

    #[error("Command {command} is failed: {status}")]
    CommandFailed { command: String, status: ExitStatus },

    #[error("Command {command} cannot be executed: {error}")]
    CommandCannotExecuted {
        command: String,
        error: std::io::Error,
    },

    #[error("I/O error: {error}")]
    IoError { error: std::io::Error },

    #[error("Unknown error is occured.")]
    Unknown,
}
