// SPDX-FileCopyrightText: 2024 Keita Kita <maoutwo@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Helpers for running external commands.

use std::{ffi::OsStr, process::Command};

use log::debug;
use which::which;

use crate::conversion_error::ConversionError;

/// Creates a [`Command`] for `command`.
///
/// `command` is either a bare name looked up in `PATH` or a path to an executable.
pub fn get_command<S: AsRef<OsStr>>(command: S) -> Result<Command, ConversionError> {
    let command = command.as_ref();

    match which(command) {
        Ok(command_path) => Ok(Command::new(command_path)),

        Err(error) => Err(ConversionError::CommandNotFound {
            command: command.to_string_lossy().into_owned(),
            error,
        }),
    }
}

pub fn run_command(command: &mut Command, command_name: &str) -> Result<(), ConversionError> {
    debug!("Run: {command:?}");

    let result = command.status();

    match result {
        Ok(exit_status) => {
            if exit_status.success() {
                Ok(())
            } else {
                Err(ConversionError::CommandFailed {
                    command: command_name.to_string(),
                    status: exit_status,
                })
            }
        }
        Err(error) => Err(ConversionError::CommandCannotExecuted {
            command: command_name.to_string(),
            error,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_command_is_not_found() {
        let error = get_command("simple-audio-converter-no-such-command").unwrap_err();

        assert!(matches!(
            error,
            ConversionError::CommandNotFound { command, .. }
            if command == "simple-audio-converter-no-such-command"
        ));
    }

    #[cfg(unix)]
    #[test]
    fn failed_command_is_reported() {
        let mut command = get_command("false").unwrap();

        let error = run_command(&mut command, "false").unwrap_err();

        assert!(matches!(
            error,
            ConversionError::CommandFailed { command, status }
            if command == "false" && !status.success()
        ));
    }

    #[cfg(unix)]
    #[test]
    fn successful_command() {
        let mut command = get_command("true").unwrap();

        assert!(run_command(&mut command, "true").is_ok());
    }
}
