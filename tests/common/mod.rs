use std::{
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use anyhow::{bail, Result};
use lofty::{file::FileType, probe::Probe};
use walkdir::WalkDir;
use which::which;

/// Whether FFmpeg can encode with `codec`.
pub fn is_encoder_available(codec: &str) -> bool {
    let Ok(ffmpeg) = which("ffmpeg") else {
        return false;
    };

    let Ok(output) = Command::new(ffmpeg)
        .args(["-hide_banner", "-encoders"])
        .stderr(Stdio::null())
        .output()
    else {
        return false;
    };

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .any(|line| line.split_whitespace().nth(1) == Some(codec))
}

/// Writes a one second sine wave as a WAV file.
pub fn create_test_wav(directory: &Path, filename: &str) -> Result<PathBuf> {
    let path = directory.join(filename);

    let status = Command::new(which("ffmpeg")?)
        .args([
            "-y",
            "-loglevel",
            "error",
            "-f",
            "lavfi",
            "-i",
            "sine=frequency=440:duration=1",
        ])
        .arg(&path)
        .status()?;

    if !status.success() {
        bail!("Test WAV file cannot be created: {status}");
    }

    Ok(path)
}

pub fn get_file_type(path: &Path) -> Result<Option<FileType>> {
    let probe = Probe::open(path)?.guess_file_type()?;

    Ok(probe.file_type())
}

/// All files under `directory`.
pub fn list_files(directory: &Path) -> Vec<PathBuf> {
    WalkDir::new(directory)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect()
}
