// SPDX-FileCopyrightText: 2024 Keita Kita <maoutwo@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Output formats and how they map onto encoder parameters.

use std::fmt;

use clap::ValueEnum;

/// An output audio format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
pub enum TargetFormat {
    #[default]
    Mp3,
    Wav,
    Flac,
    Ogg,
    M4a,
    Wma,
}

impl TargetFormat {
    pub const ALL: [TargetFormat; 6] = [
        TargetFormat::Mp3,
        TargetFormat::Wav,
        TargetFormat::Flac,
        TargetFormat::Ogg,
        TargetFormat::M4a,
        TargetFormat::Wma,
    ];

    /// The file extension without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            TargetFormat::Mp3 => "mp3",
            TargetFormat::Wav => "wav",
            TargetFormat::Flac => "flac",
            TargetFormat::Ogg => "ogg",
            TargetFormat::M4a => "m4a",
            TargetFormat::Wma => "wma",
        }
    }

    /// The FFmpeg encoder name.
    pub fn codec_id(self) -> &'static str {
        match self {
            TargetFormat::Mp3 => "libmp3lame",
            TargetFormat::Wav => "pcm_s16le",
            TargetFormat::Flac => "flac",
            TargetFormat::Ogg => "libvorbis",
            TargetFormat::M4a => "aac",
            TargetFormat::Wma => "wmav2",
        }
    }

    pub fn is_lossless(self) -> bool {
        matches!(self, TargetFormat::Wav | TargetFormat::Flac)
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Encoding quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
pub enum Bitrate {
    /// 320 kbit/s.
    #[default]
    High,
    /// 128 kbit/s.
    Low,
}

impl Bitrate {
    pub fn as_str(self) -> &'static str {
        match self {
            Bitrate::High => "320k",
            Bitrate::Low => "128k",
        }
    }
}

impl fmt::Display for Bitrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters passed to the transcoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderParameters {
    pub codec_id: &'static str,

    /// `None` for lossless formats.
    pub bitrate: Option<&'static str>,
}

/// Resolves the encoder parameters for a format.
///
/// The requested bitrate is dropped for lossless formats.
pub fn resolve(target_format: TargetFormat, target_bitrate: Bitrate) -> EncoderParameters {
    EncoderParameters {
        codec_id: target_format.codec_id(),
        bitrate: (!target_format.is_lossless()).then(|| target_bitrate.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_format_has_codec() {
        for format in TargetFormat::ALL {
            assert!(!resolve(format, Bitrate::High).codec_id.is_empty());
        }
    }

    #[test]
    fn lossless_formats_ignore_bitrate() {
        for format in [TargetFormat::Wav, TargetFormat::Flac] {
            assert_eq!(None, resolve(format, Bitrate::High).bitrate);
            assert_eq!(None, resolve(format, Bitrate::Low).bitrate);
        }
    }

    #[test]
    fn lossy_formats_pass_bitrate_through() {
        for format in [
            TargetFormat::Mp3,
            TargetFormat::Ogg,
            TargetFormat::M4a,
            TargetFormat::Wma,
        ] {
            assert_eq!(Some("320k"), resolve(format, Bitrate::High).bitrate);
            assert_eq!(Some("128k"), resolve(format, Bitrate::Low).bitrate);
        }
    }

    #[test]
    fn codec_for_mp3() {
        assert_eq!(
            EncoderParameters {
                codec_id: "libmp3lame",
                bitrate: Some("128k"),
            },
            resolve(TargetFormat::Mp3, Bitrate::Low)
        );
    }

    #[test]
    fn codec_for_wav() {
        assert_eq!("pcm_s16le", resolve(TargetFormat::Wav, Bitrate::High).codec_id);
    }

    #[test]
    fn format_parsed_case_insensitively() {
        assert_eq!(
            TargetFormat::M4a,
            TargetFormat::from_str("M4A", true).unwrap()
        );
        assert!(TargetFormat::from_str("aiff", true).is_err());
    }
}
