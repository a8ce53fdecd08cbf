// SPDX-FileCopyrightText: 2024 Keita Kita <maoutwo@gmail.com>
//
// SPDX-License-Identifier: MIT

use std::process::exit;

use clap::Parser;

use env_logger::Env;
use log::error;
use simple_audio_converter::audio_converter::{convert_audio, AudioConverterError, Setting};

fn initialize_logging() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_target(false)
        .format_timestamp(None)
        .init();
}

fn main() {
    initialize_logging();

    let result = convert_audio(&Setting::parse());

    if let Err(error) = result {
        match error {
            // The cause is already logged by the conversion job.
            AudioConverterError::ConversionFailed(_) => {}
            error => error!("{error}"),
        }

        exit(1);
    }
}
