// SPDX-FileCopyrightText: 2024 Keita Kita <maoutwo@gmail.com>
//
// SPDX-License-Identifier: MIT

pub mod audio_converter;
pub mod command;
pub mod conversion_error;
pub mod format;
pub mod job;
pub mod session;
pub mod transcoder;
