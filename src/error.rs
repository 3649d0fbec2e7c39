// Copyright 2025 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use thiserror::Error;

use crate::codec::h265::parser::NaluType;

/// Errors raised while decoding a parameter set.
///
/// Apart from `WrongUnitType`, these are latched on the [`BitReader`] that hit
/// them and reported together with whatever could be decoded up to that point.
///
/// [`BitReader`]: crate::bitstream_utils::BitReader
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("NALU type is {0:?}, not SPS")]
    WrongUnitType(NaluType),

    #[error("reader ran out of bits at position {position} ({requested} requested)")]
    Truncated { position: u64, requested: usize },

    #[error("malformed bitstream: {0}")]
    Malformed(String),

    #[error(
        "more than 16 short term reference pictures ({num_negative_pics} negative, {num_positive_pics} positive)"
    )]
    TooManyReferencePictures {
        num_negative_pics: u64,
        num_positive_pics: u64,
    },

    #[error("unknown aspect_ratio_idc {0}")]
    UnknownAspectRatioIdc(u8),
}

pub type ParseResult<T> = std::result::Result<T, ParseError>;
