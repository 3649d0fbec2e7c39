// Copyright 2025 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Sample aspect ratio indicators, Table E-1 of H.264. H.265 reuses the same
//! table for its `aspect_ratio_idc`.

use crate::error::ParseError;
use crate::error::ParseResult;

/// `aspect_ratio_idc` value signalling that `sar_width` and `sar_height`
/// follow in the bitstream.
pub const EXTENDED_SAR: u8 = 255;

const SAR_TABLE: [(u16, u16); 16] = [
    (1, 1),
    (12, 11),
    (10, 11),
    (16, 11),
    (40, 33),
    (24, 11),
    (20, 11),
    (32, 11),
    (80, 33),
    (18, 11),
    (15, 11),
    (64, 33),
    (160, 99),
    (4, 3),
    (3, 2),
    (2, 1),
];

/// Returns the `(width, height)` sample aspect ratio for `aspect_ratio_idc`.
///
/// Only the tabulated values 1 to 16 are accepted: 0 is "unspecified",
/// [`EXTENDED_SAR`] carries its ratio explicitly and everything else is
/// reserved.
pub fn sar_from_idc(aspect_ratio_idc: u8) -> ParseResult<(u16, u16)> {
    match aspect_ratio_idc {
        1..=16 => Ok(SAR_TABLE[usize::from(aspect_ratio_idc) - 1]),
        _ => Err(ParseError::UnknownAspectRatioIdc(aspect_ratio_idc)),
    }
}
