// Copyright 2022 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Parsing of H.265 Sequence Parameter Sets.
//!
//! The entry point is [`codec::h265::parser::Parser::parse_sps`], which takes
//! a SPS NAL unit and returns everything that could be decoded from it along
//! with the first error met, if any.

pub mod bitstream_utils;
pub mod codec;
pub mod error;

pub use codec::h265::parser::parse_sps;
pub use codec::h265::parser::Decoded;
pub use codec::h265::parser::Parser;
pub use codec::h265::parser::ParserConfig;
pub use codec::h265::parser::Sps;
pub use error::ParseError;
pub use error::ParseResult;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}
