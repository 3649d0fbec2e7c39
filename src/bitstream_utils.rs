// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::borrow::Cow;
#[cfg(test)]
use std::io::Write;

use crate::error::ParseError;

/// Longest run of leading zero bits accepted in front of an Exp-Golomb code.
const MAX_EXP_GOLOMB_LEADING_ZEROS: u32 = 32;

/// Removes the emulation prevention bytes (the `0x03` in every `0x000003`
/// sequence) from an EBSP, turning it into an RBSP. The input is borrowed back
/// untouched if it contains none.
pub fn strip_emulation_prevention(data: &[u8]) -> Cow<'_, [u8]> {
    let mut rbsp: Option<Vec<u8>> = None;
    let mut num_zeros = 0;

    for (i, &byte) in data.iter().enumerate() {
        if num_zeros >= 2 && byte == 0x03 {
            // We found an epb. We need another 2 zero bytes before another one
            // can happen.
            rbsp.get_or_insert_with(|| data[..i].to_vec());
            num_zeros = 0;
            continue;
        }

        num_zeros = if byte == 0 { num_zeros + 1 } else { 0 };
        if let Some(rbsp) = rbsp.as_mut() {
            rbsp.push(byte);
        }
    }

    match rbsp {
        Some(rbsp) => Cow::Owned(rbsp),
        None => Cow::Borrowed(data),
    }
}

/// A bit reader for parameter set payloads.
///
/// Instead of returning a `Result` from every read, the reader latches the
/// first error it runs into. From then on every read returns zero and leaves
/// the position untouched, so a parser can walk a whole syntax structure and
/// only look at [`BitReader::status`] at the points where it matters.
#[derive(Clone, Debug)]
pub struct BitReader<'a> {
    /// The RBSP being read.
    data: Cow<'a, [u8]>,
    /// How many bits have been read so far.
    position: u64,
    /// Number of emulation prevention bytes (i.e. 0x000003) removed from the
    /// input.
    num_epb: usize,
    /// The first error encountered, if any.
    error: Option<ParseError>,
}

impl<'a> BitReader<'a> {
    /// Creates a reader over `data`. If `needs_epb` is set, `data` is an EBSP
    /// and its emulation prevention bytes are removed before reading.
    pub fn new(data: &'a [u8], needs_epb: bool) -> Self {
        let (data, num_epb) = if needs_epb {
            let rbsp = strip_emulation_prevention(data);
            let num_epb = data.len() - rbsp.len();
            (rbsp, num_epb)
        } else {
            (Cow::Borrowed(data), 0)
        };

        Self {
            data,
            position: 0,
            num_epb,
            error: None,
        }
    }

    /// Read a single bit from the stream.
    pub fn read_bit(&mut self) -> bool {
        self.read_raw(1) == 1
    }

    /// Read up to 64 bits from the stream, most significant bit first.
    ///
    /// A value that does not fit into `U` latches a `Malformed` error and
    /// yields `U::default()`.
    pub fn read_bits<U: TryFrom<u64> + Default>(&mut self, num_bits: usize) -> U {
        let value = self.read_raw(num_bits);
        self.convert(value)
    }

    /// Skip `num_bits` bits from the stream.
    pub fn skip_bits(&mut self, mut num_bits: usize) {
        while num_bits > 0 && self.error.is_none() {
            let n = std::cmp::min(num_bits, 64);
            self.read_raw(n);
            num_bits -= n;
        }
    }

    /// Reads an unsigned Exponential-Golomb coded number. See H.265 clause
    /// 9.2 for details.
    pub fn read_ue<U: TryFrom<u64> + Default>(&mut self) -> U {
        let mut leading_zeros = 0;

        loop {
            let bit = self.read_raw(1);
            if self.error.is_some() {
                return U::default();
            }

            if bit == 1 {
                break;
            }

            leading_zeros += 1;
            if leading_zeros > MAX_EXP_GOLOMB_LEADING_ZEROS {
                self.set_error(ParseError::Malformed(format!(
                    "Exp-Golomb prefix longer than {} bits",
                    MAX_EXP_GOLOMB_LEADING_ZEROS
                )));
                return U::default();
            }
        }

        let suffix = self.read_raw(leading_zeros as usize);
        if self.error.is_some() {
            return U::default();
        }

        self.convert((1u64 << leading_zeros) - 1 + suffix)
    }

    /// Latches `err` unless an error has already been latched.
    pub fn set_error(&mut self, err: ParseError) {
        if self.error.is_none() {
            log::debug!("Bitstream error at bit {}: {}", self.position, err);
            self.error = Some(err);
        }
    }

    /// Returns the first error encountered so far, if any.
    pub fn status(&self) -> Option<&ParseError> {
        self.error.as_ref()
    }

    pub fn has_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Consumes the reader, returning the first error it encountered.
    pub fn into_status(self) -> Option<ParseError> {
        self.error
    }

    /// Return the position of this bitstream in bits.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Returns the amount of bits left in the stream.
    pub fn num_bits_left(&self) -> u64 {
        self.data.len() as u64 * 8 - self.position
    }

    /// Returns the number of emulation prevention bytes removed from the input.
    pub fn num_epb(&self) -> usize {
        self.num_epb
    }

    fn read_raw(&mut self, num_bits: usize) -> u64 {
        if self.error.is_some() || num_bits == 0 {
            return 0;
        }

        if num_bits > 64 {
            self.set_error(ParseError::Malformed(format!(
                "more than 64 ({}) bits were requested",
                num_bits
            )));
            return 0;
        }

        if num_bits as u64 > self.num_bits_left() {
            self.set_error(ParseError::Truncated {
                position: self.position,
                requested: num_bits,
            });
            return 0;
        }

        let mut bits_left = num_bits;
        let mut out = 0u64;

        while bits_left > 0 {
            let curr_byte = self.data[(self.position / 8) as usize];
            let num_remaining_bits_in_curr_byte = 8 - (self.position % 8) as usize;
            let n = std::cmp::min(num_remaining_bits_in_curr_byte, bits_left);

            let bits = (curr_byte >> (num_remaining_bits_in_curr_byte - n)) as u64
                & ((1u64 << n) - 1);
            out = (out << n) | bits;

            bits_left -= n;
            self.position += n as u64;
        }

        out
    }

    fn convert<U: TryFrom<u64> + Default>(&mut self, value: u64) -> U {
        match U::try_from(value) {
            Ok(value) => value,
            Err(_) => {
                self.set_error(ParseError::Malformed(format!(
                    "value {} does not fit the syntax element",
                    value
                )));
                U::default()
            }
        }
    }
}

#[cfg(test)]
#[derive(Debug)]
pub(crate) enum BitWriterError {
    InvalidBitCount,
    Io(std::io::Error),
}

#[cfg(test)]
impl From<std::io::Error> for BitWriterError {
    fn from(err: std::io::Error) -> Self {
        BitWriterError::Io(err)
    }
}

#[cfg(test)]
pub(crate) type BitWriterResult<T> = std::result::Result<T, BitWriterError>;

/// Reference encoder used to synthesize bitstreams in tests.
#[cfg(test)]
pub(crate) struct BitWriter<W: Write> {
    out: W,
    nth_bit: u8,
    curr_byte: u8,
}

#[cfg(test)]
impl<W: Write> BitWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            out: writer,
            curr_byte: 0,
            nth_bit: 0,
        }
    }

    /// Writes fixed bit size integer (up to 64 bit)
    pub fn write_f<T: Into<u64>>(&mut self, bits: usize, value: T) -> BitWriterResult<usize> {
        let value = value.into();

        if bits > 64 {
            return Err(BitWriterError::InvalidBitCount);
        }

        for bit in (0..bits).rev() {
            self.write_bit((value >> bit) & 1 == 1)?;
        }

        Ok(bits)
    }

    /// Writes an unsigned Exp-Golomb code.
    pub fn write_ue<T: Into<u64>>(&mut self, value: T) -> BitWriterResult<usize> {
        let value = value.into() + 1;
        let len = (64 - value.leading_zeros()) as usize;

        Ok(self.write_f(len - 1, 0u64)? + self.write_f(len, value)?)
    }

    /// Takes a single bit that will be outputed to [`std::io::Write`]
    pub fn write_bit(&mut self, bit: bool) -> BitWriterResult<()> {
        self.curr_byte |= (bit as u8) << (7u8 - self.nth_bit);
        self.nth_bit += 1;

        if self.nth_bit == 8 {
            self.out.write_all(&[self.curr_byte])?;
            self.nth_bit = 0;
            self.curr_byte = 0;
        }

        Ok(())
    }

    /// Immediately outputs any cached bits to [`std::io::Write`]
    pub fn flush(&mut self) -> BitWriterResult<()> {
        if self.nth_bit != 0 {
            self.out.write_all(&[self.curr_byte])?;
            self.nth_bit = 0;
            self.curr_byte = 0;
        }

        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
impl<W: Write> Drop for BitWriter<W> {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            log::error!("Unable to flush bits {e:?}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitwriter_f3() {
        let mut buf = Vec::<u8>::new();
        {
            let mut writer = BitWriter::new(&mut buf);
            writer.write_f(3, 0b100u8).unwrap();
            writer.write_f(3, 0b101u8).unwrap();
            writer.write_f(3, 0b011u8).unwrap();
        }
        assert_eq!(buf, vec![0b10010101u8, 0b10000000u8]);
    }

    // Adapted from the chromium tests at media/video/h264_bit_reader_unitttest.cc

    #[test]
    fn read_stream_without_escape_and_trailing_zero_bytes() {
        const RBSP: [u8; 6] = [0x01, 0x23, 0x45, 0x67, 0x89, 0xa0];

        let mut reader = BitReader::new(&RBSP, true);
        assert_eq!(reader.read_bits::<u32>(1), 0);
        assert_eq!(reader.num_bits_left(), 47);

        assert_eq!(reader.read_bits::<u32>(8), 0x02);
        assert_eq!(reader.num_bits_left(), 39);

        assert_eq!(reader.read_bits::<u32>(31), 0x23456789);
        assert_eq!(reader.num_bits_left(), 8);

        assert!(reader.read_bit());
        assert_eq!(reader.num_bits_left(), 7);

        assert!(!reader.read_bit());
        assert_eq!(reader.num_bits_left(), 6);
        assert!(reader.status().is_none());
    }

    #[test]
    fn read_wide_values() {
        const RBSP: [u8; 9] = [0xde, 0xad, 0xbe, 0xef, 0x01, 0x23, 0x45, 0x67, 0x80];

        let mut reader = BitReader::new(&RBSP, false);
        assert_eq!(reader.read_bits::<u64>(64), 0xdead_beef_0123_4567);
        assert!(reader.read_bit());
        assert_eq!(reader.position(), 65);

        let mut reader = BitReader::new(&RBSP, false);
        assert_eq!(reader.read_bits::<u64>(48), 0xdead_beef_0123);
        assert_eq!(reader.read_bits::<u32>(24), 0x45_67_80);
        assert_eq!(reader.num_bits_left(), 0);
    }

    #[test]
    fn split_reads_match_single_read() {
        const RBSP: [u8; 16] = [
            0x5a, 0xc3, 0x0f, 0xf0, 0x96, 0x69, 0x12, 0x34, 0xfe, 0xdc, 0xba, 0x98, 0x76, 0x54,
            0x32, 0x10,
        ];

        for n in 1..=32 {
            for k in 1..=32 {
                let mut whole = BitReader::new(&RBSP, false);
                let expected = whole.read_bits::<u64>(n + k);

                let mut split = BitReader::new(&RBSP, false);
                let hi = split.read_bits::<u64>(n);
                let lo = split.read_bits::<u64>(k);

                assert_eq!((hi << k) | lo, expected, "n = {}, k = {}", n, k);
                assert_eq!(split.position(), whole.position());
            }
        }
    }

    // Check that read_ue behaves properly with input at the limits.
    #[test]
    fn read_ue() {
        // Regular value.
        let mut reader = BitReader::new(&[0b0001_1010], false);
        assert_eq!(reader.read_ue::<u32>(), 12);
        assert_eq!(reader.position(), 7);
        assert!(reader.status().is_none());

        // 0 value.
        let mut reader = BitReader::new(&[0b1000_0000], false);
        assert_eq!(reader.read_ue::<u32>(), 0);
        assert_eq!(reader.position(), 1);

        // No prefix stop bit.
        let mut reader = BitReader::new(&[0b0000_0000], false);
        assert_eq!(reader.read_ue::<u32>(), 0);
        assert!(matches!(
            reader.status(),
            Some(ParseError::Truncated { .. })
        ));

        // Suffix running past the end of the data.
        let mut reader = BitReader::new(&[0b0000_0001], false);
        assert_eq!(reader.read_ue::<u32>(), 0);
        assert_eq!(
            reader.status(),
            Some(&ParseError::Truncated {
                position: 8,
                requested: 7
            })
        );

        // u32 max value: 31 0-bits, 1 bit marker, 31 bits 1-bits.
        let mut reader = BitReader::new(
            &[
                0b0000_0000,
                0b0000_0000,
                0b0000_0000,
                0b0000_0001,
                0b1111_1111,
                0b1111_1111,
                0b1111_1111,
                0b1111_1110,
            ],
            false,
        );
        assert_eq!(reader.read_ue::<u32>(), 0xffff_fffe);
        assert_eq!(reader.position(), 63);

        // 32 0-bits is still accepted, but the result may no longer fit in a u32.
        let mut reader = BitReader::new(&[0, 0, 0, 0, 0x80, 0, 0, 0, 0], false);
        assert_eq!(reader.read_ue::<u64>(), 0xffff_ffff);
        assert!(reader.status().is_none());

        let mut reader = BitReader::new(&[0, 0, 0, 0, 0x80, 0, 0, 0, 0x80], false);
        assert_eq!(reader.read_ue::<u32>(), 0);
        assert!(matches!(reader.status(), Some(ParseError::Malformed(_))));

        // 33 0-bits is rejected.
        let mut reader = BitReader::new(&[0, 0, 0, 0, 0x40, 0, 0, 0, 0], false);
        assert_eq!(reader.read_ue::<u64>(), 0);
        assert!(matches!(reader.status(), Some(ParseError::Malformed(_))));
    }

    #[test]
    fn read_ue_matches_reference_encoder() {
        let mut buf = Vec::<u8>::new();
        {
            let mut writer = BitWriter::new(&mut buf);
            for n in 0..1024u64 {
                writer.write_ue(n).unwrap();
            }
            writer.write_ue(u64::from(u32::MAX)).unwrap();
        }

        let mut reader = BitReader::new(&buf, false);
        for n in 0..1024u64 {
            assert_eq!(reader.read_ue::<u64>(), n);
        }
        assert_eq!(reader.read_ue::<u64>(), u64::from(u32::MAX));
        assert!(reader.status().is_none());
    }

    #[test]
    fn error_is_latched() {
        let mut reader = BitReader::new(&[0xff, 0xff], false);
        assert_eq!(reader.read_bits::<u32>(12), 0xfff);
        assert_eq!(reader.read_bits::<u32>(5), 0);

        let first = ParseError::Truncated {
            position: 12,
            requested: 5,
        };
        assert_eq!(reader.status(), Some(&first));

        // Everything after the failure reads as zero, even though 4 bits are
        // still available.
        assert!(!reader.read_bit());
        assert_eq!(reader.read_bits::<u32>(4), 0);
        assert_eq!(reader.read_ue::<u32>(), 0);
        reader.skip_bits(2);
        assert_eq!(reader.position(), 12);

        reader.set_error(ParseError::UnknownAspectRatioIdc(42));
        assert_eq!(reader.into_status(), Some(first));
    }

    #[test]
    fn invalid_bit_counts() {
        let mut reader = BitReader::new(&[0xff; 16], false);
        assert_eq!(reader.read_bits::<u64>(0), 0);
        assert!(reader.status().is_none());

        assert_eq!(reader.read_bits::<u64>(65), 0);
        assert!(matches!(reader.status(), Some(ParseError::Malformed(_))));
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn conversion_failure_is_latched() {
        let mut reader = BitReader::new(&[0xff, 0xff], false);
        assert_eq!(reader.read_bits::<u8>(9), 0);
        assert!(matches!(reader.status(), Some(ParseError::Malformed(_))));
    }

    // Check that emulation prevention is being handled correctly.
    #[test]
    fn skip_epb_when_enabled() {
        let mut reader = BitReader::new(&[0x00, 0x00, 0x03, 0x01], false);
        assert_eq!(reader.read_bits::<u32>(8), 0x00);
        assert_eq!(reader.read_bits::<u32>(8), 0x00);
        assert_eq!(reader.read_bits::<u32>(8), 0x03);
        assert_eq!(reader.read_bits::<u32>(8), 0x01);
        assert_eq!(reader.num_epb(), 0);

        let mut reader = BitReader::new(&[0x00, 0x00, 0x03, 0x01], true);
        assert_eq!(reader.read_bits::<u32>(8), 0x00);
        assert_eq!(reader.read_bits::<u32>(8), 0x00);
        assert_eq!(reader.read_bits::<u32>(8), 0x01);
        assert_eq!(reader.num_epb(), 1);
        assert_eq!(reader.num_bits_left(), 0);
    }

    #[test]
    fn strip_epb() {
        let data = [0x42, 0x01, 0x01];
        assert!(matches!(strip_emulation_prevention(&data), Cow::Borrowed(_)));

        // The byte right after an epb is never an epb itself.
        let data = [0x00, 0x00, 0x03, 0x03, 0x00, 0x00, 0x03, 0x00, 0x01];
        assert_eq!(
            strip_emulation_prevention(&data).as_ref(),
            &[0x00, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01]
        );
    }
}
