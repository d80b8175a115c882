// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Bounds-checked little-endian buffers.

use super::ExecError;
use crate::types::Primitive;

/// Growable output buffer.
#[derive(Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    /// Writes `value` as a little-endian `primitive`, rejecting values the
    /// primitive cannot hold.
    pub fn write_int(&mut self, primitive: Primitive, value: i128) -> Result<(), ExecError> {
        if !primitive.contains(value) {
            return Err(ExecError::OutOfRange {
                type_name: primitive.name().to_owned(),
                value,
            });
        }
        let bytes = value.to_le_bytes();
        self.buf.extend_from_slice(&bytes[..primitive.width()]);
        Ok(())
    }

    /// Writes raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Writes `count` zero bytes.
    pub fn write_zeros(&mut self, count: usize) {
        self.buf.resize(self.buf.len() + count, 0);
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing was written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Consumes the writer.
    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor over an input slice.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    /// Reader positioned at the start of `bytes`.
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    /// Bytes consumed so far.
    pub const fn position(&self) -> usize {
        self.offset
    }

    /// Bytes left.
    pub const fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    /// Unconsumed tail, without advancing.
    pub fn rest(&self) -> &'a [u8] {
        &self.bytes[self.offset..]
    }

    /// Consumes `len` bytes.
    pub fn take(&mut self, len: usize) -> Result<&'a [u8], ExecError> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(ExecError::OutOfBounds {
                offset: self.offset,
                wanted: len,
            })?;
        let out = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(out)
    }

    /// Skips `len` bytes.
    pub fn skip(&mut self, len: usize) -> Result<(), ExecError> {
        self.take(len).map(|_| ())
    }

    /// Reads a little-endian `primitive`, sign-extending signed values.
    pub fn read_int(&mut self, primitive: Primitive) -> Result<i128, ExecError> {
        let chunk = self.take(primitive.width())?;
        let negative = primitive.is_signed() && chunk.last().is_some_and(|b| b & 0x80 != 0);
        let mut raw = if negative { [0xff_u8; 16] } else { [0_u8; 16] };
        raw[..chunk.len()].copy_from_slice(chunk);
        Ok(i128::from_le_bytes(raw))
    }

    /// Consumes `len` bytes and returns a reader bounded to them.
    pub fn sub(&mut self, len: usize) -> Result<Self, ExecError> {
        self.take(len).map(Reader::new)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn signed_values_round_trip() {
        let mut w = Writer::default();
        w.write_int(Primitive::Int16, -2).unwrap();
        w.write_int(Primitive::Uint32, 0xdead_beef).unwrap();
        let bytes = w.into_vec();
        assert_eq!(bytes, vec![0xfe, 0xff, 0xef, 0xbe, 0xad, 0xde]);
        let mut r = Reader::new(&bytes);
        assert_eq!(r.read_int(Primitive::Int16).unwrap(), -2);
        assert_eq!(r.read_int(Primitive::Uint32).unwrap(), 0xdead_beef);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn out_of_range_and_out_of_bounds() {
        let mut w = Writer::default();
        assert!(matches!(
            w.write_int(Primitive::Uint8, 256),
            Err(ExecError::OutOfRange { .. })
        ));
        assert!(w.is_empty());
        let mut r = Reader::new(&[1, 2]);
        assert_eq!(
            r.read_int(Primitive::Uint32),
            Err(ExecError::OutOfBounds {
                offset: 0,
                wanted: 4
            })
        );
    }
}
