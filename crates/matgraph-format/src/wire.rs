//! Little-endian wire helpers.

use matgraph_core::{MatgraphError, Result};

#[inline]
pub fn read_u32_le(buf: &[u8], offset: usize) -> Option<u32> {
    let b = buf.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

#[inline]
pub fn read_i64_le(buf: &[u8], offset: usize) -> Option<i64> {
    let b = buf.get(offset..offset.checked_add(8)?)?;
    Some(i64::from_le_bytes([
        b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
    ]))
}

#[inline]
pub fn write_u32_le(buf: &mut Vec<u8>, val: u32) {
    buf.extend_from_slice(&val.to_le_bytes());
}

#[inline]
pub fn write_i64_le(buf: &mut Vec<u8>, val: i64) {
    buf.extend_from_slice(&val.to_le_bytes());
}

/// Forward-only cursor over an encoded buffer.
///
/// Every read past the end is reported as `MalformedGraph`.
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn truncated(&self, what: &str, need: usize) -> MatgraphError {
        MatgraphError::MalformedGraph(format!(
            "truncated {what} at offset {}: need {need} bytes, have {}",
            self.pos,
            self.remaining()
        ))
    }

    pub fn bytes(&mut self, n: usize, what: &str) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| self.truncated(what, n))?;
        let buf = self.buf;
        let out = &buf[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    pub fn u8(&mut self, what: &str) -> Result<u8> {
        let b = *self.buf.get(self.pos).ok_or_else(|| self.truncated(what, 1))?;
        self.pos += 1;
        Ok(b)
    }

    pub fn u32(&mut self, what: &str) -> Result<u32> {
        let v = read_u32_le(self.buf, self.pos).ok_or_else(|| self.truncated(what, 4))?;
        self.pos += 4;
        Ok(v)
    }

    pub fn i64(&mut self, what: &str) -> Result<i64> {
        let v = read_i64_le(self.buf, self.pos).ok_or_else(|| self.truncated(what, 8))?;
        self.pos += 8;
        Ok(v)
    }

    /// A single byte that must be 0 or 1.
    pub fn bool(&mut self, what: &str) -> Result<bool> {
        match self.u8(what)? {
            0 => Ok(false),
            1 => Ok(true),
            b => Err(MatgraphError::MalformedGraph(format!(
                "{what} at offset {} is {b}, expected 0 or 1",
                self.pos - 1
            ))),
        }
    }
}
