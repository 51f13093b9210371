//! Little-endian field reader/writer shared by every payload.
//!
//! Strings and byte blobs carry a `u16` length prefix and lists a `u16`
//! count, so every variable-length payload is at least two bytes.

use crate::core::MessageError;

/// Appends fields to an outbound frame.
#[derive(Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Finish and return the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn bool(&mut self, v: bool) {
        self.buf.push(u8::from(v));
    }

    pub fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn fixed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn str(&mut self, field: &'static str, s: &str) -> Result<(), MessageError> {
        self.blob(field, s.as_bytes())
    }

    pub fn blob(&mut self, field: &'static str, bytes: &[u8]) -> Result<(), MessageError> {
        let len = u16::try_from(bytes.len()).map_err(|_| MessageError::FieldTooLong {
            field,
            len: bytes.len(),
        })?;
        self.buf.extend_from_slice(&len.to_le_bytes());
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    pub fn count(&mut self, field: &'static str, n: usize) -> Result<(), MessageError> {
        let n = u16::try_from(n).map_err(|_| MessageError::FieldTooLong { field, len: n })?;
        self.buf.extend_from_slice(&n.to_le_bytes());
        Ok(())
    }
}

/// Reads fields from an inbound frame.
#[derive(Debug)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Start reading at the beginning of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], MessageError> {
        let end = self.pos + n;
        if end > self.data.len() {
            return Err(MessageError::TooShort {
                expected: end,
                actual: self.data.len(),
            });
        }
        let out = &self.data[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8, MessageError> {
        Ok(self.take(1)?[0])
    }

    pub fn bool(&mut self) -> Result<bool, MessageError> {
        Ok(self.u8()? != 0)
    }

    pub fn u16(&mut self) -> Result<u16, MessageError> {
        let mut raw = [0u8; 2];
        raw.copy_from_slice(self.take(2)?);
        Ok(u16::from_le_bytes(raw))
    }

    pub fn u32(&mut self) -> Result<u32, MessageError> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(raw))
    }

    pub fn u64(&mut self) -> Result<u64, MessageError> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(raw))
    }

    pub fn fixed<const N: usize>(&mut self) -> Result<[u8; N], MessageError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn str(&mut self, field: &'static str) -> Result<String, MessageError> {
        let raw = self.blob()?;
        String::from_utf8(raw).map_err(|_| MessageError::InvalidUtf8(field))
    }

    pub fn blob(&mut self) -> Result<Vec<u8>, MessageError> {
        let len = self.u16()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    pub fn count(&mut self) -> Result<usize, MessageError> {
        Ok(self.u16()? as usize)
    }
}
