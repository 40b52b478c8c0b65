//! Big-endian binary reader shared by every on-disk model format.
//!
//! Reference upstream implementation: the byte-reading idiom of the
//! teacher's `lib.rs::Lexicon::load_from_fst_bincode` (open, read to a
//! `Vec<u8>`, then parse), generalized into one reusable cursor instead of
//! repeating the open/read/parse dance per format. All model file formats
//! (trie §4.B, CRF §4.F, graph/postal artefacts §4.K) are big-endian and go
//! through this type.

use crate::error::{Error, Result};

/// A cursor over a byte slice that reads big-endian primitives.
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Error::InvalidData(format!(
                "unexpected end of data at offset {}: need {} bytes, have {}",
                self.pos,
                n,
                self.remaining()
            )));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(b);
        Ok(u64::from_be_bytes(arr))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.take(n)
    }

    /// Read a `u32`-length-prefixed UTF-8 string.
    pub fn read_length_prefixed_string(&mut self) -> Result<String> {
        let len = self.read_u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| Error::InvalidData(format!("string is not valid utf-8: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_big_endian_primitives() {
        let data = [0x00, 0x00, 0x00, 0x2A, 0x3F, 0x80, 0x00, 0x00];
        let mut r = ByteReader::new(&data);
        assert_eq!(r.read_u32().unwrap(), 42);
        assert_eq!(r.read_f32().unwrap(), 1.0f32);
    }

    #[test]
    fn length_prefixed_string_round_trips() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&5u32.to_be_bytes());
        buf.extend_from_slice("hello".as_bytes());
        let mut r = ByteReader::new(&buf);
        assert_eq!(r.read_length_prefixed_string().unwrap(), "hello");
    }

    #[test]
    fn truncated_read_is_invalid_data() {
        let data = [0x00, 0x00];
        let mut r = ByteReader::new(&data);
        assert!(matches!(r.read_u32(), Err(Error::InvalidData(_))));
    }
}
