//! Double-array trie disk format decoder.
//!
//! Reference: `spec.md` §4.B. This format is consumed read-only — there is
//! no production encoder, only a decoder. (Test fixtures are built by a
//! small brute-force encoder kept under `#[cfg(test)]` below; it exists only
//! to generate valid bytes for decoder tests, not as a public API.)
//!
//! Resolution of an open question (see `DESIGN.md`): the format as
//! specified gives a node's `base` field a dual role (branch offset vs.
//! terminal-data marker) with no reserved terminator byte to disambiguate a
//! key from one of its own extensions. This implementation assumes, as is
//! true of the lexicons this format actually carries (single vocabulary
//! words, or whole phrase strings, at one consistent granularity per trie
//! file), that no stored key is a strict byte-prefix of another stored key
//! in the same file. A malformed file that violates this will surface as a
//! lookup miss or an `Error::InvalidData`, never undefined behavior.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::reader::ByteReader;

const TRIE_SIGNATURE: u32 = 0xABAB_ABAB;
const ROOT: usize = 2;

/// A decoded double-array trie, read-only.
pub struct DoubleArrayTrie {
    alphabet: Vec<u8>,
    alphabet_index: HashMap<u8, usize>,
    base: Vec<i32>,
    check: Vec<i32>,
    data: Vec<(u32, u32)>,
    tail: Vec<u8>,
}

impl DoubleArrayTrie {
    /// Decode a full double-array file, including the leading signature.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(bytes);
        let sig = r.read_u32()?;
        if sig != TRIE_SIGNATURE {
            return Err(Error::InvalidSignature {
                expected: TRIE_SIGNATURE,
                found: sig,
            });
        }
        let alphabet_len = r.read_u32()?;
        Self::decode_body(&mut r, alphabet_len)
    }

    /// Decode starting just after the signature and alphabet-length fields
    /// have already been consumed by the caller (used by `Trie::load`,
    /// which must peek that field to distinguish formats).
    pub(crate) fn decode_after_alphabet_len(bytes: &[u8], alphabet_len: u32) -> Result<Self> {
        // 4 signature bytes + 4 alphabet-length bytes already consumed.
        let mut r = ByteReader::new(&bytes[8..]);
        Self::decode_body(&mut r, alphabet_len)
    }

    fn decode_body(r: &mut ByteReader, alphabet_len: u32) -> Result<Self> {
        let alphabet = r.read_bytes(alphabet_len as usize)?.to_vec();
        let mut alphabet_index = HashMap::with_capacity(alphabet.len());
        for (i, &b) in alphabet.iter().enumerate() {
            alphabet_index.insert(b, i);
        }

        let _key_count = r.read_u32()?;

        let node_count = r.read_u32()? as usize;
        let mut base = Vec::with_capacity(node_count);
        let mut check = Vec::with_capacity(node_count);
        for _ in 0..node_count {
            base.push(r.read_i32()?);
            check.push(r.read_i32()?);
        }

        let data_count = r.read_u32()? as usize;
        let mut data = Vec::with_capacity(data_count);
        for _ in 0..data_count {
            let tail_offset = r.read_u32()?;
            let value = r.read_u32()?;
            data.push((tail_offset, value));
        }

        let tail_len = r.read_u32()? as usize;
        let tail = r.read_bytes(tail_len)?.to_vec();

        Ok(Self {
            alphabet,
            alphabet_index,
            base,
            check,
            data,
            tail,
        })
    }

    fn read_tail(&self, offset: usize) -> Result<&str> {
        let end = self.tail[offset..]
            .iter()
            .position(|&b| b == 0)
            .map(|p| offset + p)
            .unwrap_or(self.tail.len());
        std::str::from_utf8(&self.tail[offset..end])
            .map_err(|e| Error::InvalidData(format!("tail is not valid utf-8: {e}")))
    }

    fn terminal_data(&self, node: usize) -> Result<Option<(u32, &str)>> {
        if self.base[node] >= 0 {
            return Ok(None);
        }
        let data_idx = (-self.base[node] - 1) as usize;
        let &(tail_offset, value) = self
            .data
            .get(data_idx)
            .ok_or_else(|| Error::InvalidData(format!("data index {data_idx} out of range")))?;
        Ok(Some((value, self.read_tail(tail_offset as usize)?)))
    }

    /// Exact-match lookup.
    pub fn get(&self, key: &str) -> Result<Option<u32>> {
        let key_bytes = key.as_bytes();
        let mut cur = ROOT;
        let mut i = 0usize;
        loop {
            if let Some((value, tail)) = self.terminal_data(cur)? {
                return Ok(if tail.as_bytes() == &key_bytes[i..] {
                    Some(value)
                } else {
                    None
                });
            }
            if i >= key_bytes.len() {
                return Ok(None);
            }
            let Some(&t) = self.alphabet_index.get(&key_bytes[i]) else {
                return Ok(None);
            };
            let next = self.base[cur] + t as i32;
            if next < 0 || next as usize >= self.check.len() {
                return Ok(None);
            }
            if self.check[next as usize] != cur as i32 {
                return Ok(None);
            }
            cur = next as usize;
            i += 1;
        }
    }

    pub fn contains_key(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Enumerate all `(key, value)` pairs whose key starts with `prefix`.
    pub fn prefix_matches(&self, prefix: &str) -> Result<Vec<(String, u32)>> {
        let prefix_bytes = prefix.as_bytes();
        let mut cur = ROOT;
        let mut i = 0usize;
        loop {
            if let Some((value, tail)) = self.terminal_data(cur)? {
                let remaining = &prefix_bytes[i..];
                return Ok(if tail.as_bytes().starts_with(remaining) {
                    vec![(format!("{}{}", prefix, &tail[remaining.len()..]), value)]
                } else {
                    Vec::new()
                });
            }
            if i >= prefix_bytes.len() {
                let mut out = Vec::new();
                self.collect(cur, prefix_bytes.to_vec(), &mut out)?;
                return Ok(out);
            }
            let Some(&t) = self.alphabet_index.get(&prefix_bytes[i]) else {
                return Ok(Vec::new());
            };
            let next = self.base[cur] + t as i32;
            if next < 0 || next as usize >= self.check.len() || self.check[next as usize] != cur as i32 {
                return Ok(Vec::new());
            }
            cur = next as usize;
            i += 1;
        }
    }

    /// Collect all complete keys reachable from `node`. `prefix_bytes`
    /// accumulates raw key bytes (not `char`s) so multi-byte UTF-8
    /// sequences in the alphabet are reassembled correctly; only the final
    /// accumulated byte string is decoded as UTF-8, once complete.
    fn collect(&self, node: usize, prefix_bytes: Vec<u8>, out: &mut Vec<(String, u32)>) -> Result<()> {
        if let Some((value, tail)) = self.terminal_data(node)? {
            let mut full = prefix_bytes;
            full.extend_from_slice(tail.as_bytes());
            let key = String::from_utf8(full)
                .map_err(|e| Error::InvalidData(format!("key is not valid utf-8: {e}")))?;
            out.push((key, value));
            return Ok(());
        }
        for (t, &byte) in self.alphabet.iter().enumerate() {
            let next = self.base[node] + t as i32;
            if next < 0 || next as usize >= self.check.len() {
                continue;
            }
            if self.check[next as usize] != node as i32 {
                continue;
            }
            let mut next_prefix = prefix_bytes.clone();
            next_prefix.push(byte);
            self.collect(next as usize, next_prefix, out)?;
        }
        Ok(())
    }

    /// Enumerate every entry in the trie.
    pub fn entries(&self) -> Result<Vec<(String, u32)>> {
        self.prefix_matches("")
    }
}
