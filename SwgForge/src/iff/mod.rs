//! IFF chunk codec
//!
//! SWG assets are nested `FORM`/chunk blocks. Every block starts with a
//! 4-byte tag and a big-endian `u32` length; a `FORM` additionally carries a
//! second 4-byte tag (its name) which is counted in its length. Payload
//! scalars are little-endian.
//!
//! [`Iff`] keeps one growable buffer plus a stack of [`Block`] frames, one per
//! nesting depth. The same type is used for reading (enter/read/exit) and for
//! writing (insert/exit); inserting anywhere patches the length of every
//! enclosing block so no second pass is needed.

mod crc;
mod read;
mod write;

pub use crc::crc32;

use std::fs;
use std::path::Path;

use byteorder::{BigEndian, ByteOrder};

use crate::error::{Error, Result};

/// Bytes of header in front of a form's payload (`FORM`, length, name).
pub const FORM_HEADER: usize = 12;

/// Bytes of header in front of a chunk's payload (tag, length).
pub const CHUNK_HEADER: usize = 8;

const FORM_TAG: &[u8; 4] = b"FORM";

/// One frame of the block stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    /// Offset of the first payload byte.
    pub start: usize,
    /// Payload length (a form's name is not part of it).
    pub length: usize,
    /// Payload bytes consumed so far.
    pub used: usize,
}

/// One entry of [`Iff::walk`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockInfo {
    pub depth: usize,
    /// `FORM` for forms, otherwise the chunk tag.
    pub tag: String,
    /// The form name, or the chunk tag again.
    pub name: String,
    /// Length as stored in the header.
    pub length: usize,
}

/// Chunked binary container reader/writer.
#[derive(Debug, Clone)]
pub struct Iff {
    data: Vec<u8>,
    stack: Vec<Block>,
    in_chunk: bool,
}

impl Default for Iff {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Iff {
    /// Empty buffer for writing.
    pub fn new(initial_capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(initial_capacity),
            stack: vec![Block {
                start: 0,
                length: 0,
                used: 0,
            }],
            in_chunk: false,
        }
    }

    /// Load a whole file into memory.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read(path.as_ref())?;
        tracing::debug!("Opened IFF {} ({} bytes)", path.as_ref().display(), data.len());
        Ok(Self::from_bytes(data))
    }

    /// Wrap an existing buffer for reading.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        let length = data.len();
        Self {
            data,
            stack: vec![Block {
                start: 0,
                length,
                used: 0,
            }],
            in_chunk: false,
        }
    }

    /// Committed bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.stack[0].length]
    }

    pub fn into_bytes(mut self) -> Vec<u8> {
        self.data.truncate(self.stack[0].length);
        self.data
    }

    /// Write the committed bytes to disk.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path.as_ref(), self.as_bytes())?;
        tracing::info!("Wrote {} ({} bytes)", path.as_ref().display(), self.stack[0].length);
        Ok(())
    }

    /// Content-identity checksum over the committed bytes.
    pub fn calculate(&self) -> u32 {
        crc32(self.as_bytes())
    }

    /// Current nesting depth (0 = root).
    pub fn depth(&self) -> usize {
        self.stack.len() - 1
    }

    pub fn in_chunk(&self) -> bool {
        self.in_chunk
    }

    /// The frame on top of the stack.
    pub fn current_block(&self) -> Block {
        self.top()
    }

    pub fn at_end_of_form(&self) -> bool {
        let top = self.top();
        top.used >= top.length
    }

    /// Bytes left in the current block.
    pub fn remaining(&self) -> usize {
        let top = self.top();
        top.length.saturating_sub(top.used)
    }

    /// The first tag of the block at the cursor (`FORM` for forms).
    pub fn current_tag(&self) -> String {
        if self.in_chunk || self.at_end_of_form() {
            return String::new();
        }
        self.tag_at(self.cursor()).map(tag_string).unwrap_or_default()
    }

    /// Semantic name of the block at the cursor: the chunk tag, or the form
    /// name when the block is a `FORM`.
    pub fn current_name(&self) -> String {
        if self.in_chunk || self.at_end_of_form() {
            return String::new();
        }
        let offset = self.cursor();
        match self.tag_at(offset) {
            Some(tag) if tag == *FORM_TAG => self
                .tag_at(offset + 8)
                .map(tag_string)
                .unwrap_or_default(),
            Some(tag) => tag_string(tag),
            None => String::new(),
        }
    }

    /// Payload length of the block at the cursor, as stored in its header.
    pub fn current_length(&self) -> usize {
        if self.in_chunk || self.at_end_of_form() {
            return 0;
        }
        self.length_at(self.cursor() + 4).unwrap_or(0)
    }

    pub fn is_current_form(&self) -> bool {
        self.current_tag() == "FORM"
    }

    /// Enter the form at the cursor, validating its name.
    pub fn enter_form(&mut self, name: &str) -> Result<()> {
        self.enter_form_inner(Some(name))
    }

    /// Enter the form at the cursor whatever its name.
    pub fn enter_form_unchecked(&mut self) -> Result<String> {
        let name = self.current_name();
        self.enter_form_inner(None)?;
        Ok(name)
    }

    fn enter_form_inner(&mut self, name: Option<&str>) -> Result<()> {
        let expected = name.unwrap_or("FORM");
        if self.in_chunk {
            return Err(self.fail(expected, "inside a chunk"));
        }
        if self.at_end_of_form() {
            return Err(self.fail(expected, "end of form"));
        }
        let offset = self.cursor();
        let tag = self.tag_at(offset).ok_or_else(|| self.truncated(8))?;
        if tag != *FORM_TAG {
            return Err(self.fail(expected, &tag_string(tag)));
        }
        let form_name = self.tag_at(offset + 8).ok_or_else(|| self.truncated(12))?;
        if let Some(name) = name {
            if tag_string(form_name) != name {
                return Err(self.fail(name, &tag_string(form_name)));
            }
        }
        let length = self.length_at(offset + 4).ok_or_else(|| self.truncated(8))?;
        if length < 4 || offset + CHUNK_HEADER + length > self.limit() {
            return Err(Error::TruncatedData {
                wanted: length + CHUNK_HEADER,
                available: self.limit().saturating_sub(offset),
            });
        }
        self.stack.push(Block {
            start: offset + FORM_HEADER,
            length: length - 4,
            used: 0,
        });
        Ok(())
    }

    /// Enter the chunk at the cursor, validating its tag.
    pub fn enter_chunk(&mut self, name: &str) -> Result<()> {
        self.enter_chunk_inner(Some(name))
    }

    /// Enter the chunk at the cursor whatever its tag.
    pub fn enter_chunk_unchecked(&mut self) -> Result<String> {
        let name = self.current_name();
        self.enter_chunk_inner(None)?;
        Ok(name)
    }

    fn enter_chunk_inner(&mut self, name: Option<&str>) -> Result<()> {
        let expected = name.unwrap_or("chunk");
        if self.in_chunk {
            return Err(self.fail(expected, "inside a chunk"));
        }
        if self.at_end_of_form() {
            return Err(self.fail(expected, "end of form"));
        }
        let offset = self.cursor();
        let tag = self.tag_at(offset).ok_or_else(|| self.truncated(8))?;
        if tag == *FORM_TAG {
            let form_name = self.tag_at(offset + 8).map(tag_string).unwrap_or_default();
            return Err(self.fail(expected, &format!("FORM {form_name}")));
        }
        if let Some(name) = name {
            if tag_string(tag) != name {
                return Err(self.fail(name, &tag_string(tag)));
            }
        }
        let length = self.length_at(offset + 4).ok_or_else(|| self.truncated(8))?;
        if offset + CHUNK_HEADER + length > self.limit() {
            return Err(Error::TruncatedData {
                wanted: length + CHUNK_HEADER,
                available: self.limit().saturating_sub(offset),
            });
        }
        self.stack.push(Block {
            start: offset + CHUNK_HEADER,
            length,
            used: 0,
        });
        self.in_chunk = true;
        Ok(())
    }

    /// Leave the current form. An empty `name` skips validation.
    pub fn exit_form(&mut self, name: &str) -> Result<()> {
        if self.in_chunk {
            return Err(self.fail(&format!("exit FORM {name}"), "inside a chunk"));
        }
        if self.stack.len() < 2 {
            return Err(self.fail(&format!("exit FORM {name}"), "root block"));
        }
        let top = self.top();
        if !name.is_empty() {
            let actual = self.tag_at(top.start - 4).map(tag_string).unwrap_or_default();
            if actual != name {
                return Err(self.fail(name, &actual));
            }
        }
        self.stack.pop();
        if let Some(parent) = self.stack.last_mut() {
            parent.used += top.length + FORM_HEADER;
        }
        Ok(())
    }

    /// Leave the current chunk. An empty `name` skips validation.
    pub fn exit_chunk(&mut self, name: &str) -> Result<()> {
        if !self.in_chunk {
            return Err(self.fail(&format!("exit chunk {name}"), "not in a chunk"));
        }
        let top = self.top();
        if !name.is_empty() {
            let actual = self.tag_at(top.start - CHUNK_HEADER).map(tag_string).unwrap_or_default();
            if actual != name {
                return Err(self.fail(name, &actual));
            }
        }
        self.stack.pop();
        if let Some(parent) = self.stack.last_mut() {
            parent.used += top.length + CHUNK_HEADER;
        }
        self.in_chunk = false;
        Ok(())
    }

    /// Skip over the block at the cursor without entering it.
    pub fn skip_block(&mut self) -> Result<()> {
        if self.in_chunk || self.at_end_of_form() {
            return Err(self.fail("block", "nothing to skip"));
        }
        let length = self.length_at(self.cursor() + 4).ok_or_else(|| self.truncated(8))?;
        let total = length + CHUNK_HEADER;
        if total > self.remaining() {
            return Err(self.truncated(total));
        }
        if let Some(top) = self.stack.last_mut() {
            top.used += total;
        }
        Ok(())
    }

    /// Resize the buffer by `delta` bytes at the cursor and patch the length
    /// of every block on the stack.
    ///
    /// Growing opens a zeroed gap at the cursor, shrinking removes bytes
    /// following it. Capacity grows by doubling.
    pub fn adjust_for(&mut self, delta: isize) {
        let offset = self.cursor();
        let old_len = self.stack[0].length;
        if delta >= 0 {
            let grow = delta.unsigned_abs();
            let needed = old_len + grow;
            if needed > self.data.capacity() {
                let mut capacity = self.data.capacity().max(1);
                while capacity < needed {
                    capacity *= 2;
                }
                self.data.reserve_exact(capacity - self.data.len());
            }
            self.data.truncate(old_len);
            self.data.resize(needed, 0);
            self.data.copy_within(offset..old_len, offset + grow);
            self.data[offset..offset + grow].fill(0);
        } else {
            let shrink = delta.unsigned_abs().min(old_len - offset);
            self.data.copy_within(offset + shrink..old_len, offset);
            self.data.truncate(old_len - shrink);
        }
        self.patch_lengths(delta);
    }

    /// Apply `delta` to every frame's length and rewrite the big-endian
    /// length field of each non-root frame.
    fn patch_lengths(&mut self, delta: isize) {
        let depth = self.depth();
        for i in 0..self.stack.len() {
            let block = &mut self.stack[i];
            block.length = block.length.saturating_add_signed(delta);
            if i == 0 {
                continue;
            }
            let (at, value) = if i == depth && self.in_chunk {
                (block.start - 4, block.length)
            } else {
                (block.start - 8, block.length + 4)
            };
            BigEndian::write_u32(&mut self.data[at..at + 4], value as u32);
        }
    }

    /// Every block in the file, depth first. Does not move the cursor.
    pub fn walk(&self) -> Vec<BlockInfo> {
        let mut out = Vec::new();
        self.walk_range(0, self.stack[0].length, 0, &mut out);
        out
    }

    fn walk_range(&self, start: usize, end: usize, depth: usize, out: &mut Vec<BlockInfo>) {
        let mut offset = start;
        while offset + CHUNK_HEADER <= end {
            let (Some(tag), Some(length)) = (self.tag_at(offset), self.length_at(offset + 4)) else {
                break;
            };
            let block_end = (offset + CHUNK_HEADER + length).min(end);
            if tag == *FORM_TAG {
                let name = self.tag_at(offset + 8).map(tag_string).unwrap_or_default();
                out.push(BlockInfo {
                    depth,
                    tag: "FORM".to_string(),
                    name,
                    length,
                });
                self.walk_range(offset + FORM_HEADER, block_end, depth + 1, out);
            } else {
                out.push(BlockInfo {
                    depth,
                    tag: tag_string(tag),
                    name: tag_string(tag),
                    length,
                });
            }
            offset = block_end;
        }
    }

    // ==================== internals ====================

    fn top(&self) -> Block {
        self.stack[self.stack.len() - 1]
    }

    fn top_mut(&mut self) -> &mut Block {
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    /// Absolute offset of the next unread/unwritten byte.
    fn cursor(&self) -> usize {
        let top = self.top();
        top.start + top.used
    }

    fn limit(&self) -> usize {
        let top = self.top();
        top.start + top.length
    }

    fn tag_at(&self, offset: usize) -> Option<[u8; 4]> {
        self.data
            .get(offset..offset + 4)
            .and_then(|b| <[u8; 4]>::try_from(b).ok())
    }

    fn length_at(&self, offset: usize) -> Option<usize> {
        self.data
            .get(offset..offset + 4)
            .map(|b| BigEndian::read_u32(b) as usize)
    }

    fn truncated(&self, wanted: usize) -> Error {
        Error::TruncatedData {
            wanted,
            available: self.remaining(),
        }
    }

    fn fail(&self, expected: &str, found: &str) -> Error {
        tracing::warn!(
            "IFF structural mismatch at depth {}: expected {expected}, found {found}",
            self.depth()
        );
        Error::mismatch(expected, found)
    }
}

fn tag_string(tag: [u8; 4]) -> String {
    String::from_utf8_lossy(&tag).into_owned()
}

/// Validate a block name and return its bytes.
pub(crate) fn tag_bytes(name: &str) -> Result<[u8; 4]> {
    let bytes = name.as_bytes();
    if bytes.len() != 4 || !bytes.is_ascii() {
        return Err(Error::InvalidTag(name.to_string()));
    }
    Ok([bytes[0], bytes[1], bytes[2], bytes[3]])
}
