//! Block and primitive writers
//!
//! Every insert opens a gap at the cursor through [`Iff::adjust_for`], fills
//! it, and advances the current block's `used`.

use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};
use glam::{Vec3, Vec4};

use super::{CHUNK_HEADER, FORM_HEADER, FORM_TAG, Iff, tag_bytes};
use crate::error::{Error, Result};

impl Iff {
    /// Splice `bytes` in at the cursor.
    fn put(&mut self, bytes: &[u8]) {
        let offset = self.cursor();
        self.adjust_for(bytes.len() as isize);
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        self.top_mut().used += bytes.len();
    }

    fn ensure_writable(&self, what: &str) -> Result<()> {
        if self.in_chunk {
            return Err(self.fail(what, "inside a chunk"));
        }
        Ok(())
    }

    /// Insert an empty `FORM name`, optionally entering it.
    pub fn insert_form(&mut self, name: &str, enter: bool) -> Result<()> {
        let tag = tag_bytes(name)?;
        self.ensure_writable(&format!("insert FORM {name}"))?;
        let offset = self.cursor();
        self.adjust_for(FORM_HEADER as isize);
        self.data[offset..offset + 4].copy_from_slice(FORM_TAG);
        BigEndian::write_u32(&mut self.data[offset + 4..offset + 8], 4);
        self.data[offset + 8..offset + 12].copy_from_slice(&tag);
        if enter {
            self.enter_form(name)
        } else {
            self.top_mut().used += FORM_HEADER;
            Ok(())
        }
    }

    /// Insert a form named by `n` zero-padded to four digits.
    pub fn insert_numbered_form(&mut self, n: usize, enter: bool) -> Result<()> {
        self.insert_form(&format!("{n:04}"), enter)
    }

    /// Insert an empty chunk, optionally entering it.
    pub fn insert_chunk(&mut self, name: &str, enter: bool) -> Result<()> {
        let tag = tag_bytes(name)?;
        self.ensure_writable(&format!("insert chunk {name}"))?;
        let offset = self.cursor();
        self.adjust_for(CHUNK_HEADER as isize);
        self.data[offset..offset + 4].copy_from_slice(&tag);
        BigEndian::write_u32(&mut self.data[offset + 4..offset + 8], 0);
        if enter {
            self.enter_chunk(name)
        } else {
            self.top_mut().used += CHUNK_HEADER;
            Ok(())
        }
    }

    /// Remove `n` bytes at the cursor.
    pub fn delete(&mut self, n: usize) -> Result<()> {
        let available = self.remaining();
        if n > available {
            return Err(Error::TruncatedData {
                wanted: n,
                available,
            });
        }
        self.adjust_for(-(n as isize));
        Ok(())
    }

    pub fn insert_bool8(&mut self, value: bool) -> Result<()> {
        self.insert_u8(u8::from(value))
    }

    pub fn insert_u8(&mut self, value: u8) -> Result<()> {
        self.put(&[value]);
        Ok(())
    }

    pub fn insert_i8(&mut self, value: i8) -> Result<()> {
        self.put(&value.to_le_bytes());
        Ok(())
    }

    pub fn insert_u16(&mut self, value: u16) -> Result<()> {
        self.put(&value.to_le_bytes());
        Ok(())
    }

    pub fn insert_i16(&mut self, value: i16) -> Result<()> {
        self.put(&value.to_le_bytes());
        Ok(())
    }

    pub fn insert_u32(&mut self, value: u32) -> Result<()> {
        self.put(&value.to_le_bytes());
        Ok(())
    }

    pub fn insert_i32(&mut self, value: i32) -> Result<()> {
        self.put(&value.to_le_bytes());
        Ok(())
    }

    pub fn insert_f32(&mut self, value: f32) -> Result<()> {
        self.put(&value.to_le_bytes());
        Ok(())
    }

    pub fn insert_vec3(&mut self, value: Vec3) -> Result<()> {
        self.insert_floats(&value.to_array())
    }

    pub fn insert_vec4(&mut self, value: Vec4) -> Result<()> {
        self.insert_floats(&value.to_array())
    }

    pub fn insert_floats(&mut self, values: &[f32]) -> Result<()> {
        let mut bytes = Vec::with_capacity(values.len() * 4);
        for &v in values {
            bytes.write_f32::<LittleEndian>(v)?;
        }
        self.put(&bytes);
        Ok(())
    }

    /// RGBA in `0.0..=1.0`, stored as clamped B, G, R, A bytes.
    pub fn insert_color(&mut self, rgba: [f32; 4]) -> Result<()> {
        let [r, g, b, a] = rgba.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
        self.put(&[b, g, r, a]);
        Ok(())
    }

    /// NUL-terminated ASCII string.
    pub fn insert_string(&mut self, value: &str) -> Result<()> {
        let mut bytes = Vec::with_capacity(value.len() + 1);
        bytes.extend_from_slice(value.as_bytes());
        bytes.push(0);
        self.put(&bytes);
        Ok(())
    }

    /// Splice raw, already-encoded blocks (or payload) in at the cursor.
    pub fn insert_iff_data(&mut self, bytes: &[u8]) -> Result<()> {
        self.put(bytes);
        Ok(())
    }

    /// Splice another codec's committed bytes in at the cursor.
    pub fn insert_iff(&mut self, other: &Iff) -> Result<()> {
        self.ensure_writable("insert IFF")?;
        self.insert_iff_data(other.as_bytes())
    }

    /// Add `delta` to the `i32` at the cursor, in place.
    pub fn update_i32(&mut self, delta: i32) -> Result<()> {
        let value = self.read_i32()?;
        self.rewind(4);
        self.delete(4)?;
        self.insert_i32(value.wrapping_add(delta))
    }

    /// Add `delta` to the `f32` at the cursor, in place.
    pub fn update_f32(&mut self, delta: f32) -> Result<()> {
        let value = self.read_f32()?;
        self.rewind(4);
        self.delete(4)?;
        self.insert_f32(value + delta)
    }

    /// Add `delta` to the vector at the cursor, in place.
    pub fn update_vec3(&mut self, delta: Vec3) -> Result<()> {
        let value = self.read_vec3()?;
        self.rewind(12);
        self.delete(12)?;
        self.insert_vec3(value + delta)
    }

    fn rewind(&mut self, n: usize) {
        let top = self.top_mut();
        top.used = top.used.saturating_sub(n);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Re-read every block with name validation and compare stored lengths
    /// against the payload actually walked.
    fn assert_consistent(bytes: &[u8]) {
        let iff = Iff::from_bytes(bytes.to_vec());
        let blocks = iff.walk();
        assert!(!blocks.is_empty());
        let mut reader = Iff::from_bytes(bytes.to_vec());
        descend(&mut reader);
        assert!(reader.at_end_of_form());
    }

    fn descend(iff: &mut Iff) {
        while !iff.at_end_of_form() {
            let name = iff.current_name();
            if iff.is_current_form() {
                iff.enter_form(&name).unwrap();
                descend(iff);
                iff.exit_form(&name).unwrap();
            } else {
                iff.enter_chunk(&name).unwrap();
                let n = iff.remaining();
                iff.read_misc(n).unwrap();
                iff.exit_chunk(&name).unwrap();
            }
        }
    }

    #[test]
    fn test_insert_in_middle_patches_every_level() {
        let mut iff = Iff::new(0);
        iff.insert_form("ROOT", true).unwrap();
        iff.insert_form("0000", true).unwrap();
        iff.insert_chunk("AAAA", true).unwrap();
        iff.insert_u32(1).unwrap();
        iff.exit_chunk("AAAA").unwrap();
        iff.insert_chunk("CCCC", true).unwrap();
        iff.insert_u32(3).unwrap();
        iff.exit_chunk("CCCC").unwrap();
        iff.exit_form("0000").unwrap();
        iff.exit_form("ROOT").unwrap();
        let before = iff.as_bytes().len();

        // reopen and insert a chunk between AAAA and CCCC
        let mut iff = Iff::from_bytes(iff.into_bytes());
        iff.enter_form("ROOT").unwrap();
        iff.enter_form("0000").unwrap();
        iff.skip_block().unwrap();
        iff.insert_chunk("BBBB", true).unwrap();
        iff.insert_string("middle").unwrap();
        iff.exit_chunk("BBBB").unwrap();
        iff.exit_form("0000").unwrap();
        iff.exit_form("ROOT").unwrap();

        assert_eq!(iff.as_bytes().len(), before + 8 + 7);
        assert_consistent(iff.as_bytes());

        let names: Vec<_> = iff.walk().into_iter().map(|b| b.name).collect();
        assert_eq!(names, vec!["ROOT", "0000", "AAAA", "BBBB", "CCCC"]);
    }

    #[test]
    fn test_delete_shrinks_every_level() {
        let mut iff = Iff::new(16);
        iff.insert_form("ROOT", true).unwrap();
        iff.insert_chunk("DATA", true).unwrap();
        iff.insert_u32(1).unwrap();
        iff.insert_u32(2).unwrap();
        iff.exit_chunk("DATA").unwrap();
        iff.exit_form("ROOT").unwrap();

        let mut iff = Iff::from_bytes(iff.into_bytes());
        iff.enter_form("ROOT").unwrap();
        iff.enter_chunk("DATA").unwrap();
        iff.delete(4).unwrap();
        assert_eq!(iff.read_u32().unwrap(), 2);
        iff.exit_chunk("DATA").unwrap();
        iff.exit_form("ROOT").unwrap();

        assert_eq!(iff.as_bytes().len(), 12 + 8 + 4);
        assert_consistent(iff.as_bytes());
    }

    #[test]
    fn test_update_vec3_in_place() {
        let mut iff = Iff::new(0);
        iff.insert_form("ROOT", true).unwrap();
        iff.insert_chunk("POSN", true).unwrap();
        iff.insert_vec3(Vec3::new(1.0, 2.0, 3.0)).unwrap();
        iff.insert_i32(10).unwrap();
        iff.insert_f32(0.5).unwrap();
        iff.exit_chunk("POSN").unwrap();
        iff.exit_form("ROOT").unwrap();

        let mut iff = Iff::from_bytes(iff.into_bytes());
        iff.enter_form("ROOT").unwrap();
        iff.enter_chunk("POSN").unwrap();
        iff.update_vec3(Vec3::new(10.0, 0.0, -1.0)).unwrap();
        iff.update_i32(-4).unwrap();
        iff.update_f32(0.25).unwrap();
        iff.exit_chunk("POSN").unwrap();
        iff.exit_form("ROOT").unwrap();

        let mut iff = Iff::from_bytes(iff.into_bytes());
        iff.enter_form("ROOT").unwrap();
        iff.enter_chunk("POSN").unwrap();
        assert_eq!(iff.read_vec3().unwrap(), Vec3::new(11.0, 2.0, 2.0));
        assert_eq!(iff.read_i32().unwrap(), 6);
        assert_eq!(iff.read_f32().unwrap(), 0.75);
    }

    #[test]
    fn test_insert_iff_splices_blocks() {
        let mut inner = Iff::new(0);
        inner.insert_chunk("NAME", true).unwrap();
        inner.insert_string("x").unwrap();
        inner.exit_chunk("NAME").unwrap();

        let mut outer = Iff::new(0);
        outer.insert_form("APT ", true).unwrap();
        outer.insert_iff(&inner).unwrap();
        outer.exit_form("APT ").unwrap();
        assert_consistent(outer.as_bytes());
        assert_eq!(outer.as_bytes().len(), 12 + 8 + 2);
    }

    #[test]
    fn test_insert_form_without_entering() {
        let mut iff = Iff::new(0);
        iff.insert_form("ROOT", true).unwrap();
        iff.insert_form("NULL", false).unwrap();
        iff.insert_chunk("NEXT", false).unwrap();
        iff.exit_form("ROOT").unwrap();
        let names: Vec<_> = iff.walk().into_iter().map(|b| (b.depth, b.name)).collect();
        assert_eq!(
            names,
            vec![
                (0, "ROOT".to_string()),
                (1, "NULL".to_string()),
                (1, "NEXT".to_string())
            ]
        );
    }

    #[test]
    fn test_bad_tag_rejected() {
        let mut iff = Iff::new(0);
        assert!(matches!(iff.insert_form("TOOLONG", true), Err(Error::InvalidTag(_))));
    }

    #[test]
    fn test_capacity_grows_from_zero() {
        let mut iff = Iff::new(0);
        iff.insert_chunk("DATA", true).unwrap();
        for i in 0..1000 {
            iff.insert_u32(i).unwrap();
        }
        iff.exit_chunk("DATA").unwrap();
        assert_eq!(iff.as_bytes().len(), 8 + 4000);
        assert_consistent(iff.as_bytes());
    }
}
