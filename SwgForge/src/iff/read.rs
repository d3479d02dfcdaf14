//! Primitive readers
//!
//! Every reader advances the current block's `used` by the exact byte width
//! and fails with [`Error::TruncatedData`] instead of reading past the block.

use byteorder::{LittleEndian, ReadBytesExt};
use glam::{Vec3, Vec4};

use super::Iff;
use crate::error::{Error, Result};

impl Iff {
    /// Borrow the next `n` bytes of the current block and advance past them.
    fn take(&mut self, n: usize) -> Result<&[u8]> {
        let available = self.remaining();
        if n > available {
            return Err(Error::TruncatedData {
                wanted: n,
                available,
            });
        }
        let offset = self.cursor();
        self.top_mut().used += n;
        Ok(&self.data[offset..offset + n])
    }

    /// Validate a record count read from the file against the bytes left in
    /// the current block, before anything is allocated for it.
    ///
    /// `record_size` is the smallest number of bytes one record can occupy;
    /// zero-sized records are counted as one byte.
    pub fn checked_count(&self, count: usize, record_size: usize) -> Result<usize> {
        let wanted = count.saturating_mul(record_size.max(1));
        let available = self.remaining();
        if wanted > available {
            return Err(Error::TruncatedData { wanted, available });
        }
        Ok(count)
    }

    /// Raw bytes. Used for opaque sub-blocks read header and all.
    pub fn read_misc(&mut self, n: usize) -> Result<Vec<u8>> {
        Ok(self.take(n)?.to_vec())
    }

    /// The whole block at the cursor, header included, as raw bytes.
    pub fn read_block_raw(&mut self) -> Result<Vec<u8>> {
        let total = self.current_length() + super::CHUNK_HEADER;
        self.read_misc(total)
    }

    pub fn read_bool8(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.take(1)?.read_i8()?)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(self.take(2)?.read_u16::<LittleEndian>()?)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(self.take(2)?.read_i16::<LittleEndian>()?)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(self.take(4)?.read_u32::<LittleEndian>()?)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.take(4)?.read_i32::<LittleEndian>()?)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(self.take(4)?.read_f32::<LittleEndian>()?)
    }

    pub fn read_vec3(&mut self) -> Result<Vec3> {
        let mut bytes = self.take(12)?;
        let x = bytes.read_f32::<LittleEndian>()?;
        let y = bytes.read_f32::<LittleEndian>()?;
        let z = bytes.read_f32::<LittleEndian>()?;
        Ok(Vec3::new(x, y, z))
    }

    pub fn read_vec4(&mut self) -> Result<Vec4> {
        let mut bytes = self.take(16)?;
        let x = bytes.read_f32::<LittleEndian>()?;
        let y = bytes.read_f32::<LittleEndian>()?;
        let z = bytes.read_f32::<LittleEndian>()?;
        let w = bytes.read_f32::<LittleEndian>()?;
        Ok(Vec4::new(x, y, z, w))
    }

    /// `n` little-endian floats.
    pub fn read_floats<const N: usize>(&mut self) -> Result<[f32; N]> {
        let mut bytes = self.take(4 * N)?;
        let mut out = [0.0; N];
        for value in &mut out {
            *value = bytes.read_f32::<LittleEndian>()?;
        }
        Ok(out)
    }

    /// Packed BGRA color, returned as RGBA in `0.0..=1.0`.
    pub fn read_color(&mut self) -> Result<[f32; 4]> {
        let bytes = self.take(4)?;
        let [b, g, r, a] = [bytes[0], bytes[1], bytes[2], bytes[3]];
        Ok([r, g, b, a].map(|c| f32::from(c) / 255.0))
    }

    /// NUL-terminated ASCII string.
    pub fn read_string(&mut self) -> Result<String> {
        let offset = self.cursor();
        let available = self.remaining();
        let block = &self.data[offset..offset + available];
        let Some(len) = block.iter().position(|&b| b == 0) else {
            return Err(Error::TruncatedData {
                wanted: available + 1,
                available,
            });
        };
        let value = String::from_utf8_lossy(&block[..len]).into_owned();
        self.top_mut().used += len + 1;
        Ok(value)
    }

    /// Read strings until the end of the current block.
    pub fn read_strings(&mut self) -> Result<Vec<String>> {
        let mut out = Vec::new();
        while !self.at_end_of_form() {
            out.push(self.read_string()?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_is_bgra_on_disk() {
        let mut iff = Iff::new(0);
        iff.insert_chunk("VDCL", true).unwrap();
        iff.insert_color([1.0, 0.5, 0.0, 1.0]).unwrap();
        iff.exit_chunk("VDCL").unwrap();
        let bytes = iff.as_bytes().to_vec();
        assert_eq!(&bytes[8..12], &[0, 128, 255, 255]);

        let mut iff = Iff::from_bytes(bytes);
        iff.enter_chunk("VDCL").unwrap();
        let [r, g, b, a] = iff.read_color().unwrap();
        assert_eq!((r, b, a), (1.0, 0.0, 1.0));
        assert!((g - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_string_without_terminator_is_truncated() {
        let mut raw = b"NAME".to_vec();
        raw.extend_from_slice(&3u32.to_be_bytes());
        raw.extend_from_slice(b"abc");
        let mut iff = Iff::from_bytes(raw);
        iff.enter_chunk("NAME").unwrap();
        assert!(matches!(iff.read_string(), Err(Error::TruncatedData { .. })));
    }

    #[test]
    fn test_count_larger_than_block_is_truncated() {
        let mut raw = b"VERT".to_vec();
        raw.extend_from_slice(&24u32.to_be_bytes());
        raw.extend_from_slice(&[0; 24]);
        let mut iff = Iff::from_bytes(raw);
        iff.enter_chunk("VERT").unwrap();
        assert_eq!(iff.checked_count(2, 12).unwrap(), 2);
        assert!(matches!(
            iff.checked_count(3, 12),
            Err(Error::TruncatedData { wanted: 36, available: 24 })
        ));
        assert!(matches!(
            iff.checked_count(usize::MAX, 60),
            Err(Error::TruncatedData { wanted: usize::MAX, .. })
        ));
        // empty records still need a byte each
        assert!(iff.checked_count(25, 0).is_err());
    }

    #[test]
    fn test_scalar_widths() {
        let mut iff = Iff::new(0);
        iff.insert_chunk("DATA", true).unwrap();
        iff.insert_i8(-3).unwrap();
        iff.insert_u16(0xBEEF).unwrap();
        iff.insert_i16(-2).unwrap();
        iff.insert_i32(-70000).unwrap();
        iff.insert_bool8(true).unwrap();
        iff.insert_vec4(Vec4::new(1.0, 2.0, 3.0, 4.0)).unwrap();
        iff.exit_chunk("DATA").unwrap();

        let mut iff = Iff::from_bytes(iff.into_bytes());
        iff.enter_chunk("DATA").unwrap();
        assert_eq!(iff.read_i8().unwrap(), -3);
        assert_eq!(iff.read_u16().unwrap(), 0xBEEF);
        assert_eq!(iff.read_i16().unwrap(), -2);
        assert_eq!(iff.read_i32().unwrap(), -70000);
        assert!(iff.read_bool8().unwrap());
        assert_eq!(iff.read_vec4().unwrap(), Vec4::new(1.0, 2.0, 3.0, 4.0));
        assert!(iff.at_end_of_form());
    }
}
