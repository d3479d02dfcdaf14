//! Content-identity CRC
//!
//! SWG hashes with the MSB-first CRC-32 (polynomial `0x04C11DB7`, no
//! reflection, init and final xor `0xFFFFFFFF`), i.e. CRC-32/BZIP2.

const POLYNOMIAL: u32 = 0x04C11DB7;

const TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0u32;
    while i < 256 {
        let mut crc = i << 24;
        let mut j = 0;
        while j < 8 {
            if crc & 0x80000000 != 0 {
                crc = (crc << 1) ^ POLYNOMIAL;
            } else {
                crc <<= 1;
            }
            j += 1;
        }
        table[i as usize] = crc;
        i += 1;
    }
    table
};

/// CRC over `data`.
#[must_use]
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = 0xFFFFFFFFu32;
    for &byte in data {
        crc = TABLE[(((crc >> 24) ^ u32::from(byte)) & 0xFF) as usize] ^ (crc << 8);
    }
    !crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_value() {
        assert_eq!(crc32(b"123456789"), 0xFC891918);
    }

    #[test]
    fn test_table_spot_values() {
        assert_eq!(TABLE[0], 0);
        assert_eq!(TABLE[1], POLYNOMIAL);
        assert_eq!(TABLE[255], 0xB1F740B4);
    }

    #[test]
    fn test_single_byte_flip_changes_crc() {
        let data = b"FORM\x00\x00\x00\x04PRTO".to_vec();
        let base = crc32(&data);
        for i in 0..data.len() {
            for bit in 0..8 {
                let mut flipped = data.clone();
                flipped[i] ^= 1 << bit;
                assert_ne!(crc32(&flipped), base, "byte {i} bit {bit}");
            }
        }
    }
}
