use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use crc::{Crc, CRC_32_ISO_HDLC};

/// Standard CRC-32 (zlib / PKZIP polynomial, reflected, final xor).
const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

pub fn crc32(bytes: &[u8]) -> u32 {
    CRC32.checksum(bytes)
}

/// Decode a cloud payload. Surrounding whitespace is ignored.
pub fn decode_payload(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(data.trim())
}

/// CRC-32 of a payload in the two renderings the device prints.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Checksum(pub u32);

impl Checksum {
    pub fn of(bytes: &[u8]) -> Self {
        Self(crc32(bytes))
    }

    pub fn decimal(&self) -> String {
        self.0.to_string()
    }

    /// Zero-padded 8-digit uppercase hex.
    pub fn hex(&self) -> String {
        format!("{:08X}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vectors() {
        assert_eq!(crc32(b"\x01\x02\x03\x04"), 3_057_449_933);
        assert_eq!(Checksum::of(b"\x01\x02\x03\x04").hex(), "B63CFBCD");
        assert_eq!(crc32(b"hello"), 907_060_870);
        assert_eq!(Checksum::of(b"hello").hex(), "3610A686");
    }

    #[test]
    fn empty_input_is_zero_padded() {
        let c = Checksum::of(b"");
        assert_eq!(c.decimal(), "0");
        assert_eq!(c.hex(), "00000000");
    }

    #[test]
    fn payload_decoding() {
        assert_eq!(decode_payload(" AQIDBA==\n").unwrap(), vec![1, 2, 3, 4]);
        assert!(decode_payload("not base64!").is_err());
    }
}
