//! Command integrity tag
//!
//! The station can protect commands and responses with a three character
//! tag derived from a CRC-16 (polynomial 0x8005 reflected, init 0x0000).
//! Each character carries a slice of the CRC ORed with 0x40 so the tag is
//! always printable. The driver never enables CRC framing on its own; these
//! helpers exist for callers that switch the station into CRC mode.

/// CRC-16 over the command or response body
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0x0000;

    for &byte in data {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            if crc & 0x0001 != 0 {
                crc = (crc >> 1) ^ 0xA001;
            } else {
                crc >>= 1;
            }
        }
    }

    crc
}

/// Encode a CRC as the three printable tag characters
pub fn encode_tag(crc: u16) -> [u8; 3] {
    [
        0x40 | (crc >> 12) as u8,
        0x40 | ((crc >> 6) & 0x3F) as u8,
        0x40 | (crc & 0x3F) as u8,
    ]
}

/// Compute the integrity tag for `data`
pub fn crc_tag(data: &[u8]) -> [u8; 3] {
    encode_tag(crc16(data))
}

/// Check a line whose last three bytes are an integrity tag.
///
/// The terminator must already be removed.
pub fn verify(line: &[u8]) -> bool {
    if line.len() < 3 {
        return false;
    }
    let (body, tag) = line.split_at(line.len() - 3);
    crc_tag(body) == tag
}
