use anyhow::{bail, Context, Result};
use std::fmt::Write;

/// Data bytes per record when writing.
const RECORD_LEN: usize = 16;

/// A parsed segment of data at a specific address from an Intel HEX file.
#[derive(Debug, Clone)]
pub struct HexSegment {
    pub address: u32,
    pub data: Vec<u8>,
}

/// Parse an Intel HEX format string into address-data segments.
///
/// Supports record types:
/// - 00: Data
/// - 01: End of File
/// - 02: Extended Segment Address
pub fn parse_hex(input: &str) -> Result<Vec<HexSegment>> {
    let mut segments: Vec<HexSegment> = Vec::new();
    let mut base_address: u32 = 0;

    for (line_num, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some(body) = line.strip_prefix(':') else {
            bail!("line {}: missing start code ':'", line_num + 1);
        };

        let bytes = decode_hex_bytes(body)
            .with_context(|| format!("line {}: invalid hex data", line_num + 1))?;

        if bytes.len() < 5 {
            bail!("line {}: record too short", line_num + 1);
        }

        let byte_count = bytes[0] as usize;
        if bytes.len() != 5 + byte_count {
            bail!(
                "line {}: expected {} data bytes, got {}",
                line_num + 1,
                byte_count,
                bytes.len() - 5
            );
        }

        // Sum of all bytes including the checksum must be 0 mod 256
        let checksum: u8 = bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
        if checksum != 0 {
            bail!("line {}: checksum mismatch", line_num + 1);
        }

        let address = u16::from_be_bytes([bytes[1], bytes[2]]);
        let data = &bytes[4..4 + byte_count];

        match bytes[3] {
            0x00 => {
                let full_address = base_address + address as u32;

                // Extend the last segment if this record is contiguous
                if let Some(last) = segments.last_mut() {
                    if full_address == last.address + last.data.len() as u32 {
                        last.data.extend_from_slice(data);
                        continue;
                    }
                }

                segments.push(HexSegment {
                    address: full_address,
                    data: data.to_vec(),
                });
            }
            0x01 => break,
            0x02 => {
                if byte_count != 2 {
                    bail!("line {}: extended segment address must be 2 bytes", line_num + 1);
                }
                base_address = (u16::from_be_bytes([data[0], data[1]]) as u32) << 4;
            }
            other => {
                bail!("line {}: unsupported record type 0x{:02X}", line_num + 1, other);
            }
        }
    }

    Ok(segments)
}

/// Lay segments out over `len` bytes starting at address 0.
/// Bytes not covered by any segment read as 0xFF (erased EEPROM); data past
/// `len` is ignored.
pub fn fill_image(segments: &[HexSegment], len: usize) -> Vec<u8> {
    let mut image = vec![0xFFu8; len];

    for seg in segments {
        for (i, &byte) in seg.data.iter().enumerate() {
            let address = seg.address as usize + i;
            if address < len {
                image[address] = byte;
            }
        }
    }

    image
}

/// Encode `data` (starting at address 0) as Intel HEX.
pub fn write_hex(data: &[u8]) -> String {
    let mut out = String::new();

    for (i, chunk) in data.chunks(RECORD_LEN).enumerate() {
        let address = (i * RECORD_LEN) as u16;
        let mut record = vec![chunk.len() as u8];
        record.extend_from_slice(&address.to_be_bytes());
        record.push(0x00);
        record.extend_from_slice(chunk);
        push_record(&mut out, &record);
    }

    push_record(&mut out, &[0x00, 0x00, 0x00, 0x01]);
    out
}

fn push_record(out: &mut String, record: &[u8]) {
    let sum = record.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    out.push(':');
    for byte in record {
        let _ = write!(out, "{:02X}", byte);
    }
    let _ = writeln!(out, "{:02X}", sum.wrapping_neg());
}

fn decode_hex_bytes(hex: &str) -> Result<Vec<u8>> {
    if hex.len() % 2 != 0 {
        bail!("odd number of hex characters");
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .with_context(|| format!("invalid hex at position {}", i))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let hex = ":10000000000102030405060708090A0B0C0D0E0F78\n\
                   :00000001FF\n";
        let segments = parse_hex(hex).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].address, 0);
        assert_eq!(segments[0].data.len(), 16);
        assert_eq!(segments[0].data[15], 0x0F);
    }

    #[test]
    fn test_checksum_error() {
        let hex = ":10000000000102030405060708090A0B0C0D0E0F00\n\
                   :00000001FF\n";
        assert!(parse_hex(hex).is_err());
    }

    #[test]
    fn test_truncated_record() {
        assert!(parse_hex(":0400000011\n").is_err());
    }

    #[test]
    fn test_contiguous_merge() {
        let hex = ":04000000AABBCCDDEE\n\
                   :04000400112233444E\n\
                   :00000001FF\n";
        let segments = parse_hex(hex).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].data, vec![0xAA, 0xBB, 0xCC, 0xDD, 0x11, 0x22, 0x33, 0x44]);
    }

    #[test]
    fn test_fill_image_pads_with_erased() {
        let segments = vec![
            HexSegment {
                address: 0x02,
                data: vec![0x5A, 0x00],
            },
            HexSegment {
                address: 0x30,
                data: vec![0x11],
            },
        ];
        let image = fill_image(&segments, 8);
        assert_eq!(image, vec![0xFF, 0xFF, 0x5A, 0x00, 0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_written_hex_parses_back() {
        let data: Vec<u8> = (0u8..20).collect();
        let text = write_hex(&data);
        assert!(text.starts_with(":10000000000102030405060708090A0B0C0D0E0F78\n"));
        assert!(text.ends_with(":00000001FF\n"));

        let segments = parse_hex(&text).unwrap();
        assert_eq!(fill_image(&segments, 20), data);
    }
}
