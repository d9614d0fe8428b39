//! Stream codecs: zlib/deflate plus the two ASCII armors PDF content streams use.

use crate::error::GraphError;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

pub fn inflate(data: &[u8]) -> Result<Vec<u8>, GraphError> {
    let mut decoder = ZlibDecoder::new(data);
    let mut decoded = Vec::new();
    decoder
        .read_to_end(&mut decoded)
        .map_err(|e| GraphError::Codec(format!("FlateDecode: {}", e)))?;
    Ok(decoded)
}

/// Zlib-compress at the best compression level.
pub fn deflate(data: &[u8]) -> Result<Vec<u8>, GraphError> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::best());
    encoder
        .write_all(data)
        .map_err(|e| GraphError::Codec(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| GraphError::Codec(e.to_string()))
}

/// Decode ASCII85 data. An optional `<~` prefix is accepted; `~>` ends the data.
pub fn decode_ascii85(data: &[u8]) -> Result<Vec<u8>, GraphError> {
    let data = data.strip_prefix(b"<~").unwrap_or(data);
    let mut result = Vec::with_capacity(data.len() * 4 / 5);
    let mut group: u64 = 0;
    let mut count = 0;

    for &byte in data {
        if byte.is_ascii_whitespace() {
            continue;
        }
        if byte == b'~' {
            break;
        }

        // 'z' stands for four zero bytes
        if byte == b'z' {
            if count != 0 {
                return Err(GraphError::Codec("ASCII85Decode: 'z' inside a group".into()));
            }
            result.extend_from_slice(&[0, 0, 0, 0]);
            continue;
        }

        if !(b'!'..=b'u').contains(&byte) {
            return Err(GraphError::Codec(format!(
                "ASCII85Decode: invalid character 0x{:02x}",
                byte
            )));
        }

        group = group * 85 + u64::from(byte - b'!');
        count += 1;

        if count == 5 {
            let word = u32::try_from(group)
                .map_err(|_| GraphError::Codec("ASCII85Decode: group overflow".into()))?;
            result.extend_from_slice(&word.to_be_bytes());
            group = 0;
            count = 0;
        }
    }

    match count {
        0 => {}
        1 => return Err(GraphError::Codec("ASCII85Decode: dangling final character".into())),
        _ => {
            // Pad with 'u' and keep count - 1 bytes
            for _ in count..5 {
                group = group * 85 + 84;
            }
            let word = u32::try_from(group)
                .map_err(|_| GraphError::Codec("ASCII85Decode: group overflow".into()))?;
            result.extend_from_slice(&word.to_be_bytes()[..count - 1]);
        }
    }

    Ok(result)
}

/// Encode data with ASCII85, terminated by `~>`.
pub fn encode_ascii85(data: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(data.len() * 5 / 4 + 2);

    for chunk in data.chunks(4) {
        let mut bytes = [0u8; 4];
        bytes[..chunk.len()].copy_from_slice(chunk);
        let group = u32::from_be_bytes(bytes);

        if group == 0 && chunk.len() == 4 {
            result.push(b'z');
            continue;
        }

        let mut encoded = [0u8; 5];
        let mut rest = group;
        for slot in encoded.iter_mut().rev() {
            *slot = (rest % 85) as u8 + b'!';
            rest /= 85;
        }
        result.extend_from_slice(&encoded[..chunk.len() + 1]);
    }

    result.extend_from_slice(b"~>");
    result
}

/// Decode ASCIIHex data; `>` ends the data and an odd final digit is padded with zero.
pub fn decode_ascii_hex(data: &[u8]) -> Result<Vec<u8>, GraphError> {
    let mut result = Vec::with_capacity(data.len() / 2);
    let mut high_nibble: Option<u8> = None;

    for &byte in data {
        if byte.is_ascii_whitespace() {
            continue;
        }
        if byte == b'>' {
            break;
        }

        let nibble = match byte {
            b'0'..=b'9' => byte - b'0',
            b'A'..=b'F' => byte - b'A' + 10,
            b'a'..=b'f' => byte - b'a' + 10,
            _ => {
                return Err(GraphError::Codec(format!(
                    "ASCIIHexDecode: invalid character 0x{:02x}",
                    byte
                )))
            }
        };

        match high_nibble.take() {
            None => high_nibble = Some(nibble),
            Some(high) => result.push((high << 4) | nibble),
        }
    }

    if let Some(high) = high_nibble {
        result.push(high << 4);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii85_known_vector() {
        assert_eq!(encode_ascii85(b"Hello World"), b"87cURD]i,\"Ebo7~>".to_vec());
        assert_eq!(decode_ascii85(b"<~87cURD]i,\"Ebo7~>").unwrap(), b"Hello World".to_vec());
    }

    #[test]
    fn ascii85_zero_group_uses_z() {
        let encoded = encode_ascii85(b"\0\0\0\0abc");
        assert_eq!(encoded, b"z@:E^~>".to_vec());
        assert_eq!(decode_ascii85(&encoded).unwrap(), b"\0\0\0\0abc".to_vec());
    }

    #[test]
    fn ascii85_ignores_whitespace() {
        assert_eq!(
            decode_ascii85(b"87cUR D]i,\n\"Ebo7 ~>").unwrap(),
            b"Hello World".to_vec()
        );
    }

    #[test]
    fn ascii85_rejects_garbage() {
        assert!(decode_ascii85(b"87c{R~>").is_err());
        assert!(decode_ascii85(b"87z~>").is_err());
    }

    #[test]
    fn ascii_hex_handles_odd_digits_and_case() {
        assert_eq!(decode_ascii_hex(b"48 65 6c6C 6F>").unwrap(), b"Hello".to_vec());
        assert_eq!(decode_ascii_hex(b"7>").unwrap(), vec![0x70]);
        assert!(decode_ascii_hex(b"4G>").is_err());
    }

    #[test]
    fn deflate_then_inflate_restores_bytes() {
        let text = b"q 1 0 0 1 72 720 cm BT /F1 12 Tf (repeat repeat repeat) Tj ET Q".repeat(20);
        let packed = deflate(&text).unwrap();
        assert!(packed.len() < text.len());
        assert_eq!(inflate(&packed).unwrap(), text);
    }

    #[test]
    fn inflate_reports_corrupt_input() {
        assert!(matches!(inflate(b"not zlib"), Err(GraphError::Codec(_))));
    }
}
