//! Diagram text → rendering-service URL.
//!
//! Nothing here touches the network: the URL is handed to the client (an
//! `<img src>` or a browser) which fetches the picture from the public
//! service. Every function is a deterministic, total mapping from text to URL.
//!
//! ## Encodings
//!
//! | Dialect  | Service        | Path segment |
//! |----------|----------------|--------------|
//! | PlantUML | plantuml.com   | raw DEFLATE + PlantUML 6-bit alphabet |
//! | Mermaid  | mermaid.ink    | base64 of the UTF-8 text |
//! | ZenUML   | zenuml.com     | base64 of the UTF-8 text |
//!
//! Base64 segments use the URL-safe alphabet so a `/` in the encoded text
//! can never split the path; both services decode either alphabet.

use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use thiserror::Error;

/// Public PlantUML SVG endpoint.
pub const PLANTUML_SVG_BASE: &str = "https://www.plantuml.com/plantuml/svg";

/// Public mermaid.ink image endpoint.
pub const MERMAID_IMG_BASE: &str = "https://mermaid.ink/img";

/// Public ZenUML PNG endpoint.
pub const ZENUML_PNG_BASE: &str = "https://zenuml.com/api/png";

/// URLs longer than this are rejected by many proxies and browsers.
///
/// The encoders still return them; the orchestrator only logs a warning.
pub const MAX_PORTABLE_URL_LEN: usize = 8 * 1024;

/// PlantUML's base64 variant: digits first, then upper, lower, `-`, `_`.
const PLANTUML_ALPHABET: &[u8; 64] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz-_";

/// Failure decoding a PlantUML text-encoded segment.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid character {0:?} in PlantUML encoding")]
    InvalidChar(char),

    #[error("PlantUML encoding length {0} is not a multiple of 4")]
    InvalidLength(usize),

    #[error("inflate failed: {0}")]
    Inflate(String),

    #[error("decoded diagram is not valid UTF-8")]
    NotUtf8,
}

// ── PlantUML ─────────────────────────────────────────────────────────────

/// Build the PlantUML SVG URL for `text` under `base`.
pub fn plantuml_url(base: &str, text: &str) -> String {
    join(base, &encode_plantuml(text))
}

/// Apply PlantUML's text encoding: DEFLATE, then the 6-bit alphabet.
pub fn encode_plantuml(text: &str) -> String {
    encode64(&deflate(text.as_bytes()))
}

/// Reverse [`encode_plantuml`].
pub fn decode_plantuml(encoded: &str) -> Result<String, DecodeError> {
    let compressed = decode64(encoded)?;
    let mut out = Vec::new();
    DeflateDecoder::new(compressed.as_slice())
        .read_to_end(&mut out)
        .map_err(|e| DecodeError::Inflate(e.to_string()))?;
    String::from_utf8(out).map_err(|_| DecodeError::NotUtf8)
}

fn deflate(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::with_capacity(bytes.len()), Compression::best());
    // Writing into a Vec cannot fail.
    if encoder.write_all(bytes).is_err() {
        return Vec::new();
    }
    encoder.finish().unwrap_or_default()
}

fn encode64(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(3) * 4);
    for chunk in data.chunks(3) {
        let b1 = chunk[0];
        let b2 = chunk.get(1).copied().unwrap_or(0);
        let b3 = chunk.get(2).copied().unwrap_or(0);
        for six in [
            b1 >> 2,
            ((b1 & 0x3) << 4) | (b2 >> 4),
            ((b2 & 0xF) << 2) | (b3 >> 6),
            b3 & 0x3F,
        ] {
            out.push(PLANTUML_ALPHABET[six as usize] as char);
        }
    }
    out
}

fn decode64(encoded: &str) -> Result<Vec<u8>, DecodeError> {
    let bytes = encoded.as_bytes();
    if bytes.len() % 4 != 0 {
        return Err(DecodeError::InvalidLength(bytes.len()));
    }
    let mut out = Vec::with_capacity(bytes.len() / 4 * 3);
    for group in bytes.chunks(4) {
        let mut six = [0u8; 4];
        for (slot, &c) in six.iter_mut().zip(group) {
            *slot = decode6bit(c).ok_or(DecodeError::InvalidChar(c as char))?;
        }
        out.push((six[0] << 2) | (six[1] >> 4));
        out.push((six[1] << 4) | (six[2] >> 2));
        out.push((six[2] << 6) | six[3]);
    }
    Ok(out)
}

fn decode6bit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'A'..=b'Z' => Some(c - b'A' + 10),
        b'a'..=b'z' => Some(c - b'a' + 36),
        b'-' => Some(62),
        b'_' => Some(63),
        _ => None,
    }
}

// ── Mermaid / ZenUML ─────────────────────────────────────────────────────

/// Build the mermaid.ink image URL for `text` under `base`.
pub fn mermaid_url(base: &str, text: &str) -> String {
    join(base, &URL_SAFE.encode(text.as_bytes()))
}

/// Build the ZenUML PNG URL for `text` under `base`.
pub fn zenuml_url(base: &str, text: &str) -> String {
    join(base, &URL_SAFE.encode(text.as_bytes()))
}

fn join(base: &str, segment: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), segment)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "@startuml\nAlice -> Bob: hello\n@enduml";

    #[test]
    fn mermaid_segment_decodes_to_source() {
        let url = mermaid_url(MERMAID_IMG_BASE, "graph TD;A-->B;");
        let segment = url.strip_prefix("https://mermaid.ink/img/").expect("prefix");
        let decoded = URL_SAFE.decode(segment).expect("valid base64");
        assert_eq!(decoded, b"graph TD;A-->B;");
    }

    #[test]
    fn zenuml_url_shape() {
        let url = zenuml_url(ZENUML_PNG_BASE, "A.method() { return }");
        assert!(url.starts_with("https://zenuml.com/api/png/"));
        assert!(!url["https://zenuml.com/api/png/".len()..].contains('/'));
    }

    #[test]
    fn base64_segment_never_contains_slash() {
        // Standard base64 of "???" is "Pz8/".
        let url = mermaid_url(MERMAID_IMG_BASE, "???");
        assert_eq!(url, "https://mermaid.ink/img/Pz8_");
    }

    #[test]
    fn plantuml_roundtrip_and_alphabet() {
        let encoded = encode_plantuml(SAMPLE);
        assert!(encoded
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_'));
        assert_eq!(decode_plantuml(&encoded).unwrap(), SAMPLE);
    }

    #[test]
    fn plantuml_handles_unicode() {
        let text = "@startuml\nÉlise -> 東京: こんにちは\n@enduml";
        assert_eq!(decode_plantuml(&encode_plantuml(text)).unwrap(), text);
    }

    #[test]
    fn encode64_matches_reference_grouping() {
        // 0x00 0x10 0x83 → 6-bit groups 0, 1, 2, 3
        assert_eq!(encode64(&[0x00, 0x10, 0x83]), "0123");
        // Short tails are zero-padded to a full group.
        assert_eq!(encode64(&[0xFF]), "_m00");
        assert_eq!(decode64("0123").unwrap(), vec![0x00, 0x10, 0x83]);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert_eq!(decode_plantuml("abc"), Err(DecodeError::InvalidLength(3)));
        assert_eq!(decode_plantuml("ab+d"), Err(DecodeError::InvalidChar('+')));
    }

    #[test]
    fn urls_are_deterministic() {
        assert_eq!(plantuml_url(PLANTUML_SVG_BASE, SAMPLE), plantuml_url(PLANTUML_SVG_BASE, SAMPLE));
        assert!(plantuml_url(PLANTUML_SVG_BASE, SAMPLE).starts_with("https://www.plantuml.com/plantuml/svg/"));
    }

    #[test]
    fn custom_base_trailing_slash() {
        assert_eq!(mermaid_url("http://localhost:3001/img/", "a"), "http://localhost:3001/img/YQ==");
    }
}
