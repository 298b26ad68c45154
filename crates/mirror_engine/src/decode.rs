use std::fs;
use std::path::PathBuf;

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};
use mirror_logging::{mirror_debug, mirror_warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub encoding_label: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("failed to decode bytes with {encoding}: {message}")]
    DecodeFailure { encoding: String, message: String },
}

/// Decode raw bytes into UTF-8 using: BOM -> valid UTF-8 -> chardetng guess.
pub fn decode_text(bytes: &[u8]) -> Result<DecodedText, DecodeError> {
    decode_with(bytes, detect(bytes), true)
}

/// Like [`decode_text`] but replaces malformed sequences instead of failing.
pub fn decode_text_lossy(bytes: &[u8]) -> DecodedText {
    let encoding = detect(bytes);
    match decode_with(bytes, encoding, true) {
        Ok(decoded) => decoded,
        Err(_) => decode_with(bytes, encoding, false).unwrap_or_else(|_| DecodedText {
            text: String::from_utf8_lossy(bytes).into_owned(),
            encoding_label: UTF_8.name().to_string(),
        }),
    }
}

fn detect(bytes: &[u8]) -> &'static Encoding {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return encoding;
    }
    if std::str::from_utf8(bytes).is_ok() {
        return UTF_8;
    }
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    detector.guess(None, true)
}

fn decode_with(
    bytes: &[u8],
    enc: &'static Encoding,
    strict: bool,
) -> Result<DecodedText, DecodeError> {
    let (text, _, had_errors) = enc.decode(bytes);
    if had_errors && strict {
        return Err(DecodeError::DecodeFailure {
            encoding: enc.name().to_string(),
            message: "decoding error".into(),
        });
    }
    Ok(DecodedText {
        text: text.into_owned(),
        encoding_label: enc.name().to_string(),
    })
}

/// Concatenate the given stylesheet files. Unreadable files are skipped.
pub fn load_stylesheets(paths: &[PathBuf]) -> Option<String> {
    let mut css = String::new();
    for path in paths {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                mirror_warn!("Skipping stylesheet {:?}: {}", path, err);
                continue;
            }
        };
        let decoded = match decode_text(&bytes) {
            Ok(decoded) => decoded,
            Err(err) => {
                mirror_warn!("Encoding issue in {:?} ({}), decoding lossily", path, err);
                decode_text_lossy(&bytes)
            }
        };
        mirror_debug!("Adding stylesheet {:?} ({})", path, decoded.encoding_label);
        css.push_str(&decoded.text);
        css.push('\n');
    }
    if css.trim().is_empty() {
        None
    } else {
        Some(css)
    }
}
