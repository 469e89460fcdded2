//! Value codecs.
//!
//! Every value in a parameter file goes through the same codec, chosen by the
//! file's [`Mode`]. The stored text is always standard base64 so it fits on a
//! single line.

use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

use base64::{engine::general_purpose, Engine as _};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::crypto::{self, Key};
use crate::error::{ParamError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Plain,
    Compressed,
    Encrypted,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Plain, Mode::Compressed, Mode::Encrypted];

    /// Decimal marker persisted in the reserved parameter.
    pub fn marker(self) -> &'static str {
        match self {
            Mode::Plain => "0",
            Mode::Compressed => "1",
            Mode::Encrypted => "2",
        }
    }

    pub fn from_marker(marker: &str) -> Option<Mode> {
        match marker {
            "0" => Some(Mode::Plain),
            "1" => Some(Mode::Compressed),
            "2" => Some(Mode::Encrypted),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Mode::Plain => "plain",
            Mode::Compressed => "compressed",
            Mode::Encrypted => "encrypted",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim().to_ascii_lowercase();
        Mode::ALL
            .into_iter()
            .find(|mode| mode.name() == lowered)
            .or_else(|| Mode::from_marker(&lowered))
            .ok_or_else(|| ParamError::Validation(format!("unknown mode \"{s}\"")))
    }
}

/// Transform a plaintext value into its stored form.
pub fn encode(mode: Mode, key: Option<&Key>, plaintext: &str) -> Result<String> {
    let bytes = match mode {
        Mode::Plain => plaintext.as_bytes().to_vec(),
        Mode::Compressed => compress(plaintext.as_bytes())?,
        Mode::Encrypted => crypto::encrypt(require_key(key)?, plaintext.as_bytes())?,
    };
    Ok(general_purpose::STANDARD.encode(bytes))
}

/// Reverse [`encode`].
pub fn decode(mode: Mode, key: Option<&Key>, stored: &str) -> Result<String> {
    let raw = general_purpose::STANDARD.decode(stored)?;
    let bytes = match mode {
        Mode::Plain => raw,
        Mode::Compressed => decompress(&raw)?,
        Mode::Encrypted => crypto::decrypt(require_key(key)?, &raw)?.to_vec(),
    };
    String::from_utf8(bytes).map_err(|e| ParamError::Decode(format!("utf-8: {e}")))
}

fn require_key(key: Option<&Key>) -> Result<&Key> {
    key.ok_or_else(|| ParamError::Validation("encrypted mode requires a key".into()))
}

fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder
        .write_all(data)
        .map_err(ParamError::io("compress value"))?;
    encoder.finish().map_err(ParamError::io("finish compression"))
}

fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| ParamError::Decode(format!("gzip: {e}")))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: &[&str] = &[
        "",
        "v1",
        "value with spaces and $dollars$",
        "multi\nline\r\nvalue",
        "юникод ✓",
    ];

    #[test]
    fn every_mode_round_trips() {
        let key = crypto::derive_key("pw");
        for mode in Mode::ALL {
            for sample in SAMPLES {
                let stored = encode(mode, Some(&*key), sample).unwrap();
                assert!(!stored.contains('\n'), "{mode} produced a multi-line value");
                assert_eq!(decode(mode, Some(&*key), &stored).unwrap(), *sample);
            }
        }
    }

    #[test]
    fn plain_is_base64() {
        assert_eq!(encode(Mode::Plain, None, "v1").unwrap(), "djE=");
    }

    #[test]
    fn malformed_base64_is_decode_error() {
        for mode in Mode::ALL {
            let key = crypto::derive_key("pw");
            assert!(matches!(
                decode(mode, Some(&*key), "not base64!"),
                Err(ParamError::Decode(_))
            ));
        }
    }

    #[test]
    fn corrupt_gzip_is_decode_error() {
        let stored = general_purpose::STANDARD.encode(b"definitely not gzip");
        assert!(matches!(
            decode(Mode::Compressed, None, &stored),
            Err(ParamError::Decode(_))
        ));
    }

    #[test]
    fn encrypted_requires_key() {
        assert!(matches!(
            encode(Mode::Encrypted, None, "v"),
            Err(ParamError::Validation(_))
        ));
    }

    #[test]
    fn short_ciphertext_is_malformed_nonce() {
        let key = crypto::derive_key("pw");
        let stored = general_purpose::STANDARD.encode([1u8; 8]);
        assert!(matches!(
            decode(Mode::Encrypted, Some(&*key), &stored),
            Err(ParamError::MalformedNonce { .. })
        ));
    }

    #[test]
    fn mode_parses_names_and_markers() {
        assert_eq!("Encrypted".parse::<Mode>().unwrap(), Mode::Encrypted);
        assert_eq!("1".parse::<Mode>().unwrap(), Mode::Compressed);
        assert!("zip".parse::<Mode>().is_err());
        for mode in Mode::ALL {
            assert_eq!(Mode::from_marker(mode.marker()), Some(mode));
        }
    }

    #[test]
    fn marker_must_match_exactly() {
        for damaged in [" 2", "2 ", "02", "2\n", ""] {
            assert_eq!(Mode::from_marker(damaged), None, "{damaged:?}");
        }
        assert_eq!(" plain ".parse::<Mode>().unwrap(), Mode::Plain);
    }
}
