//! Detached JWS with unencoded payload (RFC 7797).
//!
//! The payload is signed as raw bytes (`"b64": false`) and left out of the
//! serialized token, which then reads `<header>..<signature>`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Header {
    #[serde(rename = "alg")]
    pub algorithm: String,
    #[serde(rename = "b64")]
    pub base64urlencode_payload: bool,
    #[serde(rename = "crit")]
    pub critical: Vec<String>,
}

impl Header {
    pub fn detached(algorithm: &str) -> Self {
        Self {
            algorithm: algorithm.to_string(),
            base64urlencode_payload: false,
            critical: vec!["b64".to_string()],
        }
    }
}

fn base64_encode_json<T: Serialize>(object: &T) -> Result<String, Error> {
    let json = serde_json::to_string(&object)?;
    Ok(base64::encode_config(json, base64::URL_SAFE_NO_PAD))
}

/// Encoded header and signing input for a detached signature over
/// `payload`.
pub fn prepare_detached_unencoded_payload(
    algorithm: &str,
    payload: &[u8],
) -> Result<(String, Vec<u8>), Error> {
    let header_b64 = base64_encode_json(&Header::detached(algorithm))?;
    let signing_input = [header_b64.as_bytes(), b".", payload].concat();
    Ok((header_b64, signing_input))
}

pub fn complete_sign_unencoded_payload(header_b64: &str, signature: &[u8]) -> String {
    let sig_b64 = base64::encode_config(signature, base64::URL_SAFE_NO_PAD);
    [header_b64, "", &sig_b64].join(".")
}

pub fn split_detached_jws(jws: &str) -> Result<(&str, &str), Error> {
    let mut parts = jws.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(header_b64), Some(""), Some(signature_b64), None) => Ok((header_b64, signature_b64)),
        _ => Err(Error::Signature(
            "The proof's JWS must be a detached JWS.".to_string(),
        )),
    }
}

pub struct DecodedJws {
    pub header: Header,
    pub signing_input: Vec<u8>,
    pub signature: Vec<u8>,
}

/// Decodes a detached JWS over `payload`.
///
/// The header must consist of exactly `alg`, `b64` and `crit`, with `alg`
/// equal to `algorithm`, `b64` false and `crit` `["b64"]`. Any other header is
/// rejected with an error rather than reported as a bad signature.
pub fn decode_detached_unencoded_payload(
    jws: &str,
    algorithm: &str,
    payload: &[u8],
) -> Result<DecodedJws, Error> {
    let (header_b64, signature_b64) = split_detached_jws(jws)?;
    let invalid_header = || Error::Signature("Invalid JWS header parameters.".to_string());
    let header_json = base64::decode_config(header_b64, base64::URL_SAFE_NO_PAD)
        .map_err(|_| invalid_header())?;
    let raw: Map<String, Value> =
        serde_json::from_slice(&header_json).map_err(|_| invalid_header())?;
    if raw.len() != 3 {
        return Err(invalid_header());
    }
    let header: Header = serde_json::from_value(Value::Object(raw)).map_err(|_| invalid_header())?;
    if header != Header::detached(algorithm) {
        return Err(invalid_header());
    }
    let signature = base64::decode_config(signature_b64, base64::URL_SAFE_NO_PAD)
        .map_err(|e| Error::Signature(format!("Invalid JWS signature encoding: {}", e)))?;
    let signing_input = [header_b64.as_bytes(), b".", payload].concat();
    Ok(DecodedJws {
        header,
        signing_input,
        signature,
    })
}
