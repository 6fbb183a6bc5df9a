/*
 * Responsibility
 * - claim に載せる文字列 (subject / authorities) の可逆な難読化
 * - encode: value + payload_key を standard base64 にする
 * - decode: base64 を戻して payload_key の suffix を外す
 *
 * This layer has NO security value. It only keeps raw usernames and role
 * names out of the token payload in plain form; the HS256 signature is the
 * only integrity guarantee.
 *
 * thiserror を使わない理由:
 * - このモジュール内で完結するエラー型なので
 * - 呼び出し側は Malformed token として扱うだけなので
 */
use base64::{Engine, engine::general_purpose::STANDARD};
use std::{error::Error, fmt};

pub type Result<T> = std::result::Result<T, TokenCodecError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenCodecError {
    InvalidBase64,
    InvalidUtf8,
    MissingPayloadKey,
}

impl fmt::Display for TokenCodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenCodecError::InvalidBase64 => write!(f, "claim value is not valid base64"),
            TokenCodecError::InvalidUtf8 => write!(f, "claim value is not valid utf-8"),
            TokenCodecError::MissingPayloadKey => {
                write!(f, "claim value was not produced by this codec")
            }
        }
    }
}

impl Error for TokenCodecError {}

#[derive(Clone)]
pub struct TokenCodec {
    payload_key: String,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print the payload key
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(payload_key: impl Into<String>) -> Self {
        Self {
            payload_key: payload_key.into(),
        }
    }

    pub fn encode(&self, value: &str) -> String {
        let mut raw = String::with_capacity(value.len() + self.payload_key.len());
        raw.push_str(value);
        raw.push_str(&self.payload_key);
        STANDARD.encode(raw.as_bytes())
    }

    pub fn decode(&self, value: &str) -> Result<String> {
        let bytes = STANDARD
            .decode(value)
            .map_err(|_| TokenCodecError::InvalidBase64)?;
        let raw = String::from_utf8(bytes).map_err(|_| TokenCodecError::InvalidUtf8)?;

        raw.strip_suffix(self.payload_key.as_str())
            .map(str::to_owned)
            .ok_or(TokenCodecError::MissingPayloadKey)
    }
}
