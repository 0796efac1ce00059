mod download_type;
mod info;

use url::Url;

use crate::bencoding::{self, Value};

pub use download_type::*;
pub use info::*;

// https://wiki.theory.org/BitTorrentSpecification#Metainfo_File_Structure

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed encoding: {0}")]
    MalformedEncoding(#[from] bencoding::Error),
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("invalid field `{0}`")]
    InvalidField(&'static str),
    #[error("invalid announce url: {0}")]
    InvalidAnnounce(#[from] url::ParseError),
    #[error("pieces length {0} is not a multiple of 20")]
    PieceHashLength(usize),
    #[error("expected {expected} piece hashes, found {actual}")]
    PieceCountMismatch { expected: usize, actual: usize },
}

#[derive(Debug, PartialEq, Clone)]
pub struct Torrent {
    pub announce: Url,
    pub info: Info,
}

impl Torrent {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let value = Value::try_from(bytes)?;
        Torrent::try_from(&value)
    }
}

impl TryFrom<&Value> for Torrent {
    type Error = DecodeError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        let announce = required(value, "announce")?
            .as_str()
            .ok_or(DecodeError::InvalidField("announce"))?;
        let announce = Url::parse(announce)?;
        let info = Info::try_from(required(value, "info")?)?;
        Ok(Torrent { announce, info })
    }
}

pub(crate) fn required<'a>(value: &'a Value, key: &'static str) -> Result<&'a Value, DecodeError> {
    value.get(key).ok_or(DecodeError::MissingField(key))
}

pub(crate) fn integer_field(value: &Value, key: &'static str) -> Result<usize, DecodeError> {
    required(value, key)?
        .as_integer()
        .and_then(|integer| usize::try_from(integer).ok())
        .ok_or(DecodeError::InvalidField(key))
}
