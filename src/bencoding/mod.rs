mod decoder;
mod encoder;
mod value;

pub use decoder::*;
pub use value::*;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("malformed bencode at byte {position}: {reason}")]
    Malformed { position: usize, reason: String },
    #[error("incomplete bencode value")]
    Incomplete,
}

impl From<Error> for std::io::Error {
    fn from(value: Error) -> Self {
        std::io::Error::new(std::io::ErrorKind::InvalidData, value)
    }
}
