use std::fmt::{self, Debug, Display, Formatter};

use sha1::Digest;

use crate::bencoding::Value;

pub const SHA1_LEN: usize = 20;

#[derive(PartialEq, Eq, Clone, Copy, Hash)]
pub struct Sha1(pub [u8; SHA1_LEN]);

impl Sha1 {
    pub fn digest(data: &[u8]) -> Self {
        Self(sha1::Sha1::digest(data).into())
    }
}

/// Hashes the canonical encoding of a bencoded value. For the `info` dictionary of a torrent this
/// is the info hash.
impl From<&Value> for Sha1 {
    fn from(value: &Value) -> Self {
        Self::digest(&value.to_bytes())
    }
}

impl Debug for Sha1 {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Sha1({})", hex::encode(self.0))
    }
}

impl Display for Sha1 {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}
