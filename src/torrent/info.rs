use crate::bencoding::Value;
use crate::core::{SHA1_LEN, Sha1};
use crate::torrent::{DecodeError, DownloadType, integer_field, required};

#[derive(Debug, PartialEq, Clone)]
pub struct Info {
    pub info_hash: Sha1,
    pub piece_length: usize,
    pub pieces: Vec<Sha1>,
    pub download_type: DownloadType,
}

impl Info {
    fn build_pieces(pieces: &[u8]) -> Result<Vec<Sha1>, DecodeError> {
        if pieces.len() % SHA1_LEN != 0 {
            return Err(DecodeError::PieceHashLength(pieces.len()));
        }
        let all = pieces
            .chunks_exact(SHA1_LEN)
            .map(|chunk| {
                let mut bytes = [0; SHA1_LEN];
                bytes.copy_from_slice(chunk);
                Sha1(bytes)
            })
            .collect();
        Ok(all)
    }

    pub fn name(&self) -> &str {
        self.download_type.name()
    }

    pub fn total_pieces(&self) -> usize {
        self.pieces.len()
    }

    pub fn total_length(&self) -> usize {
        self.download_type.length()
    }

    pub fn piece_offset(&self, piece: usize) -> usize {
        self.piece_length * piece
    }

    /// Actual number of bytes in `piece`; only the last piece can be shorter than the piece length.
    pub fn piece_size(&self, piece: usize) -> usize {
        let piece_start = self.piece_offset(piece).min(self.total_length());
        let piece_end = (piece_start + self.piece_length).min(self.total_length());
        piece_end - piece_start
    }
}

impl TryFrom<&Value> for Info {
    type Error = DecodeError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        let info_hash = Sha1::from(value);
        let piece_length = integer_field(value, "piece length")?;
        if piece_length == 0 {
            return Err(DecodeError::InvalidField("piece length"));
        }
        let pieces = required(value, "pieces")?
            .as_bytes()
            .ok_or(DecodeError::InvalidField("pieces"))?;
        let pieces = Info::build_pieces(pieces)?;
        let download_type = DownloadType::try_from(value)?;

        let expected = download_type.length().div_ceil(piece_length);
        if pieces.len() != expected {
            return Err(DecodeError::PieceCountMismatch {
                expected,
                actual: pieces.len(),
            });
        }

        Ok(Info {
            info_hash,
            piece_length,
            pieces,
            download_type,
        })
    }
}
