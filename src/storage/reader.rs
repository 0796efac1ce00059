use std::io::{Result, SeekFrom};

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::storage::Storage;

impl Storage {
    pub async fn read_block(&self, piece: usize, offset: usize, length: usize) -> Result<Vec<u8>> {
        let mut data = vec![0; length];
        let mut file = File::open(&self.path).await?;
        file.seek(SeekFrom::Start(self.global_offset(piece, offset)))
            .await?;
        file.read_exact(&mut data).await?;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn read_back_written_block() {
        let dir = tempdir().unwrap();
        let storage = Storage::create(dir.path().join("file.bin"), 48, 16)
            .await
            .unwrap();
        let data: Vec<u8> = (0..16).collect();

        storage.write_block(1, 0, &data).await.unwrap();

        assert_eq!(storage.read_block(1, 0, 16).await.unwrap(), data);
        assert_eq!(storage.read_block(0, 0, 16).await.unwrap(), vec![0; 16]);
        assert_eq!(storage.read_block(2, 0, 16).await.unwrap(), vec![0; 16]);
    }

    #[tokio::test]
    async fn read_past_end_fails() {
        let dir = tempdir().unwrap();
        let storage = Storage::create(dir.path().join("file.bin"), 8, 4)
            .await
            .unwrap();

        assert!(storage.read_block(1, 2, 4).await.is_err());
    }
}
