use std::io::{Result, SeekFrom};
use std::path::PathBuf;

use log::debug;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};

use crate::storage::Storage;

impl Storage {
    /// Creates (or truncates) the target file and extends it to `total_length`. The file is
    /// sparse on filesystems that support it.
    pub async fn create(
        path: impl Into<PathBuf>,
        total_length: usize,
        piece_length: usize,
    ) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .await?;
        file.set_len(total_length as u64).await?;
        debug!("allocated {} bytes at {}", total_length, path.display());
        Ok(Self { path, piece_length })
    }

    pub async fn write_block(&self, piece: usize, offset: usize, data: &[u8]) -> Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .truncate(false)
            .open(&self.path)
            .await?;
        file.seek(SeekFrom::Start(self.global_offset(piece, offset)))
            .await?;
        file.write_all(data).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn preallocates_zeroed_file() {
        let dir = tempdir().unwrap();
        let storage = Storage::create(dir.path().join("file.bin"), 100, 16)
            .await
            .unwrap();

        let contents = tokio::fs::read(storage.path()).await.unwrap();

        assert_eq!(contents, vec![0; 100]);
    }

    #[tokio::test]
    async fn write_block_at_piece_offset() {
        let dir = tempdir().unwrap();
        let storage = Storage::create(dir.path().join("file.bin"), 40, 16)
            .await
            .unwrap();

        storage.write_block(1, 0, &[7; 16]).await.unwrap();
        storage.write_block(2, 4, &[9; 4]).await.unwrap();

        let contents = tokio::fs::read(storage.path()).await.unwrap();
        let mut expected = vec![0; 40];
        expected[16..32].copy_from_slice(&[7; 16]);
        expected[36..40].copy_from_slice(&[9; 4]);
        assert_eq!(contents, expected);
    }

    #[tokio::test]
    async fn recreating_truncates_previous_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("file.bin");
        let storage = Storage::create(&path, 8, 4).await.unwrap();
        storage.write_block(0, 0, &[1; 8]).await.unwrap();

        let storage = Storage::create(&path, 4, 4).await.unwrap();

        let contents = tokio::fs::read(storage.path()).await.unwrap();
        assert_eq!(contents, vec![0; 4]);
    }

    #[tokio::test]
    async fn write_fails_when_file_is_gone() {
        let dir = tempdir().unwrap();
        let storage = Storage::create(dir.path().join("file.bin"), 8, 4)
            .await
            .unwrap();
        tokio::fs::remove_file(storage.path()).await.unwrap();

        assert!(storage.write_block(0, 0, &[1; 4]).await.is_err());
    }
}
