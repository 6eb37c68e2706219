//! Write-once audio cache
//!
//! Each arriving chunk is persisted under its segment id before playback.
//! Ids are unique per segment per request, so a key is written at most once
//! and never concurrently.

use std::path::{Path, PathBuf};

use talkstream_core::AudioChunk;

use crate::ClientError;

/// Per-turn audio file cache.
pub struct AudioCache {
    dir: PathBuf,
}

impl AudioCache {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Persist a chunk, keyed by id and format. An existing file is left
    /// untouched and its path returned.
    pub async fn store(&self, chunk: &AudioChunk) -> Result<PathBuf, ClientError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self
            .dir
            .join(format!("{}.{}", chunk.id, chunk.format.extension()));

        if tokio::fs::try_exists(&path).await? {
            return Ok(path);
        }

        tokio::fs::write(&path, &chunk.bytes).await?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use bytes::Bytes;
    use talkstream_core::AudioFormat;

    fn chunk(id: u64, payload: &[u8]) -> AudioChunk {
        AudioChunk {
            id,
            format: AudioFormat::Wav,
            bytes: Bytes::copy_from_slice(payload),
        }
    }

    #[tokio::test]
    async fn test_store_and_write_once() {
        let dir = std::env::temp_dir().join(format!("talkstream-cache-{}", std::process::id()));
        let cache = AudioCache::new(&dir);

        let path = cache.store(&chunk(1, b"first")).await.unwrap();
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"first");

        // a second store for the same id does not overwrite
        let again = cache.store(&chunk(1, b"second")).await.unwrap();
        assert_eq!(again, path);
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"first");

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
