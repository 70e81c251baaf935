//! Atomic collection file writer
//!
//! A collection file is replaced in two steps:
//! 1. Write the full snapshot to a uniquely named temp file in the target
//!    directory and fsync it (`stage`)
//! 2. Rename the temp file over the target (`StagedWrite::commit`)
//!
//! The rename is the only step that changes what readers observe. A crash
//! before it leaves the old file; a crash after it leaves the new file.

use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serializer;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use super::errors::StorageResult;
use crate::crash_point::{maybe_crash, points};
use crate::record::Record;

/// Serialize records as one JSON array.
///
/// Keys inside each record are emitted in sorted order, so identical
/// data always encodes to identical bytes. Output ends with a newline.
pub fn encode_records<'a, I>(records: I, pretty: bool) -> serde_json::Result<Vec<u8>>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut buf = Vec::with_capacity(4096);
    if pretty {
        let mut ser = serde_json::Serializer::pretty(&mut buf);
        (&mut ser).collect_seq(records)?;
    } else {
        let mut ser = serde_json::Serializer::new(&mut buf);
        (&mut ser).collect_seq(records)?;
    }
    buf.push(b'\n');
    Ok(buf)
}

/// Temp file path for an atomic write of `target`.
///
/// Lives next to the target so the rename never crosses filesystems.
/// Suffix: process id, nanosecond timestamp, random component.
pub fn temp_path_for(target: &Path) -> PathBuf {
    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "collection".to_string());
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let suffix = format!(
        "{}.{}.{}.{:08x}.tmp",
        file_name,
        process::id(),
        nanos,
        rand::random::<u32>()
    );
    target.with_file_name(suffix)
}

/// A fully written, fsynced temp file that has not yet replaced its target.
///
/// Dropping a `StagedWrite` without calling `commit` or `discard` removes
/// the temp file. Only an abort leaves it behind.
#[derive(Debug)]
pub struct StagedWrite {
    target: PathBuf,
    temp: PathBuf,
    /// Temp file renamed or already removed
    done: bool,
}

impl StagedWrite {
    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp
    }

    /// Rename the temp file over the target.
    pub async fn commit(mut self) -> io::Result<()> {
        maybe_crash(points::PERSIST_BEFORE_RENAME);

        if let Err(e) = fs::rename(&self.temp, &self.target).await {
            remove_quietly(&self.temp).await;
            self.done = true;
            return Err(e);
        }
        self.done = true;

        maybe_crash(points::PERSIST_AFTER_RENAME);

        // Make the rename itself durable
        #[cfg(unix)]
        {
            if let Some(parent) = self.target.parent() {
                if let Ok(dir) = fs::File::open(parent).await {
                    if let Err(e) = dir.sync_all().await {
                        tracing::warn!(path = %parent.display(), error = %e, "failed to sync directory");
                    }
                }
            }
        }

        Ok(())
    }

    /// Remove the temp file without touching the target.
    pub async fn discard(mut self) -> io::Result<()> {
        self.done = true;
        fs::remove_file(&self.temp).await
    }
}

impl Drop for StagedWrite {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.temp) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = %self.temp.display(), error = %e, "failed to remove temp file");
            }
        }
    }
}

/// Write `bytes` to a fresh temp file beside `target` and fsync it.
///
/// Creates the target directory if it does not exist. On failure the temp
/// file is removed and the target is untouched.
pub async fn stage(target: &Path, bytes: &[u8]) -> io::Result<StagedWrite> {
    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    let temp = temp_path_for(target);
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp)
        .await?;
    // Owns the temp file from here on
    let mut staged = StagedWrite {
        target: target.to_path_buf(),
        temp,
        done: false,
    };

    let written: io::Result<()> = async {
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await
    }
    .await;

    if let Err(e) = written {
        drop(file);
        remove_quietly(&staged.temp).await;
        staged.done = true;
        return Err(e);
    }

    Ok(staged)
}

/// Atomically replace `target` with `bytes`.
pub async fn write_atomic(target: &Path, bytes: &[u8]) -> io::Result<()> {
    stage(target, bytes).await?.commit().await
}

/// Serialize `records` and atomically replace the collection file.
pub async fn persist(path: &Path, records: &[Record], pretty: bool) -> StorageResult<()> {
    let bytes = encode_records(records, pretty)?;
    write_atomic(path, &bytes).await?;
    tracing::debug!(path = %path.display(), records = records.len(), bytes = bytes.len(), "persisted collection");
    Ok(())
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove temp file");
        }
    }
}
