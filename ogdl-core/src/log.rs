//! Append-only store of binary-encoded graphs.
//!
//! Records are concatenated binary objects; no index is kept. Append
//! returns the record's byte offset, read consumes exactly one object at
//! an offset and returns the next offset, or `None` at the end of the
//! log. One writer at a time; readers may share the file once writers
//! are quiesced.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::debug;

use crate::binary::BinReader;
use crate::error::LogError;
use crate::graph::Graph;

pub struct Log {
    file: File,
    auto_sync: bool,
}

impl Log {
    /// Open a log file, creating it when absent.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Log, LogError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        Ok(Log {
            file,
            auto_sync: true,
        })
    }

    /// When set (the default), every append is followed by an fsync.
    pub fn set_auto_sync(&mut self, on: bool) {
        self.auto_sync = on;
    }

    /// Commit buffered writes to disk.
    pub fn sync(&mut self) -> Result<(), LogError> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Explicitly close the log.
    pub fn close(self) {}

    /// Append one tree; returns its offset.
    pub fn append(&mut self, g: &Graph) -> Result<u64, LogError> {
        let bytes = g.to_binary()?;
        self.append_raw(&bytes)
    }

    /// Append one pre-encoded binary object; returns its offset.
    pub fn append_raw(&mut self, bytes: &[u8]) -> Result<u64, LogError> {
        let offset = self.file.seek(SeekFrom::End(0))?;
        self.file.write_all(bytes)?;
        if self.auto_sync {
            self.file.sync_all()?;
        }
        debug!(offset, len = bytes.len(), "appended binary object");
        Ok(offset)
    }

    /// Read the tree at `offset`. The second value is the offset of the
    /// following record, or `None` at the end of the log.
    pub fn read(&mut self, offset: u64) -> Result<(Graph, Option<u64>), LogError> {
        self.file.seek(SeekFrom::Start(offset))?;
        let (g, consumed) = {
            let mut r = BinReader::new(BufReader::new(&mut self.file));
            let g = r.read_graph()?;
            (g, r.bytes_read())
        };
        let next = offset + consumed as u64;
        Ok((g, self.bound(next)?))
    }

    /// Read the record at `offset` exactly as stored.
    pub fn read_raw(&mut self, offset: u64) -> Result<(Vec<u8>, Option<u64>), LogError> {
        self.file.seek(SeekFrom::Start(offset))?;
        let bytes = {
            let mut r = BinReader::new(BufReader::new(&mut self.file));
            r.read_raw()?
        };
        let next = offset + bytes.len() as u64;
        Ok((bytes, self.bound(next)?))
    }

    /// `next` when another record follows, `None` otherwise.
    fn bound(&mut self, next: u64) -> Result<Option<u64>, LogError> {
        let end = self.file.seek(SeekFrom::End(0))?;
        Ok(if next < end { Some(next) } else { None })
    }
}
