//! Append-only partition log and replay.
//!
//! Each partition owns one log file, `<data_dir>/kv_log_<partition_id>.log`,
//! holding every mutation applied to the partition in order. On startup the
//! log is replayed from offset 0 to rebuild the in-memory index.
//!
//! # Record Format
//!
//! One record per line:
//!
//! ```text
//! <ts_ms>|<OP>|<klen>|<key_bytes>|<vlen>|<value_bytes>\n
//! ```
//!
//! The length prefixes are authoritative: key and value bytes may contain
//! `|` and `\n`, so the decoder is a streaming byte reader, never a line
//! splitter. The framing is: first three `|` delimiters, `klen` bytes of
//! key, one `|`, the `vlen` field, one `|`, `vlen` bytes of value, one
//! `\n`. The timestamp is diagnostics only; replay ignores it.
//!
//! # Torn Writes
//!
//! A record that runs past end-of-file, or an unterminated corrupt final
//! line, is a torn write from a crash mid-append and is dropped silently.
//! A corrupt record followed by further data means the file is damaged and
//! replay fails.

use crate::core::error::{KvError, KvResult};
use bytes::Bytes;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWriteExt, BufWriter};

/// Log file name prefix; the partition id and `.log` complete the name.
pub const LOG_FILE_PREFIX: &str = "kv_log_";

/// The mutation kind a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOp {
    /// Install key → value.
    Put,
    /// Erase key. The record's value field is empty.
    Delete,
}

impl LogOp {
    fn token(self) -> &'static [u8] {
        match self {
            Self::Put => b"PUT",
            Self::Delete => b"DELETE",
        }
    }
}

impl std::fmt::Display for LogOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// Durability mode for log appends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Write and flush per mutation; the record reaches the kernel's page
    /// cache before the operation is acknowledged.
    Flush,
    /// Additionally fsync per mutation.
    Fsync,
}

/// One decoded log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Wall-clock milliseconds at append time. Diagnostics only.
    pub timestamp_ms: u64,
    /// The mutation kind.
    pub op: LogOp,
    /// The key bytes.
    pub key: Vec<u8>,
    /// The value bytes; empty for DELETE.
    pub value: Bytes,
}

/// The log file path for a partition.
pub fn log_path(data_dir: &Path, partition_id: u32) -> PathBuf {
    data_dir.join(format!("{}{}.log", LOG_FILE_PREFIX, partition_id))
}

/// Wall-clock milliseconds since the UNIX epoch.
pub fn unix_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Encode one record into its on-disk line form.
pub fn encode_record(timestamp_ms: u64, op: LogOp, key: &[u8], value: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(key.len() + value.len() + 32);
    out.extend_from_slice(timestamp_ms.to_string().as_bytes());
    out.push(b'|');
    out.extend_from_slice(op.token());
    out.push(b'|');
    out.extend_from_slice(key.len().to_string().as_bytes());
    out.push(b'|');
    out.extend_from_slice(key);
    out.push(b'|');
    out.extend_from_slice(value.len().to_string().as_bytes());
    out.push(b'|');
    out.extend_from_slice(value);
    out.push(b'\n');
    out
}

/// Why a record failed to decode.
enum ParseFailure {
    /// The record needs bytes past end-of-buffer (torn tail).
    Truncated,
    /// The record is structurally invalid within the available bytes.
    Corrupt(String),
}

/// Streaming byte reader over a log buffer.
struct RecordReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> RecordReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Consume bytes up to (but not including) the next `|`, then consume
    /// the delimiter.
    fn field(&mut self) -> Result<&'a [u8], ParseFailure> {
        let rest = &self.buf[self.pos..];
        match rest.iter().position(|&b| b == b'|') {
            Some(at) => {
                let field = &rest[..at];
                self.pos += at + 1;
                Ok(field)
            }
            None => Err(ParseFailure::Truncated),
        }
    }

    /// Consume exactly `n` bytes.
    fn take(&mut self, n: usize) -> Result<&'a [u8], ParseFailure> {
        if self.buf.len() - self.pos < n {
            return Err(ParseFailure::Truncated);
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    /// Consume one expected byte.
    fn expect(&mut self, byte: u8, what: &str) -> Result<(), ParseFailure> {
        if self.pos >= self.buf.len() {
            return Err(ParseFailure::Truncated);
        }
        if self.buf[self.pos] != byte {
            return Err(ParseFailure::Corrupt(format!(
                "expected {} at byte {}",
                what, self.pos
            )));
        }
        self.pos += 1;
        Ok(())
    }

    fn next_record(&mut self) -> Result<LogRecord, ParseFailure> {
        let timestamp_ms = parse_decimal(self.field()?, "timestamp")?;

        let op = match self.field()? {
            b"PUT" => LogOp::Put,
            b"DELETE" => LogOp::Delete,
            other => {
                return Err(ParseFailure::Corrupt(format!(
                    "unknown operation {:?}",
                    String::from_utf8_lossy(other)
                )))
            }
        };

        let klen = parse_decimal(self.field()?, "key length")? as usize;
        let key = self.take(klen)?.to_vec();
        self.expect(b'|', "'|' after key bytes")?;

        let vlen = parse_decimal(self.field()?, "value length")? as usize;
        let value = Bytes::copy_from_slice(self.take(vlen)?);
        self.expect(b'\n', "record terminator")?;

        Ok(LogRecord {
            timestamp_ms,
            op,
            key,
            value,
        })
    }
}

/// Parse a decimal ASCII field.
fn parse_decimal(field: &[u8], what: &str) -> Result<u64, ParseFailure> {
    if field.is_empty() || !field.iter().all(|b| b.is_ascii_digit()) {
        return Err(ParseFailure::Corrupt(format!(
            "bad {} field {:?}",
            what,
            String::from_utf8_lossy(field)
        )));
    }
    std::str::from_utf8(field)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ParseFailure::Corrupt(format!("{} out of range", what)))
}

/// Decode every record in a log buffer, in order.
///
/// A truncated tail record is dropped silently; a malformed record followed
/// by more data aborts with [`KvError::Replay`].
pub fn decode_records(buf: &[u8]) -> KvResult<Vec<LogRecord>> {
    let mut reader = RecordReader::new(buf);
    let mut records = Vec::new();

    while !reader.at_end() {
        // Tolerate blank lines.
        if buf[reader.pos] == b'\n' {
            reader.pos += 1;
            continue;
        }

        let start = reader.pos;
        match reader.next_record() {
            Ok(record) => records.push(record),
            Err(ParseFailure::Truncated) => break,
            Err(ParseFailure::Corrupt(detail)) => {
                // An unterminated final line is a torn write, not damage.
                if !buf[start..].contains(&b'\n') {
                    break;
                }
                return Err(KvError::Replay {
                    offset: start,
                    detail,
                });
            }
        }
    }

    Ok(records)
}

/// Append handle over one partition's log file.
pub struct PartitionLog {
    path: PathBuf,
    sync_mode: SyncMode,
    writer: Option<BufWriter<tokio::fs::File>>,
}

impl PartitionLog {
    /// Create a closed handle for the given log file.
    pub fn new(path: PathBuf, sync_mode: SyncMode) -> Self {
        Self {
            path,
            sync_mode,
            writer: None,
        }
    }

    /// The log file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True while the log is open for append.
    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    /// Read the whole log file, or `None` if it does not exist yet.
    pub async fn read_existing(&self) -> KvResult<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(buf) => Ok(Some(buf)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Open the log file for append, creating it if absent.
    pub async fn open_append(&mut self) -> KvResult<()> {
        if self.writer.is_some() {
            return Ok(());
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        self.writer = Some(BufWriter::new(file));
        Ok(())
    }

    /// Append one record and flush. Returns only after the record has
    /// reached the kernel (and the device, in fsync mode).
    pub async fn append(&mut self, op: LogOp, key: &[u8], value: &[u8]) -> KvResult<()> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            KvError::Io(io::Error::new(
                io::ErrorKind::NotConnected,
                "partition log is not open for append",
            ))
        })?;

        let record = encode_record(unix_millis(), op, key, value);
        writer.write_all(&record).await?;
        writer.flush().await?;
        if self.sync_mode == SyncMode::Fsync {
            writer.get_ref().sync_all().await?;
        }
        Ok(())
    }

    /// Flush and release the file handle. Safe to call on a closed log.
    pub async fn close(&mut self) -> KvResult<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().await?;
            if self.sync_mode == SyncMode::Fsync {
                writer.get_ref().sync_all().await?;
            }
        }
        Ok(())
    }
}
