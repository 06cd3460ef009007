//! Shared utility functions for tree walking

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use chrono::{DateTime, Local};

/// Lowercased extension of a basename, without the dot.
///
/// Dot-files such as `.bashrc` have no extension.
pub fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
}

/// Key used by the extension bucket.
pub fn extension_key(name: &str) -> String {
    extension_of(name).unwrap_or_else(|| "(none)".to_string())
}

/// Local calendar date for a Unix timestamp, `YYYY-MM-DD`.
pub fn local_date(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0)
        .map(|d| d.with_timezone(&Local).format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Permission bits as a four-digit octal string.
pub fn permission_key(mode: u32) -> String {
    format!("{:04o}", mode & 0o7777)
}

/// Count lines in a file.
///
/// The file is first decoded as UTF-8 text and universal line endings are
/// counted. If decoding fails it is re-read as bytes and `\n` is counted.
/// A trailing line without a terminator counts as a line.
pub fn count_lines(path: &Path) -> io::Result<u64> {
    match count_text_lines(path) {
        Err(e) if e.kind() == io::ErrorKind::InvalidData => count_byte_lines(path),
        other => other,
    }
}

/// Bytes read per step in text mode. A multi-byte character split across
/// reads is carried into the next one.
const CHUNK: usize = 64 * 1024;

fn count_text_lines(path: &Path) -> io::Result<u64> {
    let mut file = File::open(path)?;
    let mut buf = vec![0u8; CHUNK];
    let mut carry = 0;
    let mut lines = Terminators::default();
    loop {
        let n = match file.read(&mut buf[carry..]) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if n == 0 {
            if carry > 0 {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "truncated UTF-8 sequence at end of file",
                ));
            }
            break;
        }
        let filled = carry + n;
        let valid = match std::str::from_utf8(&buf[..filled]) {
            Ok(_) => filled,
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(e) => return Err(io::Error::new(io::ErrorKind::InvalidData, e)),
        };
        lines.feed(&buf[..valid]);
        buf.copy_within(valid..filled, 0);
        carry = filled - valid;
    }
    Ok(lines.finish())
}

fn count_byte_lines(path: &Path) -> io::Result<u64> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut lines = 0u64;
    let mut last = None;
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            break;
        }
        lines += buf.iter().filter(|&&b| b == b'\n').count() as u64;
        last = buf.last().copied();
        let len = buf.len();
        reader.consume(len);
    }
    Ok(match last {
        Some(b) if b != b'\n' => lines + 1,
        _ => lines,
    })
}

/// Running count of universal line terminators over consecutive chunks.
#[derive(Debug, Default)]
struct Terminators {
    lines: u64,
    /// Last byte was `\r`, so a leading `\n` in the next chunk is its pair
    after_cr: bool,
    last: Option<u8>,
}

impl Terminators {
    fn feed(&mut self, bytes: &[u8]) {
        for &b in bytes {
            let paired = self.after_cr && b == b'\n';
            self.after_cr = b == b'\r';
            self.last = Some(b);
            if paired {
                continue;
            }
            if b == b'\n' || b == b'\r' {
                self.lines += 1;
            }
        }
    }

    fn finish(&self) -> u64 {
        match self.last {
            Some(b'\n') | Some(b'\r') | None => self.lines,
            Some(_) => self.lines + 1,
        }
    }
}

/// Count `\n`, `\r\n` and lone `\r` as one terminator each.
pub fn count_text_terminators(text: &str) -> u64 {
    let mut lines = Terminators::default();
    lines.feed(text.as_bytes());
    lines.finish()
}
