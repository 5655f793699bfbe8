//! Recovery of printable text islands from an arbitrary byte stream.
//!
//! The scanner makes no assumption about line structure: any maximal run of
//! printable ASCII bytes long enough to be meaningful becomes one [`RawLine`],
//! and everything else is skipped as binary noise.

use std::io::{ErrorKind, Read};

use crate::config::ScanConfig;
use crate::domain::RawLine;
use crate::error::TriageError;

/// ASCII digits, letters, punctuation and whitespace.
pub fn is_printable(byte: u8) -> bool {
    byte.is_ascii_graphic() || matches!(byte, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

/// Lazy iterator over the printable runs of a byte source.
///
/// Memory use is bounded by the chunk buffer plus the run being accumulated.
/// Iteration ends at the first read error, which is yielded once.
pub struct ByteStreamScanner<R: Read> {
    reader: R,
    chunk: Vec<u8>,
    chunk_pos: usize,
    chunk_len: usize,
    position: u64,
    total_len: Option<u64>,
    run: Vec<u8>,
    config: ScanConfig,
    done: bool,
}

impl<R: Read> ByteStreamScanner<R> {
    pub fn new(reader: R, config: ScanConfig) -> Self {
        let chunk_size = config.chunk_size.max(1);
        Self {
            reader,
            chunk: vec![0u8; chunk_size],
            chunk_pos: 0,
            chunk_len: 0,
            position: 0,
            total_len: None,
            run: Vec::new(),
            config,
            done: false,
        }
    }

    /// Stop once `total_len` bytes have been consumed, even if the source has more.
    pub fn with_total_len(mut self, total_len: u64) -> Self {
        self.total_len = Some(total_len);
        self
    }

    /// Bytes consumed from the source so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    fn is_delimiter(&self, byte: u8) -> bool {
        !is_printable(byte) || (self.config.split_on_newline && matches!(byte, b'\n' | b'\r'))
    }

    fn take_run(&mut self) -> Option<RawLine> {
        let keep = self.run.len() >= self.config.min_run_len;
        let line = keep.then(|| self.run.iter().map(|&b| char::from(b)).collect());
        self.run.clear();
        line
    }

    fn fill_chunk(&mut self) -> Result<usize, TriageError> {
        let want = match self.total_len {
            Some(total) => {
                let remaining = total.saturating_sub(self.position);
                usize::try_from(remaining).map_or(self.chunk.len(), |r| r.min(self.chunk.len()))
            }
            None => self.chunk.len(),
        };
        if want == 0 {
            return Ok(0);
        }
        loop {
            match self.reader.read(&mut self.chunk[..want]) {
                Ok(n) => {
                    self.chunk_pos = 0;
                    self.chunk_len = n;
                    self.position += n as u64;
                    return Ok(n);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(TriageError::Read {
                        offset: self.position,
                        source,
                    })
                }
            }
        }
    }
}

impl<R: Read> Iterator for ByteStreamScanner<R> {
    type Item = Result<RawLine, TriageError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            if self.chunk_pos >= self.chunk_len {
                match self.fill_chunk() {
                    Ok(0) => {
                        self.done = true;
                        if self.config.flush_at_eof {
                            return self.take_run().map(Ok);
                        }
                        self.run.clear();
                        return None;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        self.done = true;
                        self.run.clear();
                        return Some(Err(e));
                    }
                }
            }

            while self.chunk_pos < self.chunk_len {
                let byte = self.chunk[self.chunk_pos];
                self.chunk_pos += 1;
                if !self.is_delimiter(byte) {
                    self.run.push(byte);
                } else if let Some(line) = self.take_run() {
                    return Some(Ok(line));
                }
            }
        }
    }
}
