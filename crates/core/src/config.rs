/// Tunables for recovering printable runs from a byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Bytes requested from the source per read.
    pub chunk_size: usize,

    /// Shorter printable runs are treated as noise.
    pub min_run_len: usize,

    /// Emit a trailing run that reaches end of stream without a terminating
    /// non-printable byte. When false such a run is dropped.
    pub flush_at_eof: bool,

    /// Treat `\n` and `\r` as run terminators instead of printable bytes.
    pub split_on_newline: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            chunk_size: 4096,
            min_run_len: 4,
            flush_at_eof: true,
            split_on_newline: false,
        }
    }
}
