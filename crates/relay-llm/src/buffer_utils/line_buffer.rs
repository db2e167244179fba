use anyhow::Result;

/// Reassembles `\n`-terminated lines from arbitrarily split byte chunks
///
/// Bytes stay buffered until their line is complete, so a UTF-8 sequence split across two
/// network reads decodes correctly.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
    /// Bytes before this offset are known to contain no newline
    scanned: usize,
}

impl LineBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pending: Vec::with_capacity(capacity),
            scanned: 0,
        }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Next complete line without its `\n` or `\r\n` terminator
    pub fn pop_line(&mut self) -> Option<Result<String>> {
        let offset = self.pending[self.scanned..]
            .iter()
            .position(|&b| b == b'\n');

        let Some(offset) = offset else {
            self.scanned = self.pending.len();
            return None;
        };

        let end = self.scanned + offset;
        let mut line: Vec<u8> = self.pending.drain(..=end).collect();
        self.scanned = 0;

        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }

        Some(String::from_utf8(line).map_err(|e| anyhow::anyhow!("Invalid UTF-8 in stream: {}", e)))
    }

    /// Bytes of the incomplete trailing line
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}
