//! Line framing for the receiver's CR LF terminated text protocol.
//!
//! Reads arrive in arbitrary chunks. [`LineFramer`] keeps the unterminated
//! tail of the previous read and yields complete lines as they become
//! available. Empty lines and the bare `R` acknowledgment that answers a
//! link probe are dropped here and never reach the classifier.

/// Line terminator used in both directions.
pub const TERMINATOR: &[u8] = b"\r\n";

/// Acknowledgment the receiver sends in reply to a bare terminator.
const PROBE_ACK: &str = "R";

/// Upper bound for an unterminated tail; protocol lines are far shorter.
const MAX_PARTIAL: usize = 8192;

/// Splits a byte stream into protocol lines.
#[derive(Debug, Default)]
pub struct LineFramer {
    partial: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a read and iterate over the complete lines it produced.
    ///
    /// Lines are yielded in stream order with the terminator stripped.
    /// Whatever follows the last terminator stays buffered for the next
    /// call. The iterator is lazy; bytes it does not reach stay buffered.
    pub fn feed<'a>(&'a mut self, data: &[u8]) -> impl Iterator<Item = String> + 'a {
        self.absorb(data);
        std::iter::from_fn(move || self.next_line())
    }

    /// Append bytes to the pending tail without extracting lines.
    ///
    /// Used for probe replies so their bytes are framed together with the
    /// next regular read.
    pub fn absorb(&mut self, data: &[u8]) {
        self.partial.extend_from_slice(data);
        if self.partial.len() > MAX_PARTIAL && find_terminator(&self.partial).is_none() {
            tracing::warn!(len = self.partial.len(), "partial line overflow, resetting");
            self.partial.clear();
        }
    }

    /// The unterminated tail carried into the next read.
    pub fn partial(&self) -> &[u8] {
        &self.partial
    }

    /// Drop any buffered tail, e.g. after the link was reopened.
    pub fn reset(&mut self) {
        self.partial.clear();
    }

    fn next_line(&mut self) -> Option<String> {
        loop {
            let pos = find_terminator(&self.partial)?;
            let line: Vec<u8> = self.partial.drain(..pos + TERMINATOR.len()).take(pos).collect();
            let line = String::from_utf8_lossy(&line).into_owned();
            if line.is_empty() || line == PROBE_ACK {
                continue;
            }
            return Some(line);
        }
    }
}

fn find_terminator(buf: &[u8]) -> Option<usize> {
    buf.windows(TERMINATOR.len()).position(|w| w == TERMINATOR)
}
