//! Incremental line reassembly.
//!
//! Pipe reads arrive as arbitrary-sized byte chunks: a chunk may hold a
//! fragment of a line, several complete lines, or both. The assembler keeps
//! the unterminated tail across reads and only ever hands out complete
//! newline-terminated lines, in read order.

/// Bytes requested per read wakeup. Deliberately small so one busy pipe
/// cannot monopolize a scheduling turn; responsiveness over throughput.
pub const READ_CHUNK_SIZE: usize = 81;

/// Per-pipe reassembly state. One assembler per pipe, fed from a single
/// read loop, so there is never more than one in-flight partial line.
#[derive(Debug, Default)]
pub struct LineAssembler {
    buffer: Vec<u8>,
}

impl LineAssembler {
    /// Create an assembler with an empty carry buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the bytes of one read and return every line completed by it.
    ///
    /// Each returned string is a full line without its terminator, formed
    /// from the carry buffer plus the chunk up to the newline. Any bytes
    /// after the last newline are retained for the next call. Line content
    /// is decoded lossily; producers are expected to write UTF-8.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            self.buffer.extend_from_slice(&rest[..pos]);
            lines.push(String::from_utf8_lossy(&self.buffer).into_owned());
            self.buffer.clear();
            rest = &rest[pos + 1..];
        }

        self.buffer.extend_from_slice(rest);
        lines
    }

    /// Number of buffered bytes awaiting a terminator.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn single_chunk_single_line() {
        let mut asm = LineAssembler::new();
        assert_eq!(asm.push(b"hello\n"), vec!["hello"]);
        assert_eq!(asm.pending(), 0);
    }

    #[test]
    fn line_split_across_many_chunks() {
        let mut asm = LineAssembler::new();
        assert!(asm.push(b"data:image/").is_empty());
        assert!(asm.push(b"png;base64,").is_empty());
        assert!(asm.push(b"AAAA").is_empty());
        assert_eq!(asm.push(b"BB\n"), vec!["data:image/png;base64,AAAABB"]);
    }

    #[test]
    fn multiple_lines_in_one_chunk_stay_ordered() {
        let mut asm = LineAssembler::new();
        assert_eq!(asm.push(b"one\ntwo\nthree\n"), vec!["one", "two", "three"]);
    }

    #[test]
    fn trailing_partial_is_retained() {
        let mut asm = LineAssembler::new();
        assert_eq!(asm.push(b"first\nsec"), vec!["first"]);
        assert_eq!(asm.pending(), 3);
        assert_eq!(asm.push(b"ond\n"), vec!["second"]);
        assert_eq!(asm.pending(), 0);
    }

    #[test]
    fn empty_chunk_is_a_no_op() {
        let mut asm = LineAssembler::new();
        assert!(asm.push(b"par").is_empty());
        assert!(asm.push(b"").is_empty());
        assert_eq!(asm.push(b"t\n"), vec!["part"]);
    }

    #[test]
    fn bare_newline_yields_empty_line() {
        let mut asm = LineAssembler::new();
        assert_eq!(asm.push(b"\n"), vec![""]);
    }
}
