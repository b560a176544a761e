//! Raw byte dump for debugging.

use std::fmt;

/// Display adapter over the first bytes of an arena.
///
/// Renders one line per byte: index, decimal value and the byte as a
/// character when it is printable ASCII (`.` otherwise).
pub struct ArenaDump<'a> {
    bytes: &'a [u8],
}

impl<'a> ArenaDump<'a> {
    /// Dump the first `max_bytes` of `bytes`, clamped to its length.
    pub fn new(bytes: &'a [u8], max_bytes: usize) -> Self {
        Self {
            bytes: &bytes[..max_bytes.min(bytes.len())],
        }
    }

    /// Number of bytes that will be rendered.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether nothing will be rendered.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Display for ArenaDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, &byte) in self.bytes.iter().enumerate() {
            let shown = if byte.is_ascii_graphic() { byte as char } else { '.' };
            writeln!(f, "Index: {index}\tValue: {byte}\t{shown}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_one_line_per_byte() {
        let bytes = [b'Y', 0, 63];
        let out = ArenaDump::new(&bytes, 3).to_string();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Index: 0\tValue: 89\tY",
                "Index: 1\tValue: 0\t.",
                "Index: 2\tValue: 63\t?",
            ]
        );
    }

    #[test]
    fn clamps_to_buffer_length() {
        let bytes = [1u8; 4];
        let dump = ArenaDump::new(&bytes, 100);
        assert_eq!(dump.len(), 4);
        assert_eq!(dump.to_string().lines().count(), 4);
    }
}
