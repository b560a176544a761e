//! Two-byte size codec.
//!
//! Sizes and the free-space counter are stored in the arena as two base-64
//! digits: the high digit (`value / 64`) first, the low digit
//! (`value % 64`) second. Two digits cover `0..=4095`.

/// Base of each stored digit.
pub const RADIX: usize = 64;

/// Number of bytes an encoded value occupies.
pub const ENCODED_LEN: usize = 2;

/// Largest value that fits in [`ENCODED_LEN`] digits.
pub const MAX_ENCODABLE: usize = RADIX * RADIX - 1;

/// Write `value` into `bytes[at..at + 2]`.
///
/// Both bytes are cleared before writing, so the result does not depend on
/// what was stored there before. Values above [`MAX_ENCODABLE`] are a caller
/// bug.
///
/// # Panics
///
/// Panics if `at + 2` exceeds `bytes.len()`.
pub fn encode(bytes: &mut [u8], at: usize, value: usize) {
    debug_assert!(value <= MAX_ENCODABLE, "value {value} exceeds codec range");
    let field = &mut bytes[at..at + ENCODED_LEN];
    field.fill(0);
    field[0] = (value / RADIX % RADIX) as u8;
    field[1] = (value % RADIX) as u8;
}

/// Read the value stored at `bytes[at..at + 2]`.
///
/// # Panics
///
/// Panics if `at + 2` exceeds `bytes.len()`.
pub fn decode(bytes: &[u8], at: usize) -> usize {
    let high = bytes[at] as usize;
    let low = bytes[at + 1] as usize;
    high * RADIX + low
}
