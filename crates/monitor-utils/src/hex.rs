use std::num::ParseIntError;

/// Decode a hex quantity such as `"0x1b4"`, ignoring a leading "0x" prefix if present.
///
/// # Errors
///
/// Returns an error if the input (after trimming a leading "0x") is empty, is not
/// valid base-16, or does not fit in a `u64`.
pub fn decode_hex_quantity(value: &str) -> Result<u64, ParseIntError> {
    u64::from_str_radix(value.strip_prefix("0x").unwrap_or(value), 16)
}
