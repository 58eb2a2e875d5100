//! Storage size normalization

use crate::error::QuantityParseError;
use crate::quantity::Quantity;

/// Bytes per gibibyte
pub const GIB: u64 = 1 << 30;

/// Storage is billed in blocks of this many GB
pub const STORAGE_ROUNDING_FACTOR: u64 = 32;

/// Size of a quantity in whole gibibytes; anything below a full GiB counts as 0
pub fn size_in_gb(quantity: &Quantity) -> Result<u64, QuantityParseError> {
    Ok(quantity.to_bytes()? / GIB)
}

/// Round a size up to the next multiple of [`STORAGE_ROUNDING_FACTOR`].
/// 0 stays 0 and exact multiples are returned unchanged.
pub fn rounded_to_factor(size_gb: u64) -> u64 {
    size_gb.div_ceil(STORAGE_ROUNDING_FACTOR) * STORAGE_ROUNDING_FACTOR
}
