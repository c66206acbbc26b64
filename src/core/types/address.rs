//! Target-process address type with hex parsing and page arithmetic

use super::error::{TargetError, TargetResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An address in the target process's address space.
///
/// The core never dereferences these; they are only handed to backend
/// read/write/query calls.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MemoryAddress(pub usize);

impl MemoryAddress {
    /// Lowest representable address
    pub const MIN: Self = MemoryAddress(0);
    /// Highest representable address
    pub const MAX: Self = MemoryAddress(usize::MAX);

    /// Creates a new address from a usize value
    pub const fn new(value: usize) -> Self {
        MemoryAddress(value)
    }

    /// Creates a null address (0x0)
    pub const fn null() -> Self {
        MemoryAddress(0)
    }

    /// Checks if the address is null
    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }

    /// Returns the raw usize value
    pub const fn as_usize(&self) -> usize {
        self.0
    }

    /// Checks if the address is aligned to `alignment` (a power of two)
    pub const fn is_aligned(&self, alignment: usize) -> bool {
        alignment != 0 && self.0 & (alignment - 1) == 0
    }

    /// Rounds down to the page (or any power-of-two boundary) containing this address
    pub const fn align_down(&self, alignment: usize) -> Self {
        if alignment == 0 {
            return *self;
        }
        MemoryAddress(self.0 & !(alignment - 1))
    }

    /// Adds `bytes`, returning `None` on overflow
    pub const fn checked_add(&self, bytes: usize) -> Option<Self> {
        match self.0.checked_add(bytes) {
            Some(value) => Some(MemoryAddress(value)),
            None => None,
        }
    }

    /// Adds `bytes`, clamping at [`MemoryAddress::MAX`]
    pub const fn saturating_add(&self, bytes: usize) -> Self {
        MemoryAddress(self.0.saturating_add(bytes))
    }

    /// Adds `bytes` with two's-complement wraparound
    pub const fn wrapping_add(&self, bytes: usize) -> Self {
        MemoryAddress(self.0.wrapping_add(bytes))
    }

    /// Distance in bytes from `base` up to `self`, `None` if `base` is above `self`
    pub const fn offset_from(&self, base: MemoryAddress) -> Option<usize> {
        self.0.checked_sub(base.0)
    }

    /// Converts a byte buffer of `pointer_size` bytes into an address
    pub fn from_bytes(bytes: &[u8], little_endian: bool) -> TargetResult<Self> {
        let width = std::mem::size_of::<usize>();
        if bytes.is_empty() || bytes.len() > width {
            return Err(TargetError::UnsupportedPointerWidth(bytes.len()));
        }

        let mut value: usize = 0;
        if little_endian {
            for byte in bytes.iter().rev() {
                value = (value << 8) | *byte as usize;
            }
        } else {
            for byte in bytes {
                value = (value << 8) | *byte as usize;
            }
        }
        Ok(MemoryAddress(value))
    }
}

impl FromStr for MemoryAddress {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        let value = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            usize::from_str_radix(hex, 16)
        } else if s.chars().any(|c| c.is_ascii_alphabetic()) {
            usize::from_str_radix(s, 16)
        } else {
            s.parse::<usize>()
        };

        value
            .map(MemoryAddress::new)
            .map_err(|_| TargetError::InvalidAddress(s.to_string()))
    }
}

impl fmt::Display for MemoryAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.0)
    }
}

impl fmt::LowerHex for MemoryAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl fmt::UpperHex for MemoryAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::UpperHex::fmt(&self.0, f)
    }
}

impl From<usize> for MemoryAddress {
    fn from(value: usize) -> Self {
        MemoryAddress::new(value)
    }
}

impl From<MemoryAddress> for usize {
    fn from(address: MemoryAddress) -> Self {
        address.0
    }
}

impl<T> From<*const T> for MemoryAddress {
    fn from(ptr: *const T) -> Self {
        MemoryAddress::new(ptr as usize)
    }
}

impl<T> From<*mut T> for MemoryAddress {
    fn from(ptr: *mut T) -> Self {
        MemoryAddress::new(ptr as usize)
    }
}
