//! Buffer configuration
//!
//! Capacity is fixed for the lifetime of a buffer. The optional fill value is
//! written into every slot as it is consumed, which makes stale data easy to
//! spot when dumping the backing array; it is never read back as data.

use crate::index::{self, Index};
use crate::ResultCode;

/// Capacity used by [`Config::default`]
pub const DEFAULT_CAPACITY: usize = 16;

/// Construction parameters for a [`RingBuffer`](crate::RingBuffer)
///
/// # Examples
/// ```rust
/// use cbuf::{Config, RingBuffer};
///
/// let cfg = Config::new(32).fill(b'.');
/// let rb: RingBuffer<u8, u8> = RingBuffer::with_config(cfg).unwrap();
/// assert_eq!(rb.capacity(), 32);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config<T> {
    /// Number of slots, all usable
    pub capacity: usize,
    /// Diagnostic value written into consumed slots
    pub fill: Option<T>,
}

impl<T> Config<T> {
    /// Configuration for `capacity` slots with no fill value
    pub fn new(capacity: usize) -> Self {
        Config {
            capacity,
            fill: None,
        }
    }

    /// Set the diagnostic fill value
    pub fn fill(mut self, fill: T) -> Self {
        self.fill = Some(fill);
        self
    }

    /// Validates the configuration against a cursor width
    ///
    /// Returns `Err(ResultCode::CapacityInvalid)` if the capacity is zero or
    /// larger than the cursors of width `I` can address.
    pub fn validate<I: Index>(&self) -> Result<(), ResultCode> {
        if self.capacity == 0 || self.capacity > index::max_capacity::<I>() {
            return Err(ResultCode::CapacityInvalid);
        }
        Ok(())
    }
}

impl<T> Default for Config<T> {
    fn default() -> Self {
        Config::new(DEFAULT_CAPACITY)
    }
}
