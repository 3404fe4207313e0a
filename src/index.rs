//! Cursor width selection.
//!
//! Cursors are stored in an atomic of the chosen width, so a buffer driven
//! from an 8-bit interrupt context can keep `u8` cursors while a desktop
//! consumer uses `usize`.

use std::fmt;

use crate::sync::{AtomicU16, AtomicU32, AtomicU8, AtomicUsize, Ordering};

pub(crate) mod sealed {
    use super::Ordering;

    pub trait Sealed {
        /// Atomic cell holding a cursor of this width
        type Atomic: Send + Sync + std::fmt::Debug;

        /// Largest cursor position representable by this width
        const MAX_POSITION: usize;

        fn atomic(pos: usize) -> Self::Atomic;
        fn load(cell: &Self::Atomic, order: Ordering) -> usize;
        fn store(cell: &Self::Atomic, pos: usize, order: Ordering);
    }
}

/// Integer width used for the write, read and shadow cursors
///
/// Implemented for `u8`, `u16`, `u32` and `usize`. A buffer with cursors of
/// width `I` holds at most `I::MAX + 1` elements.
pub trait Index: sealed::Sealed + Copy + fmt::Debug + Send + Sync + 'static {}

macro_rules! impl_index {
    ($($ty:ty => $atomic:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {
                type Atomic = $atomic;

                const MAX_POSITION: usize = <$ty>::MAX as usize;

                #[inline]
                fn atomic(pos: usize) -> $atomic {
                    debug_assert!(pos <= Self::MAX_POSITION);
                    $atomic::new(pos as $ty)
                }

                #[inline]
                fn load(cell: &$atomic, order: Ordering) -> usize {
                    cell.load(order) as usize
                }

                #[inline]
                fn store(cell: &$atomic, pos: usize, order: Ordering) {
                    debug_assert!(pos <= Self::MAX_POSITION);
                    cell.store(pos as $ty, order);
                }
            }

            impl Index for $ty {}
        )*
    };
}

impl_index! {
    u8 => AtomicU8,
    u16 => AtomicU16,
    u32 => AtomicU32,
    usize => AtomicUsize,
}

/// Number of elements a buffer with cursors of width `I` can address
pub(crate) fn max_capacity<I: Index>() -> usize {
    <I as sealed::Sealed>::MAX_POSITION.saturating_add(1)
}
