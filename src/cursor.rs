//! Producer and consumer seams used by [`MessageFramer`](crate::MessageFramer).
//!
//! [`Writer`] is implemented by every handle that can push, [`Reader`] by
//! every handle that can read, including the speculative [`ShadowCursor`].
//! Both traits are sealed.

use crate::index::Index;
use crate::ring_buffer::{Consumer, Producer, ResultCode, RingBuffer};
use crate::shadow::ShadowCursor;

pub(crate) mod sealed {
    use crate::ResultCode;

    pub trait Push<T> {
        /// Push, storing `eom` instead if the write fills the buffer
        fn push_framed(&mut self, elem: T, eom: T) -> Result<(), ResultCode>
        where
            T: Copy + PartialEq;
    }

    pub trait Pull<T> {
        /// Elements this cursor can still read, snapshotted by callers
        fn available(&self) -> usize;
        /// Element `offset` positions ahead, without advancing
        fn peek_at(&self, offset: usize) -> Option<T>;
        /// Next element, advancing the cursor
        fn take(&mut self) -> Option<T>;
        /// Complete messages not yet taken through this cursor
        fn messages(&self) -> usize;
        /// Account for `count` messages consumed through this cursor
        fn messages_taken(&mut self, count: usize);
    }
}

/// A handle that pushes elements: [`RingBuffer`] or [`Producer`]
pub trait Writer<T>: sealed::Push<T> {}

/// A handle that reads elements: [`RingBuffer`], [`Consumer`] or [`ShadowCursor`]
pub trait Reader<T>: sealed::Pull<T> {}

macro_rules! impl_direct {
    ($($handle:ident),*) => {
        $(
            impl<T: Copy, I: Index> sealed::Pull<T> for $handle<T, I> {
                fn available(&self) -> usize {
                    self.shared().len()
                }

                fn peek_at(&self, offset: usize) -> Option<T> {
                    // SAFETY: reading through the unique consumer handle.
                    unsafe { self.shared().peek_at(offset) }
                }

                fn take(&mut self) -> Option<T> {
                    self.pop_one()
                }

                fn messages(&self) -> usize {
                    self.shared().messages()
                }

                fn messages_taken(&mut self, count: usize) {
                    self.shared().release_messages(count);
                }
            }

            impl<T: Copy, I: Index> Reader<T> for $handle<T, I> {}
        )*
    };
}

impl_direct!(RingBuffer, Consumer);

impl<T: Copy, I: Index> sealed::Push<T> for RingBuffer<T, I> {
    fn push_framed(&mut self, elem: T, eom: T) -> Result<(), ResultCode>
    where
        T: Copy + PartialEq,
    {
        // SAFETY: `&mut self` on the handle that owns both sides.
        unsafe { self.shared().push_framed(elem, eom) }
    }
}

impl<T: Copy, I: Index> Writer<T> for RingBuffer<T, I> {}

impl<T: Copy, I: Index> sealed::Push<T> for Producer<T, I> {
    fn push_framed(&mut self, elem: T, eom: T) -> Result<(), ResultCode>
    where
        T: Copy + PartialEq,
    {
        // SAFETY: `split` creates exactly one producer.
        unsafe { self.shared().push_framed(elem, eom) }
    }
}

impl<T: Copy, I: Index> Writer<T> for Producer<T, I> {}

impl<T: Copy, I: Index> sealed::Pull<T> for ShadowCursor<'_, T, I> {
    fn available(&self) -> usize {
        ShadowCursor::available(self)
    }

    fn peek_at(&self, offset: usize) -> Option<T> {
        ShadowCursor::peek_at(self, offset)
    }

    fn take(&mut self) -> Option<T> {
        self.peek_one()
    }

    fn messages(&self) -> usize {
        ShadowCursor::messages(self)
    }

    fn messages_taken(&mut self, count: usize) {
        ShadowCursor::messages_taken(self, count);
    }
}

impl<T: Copy, I: Index> Reader<T> for ShadowCursor<'_, T, I> {}

impl<T, W: sealed::Push<T> + ?Sized> sealed::Push<T> for &mut W {
    fn push_framed(&mut self, elem: T, eom: T) -> Result<(), ResultCode>
    where
        T: Copy + PartialEq,
    {
        (**self).push_framed(elem, eom)
    }
}

impl<T, W: Writer<T> + ?Sized> Writer<T> for &mut W {}

impl<T, R: sealed::Pull<T> + ?Sized> sealed::Pull<T> for &mut R {
    fn available(&self) -> usize {
        (**self).available()
    }

    fn peek_at(&self, offset: usize) -> Option<T> {
        (**self).peek_at(offset)
    }

    fn take(&mut self) -> Option<T> {
        (**self).take()
    }

    fn messages(&self) -> usize {
        (**self).messages()
    }

    fn messages_taken(&mut self, count: usize) {
        (**self).messages_taken(count);
    }
}

impl<T, R: Reader<T> + ?Sized> Reader<T> for &mut R {}
