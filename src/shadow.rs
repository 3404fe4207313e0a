//! Speculative reads.
//!
//! A [`ShadowCursor`] reads ahead of the buffer's read cursor without freeing
//! anything. The consumer can then [`commit`](ShadowCursor::commit) once the
//! data has been processed, or [`reset`](ShadowCursor::reset) to read it
//! again later. Dropping the cursor without committing behaves like a reset.
//!
//! ```text
//! [ | | | | | | | | | | | | | | | | | | | | | | | | ]
//!           ^start    ^shadow_start       ^idx
//!           ^-pending-^---- available ----^
//! ```

use crate::index::Index;
use crate::ring_buffer::Inner;

/// Read cursor whose progress only becomes permanent on [`commit`](Self::commit)
///
/// Created by [`RingBuffer::begin_read`](crate::RingBuffer::begin_read) or
/// [`Consumer::begin_read`](crate::Consumer::begin_read). The cursor holds
/// the consumer side mutably borrowed, so direct pops cannot interleave with
/// a pending transaction. The producer may keep pushing; new elements become
/// peekable immediately.
#[derive(Debug)]
pub struct ShadowCursor<'a, T, I: Index = usize> {
    inner: &'a Inner<T, I>,
    shadow_start: usize,
    /// Elements peeked since the last commit or reset
    peeked: usize,
    /// Messages taken by a framed read since the last commit or reset
    peeked_messages: usize,
}

impl<'a, T: Copy, I: Index> ShadowCursor<'a, T, I> {
    pub(crate) fn new(inner: &'a Inner<T, I>) -> Self {
        ShadowCursor {
            shadow_start: inner.start(),
            inner,
            peeked: 0,
            peeked_messages: 0,
        }
    }

    /// Return the next unseen element and advance the shadow cursor
    ///
    /// The element stays in the buffer. Returns `None` once everything
    /// stored has been peeked.
    pub fn peek_one(&mut self) -> Option<T> {
        let elem = self.front()?;
        self.shadow_start = self.inner.wrap(self.shadow_start, 1);
        self.peeked += 1;
        Some(elem)
    }

    /// Copy up to `dst.len()` unseen elements into `dst`
    ///
    /// Bounded by what was stored on entry. Returns the number copied.
    pub fn peek_into(&mut self, dst: &mut [T]) -> usize {
        let count = self.available().min(dst.len());
        for slot in &mut dst[..count] {
            // SAFETY: `count` elements past the shadow cursor are occupied
            // and the consumer side is borrowed by this cursor.
            *slot = unsafe { self.inner.read(self.shadow_start) };
            self.shadow_start = self.inner.wrap(self.shadow_start, 1);
        }
        self.peeked += count;
        count
    }

    /// Release every element peeked since the last commit or reset
    ///
    /// Moves the buffer's read cursor onto the shadow cursor and clears
    /// overflow. A commit with nothing peeked does nothing.
    pub fn commit(&mut self) {
        if self.peeked == 0 {
            return;
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(
            released = self.peeked,
            messages = self.peeked_messages,
            "shadow cursor committed"
        );

        // SAFETY: `peeked` never exceeds the stored length, and only this
        // cursor consumes while it is alive.
        unsafe { self.inner.release(self.peeked) };
        self.inner.release_messages(self.peeked_messages);
        self.peeked = 0;
        self.peeked_messages = 0;
        debug_assert_eq!(self.inner.start(), self.shadow_start);
    }

    /// Discard progress since the last commit or reset
    ///
    /// The discarded elements can be peeked or popped again.
    pub fn reset(&mut self) {
        self.shadow_start = self.inner.start();
        self.peeked = 0;
        self.peeked_messages = 0;
    }

    /// Number of elements peeked and not yet committed
    pub fn pending(&self) -> usize {
        self.peeked
    }

    /// Number of elements that can still be peeked
    pub fn available(&self) -> usize {
        self.inner.len().saturating_sub(self.peeked)
    }

    /// Complete messages stored past the shadow cursor
    pub fn messages(&self) -> usize {
        self.inner.messages().saturating_sub(self.peeked_messages)
    }

    /// Current shadow cursor position
    pub fn shadow_start(&self) -> usize {
        self.shadow_start
    }

    pub(crate) fn front(&self) -> Option<T> {
        self.peek_at(0)
    }

    /// Unseen element `offset` positions past the shadow cursor, if stored.
    pub(crate) fn peek_at(&self, offset: usize) -> Option<T> {
        if offset >= self.available() {
            return None;
        }
        // SAFETY: `offset` unseen elements past the shadow cursor are occupied.
        Some(unsafe { self.inner.read(self.inner.wrap(self.shadow_start, offset)) })
    }

    /// Charge `count` messages to this transaction; released on commit.
    pub(crate) fn messages_taken(&mut self, count: usize) {
        self.peeked_messages += count;
    }
}
