//! Sentinel-delimited messages on top of a ring buffer.
//!
//! The producer side counts every sentinel it stores. When a push fills the
//! buffer, the sentinel is stored in place of the element, so a message cut
//! short by overflow still ends with a terminator. The consumer side only
//! drains once it has found a stored sentinel, so an unterminated tail is
//! never handed out as a message.

use crate::cursor::{Reader, Writer};
use crate::ResultCode;

/// Default end-of-message sentinel for byte buffers
pub const DEFAULT_EOM: u8 = 0;

/// Outcome of [`MessageFramer::pop_message`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// Elements copied into the destination, sentinel excluded
    pub len: usize,
    /// Whether the sentinel was consumed
    ///
    /// `false` means the destination filled up first; the rest of the
    /// message stays in the buffer and the next pop continues it.
    pub complete: bool,
}

/// Message framing over a [`Writer`] and/or [`Reader`] handle
///
/// # Examples
/// ```rust
/// use cbuf::{MessageFramer, RingBuffer};
///
/// let rb = RingBuffer::<u8>::new(16).unwrap();
/// let mut framer = MessageFramer::new(rb, b'\n');
/// for b in b"ping\npo" {
///     framer.push(*b).unwrap();
/// }
///
/// let mut msg = [0u8; 8];
/// let frame = framer.pop_message(&mut msg).unwrap();
/// assert_eq!(&msg[..frame.len], b"ping");
/// assert_eq!(framer.messages(), 0);
/// ```
#[derive(Debug)]
pub struct MessageFramer<B, T = u8> {
    inner: B,
    eom: T,
}

impl<B> MessageFramer<B, u8> {
    /// Frame byte messages terminated by [`DEFAULT_EOM`]
    pub fn with_default_eom(inner: B) -> Self {
        MessageFramer::new(inner, DEFAULT_EOM)
    }
}

impl<B, T: Copy + PartialEq> MessageFramer<B, T> {
    /// Wrap `inner`, delimiting messages with `eom`
    pub fn new(inner: B, eom: T) -> Self {
        MessageFramer { inner, eom }
    }

    /// The end-of-message sentinel
    pub fn eom(&self) -> T {
        self.eom
    }

    /// Get a reference to the wrapped handle
    pub fn get_ref(&self) -> &B {
        &self.inner
    }

    /// Get a mutable reference to the wrapped handle
    pub fn get_mut(&mut self) -> &mut B {
        &mut self.inner
    }

    /// Unwrap the handle
    pub fn into_inner(self) -> B {
        self.inner
    }
}

impl<B: Writer<T>, T: Copy + PartialEq> MessageFramer<B, T> {
    /// Push one element, counting sentinels
    ///
    /// If this push fills the buffer the sentinel is stored instead of
    /// `elem`. Fails with `ResultCode::Overflow` when already full.
    pub fn push(&mut self, elem: T) -> Result<(), ResultCode> {
        self.inner.push_framed(elem, self.eom)
    }
}

impl<B: Reader<T>, T: Copy + PartialEq> MessageFramer<B, T> {
    /// Complete messages readable through the wrapped handle
    pub fn messages(&self) -> usize {
        self.inner.messages()
    }

    /// Drain the next message into `dst`, sentinel excluded
    ///
    /// The stored elements are scanned for the sentinel before anything is
    /// taken. If the counter claims messages but none of their sentinels is
    /// still stored (raw pops or peeks consumed them), the counter is reset
    /// for this reader and the call fails.
    ///
    /// # Returns
    /// * `Ok(Frame)` with the number of elements copied
    /// * `Err(ResultCode::MissingDelimiter)` if no complete message is
    ///   stored; nothing is consumed
    pub fn pop_message(&mut self, dst: &mut [T]) -> Result<Frame, ResultCode> {
        let counted = self.inner.messages();
        if counted == 0 {
            return Err(ResultCode::MissingDelimiter);
        }

        // Every sentinel in `counted` was published before this snapshot.
        let available = self.inner.available();
        let Some(end) = (0..available).find(|&i| self.inner.peek_at(i) == Some(self.eom)) else {
            #[cfg(feature = "tracing")]
            tracing::debug!(stale = counted, "message counter ahead of stored sentinels");

            self.inner.messages_taken(counted);
            return Err(ResultCode::MissingDelimiter);
        };

        let mut len = 0;
        let dst_len = dst.len();
        for slot in &mut dst[..end.min(dst_len)] {
            let Some(elem) = self.inner.take() else {
                break;
            };
            *slot = elem;
            len += 1;
        }

        // Room for the payload but not the sentinel still completes it.
        if len == end && self.inner.take().is_some() {
            self.inner.messages_taken(1);
            return Ok(Frame {
                len,
                complete: true,
            });
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(copied = len, capacity = dst.len(), "message truncated");

        Ok(Frame {
            len,
            complete: false,
        })
    }
}
