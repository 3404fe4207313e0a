use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::config::Config;
use crate::index::Index;
use crate::shadow::ShadowCursor;
use crate::sync::{AtomicUsize, Ordering, UnsafeCell};

/// Result codes for ring buffer operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResultCode {
    /// Capacity is zero or cannot be addressed by the cursor width
    #[error("capacity is zero or not addressable by the cursor width")]
    CapacityInvalid,
    /// Ring buffer is full, nothing was written
    #[error("ring buffer is full")]
    Overflow,
    /// No sentinel-terminated message is present
    #[error("no complete message in the ring buffer")]
    MissingDelimiter,
}

/// State shared by the producer and consumer sides.
///
/// The producer owns `idx` and the slot it points at; the consumer owns
/// `start` and every occupied slot. `len` is the hand-off: the producer
/// publishes a written slot with a `Release` increment, the consumer hands a
/// slot back with a `Release` decrement. A full buffer is `len == capacity`,
/// so no slot is sacrificed to tell it apart from an empty one.
pub(crate) struct Inner<T, I: Index> {
    /// Fixed backing array, never resized
    slots: Box<[UnsafeCell<T>]>,
    /// Write cursor, next slot to be written
    idx: I::Atomic,
    /// Read cursor, oldest unread slot
    start: I::Atomic,
    /// Occupied slots, `capacity` when overflowing
    len: AtomicUsize,
    /// Sentinel-terminated messages currently stored
    messages: AtomicUsize,
    /// Diagnostic value written into consumed slots
    fill: Option<T>,
}

// SAFETY: slots are only touched through the producer/consumer split
// documented on `Inner`, and elements are moved between threads by copy.
unsafe impl<T: Send, I: Index> Send for Inner<T, I> {}
unsafe impl<T: Send, I: Index> Sync for Inner<T, I> {}

impl<T, I: Index> fmt::Debug for Inner<T, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inner")
            .field("capacity", &self.slots.len())
            .field("idx", &self.idx)
            .field("start", &self.start)
            .field("len", &self.len)
            .field("messages", &self.messages)
            .finish_non_exhaustive()
    }
}

impl<T: Copy + Default, I: Index> Inner<T, I> {
    fn with_config(cfg: Config<T>) -> Result<Self, ResultCode> {
        cfg.validate::<I>()?;

        let slots = (0..cfg.capacity)
            .map(|_| UnsafeCell::new(T::default()))
            .collect();

        #[cfg(feature = "tracing")]
        tracing::debug!(
            capacity = cfg.capacity,
            fill = cfg.fill.is_some(),
            "ring buffer created"
        );

        Ok(Inner {
            slots,
            idx: I::atomic(0),
            start: I::atomic(0),
            len: AtomicUsize::new(0),
            messages: AtomicUsize::new(0),
            fill: cfg.fill,
        })
    }
}

impl<T: Copy, I: Index> Inner<T, I> {
    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn index(&self) -> usize {
        I::load(&self.idx, Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn start(&self) -> usize {
        I::load(&self.start, Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn messages(&self) -> usize {
        self.messages.load(Ordering::Acquire)
    }

    /// Position `n` slots after `pos`, `pos < capacity` and `n <= capacity`
    #[inline]
    pub(crate) fn wrap(&self, pos: usize, n: usize) -> usize {
        let rest = self.capacity() - n;
        if pos >= rest { pos - rest } else { pos + n }
    }

    /// Store `elem` at the write cursor.
    ///
    /// If this write fills the buffer and `last` is set, `last` is stored
    /// instead. Returns the value actually stored.
    ///
    /// # Safety
    /// Only one context may push at a time.
    pub(crate) unsafe fn push(&self, elem: T, last: Option<T>) -> Result<T, ResultCode> {
        let len = self.len.load(Ordering::Acquire);
        if len == self.capacity() {
            return Err(ResultCode::Overflow);
        }

        let fills = len + 1 == self.capacity();
        let elem = match last {
            Some(last) if fills => last,
            _ => elem,
        };

        let idx = I::load(&self.idx, Ordering::Relaxed);
        // SAFETY: `len < capacity`, so slot `idx` is free and belongs to the
        // producer until the increment below publishes it.
        self.slots[idx].with_mut(|slot| unsafe { *slot = elem });
        I::store(&self.idx, self.wrap(idx, 1), Ordering::Release);
        self.len.fetch_add(1, Ordering::Release);

        #[cfg(feature = "tracing")]
        if fills {
            tracing::trace!(capacity = self.capacity(), "ring buffer overflow");
        }

        Ok(elem)
    }

    /// Push that counts stored sentinels and forces one into the last free slot.
    ///
    /// # Safety
    /// Only one context may push at a time.
    pub(crate) unsafe fn push_framed(&self, elem: T, eom: T) -> Result<(), ResultCode>
    where
        T: PartialEq,
    {
        // SAFETY: forwarded from the caller.
        let stored = unsafe { self.push(elem, Some(eom))? };
        if stored == eom {
            self.messages.fetch_add(1, Ordering::Release);
        }
        Ok(())
    }

    /// Copy of the element in slot `pos`.
    ///
    /// # Safety
    /// Caller is the only consumer and `pos` lies in the occupied region.
    #[inline]
    pub(crate) unsafe fn read(&self, pos: usize) -> T {
        // SAFETY: the producer never writes an occupied slot.
        self.slots[pos].with(|slot| unsafe { *slot })
    }

    /// Hand `count` elements at the read cursor back to the producer.
    ///
    /// # Safety
    /// Caller is the only consumer and `count <= len`.
    pub(crate) unsafe fn release(&self, count: usize) {
        if count == 0 {
            return;
        }

        let start = I::load(&self.start, Ordering::Relaxed);
        if let Some(fill) = self.fill {
            let mut pos = start;
            for _ in 0..count {
                // SAFETY: still occupied until `len` is decremented.
                self.slots[pos].with_mut(|slot| unsafe { *slot = fill });
                pos = self.wrap(pos, 1);
            }
        }

        I::store(&self.start, self.wrap(start, count), Ordering::Release);
        let before = self.len.fetch_sub(count, Ordering::Release);
        debug_assert!(before >= count);

        #[cfg(feature = "tracing")]
        if before == self.capacity() {
            tracing::trace!(released = count, "ring buffer overflow cleared");
        }
    }

    /// # Safety
    /// Caller is the only consumer.
    pub(crate) unsafe fn front(&self) -> Option<T> {
        if self.len() == 0 {
            return None;
        }
        // SAFETY: `len > 0`, so the slot at `start` is occupied.
        Some(unsafe { self.read(self.start()) })
    }

    /// Element `offset` positions past the read cursor, if stored.
    ///
    /// # Safety
    /// Caller is the only consumer.
    pub(crate) unsafe fn peek_at(&self, offset: usize) -> Option<T> {
        if offset >= self.len() {
            return None;
        }
        // SAFETY: `offset < len`, so the slot is occupied.
        Some(unsafe { self.read(self.wrap(self.start(), offset)) })
    }

    /// # Safety
    /// Caller is the only consumer.
    pub(crate) unsafe fn pop_one(&self) -> Option<T> {
        // SAFETY: forwarded from the caller.
        let elem = unsafe { self.front()? };
        unsafe { self.release(1) };
        Some(elem)
    }

    /// Drain at most `dst.len()` elements, bounded by the length seen on entry.
    ///
    /// # Safety
    /// Caller is the only consumer.
    pub(crate) unsafe fn pop_into(&self, dst: &mut [T]) -> usize {
        let count = self.len().min(dst.len());
        let mut pos = self.start();
        for slot in &mut dst[..count] {
            // SAFETY: the first `count` slots from `start` are occupied.
            *slot = unsafe { self.read(pos) };
            pos = self.wrap(pos, 1);
        }
        // SAFETY: `count` never exceeds the length read above, and only the
        // consumer shrinks it.
        unsafe { self.release(count) };
        count
    }

    pub(crate) fn release_messages(&self, count: usize) {
        if count > 0 {
            self.messages.fetch_sub(count, Ordering::AcqRel);
        }
    }

    /// # Safety
    /// Caller has exclusive access to both sides.
    unsafe fn clear(&self) {
        I::store(&self.idx, 0, Ordering::Relaxed);
        I::store(&self.start, 0, Ordering::Relaxed);
        self.len.store(0, Ordering::Relaxed);
        self.messages.store(0, Ordering::Relaxed);

        #[cfg(feature = "tracing")]
        tracing::debug!(capacity = self.capacity(), "ring buffer cleared");
    }
}

/// Fixed-capacity FIFO with overflow detection
///
/// This handle owns both the producer and the consumer side. Use
/// [`RingBuffer::split`] to hand the two sides to different contexts.
#[derive(Debug)]
pub struct RingBuffer<T = u8, I: Index = usize> {
    inner: Arc<Inner<T, I>>,
}

impl<T: Copy + Default> RingBuffer<T> {
    /// Create a ring buffer holding up to `capacity` elements
    ///
    /// # Returns
    /// * `Ok(RingBuffer)` on success
    /// * `Err(ResultCode::CapacityInvalid)` if `capacity` is 0
    pub fn new(capacity: usize) -> Result<Self, ResultCode> {
        Self::with_config(Config::new(capacity))
    }
}

impl<T: Copy + Default, I: Index> RingBuffer<T, I> {
    /// Create a ring buffer from a [`Config`], with cursors of width `I`
    ///
    /// # Returns
    /// * `Ok(RingBuffer)` on success
    /// * `Err(ResultCode::CapacityInvalid)` if the capacity is 0 or exceeds
    ///   what `I` can address
    pub fn with_config(cfg: Config<T>) -> Result<Self, ResultCode> {
        Ok(RingBuffer {
            inner: Arc::new(Inner::with_config(cfg)?),
        })
    }
}

impl<T: Copy, I: Index> RingBuffer<T, I> {
    /// Append one element
    ///
    /// Fails with `ResultCode::Overflow` and leaves the buffer untouched if
    /// it already holds `capacity` elements. Unread data is never overwritten.
    pub fn push(&mut self, elem: T) -> Result<(), ResultCode> {
        // SAFETY: `&mut self` on the handle that owns both sides.
        unsafe { self.inner.push(elem, None) }.map(|_| ())
    }

    /// Remove and return the oldest element, `None` if empty
    pub fn pop_one(&mut self) -> Option<T> {
        // SAFETY: `&mut self` on the handle that owns both sides.
        unsafe { self.inner.pop_one() }
    }

    /// Move up to `dst.len()` of the oldest elements into `dst`
    ///
    /// Returns the number of elements copied. If `dst` is shorter than the
    /// content, the rest stays in the buffer.
    pub fn pop_into(&mut self, dst: &mut [T]) -> usize {
        // SAFETY: `&mut self` on the handle that owns both sides.
        unsafe { self.inner.pop_into(dst) }
    }

    /// Discard all content without reading it
    pub fn clear(&mut self) {
        // SAFETY: `split` consumes the handle, so nothing else reaches the
        // shared state.
        unsafe { self.inner.clear() }
    }

    /// Begin a speculative read
    ///
    /// Elements peeked through the returned cursor stay in the buffer until
    /// [`ShadowCursor::commit`] is called.
    pub fn begin_read(&mut self) -> ShadowCursor<'_, T, I> {
        ShadowCursor::new(&self.inner)
    }

    /// Split into a producer and a consumer handle
    pub fn split(self) -> (Producer<T, I>, Consumer<T, I>) {
        let producer = Producer {
            inner: Arc::clone(&self.inner),
        };
        (producer, Consumer { inner: self.inner })
    }

    /// Number of stored elements
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if the buffer holds nothing
    pub fn is_empty(&self) -> bool {
        self.inner.len() == 0
    }

    /// Check if the buffer holds `capacity` elements
    ///
    /// While set, every push fails.
    pub fn overflow(&self) -> bool {
        self.inner.len() == self.inner.capacity()
    }

    /// Get the capacity in elements
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    /// Current write cursor
    pub fn index(&self) -> usize {
        self.inner.index()
    }

    /// Current read cursor
    pub fn start(&self) -> usize {
        self.inner.start()
    }

    pub(crate) fn shared(&self) -> &Inner<T, I> {
        &self.inner
    }
}

/// Producer side of a split [`RingBuffer`]
#[derive(Debug)]
pub struct Producer<T = u8, I: Index = usize> {
    inner: Arc<Inner<T, I>>,
}

impl<T: Copy, I: Index> Producer<T, I> {
    /// Append one element, see [`RingBuffer::push`]
    pub fn push(&mut self, elem: T) -> Result<(), ResultCode> {
        // SAFETY: `split` creates exactly one producer.
        unsafe { self.inner.push(elem, None) }.map(|_| ())
    }

    /// Number of stored elements, may grow stale as the consumer drains
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if the buffer holds nothing
    pub fn is_empty(&self) -> bool {
        self.inner.len() == 0
    }

    /// Check if the buffer is full
    pub fn overflow(&self) -> bool {
        self.inner.len() == self.inner.capacity()
    }

    /// Get the capacity in elements
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    pub(crate) fn shared(&self) -> &Inner<T, I> {
        &self.inner
    }
}

/// Consumer side of a split [`RingBuffer`]
#[derive(Debug)]
pub struct Consumer<T = u8, I: Index = usize> {
    inner: Arc<Inner<T, I>>,
}

impl<T: Copy, I: Index> Consumer<T, I> {
    /// Remove and return the oldest element, `None` if empty
    pub fn pop_one(&mut self) -> Option<T> {
        // SAFETY: `split` creates exactly one consumer.
        unsafe { self.inner.pop_one() }
    }

    /// Move up to `dst.len()` elements into `dst`, see [`RingBuffer::pop_into`]
    pub fn pop_into(&mut self, dst: &mut [T]) -> usize {
        // SAFETY: `split` creates exactly one consumer.
        unsafe { self.inner.pop_into(dst) }
    }

    /// Begin a speculative read, see [`RingBuffer::begin_read`]
    pub fn begin_read(&mut self) -> ShadowCursor<'_, T, I> {
        ShadowCursor::new(&self.inner)
    }

    /// Number of stored elements, may grow as the producer pushes
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if the buffer holds nothing
    pub fn is_empty(&self) -> bool {
        self.inner.len() == 0
    }

    /// Check if the buffer is full
    pub fn overflow(&self) -> bool {
        self.inner.len() == self.inner.capacity()
    }

    /// Get the capacity in elements
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    pub(crate) fn shared(&self) -> &Inner<T, I> {
        &self.inner
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;
    use std::thread;

    fn contents<I: Index>(rb: &mut RingBuffer<u8, I>) -> Vec<u8> {
        let mut out = vec![0u8; rb.capacity()];
        let n = rb.pop_into(&mut out);
        out.truncate(n);
        out
    }

    #[test]
    fn test_create_ring_buffer() {
        let rb = RingBuffer::<u8>::new(16).unwrap();
        assert_eq!(rb.capacity(), 16);
        assert!(rb.is_empty());
        assert!(!rb.overflow());
        assert_eq!((rb.index(), rb.start()), (0, 0));
    }

    #[test]
    fn test_create_with_zero_capacity() {
        let result = RingBuffer::<u8>::new(0);
        assert_eq!(result.unwrap_err(), ResultCode::CapacityInvalid);
    }

    #[test]
    fn test_capacity_limited_by_index_width() {
        let rb = RingBuffer::<u8, u8>::with_config(Config::new(256)).unwrap();
        assert_eq!(rb.capacity(), 256);

        let result = RingBuffer::<u8, u8>::with_config(Config::new(257));
        assert_eq!(result.unwrap_err(), ResultCode::CapacityInvalid);
    }

    #[test]
    fn test_single_element_roundtrip() {
        let mut rb = RingBuffer::new(4).unwrap();
        rb.push(0xA5u8).unwrap();
        assert_eq!(rb.len(), 1);
        assert_eq!(rb.pop_one(), Some(0xA5));
        assert!(rb.is_empty());
        assert_eq!(rb.pop_one(), None);
    }

    #[test]
    fn test_fill_sets_overflow_and_rejects_push() {
        let mut rb = RingBuffer::new(4).unwrap();
        for b in b"wxyz" {
            rb.push(*b).unwrap();
        }
        assert!(rb.overflow());
        assert_eq!(rb.index(), rb.start());

        assert_eq!(rb.push(b'!'), Err(ResultCode::Overflow));
        assert!(rb.overflow());
        assert_eq!(contents(&mut rb), b"wxyz");
    }

    #[test]
    fn test_pop_clears_overflow_and_frees_one_slot() {
        let mut rb = RingBuffer::new(5).unwrap();
        for b in b"abcde" {
            rb.push(*b).unwrap();
        }
        assert!(rb.overflow());

        assert_eq!(rb.pop_one(), Some(b'a'));
        assert!(!rb.overflow());
        assert_eq!(rb.len(), 4);

        rb.push(b'f').unwrap();
        assert!(rb.overflow());
        assert_eq!(contents(&mut rb), b"bcdef");
    }

    #[test]
    fn test_cursors_wrap_around() {
        let mut rb = RingBuffer::<u8, u8>::with_config(Config::new(3)).unwrap();
        for round in 0..10u8 {
            rb.push(round).unwrap();
            rb.push(round.wrapping_add(100)).unwrap();
            assert_eq!(rb.pop_one(), Some(round));
            assert_eq!(rb.pop_one(), Some(round.wrapping_add(100)));
            assert!(rb.index() < 3 && rb.start() < 3);
        }
        assert!(rb.is_empty());
    }

    #[test]
    fn test_pop_into_partial_drain() {
        let mut rb = RingBuffer::new(8).unwrap();
        for b in b"hello" {
            rb.push(*b).unwrap();
        }

        let mut dst = [0u8; 3];
        assert_eq!(rb.pop_into(&mut dst), 3);
        assert_eq!(&dst, b"hel");
        assert_eq!(rb.len(), 2);

        let mut dst = [0u8; 8];
        assert_eq!(rb.pop_into(&mut dst), 2);
        assert_eq!(&dst[..2], b"lo");
        assert_eq!(rb.pop_into(&mut dst), 0);
    }

    #[test]
    fn test_pop_into_exact_length_takes_everything() {
        let mut rb = RingBuffer::new(4).unwrap();
        for b in b"abcd" {
            rb.push(*b).unwrap();
        }
        let mut dst = [0u8; 4];
        assert_eq!(rb.pop_into(&mut dst), 4);
        assert_eq!(&dst, b"abcd");
        assert!(rb.is_empty());
        assert!(!rb.overflow());
    }

    #[test]
    fn test_clear_discards_content() {
        let mut rb = RingBuffer::new(4).unwrap();
        for b in b"abcd" {
            rb.push(*b).unwrap();
        }
        rb.pop_one();
        rb.clear();

        assert!(rb.is_empty());
        assert!(!rb.overflow());
        assert_eq!((rb.index(), rb.start()), (0, 0));
        assert_eq!(rb.pop_one(), None);
        rb.push(b'z').unwrap();
        assert_eq!(rb.pop_one(), Some(b'z'));
    }

    #[test]
    fn test_fill_value_written_on_pop() {
        let mut rb = RingBuffer::<u8, u8>::with_config(Config::new(3).fill(b'.')).unwrap();
        rb.push(b'a').unwrap();
        rb.push(b'b').unwrap();
        rb.pop_one();

        // SAFETY: exclusive handle, slot 0 is no longer occupied.
        let slot = unsafe { rb.shared().read(0) };
        assert_eq!(slot, b'.');
        assert_eq!(rb.pop_one(), Some(b'b'));
    }

    #[test]
    fn test_record_elements() {
        type Record = [u8; 8];
        let mut rb = RingBuffer::<Record>::new(2).unwrap();
        rb.push(*b"record-1").unwrap();
        rb.push(*b"record-2").unwrap();
        assert_eq!(rb.push(*b"record-3"), Err(ResultCode::Overflow));
        assert_eq!(rb.pop_one(), Some(*b"record-1"));
        assert_eq!(rb.pop_one(), Some(*b"record-2"));
    }

    #[test]
    fn test_split_handles_share_state() {
        let (mut producer, mut consumer) = RingBuffer::new(2).unwrap().split();
        producer.push(1u32).unwrap();
        producer.push(2).unwrap();
        assert!(producer.overflow());
        assert!(consumer.overflow());
        assert_eq!(producer.push(3), Err(ResultCode::Overflow));

        assert_eq!(consumer.pop_one(), Some(1));
        assert_eq!(producer.len(), 1);
        producer.push(3).unwrap();

        let mut dst = [0u32; 4];
        assert_eq!(consumer.pop_into(&mut dst), 2);
        assert_eq!(&dst[..2], &[2, 3]);
        assert!(consumer.is_empty());
    }

    #[test]
    fn test_single_producer_single_consumer() {
        let (mut producer, mut consumer) = RingBuffer::<u32, u8>::with_config(Config::new(7))
            .unwrap()
            .split();
        let total = 10_000u32;

        let handle = thread::spawn(move || {
            for value in 0..total {
                while producer.push(value).is_err() {
                    thread::yield_now();
                }
            }
        });

        let mut expected = 0;
        let mut batch = [0u32; 5];
        while expected < total {
            let n = consumer.pop_into(&mut batch);
            for value in &batch[..n] {
                assert_eq!(*value, expected);
                expected += 1;
            }
            if n == 0 {
                thread::yield_now();
            }
        }

        handle.join().unwrap();
        assert!(consumer.is_empty());
    }
}
