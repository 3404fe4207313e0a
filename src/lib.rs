//! # cbuf - Transactional Circular Buffer
//!
//! A fixed-capacity FIFO for moving elements (typically bytes from a serial
//! line) from one producer context to one consumer context.
//!
//! ## Design
//!
//! - One backing array, sized at construction and never resized
//! - Every slot is usable; a full buffer is told apart from an empty one by
//!   its occupancy, not by a reserved slot
//! - Single-producer, single-consumer, lock-free, never blocks
//! - A push into a full buffer fails; unread data is never overwritten
//! - Consumer transactions: `begin_read` → `peek_one` ... → `commit` or `reset`
//! - Optional framing of sentinel-terminated messages on either read path
//! - Generic over the element type and the cursor width (`u8` .. `usize`)
//!
//! ## Example
//!
//! ```
//! use cbuf::{MessageFramer, RingBuffer};
//!
//! let (producer, mut consumer) = RingBuffer::<u8>::new(32).unwrap().split();
//!
//! // Producer: bytes arrive one at a time
//! let mut rx = MessageFramer::new(producer, b'\n');
//! for b in b"AT+GMR\n" {
//!     rx.push(*b).unwrap();
//! }
//!
//! // Consumer: look at a message, release it only once it is handled
//! let mut shadow = consumer.begin_read();
//! let mut line = [0u8; 16];
//! let frame = MessageFramer::new(&mut shadow, b'\n')
//!     .pop_message(&mut line)
//!     .unwrap();
//! if &line[..frame.len] == b"AT+GMR" {
//!     shadow.commit();
//! }
//! ```

#![warn(missing_docs)]

mod config;
mod cursor;
mod framer;
mod index;
mod ring_buffer;
mod shadow;
mod sync;

pub use config::{Config, DEFAULT_CAPACITY};
pub use cursor::{Reader, Writer};
pub use framer::{Frame, MessageFramer, DEFAULT_EOM};
pub use index::Index;
pub use ring_buffer::{Consumer, Producer, ResultCode, RingBuffer};
pub use shadow::ShadowCursor;
