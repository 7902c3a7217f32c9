// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Stream-style output adapters over dynamically growing byte buffers.
//!
//! Network and I/O libraries often keep pending-to-send data in a resizable, possibly
//! segmented in-memory byte store that grows through a two-phase protocol: `prepare`
//! reserves writable memory, `commit` finalizes written bytes as content. That protocol
//! is efficient but awkward to generate output against directly. This crate bridges the
//! gap: it puts a familiar stream interface in front of any such buffer, so ordinary
//! formatted and byte-oriented writes land straight in the buffer's memory.
//!
//! # Writing into a buffer
//!
//! Wrap any [`DynamicBuf`] in a [`BufStream`] and use the standard write machinery.
//! Dropping the stream commits everything written:
//!
//! ```
//! use std::io::Write;
//!
//! use dynbuf::{BufStream, VecBuf};
//!
//! let mut buf = VecBuf::new();
//!
//! {
//!     let mut stream = BufStream::new(&mut buf);
//!
//!     stream.write_all(b"HTTP/1.1 ").expect("buffer writes cannot fail");
//!     write!(stream, "{} {}\r\n", 204, "No Content").expect("buffer writes cannot fail");
//! }
//!
//! assert_eq!(buf.as_slice(), b"HTTP/1.1 204 No Content\r\n");
//! ```
//!
//! The stream never exposes buffer internals. Behind the scenes it maintains a bounded
//! *write window* over freshly prepared memory: characters are stored directly into the
//! window, and when the window runs out, the filled bytes are committed and a new window
//! is grown. One position of every window is reserved so the character that no longer
//! fits can still be stored before the growth round-trip happens.
//!
//! Growth requests are clamped to the [`MIN_GROW`]..=[`MAX_GROW`] byte range and to the
//! buffer's remaining room under its content limit, bounding both the latency of a
//! single growth step and the memory wasted when little is written.
//!
//! # Character-level access
//!
//! The stream is a thin front end over [`WindowedWriter`], which exposes the
//! character-level protocol directly - [`put()`], [`overflow()`], [`sync()`] - and
//! supports wider character types such as `u16` code units:
//!
//! ```
//! use dynbuf::{VecBuf, WindowedWriter};
//!
//! let mut buf = VecBuf::new();
//!
//! {
//!     let mut writer = WindowedWriter::<_, u16>::new(&mut buf);
//!     for unit in "wide".encode_utf16() {
//!         writer.put(unit);
//!     }
//! }
//!
//! // Four u16 code units, in native byte order.
//! assert_eq!(buf.as_slice().len(), 8);
//! ```
//!
//! # Implementing a buffer
//!
//! [`DynamicBuf`] is the abstraction this crate consumes: `len`/`capacity`/`max_len`
//! queries plus the `prepare`/`commit` growth protocol. [`VecBuf`] is a ready-made
//! contiguous implementation; enabling the `bytes-compat` feature provides one for
//! `bytes::BytesMut`. A buffer reports its reserved memory as [`PreparedSpan`]s; a
//! single `prepare` call may return several of them, and consumers are not required to
//! use more than the first.
//!
//! The trait is `unsafe` to implement: prepared memory must stay valid until the next
//! `prepare` call, because writers store bytes through the span pointers without
//! further checks. See the trait documentation for the exact rules.
//!
//! # Serializing existing spans
//!
//! [`write_spans()`] is the companion utility for data that already sits in memory:
//! it writes every span of a [`SpanSeq`] to an `std::io::Write` sink, in order,
//! without buffering or copying into intermediate storage.
//!
//! # Testing
//!
//! For testing purposes (behind the `test-util` Cargo feature), the `testing` module
//! provides `SegmentedTestBuf`, a buffer that fragments every `prepare` request into
//! fixed-size spans and records all request sizes. This is useful to verify that code
//! handles segmented buffers correctly - you can go down to as low as 1 byte per span.
//!
//! [`put()`]: WindowedWriter::put
//! [`overflow()`]: WindowedWriter::overflow
//! [`sync()`]: WindowedWriter::sync

mod buf;
#[cfg(feature = "bytes-compat")]
mod bytes_compat;
mod constants;
mod slot;
mod span_seq;
mod span_writer;
mod stream;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
mod vec_buf;
mod window;

pub use buf::{DynamicBuf, PreparedSpan, PreparedSpans};
pub use constants::MAX_INLINE_SPANS;
pub use slot::{BoxedSlot, InlineSlot, WriterSlot};
pub use span_seq::SpanSeq;
pub use span_writer::write_spans;
pub use stream::{BoxedBufStream, BufStream};
pub use vec_buf::VecBuf;
pub use window::{MAX_GROW, MIN_GROW, WindowedWriter};
