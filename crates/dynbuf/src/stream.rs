// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;
use std::io;
use std::marker::PhantomData;

use crate::{BoxedSlot, DynamicBuf, InlineSlot, WindowedWriter, WriterSlot};

/// A stream-style front end that writes formatted output straight into a [`DynamicBuf`].
///
/// Implements both [`std::io::Write`] and [`std::fmt::Write`], so `write!`/`writeln!`
/// and byte-oriented writers work against it unchanged. All output lands in the buffer's
/// prepared memory via a [`WindowedWriter`]; the caller never sees growth or
/// segmentation.
///
/// # Flushing and durability
///
/// Written bytes sit in the current write window until `flush` (or [`sync()`]) commits
/// them. Dropping the stream commits everything written, so simply letting the stream
/// go out of scope is enough to make the output durable buffer content:
///
/// ```
/// use std::io::Write;
///
/// use dynbuf::{BufStream, VecBuf};
///
/// let mut buf = VecBuf::new();
///
/// {
///     let mut stream = BufStream::new(&mut buf);
///     stream.write_all(b"status: ").expect("buffer writes cannot fail");
///     write!(stream, "{}", 200).expect("buffer writes cannot fail");
/// }
///
/// assert_eq!(buf.as_slice(), b"status: 200");
/// ```
///
/// # Moving
///
/// The stream may be moved freely, even with unflushed output - a move flushes nothing.
/// The storage strategy `S` (see [`WriterSlot`]) decides whether the inner writer value
/// relocates with the stream or stays at a stable heap address; [`new()`] picks the
/// inline strategy, [`boxed()`] the stable-address one. The two behave identically.
///
/// The stream cannot be cloned: it holds the exclusive borrow of its buffer, and two
/// front ends committing into one buffer without coordination would corrupt it.
///
/// # Errors
///
/// The `io::Write` and `fmt::Write` implementations never report errors of their own;
/// buffer exhaustion surfaces as a panic from the buffer's `prepare` (see
/// [`DynamicBuf::prepare()`]).
///
/// [`sync()`]: Self::sync
/// [`new()`]: Self::new
/// [`boxed()`]: Self::boxed
#[derive(Debug)]
pub struct BufStream<'b, B, S = InlineSlot<WindowedWriter<'b, B>>>
where
    B: DynamicBuf + ?Sized,
    S: WriterSlot<WindowedWriter<'b, B>>,
{
    slot: S,
    _buf: PhantomData<&'b mut B>,
}

/// A [`BufStream`] whose inner writer lives at a stable heap address across moves.
pub type BoxedBufStream<'b, B> = BufStream<'b, B, BoxedSlot<WindowedWriter<'b, B>>>;

impl<'b, B: DynamicBuf + ?Sized> BufStream<'b, B> {
    /// Creates a stream over the buffer, storing the writer inline.
    ///
    /// The first write window is grown immediately.
    ///
    /// # Panics
    ///
    /// Panics if the first window cannot be grown (see [`WindowedWriter::new()`]).
    pub fn new(buf: &'b mut B) -> Self {
        Self {
            slot: InlineSlot::hold(WindowedWriter::new(buf)),
            _buf: PhantomData,
        }
    }
}

impl<'b, B: DynamicBuf + ?Sized> BoxedBufStream<'b, B> {
    /// Creates a stream over the buffer, storing the writer behind a stable heap
    /// address.
    ///
    /// Behaves exactly like [`new()`][BufStream::new] apart from the relocation
    /// strategy; use this when something retains a pointer to the inner writer across
    /// moves of the stream.
    ///
    /// # Panics
    ///
    /// Panics if the first window cannot be grown (see [`WindowedWriter::new()`]).
    pub fn boxed(buf: &'b mut B) -> Self {
        Self {
            slot: BoxedSlot::hold(WindowedWriter::new(buf)),
            _buf: PhantomData,
        }
    }
}

impl<'b, B, S> BufStream<'b, B, S>
where
    B: DynamicBuf + ?Sized,
    S: WriterSlot<WindowedWriter<'b, B>>,
{
    /// The inner character writer.
    #[must_use]
    pub fn writer(&self) -> &WindowedWriter<'b, B> {
        self.slot.writer()
    }

    /// The inner character writer, mutably.
    pub fn writer_mut(&mut self) -> &mut WindowedWriter<'b, B> {
        self.slot.writer_mut()
    }

    /// Commits everything written so far into the buffer.
    ///
    /// The infallible equivalent of [`io::Write::flush()`].
    pub fn sync(&mut self) {
        self.slot.writer_mut().sync();
    }
}

impl<'b, B, S> io::Write for BufStream<'b, B, S>
where
    B: DynamicBuf + ?Sized,
    S: WriterSlot<WindowedWriter<'b, B>>,
{
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.slot.writer_mut().put_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sync();
        Ok(())
    }
}

impl<'b, B, S> fmt::Write for BufStream<'b, B, S>
where
    B: DynamicBuf + ?Sized,
    S: WriterSlot<WindowedWriter<'b, B>>,
{
    fn write_str(&mut self, text: &str) -> fmt::Result {
        self.slot.writer_mut().put_slice(text.as_bytes());
        Ok(())
    }

    fn write_char(&mut self, ch: char) -> fmt::Result {
        let mut scratch = [0_u8; 4];
        self.slot.writer_mut().put_slice(ch.encode_utf8(&mut scratch).as_bytes());
        Ok(())
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use new_zealand::nz;

    use super::*;
    use crate::testing::SegmentedTestBuf;

    #[test]
    fn io_write_round_trip() {
        let mut buf = SegmentedTestBuf::new();

        {
            let mut stream = BufStream::new(&mut buf);

            let written = stream.write(b"hello, buffer").expect("buffer writes cannot fail");
            assert_eq!(written, 13);

            stream.flush().expect("buffer flushes cannot fail");
        }

        assert_eq!(buf.content(), b"hello, buffer");
    }

    #[test]
    fn fmt_write_round_trip() {
        // A generic helper keeps only `fmt::Write` in scope, the way formatting
        // machinery sees the stream.
        fn render<W: std::fmt::Write>(out: &mut W) {
            write!(out, "{}-{:04}", "item", 7).expect("buffer writes cannot fail");
            out.write_char('!').expect("buffer writes cannot fail");
        }

        let mut buf = SegmentedTestBuf::new();

        {
            let mut stream = BufStream::new(&mut buf);
            render(&mut stream);
        }

        assert_eq!(buf.content(), b"item-0007!");
    }

    #[test]
    fn drop_commits_without_explicit_flush() {
        let mut buf = SegmentedTestBuf::with_span_len(nz!(4));

        {
            let mut stream = BufStream::new(&mut buf);
            stream.write_all(b"no explicit flush").expect("buffer writes cannot fail");
        }

        assert_eq!(buf.content(), b"no explicit flush");
    }

    #[test]
    fn output_crossing_many_windows_is_exact() {
        let mut buf = SegmentedTestBuf::with_span_len(nz!(7));

        let expected: Vec<u8> = (0..=255).cycle().take(4096).collect();

        {
            let mut stream = BufStream::new(&mut buf);
            stream.write_all(&expected).expect("buffer writes cannot fail");
        }

        assert_eq!(buf.content(), expected);
    }

    fn move_probe<'b, B, S>(stream: BufStream<'b, B, S>) -> BufStream<'b, B, S>
    where
        B: DynamicBuf + ?Sized,
        S: WriterSlot<WindowedWriter<'b, B>>,
    {
        // Crossing a call boundary relocates the stream by value.
        stream
    }

    #[test]
    fn moving_with_unflushed_output_loses_nothing_inline() {
        let mut buf = SegmentedTestBuf::new();

        {
            let mut stream = BufStream::new(&mut buf);
            stream.write_all(b"part one, ").expect("buffer writes cannot fail");

            let mut moved = move_probe(stream);
            moved.write_all(b"part two").expect("buffer writes cannot fail");
        }

        assert_eq!(buf.content(), b"part one, part two");
    }

    #[test]
    fn moving_with_unflushed_output_loses_nothing_boxed() {
        let mut buf = SegmentedTestBuf::new();

        {
            let mut stream = BufStream::boxed(&mut buf);
            stream.write_all(b"part one, ").expect("buffer writes cannot fail");

            let mut moved = move_probe(stream);
            moved.write_all(b"part two").expect("buffer writes cannot fail");
        }

        assert_eq!(buf.content(), b"part one, part two");
    }

    #[test]
    fn both_shapes_commit_identical_bytes() {
        let payload: Vec<u8> = (0..=255).cycle().take(1500).collect();

        let mut inline_buf = SegmentedTestBuf::with_span_len(nz!(11));
        {
            let mut stream = BufStream::new(&mut inline_buf);
            stream.write_all(&payload[..700]).expect("buffer writes cannot fail");
            let mut stream = move_probe(stream);
            stream.write_all(&payload[700..]).expect("buffer writes cannot fail");
        }

        let mut boxed_buf = SegmentedTestBuf::with_span_len(nz!(11));
        {
            let mut stream = BufStream::boxed(&mut boxed_buf);
            stream.write_all(&payload[..700]).expect("buffer writes cannot fail");
            let mut stream = move_probe(stream);
            stream.write_all(&payload[700..]).expect("buffer writes cannot fail");
        }

        assert_eq!(inline_buf.content(), boxed_buf.content());
        assert_eq!(inline_buf.content(), payload);
    }

    #[test]
    fn move_does_not_flush() {
        let mut buf = SegmentedTestBuf::new();

        {
            let mut stream = BufStream::new(&mut buf);
            stream.write_all(b"pending").expect("buffer writes cannot fail");

            let moved = move_probe(stream);

            // The bytes are still in the window, not yet committed.
            assert_eq!(moved.writer().buffer().content().len(), 0);
            assert_eq!(moved.writer().pending(), 7);
        }

        assert_eq!(buf.content(), b"pending");
    }

    #[test]
    fn writes_after_flush_continue_cleanly() {
        let mut buf = SegmentedTestBuf::new();

        {
            let mut stream = BufStream::new(&mut buf);
            stream.write_all(b"first").expect("buffer writes cannot fail");
            stream.flush().expect("buffer flushes cannot fail");
            stream.write_all(b" second").expect("buffer writes cannot fail");
        }

        assert_eq!(buf.content(), b"first second");
    }
}
