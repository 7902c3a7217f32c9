// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::num::NonZero;
use std::ptr::NonNull;

use crate::{DynamicBuf, PreparedSpan, PreparedSpans, SpanSeq};

/// A contiguous [`DynamicBuf`] backed by a single `Vec<u8>`, with a hard content limit.
///
/// This is the simplest useful growable buffer: every `prepare` call returns exactly one
/// span, carved out of the vector's spare capacity. It is a good default when the pending
/// bytes are consumed as one slice afterwards.
///
/// # Example
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
///     write!(stream, "{} + {} = {}", 2, 3, 2 + 3).expect("buffer writes cannot fail");
/// }
///
/// assert_eq!(buf.as_slice(), b"2 + 3 = 5");
/// ```
#[derive(Debug, Default)]
pub struct VecBuf {
    /// The vector length is exactly the committed content.
    data: Vec<u8>,

    /// Bytes reserved by the most recent `prepare` call and not yet committed.
    /// These live in the vector's spare capacity, directly after the content.
    prepared: usize,

    max_len: usize,
}

impl VecBuf {
    /// Creates an empty buffer with no practical content limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_len(usize::MAX)
    }

    /// Creates an empty buffer whose content may never exceed `max_len` bytes.
    ///
    /// A `prepare` request past the limit panics - see [`DynamicBuf::prepare()`].
    #[must_use]
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            data: Vec::new(),
            prepared: 0,
            max_len,
        }
    }

    /// The committed content.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Extracts the committed content, consuming the buffer.
    ///
    /// Uncommitted prepared capacity is discarded.
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

// SAFETY: Spans are carved from the vector's spare capacity. The vector is only permitted
// to reallocate inside `prepare` (via `reserve`), before new spans are created. `commit`
// merely extends the vector length over bytes the caller vouches for, which neither moves
// nor releases the allocation, so spans stay valid until the next `prepare`.
unsafe impl DynamicBuf for VecBuf {
    fn len(&self) -> usize {
        self.data.len()
    }

    fn capacity(&self) -> usize {
        self.data.capacity()
    }

    fn max_len(&self) -> usize {
        self.max_len
    }

    fn prepare(&mut self, additional: usize) -> PreparedSpans<'_> {
        assert!(
            additional <= self.max_len.saturating_sub(self.data.len()),
            "prepare request for {additional} bytes would grow the buffer past its maximum length of {} bytes",
            self.max_len
        );

        self.prepared = additional;

        let Some(additional) = NonZero::new(additional) else {
            return PreparedSpans::empty();
        };

        self.data.reserve(additional.get());

        let spare = self.data.spare_capacity_mut();

        // Guaranteed by the `reserve` call above.
        debug_assert!(spare.len() >= additional.get());

        let start = NonNull::new(spare.as_mut_ptr()).expect("a slice pointer is never null");

        // SAFETY: The span covers the first `additional` bytes of spare capacity, which
        // exist per the reserve above and stay put until the next `prepare` (see the
        // trait impl SAFETY note).
        let span = unsafe { PreparedSpan::new(start, additional) };

        PreparedSpans::from_spans([span])
    }

    unsafe fn commit(&mut self, len: usize) {
        assert!(len <= self.prepared, "commit of {len} bytes exceeds the {} prepared bytes", self.prepared);

        // Cannot overflow - guarded by the assertion above and the prepare-time limit check.
        let new_len = self.data.len().wrapping_add(len);

        // SAFETY: The capacity exists (reserved during `prepare`) and the caller
        // guarantees the first `len` prepared bytes are initialized.
        unsafe {
            self.data.set_len(new_len);
        }

        // Remaining prepared bytes start directly after the new content, so later
        // commits against the same prepare continue where this one stopped.
        self.prepared = self.prepared.wrapping_sub(len);
    }
}

impl SpanSeq for VecBuf {
    fn spans(&self) -> impl Iterator<Item = &[u8]> {
        std::iter::once(self.as_slice())
    }

    fn total_len(&self) -> usize {
        self.data.len()
    }
}
