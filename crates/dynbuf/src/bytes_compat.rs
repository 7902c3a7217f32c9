// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Interoperability with the `bytes` crate.

use std::num::NonZero;
use std::ptr::NonNull;

use bytes::BytesMut;

use crate::{DynamicBuf, PreparedSpan, PreparedSpans};

// SAFETY: Spans are carved from the spare capacity of the `BytesMut`. Reallocation only
// happens inside `prepare` (via `reserve`), before new spans are created. `commit`
// extends the length over bytes the caller vouches for, which neither moves nor releases
// the allocation, so spans stay valid until the next `prepare`.
unsafe impl DynamicBuf for BytesMut {
    fn len(&self) -> usize {
        self.len()
    }

    fn capacity(&self) -> usize {
        self.capacity()
    }

    /// A `BytesMut` imposes no content limit of its own.
    fn max_len(&self) -> usize {
        usize::MAX
    }

    fn prepare(&mut self, additional: usize) -> PreparedSpans<'_> {
        self.reserve(additional);

        // The whole spare capacity becomes the span - `prepare` may return more than
        // was asked for, and this keeps a second reserve round-trip away.
        let spare = self.spare_capacity_mut();

        let Some(len) = NonZero::new(spare.len()) else {
            return PreparedSpans::empty();
        };

        let start = NonNull::new(spare.as_mut_ptr()).expect("a slice pointer is never null");

        // SAFETY: The span covers the spare capacity, which exists per the reserve above
        // and stays put until the next `prepare` (see the trait impl SAFETY note).
        let span = unsafe { PreparedSpan::new(start, len) };

        PreparedSpans::from_spans([span])
    }

    unsafe fn commit(&mut self, len: usize) {
        // Cannot overflow - the committed bytes lie within the existing capacity.
        let new_len = self.len().wrapping_add(len);

        assert!(new_len <= self.capacity(), "commit of {len} bytes exceeds the prepared capacity");

        // SAFETY: The capacity exists (reserved during `prepare`) and the caller
        // guarantees the first `len` prepared bytes are initialized.
        unsafe {
            self.set_len(new_len);
        }
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;
    use crate::BufStream;

    #[test]
    fn stream_into_bytes_mut() {
        let mut buf = BytesMut::new();

        {
            let mut stream = BufStream::new(&mut buf);
            stream.write_all(b"zero-copy interop").expect("buffer writes cannot fail");
        }

        assert_eq!(&buf[..], b"zero-copy interop");
    }

    #[test]
    fn prepare_returns_at_least_the_requested_bytes() {
        let mut buf = BytesMut::new();

        let spans = buf.prepare(100);

        assert_eq!(spans.span_count(), 1);
        assert!(spans.total_len() >= 100);
    }

    #[test]
    fn content_survives_across_grows() {
        let mut buf = BytesMut::new();

        {
            let mut stream = BufStream::new(&mut buf);
            for index in 0..2000_u32 {
                write!(stream, "{index},").expect("buffer writes cannot fail");
            }
        }

        let text = std::str::from_utf8(&buf).expect("only ASCII was written");
        assert!(text.starts_with("0,1,2,"));
        assert!(text.ends_with("1998,1999,"));
    }
}
