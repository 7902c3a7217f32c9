// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Special-purpose buffers for testing code that works with [`DynamicBuf`].
//!
//! These are not optimized for real-world usage - they exist to exercise corner cases
//! such as fragmented `prepare` results and hard content limits.

use std::mem::MaybeUninit;
use std::num::NonZero;
use std::ptr::NonNull;

use crate::{DynamicBuf, PreparedSpan, PreparedSpans, SpanSeq};

/// A [`DynamicBuf`] that cuts every `prepare` request into spans of a fixed length and
/// records the size of every `prepare` request it receives.
///
/// Useful for verifying how much memory a component requests, how it behaves when a
/// single `prepare` call returns multiple spans, and what happens near a hard content
/// limit. You can go down to as low as 1 byte per span!
///
/// This buffer copies committed bytes into an internal `Vec` and should not be used in
/// real code.
#[derive(Debug, Default)]
pub struct SegmentedTestBuf {
    /// Durable content, in commit order.
    committed: Vec<u8>,

    /// Memory handed out by the most recent `prepare` call. The boxes give every span a
    /// stable address for as long as the staging is alive.
    staging: Vec<Box<[MaybeUninit<u8>]>>,

    /// Total bytes across `staging`.
    staged_total: usize,

    /// Bytes of `staging` already committed. Later commits continue after these.
    staging_committed: usize,

    /// When set, every prepared span is exactly this long (the last one may overshoot
    /// the request). When unset, each request yields a single span of the exact size.
    span_len: Option<NonZero<usize>>,

    max_len: Option<usize>,

    prepare_sizes: Vec<usize>,
}

impl SegmentedTestBuf {
    /// Creates a buffer that returns a single exact-sized span per `prepare` request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a buffer that cuts every `prepare` request into spans of `span_len` bytes.
    #[must_use]
    pub fn with_span_len(span_len: NonZero<usize>) -> Self {
        Self {
            span_len: Some(span_len),
            ..Self::default()
        }
    }

    /// Imposes a hard content limit, consuming and returning the buffer for chaining.
    #[must_use]
    pub fn limited_to(mut self, max_len: usize) -> Self {
        self.max_len = Some(max_len);
        self
    }

    /// The committed content.
    #[must_use]
    pub fn content(&self) -> &[u8] {
        &self.committed
    }

    /// The recorded size of every `prepare` request, in call order.
    #[must_use]
    pub fn prepare_sizes(&self) -> &[usize] {
        &self.prepare_sizes
    }

    /// How many `prepare` calls the buffer has received.
    #[must_use]
    pub fn prepare_count(&self) -> usize {
        self.prepare_sizes.len()
    }
}

// SAFETY: Prepared spans point into boxed allocations that are neither moved nor freed
// until the next `prepare` call replaces the staging. `commit` only reads bytes the
// caller vouches for and copies them into the content vector.
unsafe impl DynamicBuf for SegmentedTestBuf {
    fn len(&self) -> usize {
        self.committed.len()
    }

    fn capacity(&self) -> usize {
        // Will not overflow - the content and outstanding staging both fit in memory.
        self.committed.len().wrapping_add(self.staged_total.wrapping_sub(self.staging_committed))
    }

    fn max_len(&self) -> usize {
        self.max_len.unwrap_or(usize::MAX)
    }

    fn prepare(&mut self, additional: usize) -> PreparedSpans<'_> {
        assert!(
            additional <= self.max_len().saturating_sub(self.committed.len()),
            "prepare request for {additional} bytes would grow the buffer past its maximum length of {} bytes",
            self.max_len()
        );

        self.prepare_sizes.push(additional);

        self.staging.clear();
        self.staged_total = 0;
        self.staging_committed = 0;

        let Some(additional) = NonZero::new(additional) else {
            return PreparedSpans::empty();
        };

        let span_len = self.span_len.unwrap_or(additional);
        let span_count = additional.get().div_ceil(span_len.get());

        for _ in 0..span_count {
            self.staging.push(vec![MaybeUninit::uninit(); span_len.get()].into_boxed_slice());
        }

        // Will not overflow - the allocations above would have failed first.
        self.staged_total = span_len.get().wrapping_mul(span_count);

        let spans = self.staging.iter_mut().map(|chunk| {
            let start = NonNull::new(chunk.as_mut_ptr()).expect("a boxed slice pointer is never null");
            let len = NonZero::new(chunk.len()).expect("span_len is nonzero, so every chunk is nonempty");

            // SAFETY: The chunk is a live boxed allocation that stays put until the next
            // `prepare` call clears the staging.
            unsafe { PreparedSpan::new(start, len) }
        });

        PreparedSpans::from_spans(spans)
    }

    unsafe fn commit(&mut self, len: usize) {
        assert!(
            len <= self.staged_total - self.staging_committed,
            "commit of {len} bytes exceeds the outstanding prepared bytes"
        );

        let mut remaining = len;
        let mut skip = self.staging_committed;

        for chunk in &self.staging {
            if remaining == 0 {
                break;
            }

            if skip >= chunk.len() {
                skip -= chunk.len();
                continue;
            }

            let take = (chunk.len() - skip).min(remaining);
            let initialized = &chunk[skip..skip + take];

            // SAFETY: The caller guarantees the first `len` outstanding prepared bytes
            // were initialized; this range lies within them.
            let bytes = unsafe { &*(std::ptr::from_ref::<[MaybeUninit<u8>]>(initialized) as *const [u8]) };

            self.committed.extend_from_slice(bytes);

            remaining -= take;
            skip = 0;
        }

        // Cannot overflow - guarded by the assertion above.
        self.staging_committed = self.staging_committed.wrapping_add(len);
    }
}

impl SpanSeq for SegmentedTestBuf {
    fn spans(&self) -> impl Iterator<Item = &[u8]> {
        std::iter::once(self.content())
    }

    fn total_len(&self) -> usize {
        self.committed.len()
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use new_zealand::nz;

    use super::*;

    fn fill_prepared(spans: &PreparedSpans<'_>, data: &[u8]) {
        let mut remaining = data;

        for span in spans.iter() {
            if remaining.is_empty() {
                break;
            }

            let take = span.len().get().min(remaining.len());

            // SAFETY: The span was just prepared and covers at least `take` writable bytes.
            unsafe {
                span.as_ptr().as_ptr().cast::<u8>().copy_from_nonoverlapping(remaining.as_ptr(), take);
            }

            remaining = &remaining[take..];
        }

        assert!(remaining.is_empty(), "test data exceeds the prepared capacity");
    }

    #[test]
    fn records_prepare_sizes() {
        let mut buf = SegmentedTestBuf::new();

        _ = buf.prepare(100);
        _ = buf.prepare(200);

        assert_eq!(buf.prepare_sizes(), [100, 200]);
        assert_eq!(buf.prepare_count(), 2);
    }

    #[test]
    fn single_span_by_default() {
        let mut buf = SegmentedTestBuf::new();

        let spans = buf.prepare(64);

        assert_eq!(spans.span_count(), 1);
        assert_eq!(spans.total_len(), 64);
    }

    #[test]
    fn fixed_span_len_fragments_the_request() {
        let mut buf = SegmentedTestBuf::with_span_len(nz!(10));

        let spans = buf.prepare(25);

        assert_eq!(spans.span_count(), 3);
        assert_eq!(spans.first().expect("request was fragmented into spans").len().get(), 10);
        assert_eq!(spans.total_len(), 30);
    }

    #[test]
    fn commit_crosses_span_boundaries() {
        let mut buf = SegmentedTestBuf::with_span_len(nz!(4));

        let spans = buf.prepare(8);
        fill_prepared(&spans, b"abcdefgh");

        // SAFETY: All 8 bytes were initialized above.
        unsafe {
            buf.commit(8);
        }

        assert_eq!(buf.content(), b"abcdefgh");
    }

    #[test]
    fn split_commits_continue_where_the_last_stopped() {
        let mut buf = SegmentedTestBuf::with_span_len(nz!(4));

        let spans = buf.prepare(8);
        fill_prepared(&spans, b"abcdefgh");

        // SAFETY: All 8 bytes were initialized above.
        unsafe {
            buf.commit(3);
        }

        // SAFETY: The remaining 5 outstanding bytes were also initialized above.
        unsafe {
            buf.commit(5);
        }

        assert_eq!(buf.content(), b"abcdefgh");
    }

    #[test]
    #[should_panic(expected = "maximum length")]
    fn prepare_past_limit_panics() {
        let mut buf = SegmentedTestBuf::new().limited_to(10);

        _ = buf.prepare(11);
    }
}
