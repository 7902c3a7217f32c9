// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Debug;
use std::marker::PhantomData;
use std::mem::MaybeUninit;
use std::num::NonZero;
use std::ptr::NonNull;

use smallvec::SmallVec;

use crate::MAX_INLINE_SPANS;

/// A dynamically growing byte buffer that hands out writable memory through a
/// prepare/commit protocol.
///
/// The buffer content is a logical sequence of committed bytes. New bytes are added in
/// two phases:
///
/// 1. [`prepare()`] reserves writable memory beyond the current content. The reserved
///    memory is exposed as one or more [`PreparedSpan`]s and is not yet part of the content.
/// 2. [`commit()`] marks the first `n` bytes of the most recently prepared memory as
///    permanent content. Committed bytes can never be taken back.
///
/// The buffer is not required to store its bytes consecutively in memory - a single
/// `prepare` call may return multiple spans, each covering a separate memory region.
///
/// # Safety
///
/// Implementations must uphold the span validity rules, as callers are permitted to write
/// through the prepared span pointers without further checks:
///
/// * Memory covered by the spans of the most recent [`prepare()`] call remains valid and
///   is not read, written, moved, or released by the buffer until the next [`prepare()`]
///   call or until the buffer is dropped, whichever comes first.
/// * [`commit()`] does not invalidate or relocate the prepared memory, it only performs
///   content bookkeeping.
/// * The spans returned by a single [`prepare()`] call cover pairwise disjoint memory and
///   total at least the requested number of bytes.
///
/// [`prepare()`]: Self::prepare
/// [`commit()`]: Self::commit
pub unsafe trait DynamicBuf: Debug {
    /// How many bytes of committed content are in the buffer.
    fn len(&self) -> usize;

    /// Whether the buffer contains no committed content.
    ///
    /// This does not imply that the buffer has no memory capacity.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The total number of bytes the buffer can hold without acquiring more memory.
    ///
    /// This counts both committed content and already-prepared memory, so it is always
    /// at least [`len()`][Self::len].
    fn capacity(&self) -> usize;

    /// The hard upper bound on the buffer's content length.
    ///
    /// A `prepare` request that would grow the content past this bound is a fatal
    /// condition - see [`prepare()`][Self::prepare].
    fn max_len(&self) -> usize;

    /// Reserves at least `additional` bytes of writable memory beyond the current content.
    ///
    /// Returns the reserved memory as an ordered sequence of writable spans. The spans
    /// are not yet part of the content; use [`commit()`][Self::commit] to make written
    /// bytes permanent.
    ///
    /// Calling `prepare` again discards any previously prepared memory that was not
    /// committed - earlier spans must not be used afterwards. Implementations may return
    /// more memory than requested. A zero-byte request may return an empty span sequence.
    ///
    /// # Panics
    ///
    /// Panics if the resulting content length could exceed [`max_len()`][Self::max_len].
    /// Running out of room under the hard bound is not recoverable by retrying with the
    /// same request, so no error value is defined for it.
    fn prepare(&mut self, additional: usize) -> PreparedSpans<'_>;

    /// Marks the first `len` bytes of the most recently prepared memory as content.
    ///
    /// The bytes become a permanent part of the buffer content, in span order.
    ///
    /// # Safety
    ///
    /// The caller must guarantee that the first `len` bytes of the most recently
    /// prepared span sequence have been initialized with data.
    ///
    /// The caller must guarantee that `len` does not exceed the total length of the
    /// most recently prepared span sequence, less any bytes already committed from it.
    unsafe fn commit(&mut self, len: usize);
}

// SAFETY: Forwarding preserves the span validity rules of the underlying implementation.
unsafe impl<B: DynamicBuf + ?Sized> DynamicBuf for &mut B {
    #[inline]
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn len(&self) -> usize {
        (**self).len()
    }

    #[inline]
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn capacity(&self) -> usize {
        (**self).capacity()
    }

    #[inline]
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn max_len(&self) -> usize {
        (**self).max_len()
    }

    #[inline]
    fn prepare(&mut self, additional: usize) -> PreparedSpans<'_> {
        (**self).prepare(additional)
    }

    #[inline]
    unsafe fn commit(&mut self, len: usize) {
        // SAFETY: Guarantees forwarded from our own caller.
        unsafe { (**self).commit(len) }
    }
}

/// One contiguous region of writable memory reserved by [`DynamicBuf::prepare()`].
///
/// A span is never empty - zero-length regions are unrepresentable by construction,
/// which keeps degenerate spans out of every downstream consumer.
///
/// The span does not own the memory it designates and does not carry a lifetime; the
/// buffer that issued it guarantees the memory stays valid until its next `prepare`
/// call (see the [`DynamicBuf`] safety contract).
#[derive(Debug)]
pub struct PreparedSpan {
    start: NonNull<MaybeUninit<u8>>,
    len: NonZero<usize>,
}

impl PreparedSpan {
    /// Creates a span over a writable memory region.
    ///
    /// This is the API used by buffer implementations to describe reserved memory.
    /// Unless you are implementing [`DynamicBuf`], you will not need to call this.
    ///
    /// # Safety
    ///
    /// The caller must guarantee that `start` points to `len` bytes of writable memory
    /// and that the memory remains valid and exclusively reachable through this span
    /// until the issuing buffer's next `prepare` call.
    #[must_use]
    pub const unsafe fn new(start: NonNull<MaybeUninit<u8>>, len: NonZero<usize>) -> Self {
        Self { start, len }
    }

    /// Pointer to the start of the writable region.
    #[must_use]
    pub const fn as_ptr(&self) -> NonNull<MaybeUninit<u8>> {
        self.start
    }

    /// Length of the writable region in bytes. Never zero.
    #[must_use]
    pub const fn len(&self) -> NonZero<usize> {
        self.len
    }
}

// SAFETY: The presence of pointers disables Send but we re-enable it here because the span
// is an inert pointer/length pair - all access rules are enforced by the issuing buffer.
unsafe impl Send for PreparedSpan {}
// SAFETY: Shared references to a span only expose the pointer value, never the memory
// behind it, so concurrent reads of the span itself are harmless.
unsafe impl Sync for PreparedSpan {}

/// The ordered sequence of writable spans returned by one [`DynamicBuf::prepare()`] call.
///
/// Borrows the issuing buffer for as long as it is held, so the spans cannot outlive
/// the `prepare` call's borrow by accident. Consumers that need to retain a window into
/// the prepared memory across further buffer calls extract the raw span data and take
/// on the validity rules of the [`DynamicBuf`] contract themselves.
#[derive(Debug)]
pub struct PreparedSpans<'b> {
    spans: SmallVec<[PreparedSpan; MAX_INLINE_SPANS]>,
    _buf: PhantomData<&'b mut [u8]>,
}

impl PreparedSpans<'_> {
    /// Creates an empty span sequence.
    ///
    /// Returned by buffer implementations for zero-byte `prepare` requests.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            spans: SmallVec::new_const(),
            _buf: PhantomData,
        }
    }

    /// Creates a span sequence from spans in content order.
    #[must_use]
    pub fn from_spans<I>(spans: I) -> Self
    where
        I: IntoIterator<Item = PreparedSpan>,
    {
        Self {
            spans: spans.into_iter().collect(),
            _buf: PhantomData,
        }
    }

    /// The first span of the sequence, or `None` if the sequence is empty.
    #[must_use]
    pub fn first(&self) -> Option<&PreparedSpan> {
        self.spans.first()
    }

    /// Visits the spans in content order.
    pub fn iter(&self) -> impl Iterator<Item = &PreparedSpan> {
        self.spans.iter()
    }

    /// How many spans are in the sequence.
    #[must_use]
    pub fn span_count(&self) -> usize {
        self.spans.len()
    }

    /// Total writable bytes across all spans.
    #[must_use]
    pub fn total_len(&self) -> usize {
        self.spans.iter().map(|span| span.len().get()).sum()
    }
}
