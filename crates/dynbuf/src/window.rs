// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::cmp;
use std::marker::PhantomData;
use std::mem::MaybeUninit;
use std::ptr::{self, NonNull};

use crate::DynamicBuf;

/// Smallest number of bytes a [`WindowedWriter`] requests from its buffer when growing
/// a write window.
pub const MIN_GROW: usize = 512;

/// Largest number of bytes a [`WindowedWriter`] requests from its buffer when growing
/// a write window.
///
/// This bounds the latency of any single growth step and the memory wasted when the
/// caller stops writing shortly after a grow.
pub const MAX_GROW: usize = 65536;

/// The current write window: a bounded region of prepared buffer memory that accepts
/// direct character writes.
///
/// The window deliberately spans one character less than the prepared span it sits on.
/// The final position is reserved so that the character that does not fit anymore can
/// still be stored before the window is reported exhausted, saving a growth round-trip.
#[derive(Debug)]
struct Window<C> {
    start: NonNull<MaybeUninit<u8>>,

    /// Directly writable character slots. The span behind the window holds one more
    /// character position (the reserved slot).
    slots: usize,

    /// Characters stored so far. May reach `slots + 1` once the reserved slot is used.
    filled: usize,

    _unit: PhantomData<C>,
}

impl<C: Copy> Window<C> {
    fn has_room(&self) -> bool {
        self.filled < self.slots
    }

    fn filled_bytes(&self) -> usize {
        // Cannot overflow - the characters all fit inside one prepared span.
        self.filled.wrapping_mul(size_of::<C>())
    }

    /// Stores `ch` at the next free position, which may be the reserved slot.
    fn store_next(&mut self, ch: C) {
        debug_assert!(self.filled <= self.slots);

        // SAFETY: `filled <= slots` and the span behind the window covers `slots + 1`
        // character positions, so the write stays inside prepared memory.
        let position = unsafe { self.start.as_ptr().cast::<u8>().add(self.filled_bytes()) };

        // SAFETY: The position is valid for one character-sized write. Prepared memory
        // carries no alignment guarantee, hence the unaligned write.
        unsafe {
            position.cast::<C>().write_unaligned(ch);
        }

        self.filled = self.filled.wrapping_add(1);
    }
}

impl Window<u8> {
    /// Copies `src` to the next free positions. The caller must stay within `slots`.
    fn copy_from(&mut self, src: &[u8]) {
        debug_assert!(src.len() <= self.slots - self.filled);

        // SAFETY: `filled` characters are in use, the rest of the span is writable.
        let dst = unsafe { self.start.as_ptr().cast::<u8>().add(self.filled) };

        // SAFETY: The destination covers at least `src.len()` writable bytes, checked
        // by the caller against the window's free room.
        unsafe {
            ptr::copy_nonoverlapping(src.as_ptr(), dst, src.len());
        }

        self.filled = self.filled.wrapping_add(src.len());
    }
}

/// A character writer that turns a [`DynamicBuf`]'s prepare/commit growth protocol into
/// a plain "store the next character" interface.
///
/// The writer maintains a write window over the first span of the most recent `prepare`
/// result. Characters are stored directly into that memory; when the window runs out,
/// the filled bytes are committed and a fresh window is grown. The caller never sees
/// growth, segmentation, or capacity limits.
///
/// Character type `C` defaults to `u8`. Wider types (e.g. `u16` code units) divide the
/// window accordingly; the committed bytes are the characters' native-endian
/// representation in store order.
///
/// # Flushing
///
/// Characters sit in the window until [`sync()`], [`overflow()`] with `None`, or drop
/// commits them. After any of these, everything stored so far is durable buffer content.
///
/// # Buffer access
///
/// The writer exclusively borrows its buffer, so the buffer cannot be read or modified
/// while the writer is alive, and the buffer always outlives the writer. Committed
/// content becomes observable once the writer is gone.
///
/// The writer itself may be freely moved; the window points into buffer memory, not
/// into the writer.
///
/// # Panics
///
/// Growing a window propagates any panic from the buffer's `prepare` (content limit
/// reached) and panics if the buffer produces a span too small to host even a single
/// character - a zero-capacity window would turn every write into an infinite
/// overflow/grow loop, so it is rejected loudly instead.
///
/// [`sync()`]: Self::sync
/// [`overflow()`]: Self::overflow
#[derive(Debug)]
pub struct WindowedWriter<'b, B: DynamicBuf + ?Sized, C: Copy = u8> {
    buf: &'b mut B,
    window: Option<Window<C>>,
}

impl<'b, B: DynamicBuf + ?Sized, C: Copy> WindowedWriter<'b, B, C> {
    /// Creates a writer over the buffer and grows the first write window.
    ///
    /// # Panics
    ///
    /// Panics if the first window cannot be grown (see the type-level notes).
    pub fn new(buf: &'b mut B) -> Self {
        const {
            assert!(size_of::<C>() > 0, "zero-sized character types cannot be written");
        }

        let mut writer = Self { buf, window: None };
        writer.grow();
        writer
    }

    /// The buffer this writer commits into.
    #[must_use]
    pub fn buffer(&self) -> &B {
        self.buf
    }

    /// How many characters are stored in the current window but not yet committed.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.window.as_ref().map_or(0, |window| window.filled)
    }

    /// Stores one character.
    ///
    /// If the current window has room, the character goes there and the call is trivially
    /// cheap. Otherwise this behaves as [`overflow()`][Self::overflow] with the character.
    pub fn put(&mut self, ch: C) {
        match &mut self.window {
            Some(window) if window.has_room() => window.store_next(ch),
            _ => self.overflow(Some(ch)),
        }
    }

    /// Handles an exhausted write window.
    ///
    /// With `Some(ch)`, the character is stored into the window's reserved slot, the
    /// window's characters (including `ch`) are committed, and a fresh window is grown.
    ///
    /// With `None` - the end-of-output signal - only the characters currently in the
    /// window are committed and no new window is requested. The window is left spent;
    /// a later write grows a fresh one first.
    ///
    /// Exposed because it is the low-level exhaustion protocol; most callers only need
    /// [`put()`][Self::put] and [`sync()`][Self::sync].
    pub fn overflow(&mut self, ch: Option<C>) {
        let Some(ch) = ch else {
            if let Some(window) = self.window.take() {
                // SAFETY: Exactly `filled` characters were stored at the start of the
                // most recently prepared span.
                unsafe {
                    self.buf.commit(window.filled_bytes());
                }
            }
            return;
        };

        match &mut self.window {
            Some(window) => {
                window.store_next(ch);
                let commit_len = window.filled_bytes();

                // SAFETY: `filled` characters, including `ch` stored just above, occupy
                // the start of the most recently prepared span.
                unsafe {
                    self.buf.commit(commit_len);
                }

                self.grow();
            }
            None => {
                // Spent by an end-of-output flush; writing resumes on a fresh window.
                self.grow();
                self.put(ch);
            }
        }
    }

    /// Commits the characters currently in the window, then grows a fresh window.
    ///
    /// After this call, everything stored so far is durable buffer content.
    pub fn sync(&mut self) {
        self.overflow(None);
        self.grow();
    }

    /// Replaces the window with a fresh one over newly prepared buffer memory.
    ///
    /// The prepare request is clamped to `[MIN_GROW, MAX_GROW]` and to the buffer's
    /// remaining room under its content limit. Only the first span of the result is
    /// used for the window; any further spans are left untouched and become reachable
    /// again on the next grow, since nothing is committed against them. Callers may
    /// rely on the resulting bounded window size.
    fn grow(&mut self) {
        let len = self.buf.len();

        // The buffer contract guarantees `capacity >= len` and `max_len >= len`; the
        // saturation merely keeps a misbehaving implementation from wrapping.
        let headroom = cmp::max(MIN_GROW, self.buf.capacity().saturating_sub(len));
        let limit = cmp::min(MAX_GROW, self.buf.max_len().saturating_sub(len));
        let target = cmp::min(headroom, limit);

        let prepared = self.buf.prepare(target);
        let first = prepared
            .first()
            .expect("the buffer prepared no spans, so no write window can be grown");

        let start = first.as_ptr();
        let span_len = first.len().get();

        let positions = span_len / size_of::<C>();
        assert!(
            positions > 0,
            "a prepared span of {span_len} bytes cannot host a single {}-byte character",
            size_of::<C>()
        );

        self.window = Some(Window {
            start,
            // One position is the reserved slot - see the Window type notes.
            slots: positions - 1,
            filled: 0,
            _unit: PhantomData,
        });
    }
}

impl<B: DynamicBuf + ?Sized> WindowedWriter<'_, B, u8> {
    /// Stores a slice of bytes, window-sized chunk by window-sized chunk.
    ///
    /// Observably equivalent to calling [`put()`][Self::put] for every byte, but copies
    /// whole runs into the window at once.
    pub fn put_slice(&mut self, mut src: &[u8]) {
        while let Some((&next, rest)) = src.split_first() {
            match &mut self.window {
                None => {
                    // Spent by an end-of-output flush; writing resumes on a fresh window.
                    self.grow();
                }
                Some(window) => {
                    let room = window.slots - window.filled;

                    if room == 0 {
                        // Window exhausted mid-slice: the next byte takes the overflow
                        // path, which commits and grows.
                        self.overflow(Some(next));
                        src = rest;
                        continue;
                    }

                    let take = cmp::min(room, src.len());
                    window.copy_from(&src[..take]);
                    src = &src[take..];
                }
            }
        }
    }
}

impl<B: DynamicBuf + ?Sized, C: Copy> Drop for WindowedWriter<'_, B, C> {
    fn drop(&mut self) {
        // Same durability guarantee as an explicit sync: everything stored becomes
        // buffer content. The fresh window a sync would grow is useless at this point
        // and growing can panic once the buffer is at its content limit, so the
        // end-of-output flush is used instead.
        self.overflow(None);
    }
}

// SAFETY: The window pointer targets memory owned by the referenced buffer, which the
// writer borrows exclusively, so sending the writer moves the entire access path with it.
unsafe impl<B: DynamicBuf + ?Sized + Send, C: Copy + Send> Send for WindowedWriter<'_, B, C> {}

// SAFETY: Shared references to the writer expose no operation that touches the window
// memory, so sharing it between threads for reads is harmless.
unsafe impl<B: DynamicBuf + ?Sized + Sync, C: Copy + Sync> Sync for WindowedWriter<'_, B, C> {}
