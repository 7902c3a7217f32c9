// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Debug;

/// Storage strategy for the writer owned by a [`BufStream`].
///
/// The strategy decides what happens to the writer when the stream is moved:
///
/// * [`InlineSlot`] stores the writer inline - a move relocates the writer value
///   itself. This is the default; it costs nothing.
/// * [`BoxedSlot`] stores the writer behind one heap allocation made at construction
///   time - a move relocates only the owning box and the writer's address never
///   changes. This is for wrapping sink types that must not be relocated once other
///   state points at them.
///
/// The choice is a static property of the wrapped sink type, not run-time state, and
/// the two strategies are observably equivalent in every other respect.
///
/// [`BufStream`]: crate::BufStream
pub trait WriterSlot<W>: Debug + Sized {
    /// Places the writer into a fresh slot.
    fn hold(writer: W) -> Self;

    /// The held writer.
    fn writer(&self) -> &W;

    /// The held writer, mutably.
    fn writer_mut(&mut self) -> &mut W;
}

/// Stores the writer inline. Moving the slot moves the writer value.
#[derive(Debug)]
pub struct InlineSlot<W>(W);

impl<W: Debug> WriterSlot<W> for InlineSlot<W> {
    fn hold(writer: W) -> Self {
        Self(writer)
    }

    #[inline]
    fn writer(&self) -> &W {
        &self.0
    }

    #[inline]
    fn writer_mut(&mut self) -> &mut W {
        &mut self.0
    }
}

/// Stores the writer behind a single heap allocation. Moving the slot moves only the
/// box; the writer's address stays stable for the slot's whole lifetime.
#[derive(Debug)]
pub struct BoxedSlot<W>(Box<W>);

impl<W: Debug> WriterSlot<W> for BoxedSlot<W> {
    fn hold(writer: W) -> Self {
        Self(Box::new(writer))
    }

    #[inline]
    fn writer(&self) -> &W {
        &self.0
    }

    #[inline]
    fn writer_mut(&mut self) -> &mut W {
        &mut self.0
    }
}
