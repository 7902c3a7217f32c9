// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// The maximum number of prepared spans that can be stored inline in a [`PreparedSpans`]
/// collection without a dynamic allocation.
///
/// Buffers that return more spans than this from a single `prepare` call still work,
/// they merely pay for one allocation per `prepare`.
///
/// [`PreparedSpans`]: crate::PreparedSpans
pub const MAX_INLINE_SPANS: usize = 4;
