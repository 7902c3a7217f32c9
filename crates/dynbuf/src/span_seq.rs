// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// An ordered, finite sequence of read-only byte spans that together form one
/// logical sequence of bytes.
///
/// The sequence is restartable: every call to [`spans()`][Self::spans] starts a fresh
/// iteration from the first span. Iteration borrows the sequence, so the backing memory
/// must stay alive for the duration of each pass but is never owned by the consumer.
pub trait SpanSeq {
    /// Visits the spans in content order.
    fn spans(&self) -> impl Iterator<Item = &[u8]>;

    /// Total number of bytes across all spans.
    fn total_len(&self) -> usize {
        // Spans designate disjoint regions of live memory, so their lengths cannot
        // sum past the address space.
        self.spans().fold(0, |total, span| total.wrapping_add(span.len()))
    }
}

impl<T: AsRef<[u8]>> SpanSeq for [T] {
    fn spans(&self) -> impl Iterator<Item = &[u8]> {
        self.iter().map(AsRef::as_ref)
    }
}

impl<T: AsRef<[u8]>, const N: usize> SpanSeq for [T; N] {
    fn spans(&self) -> impl Iterator<Item = &[u8]> {
        self.as_slice().spans()
    }
}

impl<T: AsRef<[u8]>> SpanSeq for Vec<T> {
    fn spans(&self) -> impl Iterator<Item = &[u8]> {
        self.as_slice().spans()
    }
}

impl<S: SpanSeq + ?Sized> SpanSeq for &S {
    fn spans(&self) -> impl Iterator<Item = &[u8]> {
        (**self).spans()
    }

    fn total_len(&self) -> usize {
        (**self).total_len()
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_of_slices() {
        let seq: [&[u8]; 3] = [b"ab", b"", b"cde"];

        let collected: Vec<&[u8]> = seq.spans().collect();
        assert_eq!(collected, [b"ab".as_slice(), b"", b"cde"]);
        assert_eq!(seq.total_len(), 5);
    }

    #[test]
    fn iteration_is_restartable() {
        let seq = vec![b"first".to_vec(), b"second".to_vec()];

        let first_pass: Vec<&[u8]> = seq.spans().collect();
        let second_pass: Vec<&[u8]> = seq.spans().collect();

        assert_eq!(first_pass, second_pass);
    }

    #[test]
    fn reference_forwards() {
        let seq: [&[u8]; 2] = [b"xy", b"z"];
        let by_ref = &seq;

        assert_eq!(by_ref.total_len(), 3);
        assert_eq!(by_ref.spans().count(), 2);
    }
}
