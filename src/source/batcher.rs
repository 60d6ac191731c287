use crate::merger::dtos::DivisionItem;
use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRange {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    /// Path depth shared by every record in the batch.
    pub depth: usize,
}

impl BatchRange {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Splits the parsed file into bounded batches.
pub struct Batcher {
    chunk_size: usize,
}

impl Batcher {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Next division batch starting at `offset`: at most `chunk_size`
    /// records, all with the depth of the first one. Empty at the end.
    pub fn division_batch(&self, items: &[DivisionItem], offset: usize) -> Range<usize> {
        let Some(first) = items.get(offset) else {
            return items.len()..items.len();
        };
        let depth = first.depth();

        let end = items[offset..]
            .iter()
            .take(self.chunk_size)
            .take_while(|item| item.depth() == depth)
            .count();

        offset..offset + end
    }

    /// Next translation batch: a plain contiguous slice.
    pub fn translation_batch(&self, total: usize, offset: usize) -> Range<usize> {
        let start = offset.min(total);
        start..(start + self.chunk_size).min(total)
    }

    pub fn calculate_division_batches(&self, items: &[DivisionItem]) -> Vec<BatchRange> {
        let mut batches = Vec::new();
        let mut offset = 0;

        while offset < items.len() {
            let range = self.division_batch(items, offset);
            batches.push(BatchRange {
                index: batches.len(),
                start: range.start,
                end: range.end,
                depth: items[offset].depth(),
            });
            offset = range.end;
        }

        batches
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}
