use std::collections::VecDeque;

use crate::core::error::ArchiveError;

/// Service ceiling for one upload request (5 MiB).
pub const MAX_BATCH_BYTES: usize = 5 * 1024 * 1024;

/// Service ceiling for one document (1 MiB).
pub const MAX_RECORD_BYTES: usize = 1024 * 1024;

/// Byte ceilings enforced by the accumulator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    pub max_batch_bytes: usize,
    pub max_record_bytes: usize,
}

impl BatchLimits {
    /// Limits imposed by the indexing service
    pub const fn service() -> Self {
        Self {
            max_batch_bytes: MAX_BATCH_BYTES,
            max_record_bytes: MAX_RECORD_BYTES,
        }
    }
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self::service()
    }
}

/// Bytes the payload adds around and between items
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Framing {
    pub open: usize,
    pub close: usize,
    pub separator: usize,
}

impl Framing {
    /// `[a,b,c]`
    pub const JSON_ARRAY: Framing = Framing {
        open: 1,
        close: 1,
        separator: 1,
    };

    /// Plain concatenation
    pub const NONE: Framing = Framing {
        open: 0,
        close: 0,
        separator: 0,
    };

    /// Payload size of `count` items totalling `item_bytes`.
    pub fn payload_len(&self, count: usize, item_bytes: usize) -> usize {
        if count == 0 {
            return 0;
        }
        self.open + self.close + item_bytes + self.separator * (count - 1)
    }
}

/// A sealed group of items, in offer order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch<T> {
    /// 1-based position among the batches of this accumulator
    pub sequence: usize,
    pub items: Vec<T>,
    /// Exact payload size including framing
    pub bytes: usize,
}

impl<T> Batch<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Packs items into batches under a byte ceiling without reordering.
///
/// Sizes come from a caller-supplied function so the running total matches
/// what will actually be transmitted.
pub struct BatchAccumulator<T, F>
where
    F: Fn(&T) -> usize,
{
    limits: BatchLimits,
    framing: Framing,
    size_of: F,
    current: Vec<T>,
    /// Sum of item sizes in `current`, framing excluded
    current_item_bytes: usize,
    sealed: VecDeque<Batch<T>>,
    next_sequence: usize,
}

impl<T, F> BatchAccumulator<T, F>
where
    F: Fn(&T) -> usize,
{
    pub fn new(limits: BatchLimits, framing: Framing, size_of: F) -> Self {
        Self {
            limits,
            framing,
            size_of,
            current: Vec::new(),
            current_item_bytes: 0,
            sealed: VecDeque::new(),
            next_sequence: 1,
        }
    }

    /// Payload size of the batch under construction.
    pub fn current_bytes(&self) -> usize {
        self.framing
            .payload_len(self.current.len(), self.current_item_bytes)
    }

    /// Number of sealed batches not yet handed out.
    pub fn pending(&self) -> usize {
        self.sealed.len()
    }

    /// Add an item, sealing the current batch first if the item would push
    /// it over the batch ceiling.
    ///
    /// `id` only labels the error when the item is rejected.
    ///
    /// # Errors
    ///
    /// [`ArchiveError::OversizeRecord`] when the item exceeds the per-record
    /// ceiling or could not fit even an empty batch. Rejected items are
    /// dropped, never truncated.
    pub fn offer(&mut self, item: T, id: impl FnOnce(&T) -> String) -> Result<(), ArchiveError> {
        let size = (self.size_of)(&item);

        if size > self.limits.max_record_bytes {
            return Err(ArchiveError::OversizeRecord {
                id: id(&item),
                size,
                limit: self.limits.max_record_bytes,
            });
        }

        // Alone in a fresh batch it still has to fit with its framing
        if self.framing.payload_len(1, size) > self.limits.max_batch_bytes {
            return Err(ArchiveError::OversizeRecord {
                id: id(&item),
                size,
                limit: self
                    .limits
                    .max_batch_bytes
                    .saturating_sub(self.framing.payload_len(1, 0)),
            });
        }

        let grown = self
            .framing
            .payload_len(self.current.len() + 1, self.current_item_bytes + size);
        if !self.current.is_empty() && grown > self.limits.max_batch_bytes {
            self.seal();
        }

        self.current.push(item);
        self.current_item_bytes += size;
        Ok(())
    }

    /// Hand out the oldest sealed batch, if any.
    pub fn flush_if_needed(&mut self) -> Option<Batch<T>> {
        self.sealed.pop_front()
    }

    /// Seal whatever is left and hand out the oldest remaining batch.
    /// Call until it returns `None` to drain everything.
    pub fn finalize(&mut self) -> Option<Batch<T>> {
        if !self.current.is_empty() {
            self.seal();
        }
        self.sealed.pop_front()
    }

    fn seal(&mut self) {
        let items = std::mem::take(&mut self.current);
        let bytes = self.framing.payload_len(items.len(), self.current_item_bytes);
        self.current_item_bytes = 0;

        self.sealed.push_back(Batch {
            sequence: self.next_sequence,
            items,
            bytes,
        });
        self.next_sequence += 1;
    }
}
