use std::sync::{Mutex, MutexGuard, PoisonError};

use chunkbench_core::{Chunk, Task};

#[derive(Default)]
struct CursorState {
    chunk: Option<Chunk>,
    next: usize,
}

/// Shared read position into the chunk currently being processed under the
/// dynamic policy. Every claim is a read-then-increment under one lock, so
/// each index is handed out exactly once.
#[derive(Default)]
pub(crate) struct ChunkCursor {
    state: Mutex<CursorState>,
}

impl ChunkCursor {
    fn lock(&self) -> MutexGuard<'_, CursorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Expose `chunk` from index zero.
    pub(crate) fn publish(&self, chunk: Chunk) {
        let mut state = self.lock();
        state.chunk = Some(chunk);
        state.next = 0;
    }

    /// Claim the next unprocessed task, or `None` once the chunk is exhausted.
    pub(crate) fn claim_next(&self) -> Option<(usize, Task)> {
        let mut state = self.lock();
        let index = state.next;
        let task = *state.chunk.as_ref()?.get(index)?;
        state.next += 1;
        Some((index, task))
    }

    pub(crate) fn clear(&self) {
        *self.lock() = CursorState::default();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    use super::*;

    fn chunk(n: usize) -> Chunk {
        (0..n).map(|i| Task::light(i as f64)).collect::<Vec<_>>().into()
    }

    #[test]
    fn empty_cursor_yields_nothing() {
        let cursor = ChunkCursor::default();
        assert!(cursor.claim_next().is_none());
    }

    #[test]
    fn claims_in_order_then_stops() {
        let cursor = ChunkCursor::default();
        cursor.publish(chunk(3));
        let claimed: Vec<usize> = std::iter::from_fn(|| cursor.claim_next())
            .map(|(i, _)| i)
            .collect();
        assert_eq!(claimed, vec![0, 1, 2]);
        assert!(cursor.claim_next().is_none());

        cursor.publish(chunk(2));
        assert_eq!(cursor.claim_next().map(|(i, _)| i), Some(0));
        cursor.clear();
        assert!(cursor.claim_next().is_none());
    }

    #[test]
    fn concurrent_claims_cover_chunk_without_duplicates() {
        const SIZE: usize = 5_000;
        for _round in 0..20 {
            let cursor = Arc::new(ChunkCursor::default());
            cursor.publish(chunk(SIZE));

            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let cursor = Arc::clone(&cursor);
                    thread::spawn(move || {
                        let mut mine = Vec::new();
                        while let Some((i, task)) = cursor.claim_next() {
                            assert_eq!(task.value, i as f64);
                            mine.push(i);
                        }
                        mine
                    })
                })
                .collect();

            let mut seen = HashSet::new();
            let mut total = 0;
            for h in handles {
                for i in h.join().unwrap() {
                    assert!(seen.insert(i), "index {i} claimed twice");
                    total += 1;
                }
            }
            assert_eq!(total, SIZE);
            assert_eq!(seen, (0..SIZE).collect::<HashSet<_>>());
        }
    }
}
