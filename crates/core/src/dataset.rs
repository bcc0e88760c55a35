use std::sync::Arc;

use rayon::prelude::*;

use crate::error::CoreError;
use crate::task::{Task, WorkProfile};

/// A fixed-size, read-only batch of tasks shared between threads.
pub type Chunk = Arc<[Task]>;

/// Ordered sequence of equally sized chunks.
///
/// Chunks are generated once and never mutated afterwards; workers only
/// read them and accumulate derived sums.
#[derive(Debug, Clone)]
pub struct Dataset {
    chunk_size: usize,
    chunks: Vec<Chunk>,
}

impl Dataset {
    /// Build a dataset, rejecting chunks whose length differs from the first one.
    pub fn from_chunks(chunks: Vec<Vec<Task>>) -> Result<Self, CoreError> {
        let chunk_size = chunks.first().map(Vec::len).unwrap_or(0);
        for (index, chunk) in chunks.iter().enumerate() {
            if chunk.len() != chunk_size {
                return Err(CoreError::ChunkShape {
                    index,
                    expected: chunk_size,
                    actual: chunk.len(),
                });
            }
        }
        Ok(Self {
            chunk_size,
            chunks: chunks.into_iter().map(Chunk::from).collect(),
        })
    }

    /// Number of tasks in every chunk.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn chunk(&self, index: usize) -> Option<&Chunk> {
        self.chunks.get(index)
    }

    /// Iterate over every task in chunk order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.chunks.iter().flat_map(|chunk| chunk.iter())
    }

    /// Total number of heavy tasks across all chunks.
    pub fn heavy_count(&self) -> usize {
        self.tasks().filter(|task| task.is_heavy).count()
    }

    /// Expected aggregate of [`Task::process`] over the whole dataset.
    ///
    /// Computed with rayon, independently of the execution engine, so it can
    /// be used to check what the engine reports.
    pub fn reference_sum(&self, profile: &WorkProfile) -> u64 {
        self.chunks
            .par_iter()
            .map(|chunk| chunk_sum(chunk, profile))
            .sum()
    }
}

/// Sequential sum of [`Task::process`] over one chunk.
pub fn chunk_sum(tasks: &[Task], profile: &WorkProfile) -> u64 {
    tasks
        .iter()
        .map(|task| u64::from(task.process(profile)))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tasks(n: usize) -> Vec<Task> {
        (0..n).map(|i| Task::light(i as f64 * 0.1)).collect()
    }

    #[test]
    fn from_chunks_keeps_order_and_shape() {
        let ds = Dataset::from_chunks(vec![tasks(4), tasks(4), tasks(4)]).unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.chunk_size(), 4);
        assert_eq!(ds.tasks().count(), 12);
        assert_eq!(ds.chunk(1).unwrap()[2].value, 0.2);
    }

    #[test]
    fn from_chunks_rejects_ragged_chunks() {
        let err = Dataset::from_chunks(vec![tasks(4), tasks(3)]).unwrap_err();
        match err {
            CoreError::ChunkShape {
                index,
                expected,
                actual,
            } => {
                assert_eq!(index, 1);
                assert_eq!(expected, 4);
                assert_eq!(actual, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_dataset_is_valid() {
        let ds = Dataset::from_chunks(Vec::new()).unwrap();
        assert!(ds.is_empty());
        assert_eq!(ds.chunk_size(), 0);
        assert_eq!(ds.reference_sum(&WorkProfile::default()), 0);
    }

    #[test]
    fn reference_sum_matches_sequential_sum() {
        let profile = WorkProfile::new(5, 50);
        let mut chunk = tasks(16);
        chunk[3].is_heavy = true;
        chunk[11].is_heavy = true;
        let ds = Dataset::from_chunks(vec![chunk.clone(), chunk.clone()]).unwrap();

        let expected: u64 = chunk
            .iter()
            .map(|t| u64::from(t.process(&profile)))
            .sum::<u64>()
            * 2;
        assert_eq!(ds.reference_sum(&profile), expected);
        assert_eq!(ds.heavy_count(), 4);
    }
}
