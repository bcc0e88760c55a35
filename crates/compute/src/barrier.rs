use std::sync::{Condvar, Mutex, PoisonError};

/// Reusable "all workers finished" signal between chunks.
///
/// Workers call [`signal_done`](Self::signal_done) once per chunk; the
/// controller blocks in [`wait_for_all_done`](Self::wait_for_all_done) until
/// every party has signalled, and the count is reset for the next chunk.
#[derive(Debug)]
pub struct CompletionBarrier {
    parties: usize,
    done: Mutex<usize>,
    all_done: Condvar,
}

impl CompletionBarrier {
    pub fn new(parties: usize) -> Self {
        Self {
            parties,
            done: Mutex::new(0),
            all_done: Condvar::new(),
        }
    }

    pub fn parties(&self) -> usize {
        self.parties
    }

    /// Record that one worker finished its share of the current chunk.
    pub fn signal_done(&self) {
        let mut done = self.done.lock().unwrap_or_else(PoisonError::into_inner);
        *done += 1;
        if *done >= self.parties {
            self.all_done.notify_one();
        }
    }

    /// Block until every party signalled, then reset the count to zero.
    pub fn wait_for_all_done(&self) {
        let done = self.done.lock().unwrap_or_else(PoisonError::into_inner);
        let mut done = self
            .all_done
            .wait_while(done, |done| *done < self.parties)
            .unwrap_or_else(PoisonError::into_inner);
        *done = 0;
    }
}
