use parking_lot::{Condvar, Mutex};

struct BarrierState {
    waiting: usize,
    generation: u64,
}

/// Reusable rendezvous point for a fixed number of threads.
///
/// Used twice per run: once so every client starts together with the
/// driver's clock, once so the driver stops the clock only after the last
/// client finished.
pub struct Barrier {
    parties: usize,
    state: Mutex<BarrierState>,
    released: Condvar,
}

impl Barrier {
    pub fn new(parties: usize) -> Self {
        Self {
            parties: parties.max(1),
            state: Mutex::new(BarrierState { waiting: 0, generation: 0 }),
            released: Condvar::new(),
        }
    }

    /// Block until `parties` threads have called `wait` for this round.
    ///
    /// Returns `true` for exactly one thread per round, the one whose
    /// arrival released the others.
    pub fn wait(&self) -> bool {
        let mut state = self.state.lock();
        let generation = state.generation;
        state.waiting += 1;

        if state.waiting == self.parties {
            state.waiting = 0;
            state.generation = state.generation.wrapping_add(1);
            self.released.notify_all();
            return true;
        }

        while state.generation == generation {
            self.released.wait(&mut state);
        }
        false
    }

    /// Threads currently parked in `wait`.
    pub fn num_waiting(&self) -> usize {
        self.state.lock().waiting
    }

    /// No thread is left behind in an unfinished round.
    pub fn is_clear(&self) -> bool {
        self.num_waiting() == 0
    }

    /// Rounds completed so far.
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_single_party_never_blocks() {
        let barrier = Barrier::new(1);
        assert!(barrier.wait());
        assert!(barrier.wait());
        assert_eq!(barrier.generation(), 2);
        assert!(barrier.is_clear());
    }

    #[test]
    fn test_reusable_rounds() {
        let barrier = Barrier::new(4);
        let leaders = AtomicUsize::new(0);
        let arrived = AtomicUsize::new(0);

        std::thread::scope(|s| {
            for _ in 0..4 {
                let barrier = &barrier;
                let leaders = &leaders;
                let arrived = &arrived;
                s.spawn(move || {
                    for round in 1..=3 {
                        arrived.fetch_add(1, Ordering::SeqCst);
                        if barrier.wait() {
                            leaders.fetch_add(1, Ordering::SeqCst);
                        }
                        // nobody leaves a round before everyone entered it
                        assert!(arrived.load(Ordering::SeqCst) >= round * 4);
                    }
                });
            }
        });

        assert_eq!(leaders.load(Ordering::SeqCst), 3);
        assert_eq!(barrier.generation(), 3);
        assert!(barrier.is_clear());
    }
}
