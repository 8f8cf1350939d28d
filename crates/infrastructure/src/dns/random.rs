use ferrous_netkit_application::ports::RandomSource;
use std::sync::{Mutex, PoisonError};

/// `fastrand`-backed [`RandomSource`]. Seed it to replay the same IDs and
/// server order.
#[derive(Debug)]
pub struct FastRandom {
    rng: Mutex<fastrand::Rng>,
}

impl FastRandom {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::new()),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::with_seed(seed)),
        }
    }

    fn with_rng<R>(&self, f: impl FnOnce(&mut fastrand::Rng) -> R) -> R {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut rng)
    }
}

impl Default for FastRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for FastRandom {
    fn next_id(&self) -> u16 {
        self.with_rng(|rng| rng.u16(..))
    }

    fn next_index(&self, bound: usize) -> usize {
        self.with_rng(|rng| rng.usize(..bound.max(1)))
    }
}
