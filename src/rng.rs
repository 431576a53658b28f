use std::collections::HashMap;

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub const SPAWN_STREAM: &str = "spawn";
pub const HELPER_STREAM: &str = "helpers";

/// Seeded source of randomness. Each consumer draws from its own named
/// stream so that adding draws in one place never shifts another.
pub struct RngManager {
    seed: u64,
    master: ChaCha8Rng,
    streams: HashMap<String, ChaCha8Rng>,
}

impl RngManager {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            master: ChaCha8Rng::seed_from_u64(seed),
            streams: HashMap::new(),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn stream(&mut self, name: &str) -> StreamRng<'_> {
        let master = &mut self.master;
        let entry = self.streams.entry(name.to_string()).or_insert_with(|| {
            let mut seed_bytes = [0u8; 8];
            master.fill_bytes(&mut seed_bytes);
            ChaCha8Rng::seed_from_u64(u64::from_le_bytes(seed_bytes))
        });
        StreamRng { inner: entry }
    }

    /// Drops every derived stream and restarts from the original seed.
    pub fn reseed(&mut self) {
        self.master = ChaCha8Rng::seed_from_u64(self.seed);
        self.streams.clear();
    }
}

pub struct StreamRng<'a> {
    inner: &'a mut ChaCha8Rng,
}

impl<'a> RngCore for StreamRng<'a> {
    fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.inner.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.inner.try_fill_bytes(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = RngManager::new(42);
        let mut b = RngManager::new(42);
        assert_eq!(a.stream(SPAWN_STREAM).next_u64(), b.stream(SPAWN_STREAM).next_u64());
    }

    #[test]
    fn test_draws_on_one_stream_do_not_shift_another() {
        let mut a = RngManager::new(42);
        let first = a.stream(SPAWN_STREAM).next_u64();

        let mut b = RngManager::new(42);
        let spawn = b.stream(SPAWN_STREAM).next_u64();
        b.stream(HELPER_STREAM).next_u64();
        assert_eq!(first, spawn);
        assert_eq!(a.stream(SPAWN_STREAM).next_u64(), b.stream(SPAWN_STREAM).next_u64());
    }

    #[test]
    fn test_reseed_replays_sequence() {
        let mut rng = RngManager::new(3);
        let first = rng.stream(HELPER_STREAM).next_u32();
        rng.reseed();
        assert_eq!(rng.stream(HELPER_STREAM).next_u32(), first);
    }
}
