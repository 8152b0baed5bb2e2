//! Reproducible random streams for replicate execution.
//!
//! Every replicate draws from its own ChaCha stream: same 256-bit key
//! (expanded from the master seed), distinct 64-bit stream id. This is
//! counter partitioning of one generator, not re-seeding of short streams,
//! so streams never overlap. A stream's position is a pure value (stream id
//! plus word position) and capturing or restoring state is a plain copy
//! with no global mutation anywhere.

use rand::{Error as RandError, RngCore, SeedableRng};
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};

/// Snapshot of a replicate stream, sufficient to reproduce every subsequent
/// draw bit-for-bit. Immutable once captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngState {
    /// Master seed the stream key was expanded from.
    pub master_seed: u64,
    /// Stream id (replicate or worker index).
    pub stream: u64,
    /// Word position within the stream at capture time.
    pub word_pos: u128,
}

impl RngState {
    /// Rebuild a generator at exactly this state. Draws after restoration are
    /// bit-for-bit identical to those that followed the original capture.
    pub fn restore(&self) -> ReplicateRng {
        let mut rng = ReplicateRng::for_replicate(self.master_seed, self.stream);
        rng.inner.set_word_pos(self.word_pos);
        rng
    }
}

/// Random number generator bound to one replicate's stream.
#[derive(Debug, Clone)]
pub struct ReplicateRng {
    master_seed: u64,
    inner: ChaCha12Rng,
}

impl ReplicateRng {
    /// Create the generator for stream `stream` of `master_seed`, positioned
    /// at the start of the stream.
    pub fn for_replicate(master_seed: u64, stream: u64) -> Self {
        let mut inner = ChaCha12Rng::seed_from_u64(master_seed);
        inner.set_stream(stream);
        Self { master_seed, inner }
    }

    /// Snapshot the current state without advancing the generator.
    pub fn capture_state(&self) -> RngState {
        RngState {
            master_seed: self.master_seed,
            stream: self.inner.get_stream(),
            word_pos: self.inner.get_word_pos(),
        }
    }

    /// The master seed this stream was derived from.
    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// The stream id.
    pub fn stream(&self) -> u64 {
        self.inner.get_stream()
    }
}

impl RngCore for ReplicateRng {
    fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.inner.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), RandError> {
        self.inner.try_fill_bytes(dest)
    }
}

/// Independent stream states for a pool of `n_workers` workers, each at the
/// start of its own stream.
pub fn worker_streams(master_seed: u64, n_workers: usize) -> Vec<RngState> {
    (0..n_workers as u64)
        .map(|w| ReplicateRng::for_replicate(master_seed, w).capture_state())
        .collect()
}
