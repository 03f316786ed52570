//! xorshift64* random number generator
//!
//! Fast, deterministic PRNG with 64-bit state. Same seed → same sequence of
//! candidate draws → same ledger. Rounds that fail can be reproduced by
//! re-running with the seed that was logged for them.

use serde::{Deserialize, Serialize};

/// Deterministic random number generator using xorshift64*
///
/// # Example
/// ```
/// use coffee_match_core::RngManager;
///
/// let mut rng = RngManager::new(12345);
/// let value = rng.next();
/// let slot = rng.index(4); // [0, 4)
/// assert!(slot < 4);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngManager {
    state: u64,
}

impl RngManager {
    /// Create a new RNG with given seed
    ///
    /// A zero seed is replaced by 1 (xorshift cannot leave the zero state).
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Generate next random u64 value
    pub fn next(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    /// Pick an index in [0, len)
    ///
    /// # Panics
    /// Panics if `len` is zero
    ///
    /// # Example
    /// ```
    /// use coffee_match_core::RngManager;
    ///
    /// let mut rng = RngManager::new(7);
    /// let candidates = ["ana", "ben", "cleo"];
    /// let pick = candidates[rng.index(candidates.len())];
    /// assert!(candidates.contains(&pick));
    /// ```
    pub fn index(&mut self, len: usize) -> usize {
        assert!(len > 0, "cannot pick from an empty range");
        (self.next() % len as u64) as usize
    }

    /// Get current RNG state (for checkpointing/replay)
    ///
    /// `RngManager::new(rng.get_state())` continues the same sequence.
    pub fn get_state(&self) -> u64 {
        self.state
    }

    /// Generate random f64 in range [0.0, 1.0)
    pub fn next_f64(&mut self) -> f64 {
        let value = self.next();
        (value >> 11) as f64 * (1.0 / ((1u64 << 53) as f64))
    }

    /// Returns true with the given probability
    ///
    /// Probabilities at or below 0.0 never fire; at or above 1.0 always fire.
    pub fn chance(&mut self, probability: f64) -> bool {
        self.next_f64() < probability
    }
}
