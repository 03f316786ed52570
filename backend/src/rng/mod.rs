//! Deterministic random number generation
//!
//! Uses the xorshift64* algorithm. Every random draw made by the matching
//! engine goes through a `RngManager` passed in by the caller, so a round can be
//! replayed exactly from its seed.

mod xorshift;

pub use xorshift::RngManager;
