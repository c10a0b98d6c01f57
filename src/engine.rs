// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! The embedding application's state machine.

use crate::types::tick::Tick;

/// Deterministic state machine driven by the shard runtime.
///
/// The runtime calls these in a fixed discipline:
/// - `init` once, either at first boot or after a failed restore (preceded by
///   `reset`).
/// - `tick` on the leader with fresh input, `replay` everywhere else with
///   committed input. For the same input, `replay` must leave state whose
///   `state_hash` is bit-identical to what `tick` produced.
/// - `snapshot`/`restore` serialize the full state; `restore` is only ever
///   called on a freshly reset engine.
pub trait ShardEngine: Send + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    fn init(&mut self) -> Result<(), Self::Error>;

    fn tick(&mut self, tick: &Tick) -> Result<(), Self::Error>;

    fn replay(&mut self, tick: &Tick) -> Result<(), Self::Error>;

    fn state_hash(&self) -> Result<Vec<u8>, Self::Error>;

    fn snapshot(&self) -> Result<Vec<u8>, Self::Error>;

    fn restore(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Drop all state, as if `init` had never been called.
    fn reset(&mut self);
}
