//! Single-writer runtime: handle, sweep timer, and events.

/// Runtime event payloads.
pub mod events;
/// Runtime handle, command loop, and sweep timer.
pub mod handle;
