//! Feed-side collaborator: message decoding, sources, and the adapter loop.

/// Loop that pumps a source into the cache runtime.
pub mod adapter;
/// JSON message decoding.
pub mod decode;
/// Connectivity and reset signalling shared with the runtime.
pub mod link;
/// Message source trait and implementations.
pub mod source;
