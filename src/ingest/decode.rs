use thiserror::Error;

use crate::traffic::TrafficReport;

/// Inbound message that cannot become a [`TrafficReport`].
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Blank payload.
    #[error("empty traffic message")]
    Empty,
    /// Not JSON, not an object, or a recognized key with the wrong type.
    #[error("malformed traffic message: {0}")]
    Json(#[from] serde_json::Error),
}

/// Decodes one feed message.
///
/// Unknown keys are ignored. An unparseable `Icao_addr` fails here, while a
/// missing one decodes fine and is refused later by the merge engine.
pub fn decode_message(raw: &str) -> Result<TrafficReport, DecodeError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DecodeError::Empty);
    }
    Ok(serde_json::from_str(trimmed)?)
}
