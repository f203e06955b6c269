//! Event-shape validation: checks an inbound payload
//! against its event's required-field schema. `vsg_protocol`'s
//! tagged enum already encodes that schema structurally, so validation is
//! just attempting the typed parse and turning a deserialize failure into a
//! client-visible validation error instead of a panic or a silent drop.

use serde_json::Value;
use vsg_domain::error::{Error, Result};
use vsg_protocol::ClientEvent;

pub fn validate_client_event(raw: &Value) -> Result<ClientEvent> {
    serde_json::from_value(raw.clone())
        .map_err(|e| Error::ValidationError(format!("invalid event payload: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn session_start_with_required_fields_is_valid() {
        let value = json!({
            "event": "session:start",
            "questionnaireId": "demo-01a-electronics-retail",
            "voiceId": "matthew"
        });
        assert!(validate_client_event(&value).is_ok());
    }

    #[test]
    fn session_start_missing_questionnaire_id_is_invalid() {
        let value = json!({ "event": "session:start", "voiceId": "matthew" });
        assert!(validate_client_event(&value).is_err());
    }

    #[test]
    fn unknown_event_name_is_invalid() {
        let value = json!({ "event": "not:a:real:event" });
        assert!(validate_client_event(&value).is_err());
    }

    #[test]
    fn audio_chunk_requires_sequence_number() {
        let value = json!({ "event": "audio:chunk", "audioData": "AAAA" });
        assert!(validate_client_event(&value).is_err());
    }
}
