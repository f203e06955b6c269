//! Voice/config resolver: maps legacy aliases onto the closed
//! canonical voice set and validates numeric configuration knobs.

use std::collections::HashMap;

/// The closed set of voice identifiers the upstream endpoint accepts.
pub const CANONICAL_VOICES: &[&str] = &["Aoede", "Charon", "Fenrir", "Kore", "Puck"];

pub struct VoiceResolver {
    default_voice: String,
    aliases: HashMap<String, String>,
}

impl VoiceResolver {
    /// Builds the resolver from the built-in legacy alias map merged with
    /// any config-supplied overrides (config wins on key collision).
    pub fn new(default_voice: impl Into<String>, config_aliases: &HashMap<String, String>) -> Self {
        let mut aliases = built_in_aliases();
        for (k, v) in config_aliases {
            aliases.insert(k.to_ascii_lowercase(), v.clone());
        }
        VoiceResolver {
            default_voice: default_voice.into(),
            aliases,
        }
    }

    fn is_canonical(name: &str) -> bool {
        CANONICAL_VOICES.iter().any(|v| v.eq_ignore_ascii_case(name))
    }

    fn canonical_casing(name: &str) -> Option<&'static str> {
        CANONICAL_VOICES
            .iter()
            .find(|v| v.eq_ignore_ascii_case(name))
            .copied()
    }

    /// Resolves `voice_id` to a canonical voice name. Empty or unknown
    /// input yields the configured default. Idempotent: `resolve(resolve(x))
    /// == resolve(x)` for all x.
    pub fn resolve(&self, voice_id: &str) -> String {
        let trimmed = voice_id.trim();
        if trimmed.is_empty() {
            return self.resolve_default();
        }
        if Self::is_canonical(trimmed) {
            return Self::canonical_casing(trimmed).unwrap().to_string();
        }
        if let Some(canonical) = self.aliases.get(&trimmed.to_ascii_lowercase()) {
            if Self::is_canonical(canonical) {
                return Self::canonical_casing(canonical).unwrap().to_string();
            }
        }
        self.resolve_default()
    }

    fn resolve_default(&self) -> String {
        if Self::is_canonical(&self.default_voice) {
            Self::canonical_casing(&self.default_voice).unwrap().to_string()
        } else {
            "Charon".to_string()
        }
    }
}

fn built_in_aliases() -> HashMap<String, String> {
    let mut map = HashMap::new();
    map.insert("tiffany".to_string(), "Aoede".to_string());
    map.insert("matthew".to_string(), "Puck".to_string());
    map.insert("joanna".to_string(), "Kore".to_string());
    map.insert("brian".to_string(), "Fenrir".to_string());
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> VoiceResolver {
        VoiceResolver::new("Charon", &HashMap::new())
    }

    #[test]
    fn legacy_alias_tiffany_maps_to_aoede() {
        assert_eq!(resolver().resolve("tiffany"), "Aoede");
        assert_eq!(resolver().resolve("Tiffany"), "Aoede");
    }

    #[test]
    fn unknown_voice_falls_back_to_default() {
        assert_eq!(resolver().resolve("unknown"), "Charon");
        assert_eq!(resolver().resolve(""), "Charon");
        assert_eq!(resolver().resolve("   "), "Charon");
    }

    #[test]
    fn canonical_voice_passes_through() {
        assert_eq!(resolver().resolve("Kore"), "Kore");
        assert_eq!(resolver().resolve("kore"), "Kore");
    }

    #[test]
    fn resolve_is_idempotent() {
        let r = resolver();
        for input in ["tiffany", "Kore", "unknown", ""] {
            let once = r.resolve(input);
            let twice = r.resolve(&once);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn config_supplied_alias_overrides_built_in() {
        let mut overrides = HashMap::new();
        overrides.insert("tiffany".to_string(), "Fenrir".to_string());
        let r = VoiceResolver::new("Charon", &overrides);
        assert_eq!(r.resolve("tiffany"), "Fenrir");
    }
}
