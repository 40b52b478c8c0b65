//! Parser configuration.
//!
//! Reference upstream implementation: the teacher's `Config` in
//! `libchinese-core`'s `lib.rs` (TOML load/save, plain-data feature toggles).
//! This is an ambient concern the distilled spec never names: none of these
//! knobs change a scored result at their default values, they only let a
//! host selectively disable an expensive feature family.

use serde::{Deserialize, Serialize};

/// Feature toggles for [`crate::parser::AddressParser::parse_with_config`].
///
/// All features are enabled by default, matching the behavior described in
/// the spec exactly; a host opts out of a family, never in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Emit phrase-aware `prev_word`/`next_word` context features instead of
    /// the plain adjacent-token ones.
    pub enable_phrase_aware_context: bool,
    /// Run the long-distance venue-detection scan for the first token.
    pub enable_venue_detection: bool,
    /// Defensive cap on the number of keys returned by a single trie prefix
    /// enumeration, enforced by [`crate::phrase::PhraseMatcher`] while
    /// growing a phrase match. `usize::MAX` disables the cap.
    pub max_prefix_enumeration: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            enable_phrase_aware_context: true,
            enable_venue_detection: true,
            max_prefix_enumeration: usize::MAX,
        }
    }
}

impl ParserConfig {
    /// Load configuration from a TOML file.
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
