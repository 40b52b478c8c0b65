//! The `AddressParser` façade: tokenize → score → Viterbi → assemble
//! labeled components (`spec.md` §4.J).
//!
//! Reference upstream implementation: the teacher's top-level `Engine`
//! entry point (`engine.rs`), which wraps a multi-stage pipeline behind one
//! public call and emits a `tracing` span around it.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::config::ParserConfig;
use crate::context::AddressParserContext;
use crate::error::Result;
use crate::features::extract_features;
use crate::model::AddressParserModel;
use crate::tokenizer::{DefaultTokenizer, Tokenizer};

/// Parallel `(raw token text, predicted label)` arrays, one entry per
/// non-whitespace token, in input order.
#[derive(Debug, Clone, Default)]
pub struct AddressParserResponse {
    pub components: Vec<String>,
    pub labels: Vec<String>,
}

impl AddressParserResponse {
    /// The first component whose predicted label equals `label`, if any.
    pub fn get_component(&self, label: &str) -> Option<&str> {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|i| self.components[i].as_str())
    }
}

/// Statistical CRF address parser. Cheap to clone: the model is shared
/// behind an `Arc` and never mutated after load, so concurrent `parse`
/// calls never contend (`spec.md` §5).
#[derive(Clone)]
pub struct AddressParser {
    model: Arc<AddressParserModel>,
}

impl AddressParser {
    /// Load a model directory (`spec.md` §4.K / §6).
    pub fn load_from_directory(path: impl AsRef<Path>) -> Result<Self> {
        let model = AddressParserModel::load_from_directory(path)?;
        Ok(Self { model: Arc::new(model) })
    }

    pub fn from_model(model: AddressParserModel) -> Self {
        Self { model: Arc::new(model) }
    }

    /// Parse `input` with default feature-toggle settings.
    pub fn parse(&self, input: &str) -> AddressParserResponse {
        self.parse_with_config(input, &ParserConfig::default())
    }

    /// Parse `input`, gating optional feature families per `config`.
    pub fn parse_with_config(&self, input: &str, config: &ParserConfig) -> AddressParserResponse {
        let span = tracing::debug_span!("parse", input_len = input.len());
        let _enter = span.enter();

        let lowered = input.to_lowercase();
        let tokenizer = DefaultTokenizer;
        let ts = tokenizer.tokenize(&lowered);

        let non_whitespace_count = ts.non_whitespace_count();
        if non_whitespace_count == 0 {
            debug!(tokens = 0, "empty input, nothing to parse");
            return AddressParserResponse::default();
        }

        let mut ctx = AddressParserContext::new(&ts);
        ctx.fill_phrases(
            self.model.phrases.as_ref(),
            self.model.component_phrases.as_ref(),
            self.model.postal_codes.as_ref(),
            config.max_prefix_enumeration,
        );

        let mut crf_ctx = self
            .model
            .crf
            .new_context()
            .expect("model's own transition matrix always matches its own label count");
        crf_ctx.prepare_for_inference(non_whitespace_count);

        for (token_idx, _token) in ts.non_whitespace() {
            let j = ts
                .non_whitespace_index_of(token_idx)
                .expect("token_idx comes from non_whitespace() and is never whitespace");
            let features = extract_features(&ts, token_idx, &ctx, &self.model, config);
            self.model
                .crf
                .score_token(&mut crf_ctx, j, &features, None)
                .expect("j is within [0, non_whitespace_count) by construction");
        }

        let labels = self
            .model
            .crf
            .viterbi(&crf_ctx)
            .expect("viterbi is total once state scores are populated");

        debug!(tokens = non_whitespace_count, "parse complete");

        let mut response = AddressParserResponse {
            components: Vec::with_capacity(non_whitespace_count),
            labels: Vec::with_capacity(non_whitespace_count),
        };
        for (token_idx, token) in ts.non_whitespace() {
            let j = ts.non_whitespace_index_of(token_idx).unwrap();
            let label = self.model.crf.class_name(labels[j]).unwrap_or("").to_string();
            response.components.push(token.text.clone());
            response.labels.push(label);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crf::Crf;
    use crate::trie::Trie;

    fn two_class_crf_favoring_numeric() -> Crf {
        let mut buf = Vec::new();
        buf.extend_from_slice(&0xCFCF_CFCFu32.to_be_bytes());
        buf.extend_from_slice(&2u32.to_be_bytes());
        for name in ["house_number", "street"] {
            buf.extend_from_slice(&(name.len() as u32).to_be_bytes());
            buf.extend_from_slice(name.as_bytes());
        }
        // state features: is_numeric -> id 0, word=main -> id 1
        buf.extend_from_slice(&2u32.to_be_bytes());
        for (name, id) in [("is_numeric", 0u32), ("word=main", 1u32)] {
            buf.extend_from_slice(&(name.len() as u32).to_be_bytes());
            buf.extend_from_slice(name.as_bytes());
            buf.extend_from_slice(&id.to_be_bytes());
        }
        buf.extend_from_slice(&0u32.to_be_bytes()); // trans features
        // sparse weights: 2 rows x 2 cols
        buf.extend_from_slice(&2u32.to_be_bytes());
        buf.extend_from_slice(&2u32.to_be_bytes());
        buf.extend_from_slice(&2u32.to_be_bytes());
        buf.extend_from_slice(&0u32.to_be_bytes());
        buf.extend_from_slice(&1u32.to_be_bytes());
        buf.extend_from_slice(&2u32.to_be_bytes());
        buf.extend_from_slice(&0u32.to_be_bytes()); // is_numeric -> house_number
        buf.extend_from_slice(&1u32.to_be_bytes()); // word=main -> street
        buf.extend_from_slice(&5.0f64.to_be_bytes());
        buf.extend_from_slice(&5.0f64.to_be_bytes());
        for _ in 0..4 {
            buf.extend_from_slice(&0.0f64.to_be_bytes());
        }
        Crf::load(&buf).unwrap()
    }

    fn model_with(crf: Crf) -> AddressParserModel {
        AddressParserModel {
            crf,
            vocabulary: Trie::new(),
            phrases: None,
            phrase_types: None,
            postal_codes: None,
            postal_code_graph: None,
            component_phrases: None,
            component_phrase_types: None,
        }
    }

    #[test]
    fn parses_simple_address_into_labels() {
        let parser = AddressParser::from_model(model_with(two_class_crf_favoring_numeric()));
        let response = parser.parse("123 main");
        assert_eq!(response.components, vec!["123", "main"]);
        assert_eq!(response.labels, vec!["house_number", "street"]);
    }

    #[test]
    fn empty_input_returns_empty_response() {
        let parser = AddressParser::from_model(model_with(two_class_crf_favoring_numeric()));
        let response = parser.parse("   ");
        assert!(response.components.is_empty());
        assert!(response.labels.is_empty());
    }

    #[test]
    fn get_component_finds_first_matching_label() {
        let parser = AddressParser::from_model(model_with(two_class_crf_favoring_numeric()));
        let response = parser.parse("123 main");
        assert_eq!(response.get_component("house_number"), Some("123"));
        assert_eq!(response.get_component("postcode"), None);
    }
}
