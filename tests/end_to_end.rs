//! Black-box scenarios from `spec.md` §8, exercised through the public API.

use addrparse_core::config::ParserConfig;
use addrparse_core::context::AddressParserContext;
use addrparse_core::crf::context::CrfContext;
use addrparse_core::features::extract_features;
use addrparse_core::matrix::{DenseMatrix, SparseMatrix};
use addrparse_core::model::{dictionary_bits, AddressParserModel, ComponentPhraseTypes};
use addrparse_core::tokenizer::{DefaultTokenizer, Tokenizer};
use addrparse_core::trie::Trie;
use addrparse_core::Error;

fn minimal_crf_bytes(classes: &[&str]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&0xCFCF_CFCFu32.to_be_bytes());
    buf.extend_from_slice(&(classes.len() as u32).to_be_bytes());
    for name in classes {
        buf.extend_from_slice(&(name.len() as u32).to_be_bytes());
        buf.extend_from_slice(name.as_bytes());
    }
    buf.extend_from_slice(&0u32.to_be_bytes()); // state features
    buf.extend_from_slice(&0u32.to_be_bytes()); // trans features
    buf.extend_from_slice(&0u32.to_be_bytes()); // sparse rows
    buf.extend_from_slice(&(classes.len() as u32).to_be_bytes()); // sparse cols
    buf.extend_from_slice(&0u32.to_be_bytes()); // nnz
    buf.extend_from_slice(&0u32.to_be_bytes()); // row_ptr[0]
    for _ in 0..classes.len() * classes.len() {
        buf.extend_from_slice(&0.0f64.to_be_bytes());
    }
    buf
}

fn bare_model() -> AddressParserModel {
    AddressParserModel {
        crf: addrparse_core::crf::Crf::load(&minimal_crf_bytes(&["a", "b"])).unwrap(),
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
fn scenario_1_main_street_baseline_features() {
    let ts = DefaultTokenizer.tokenize("123 main street");
    let ctx = AddressParserContext::new(&ts);
    let model = bare_model();
    let config = ParserConfig::default();

    let features_0 = extract_features(&ts, 0, &ctx, &model, &config);
    assert!(features_0.contains(&"bias".to_string()));
    assert!(features_0.contains(&"is_numeric".to_string()));
    assert!(features_0.contains(&"position=first".to_string()));

    let street_idx = ts.tokens.iter().position(|t| t.text == "street").unwrap();
    let features_2 = extract_features(&ts, street_idx, &ctx, &model, &config);
    assert!(features_2.contains(&"word=street".to_string()));
    assert!(features_2.contains(&"position=last".to_string()));
}

#[test]
fn scenario_2_postal_code_has_context_via_graph_edge() {
    let mut component_trie = Trie::new();
    component_trie.insert("brooklyn", 0).unwrap();
    let mut postal_trie = Trie::new();
    postal_trie.insert("11216", 200).unwrap();

    let mut graph = addrparse_core::graph::Graph::new(201);
    graph.add_edge(200, 0);

    let mut model = bare_model();
    model.component_phrases = Some(component_trie.clone());
    model.component_phrase_types = Some(vec![ComponentPhraseTypes {
        components: addrparse_core::model::boundary_bits::CITY,
        most_common: 0,
    }]);
    model.postal_codes = Some(postal_trie.clone());
    model.postal_code_graph = Some(graph);

    let ts = DefaultTokenizer.tokenize("brooklyn 11216");
    let mut ctx = AddressParserContext::new(&ts);
    ctx.fill_phrases(None, Some(&component_trie), Some(&postal_trie), usize::MAX);

    let postal_idx = ts.tokens.iter().position(|t| t.text == "11216").unwrap();
    let features = extract_features(&ts, postal_idx, &ctx, &model, &ParserConfig::default());
    assert!(features.contains(&"postcode have context".to_string()));
    assert!(features.contains(&"postcode have context:11216".to_string()));
}

#[test]
fn scenario_3_postal_code_no_context_without_nearby_admin_phrase() {
    let mut postal_trie = Trie::new();
    postal_trie.insert("11216", 200).unwrap();
    let mut graph = addrparse_core::graph::Graph::new(201);
    graph.add_edge(200, 0);

    let mut model = bare_model();
    model.postal_codes = Some(postal_trie.clone());
    model.postal_code_graph = Some(graph);

    let ts = DefaultTokenizer.tokenize("main 11216");
    let mut ctx = AddressParserContext::new(&ts);
    ctx.fill_phrases(None, None, Some(&postal_trie), usize::MAX);

    let postal_idx = ts.tokens.iter().position(|t| t.text == "11216").unwrap();
    let features = extract_features(&ts, postal_idx, &ctx, &model, &ParserConfig::default());
    assert!(features.contains(&"postcode no context:11216".to_string()));
    assert!(!features.contains(&"postcode have context".to_string()));
}

#[test]
fn scenario_4_venue_detection_pure_road_after_number() {
    let mut vocabulary = Trie::new();
    vocabulary.insert("ave", 1).unwrap();
    let mut dictionary_trie = Trie::new();
    dictionary_trie.insert("ave", 2).unwrap();

    let mut model = bare_model();
    model.vocabulary = vocabulary;
    model.phrases = Some(dictionary_trie.clone());
    model.phrase_types = Some(vec![0, 0, dictionary_bits::ROAD]);

    let ts = DefaultTokenizer.tokenize("barboncino 781 ave");
    let mut ctx = AddressParserContext::new(&ts);
    ctx.fill_phrases(Some(&dictionary_trie), None, None, usize::MAX);

    let features = extract_features(&ts, 0, &ctx, &model, &ParserConfig::default());
    assert!(features.contains(&"first word unknown+street phrase right:after number".to_string()));
    assert!(features.contains(&"first word unknown+street phrase right:after number:ave".to_string()));
}

#[test]
fn scenario_5_phrase_aware_prev_word_uses_full_phrase_text() {
    let mut dictionary_trie = Trie::new();
    dictionary_trie.insert("fifth avenue", 3).unwrap();

    let mut model = bare_model();
    model.phrases = Some(dictionary_trie.clone());
    model.phrase_types = Some(vec![0, 0, 0, dictionary_bits::ROAD]);

    let ts = DefaultTokenizer.tokenize("fifth avenue brooklyn");
    let mut ctx = AddressParserContext::new(&ts);
    ctx.fill_phrases(Some(&dictionary_trie), None, None, usize::MAX);

    let brooklyn_idx = ts.tokens.iter().position(|t| t.text == "brooklyn").unwrap();
    let features = extract_features(&ts, brooklyn_idx, &ctx, &model, &ParserConfig::default());
    assert!(features.contains(&"prev_word=fifth avenue".to_string()));
    assert!(!features.contains(&"prev_word=avenue".to_string()));
}

#[test]
fn scenario_6_viterbi_optimality_for_hand_built_scores() {
    let mut trans = DenseMatrix::zeros(2, 2);
    trans.set(0, 0, 0.0).unwrap();
    trans.set(0, 1, 0.5).unwrap();
    trans.set(1, 0, 0.8).unwrap();
    trans.set(1, 1, 0.0).unwrap();

    let mut ctx = CrfContext::new(2, trans).unwrap();
    ctx.prepare_for_inference(3);
    let state = [[1.0, 0.0], [0.5, 1.5], [2.0, 0.5]];
    for (t, row) in state.iter().enumerate() {
        for (k, &v) in row.iter().enumerate() {
            ctx.add_to_state(t, k, v).unwrap();
        }
    }

    let path = ctx.viterbi().unwrap();
    assert_eq!(path, vec![0, 1, 0]);
}

#[test]
fn trie_round_trip_preserves_all_entries() {
    let mut t: Trie<u32> = Trie::new();
    t.insert("street", 1).unwrap();
    t.insert("st", 2).unwrap();
    t.insert("avenue", 3).unwrap();
    let bytes = t.save_compact();
    let loaded: Trie<u32> = Trie::load(&bytes).unwrap();
    let mut a = t.keys();
    let mut b = loaded.keys();
    a.sort();
    b.sort();
    assert_eq!(a, b);
}

#[test]
fn sparse_matrix_round_trip_preserves_row_ptr_invariants() {
    let s = SparseMatrix::from_tuples(3, 4, &[(0, 1, 2.0), (2, 3, 9.0)]).unwrap();
    assert_eq!(s.get(0, 1).unwrap(), 2.0);
    assert_eq!(s.get(2, 3).unwrap(), 9.0);
    assert_eq!(s.row(1).unwrap().len(), 0);
}

#[test]
fn model_load_rejects_missing_directory() {
    let result = AddressParserModel::load_from_directory("/definitely/not/a/real/model/dir");
    assert!(matches!(result, Err(Error::DirectoryNotFound(_))));
}
