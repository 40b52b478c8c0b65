//! Deterministic per-token feature extraction (`spec.md` §4.I).
//!
//! Reference upstream implementation: the teacher's `HashSet`/`HashMap`-based
//! dedup idiom throughout `fuzzy.rs` and `lexicon.rs`, generalized here into
//! an ordered, deduplicated feature accumulator (a feature contributes once
//! per token regardless of how many rules would otherwise emit it twice).

use crate::config::ParserConfig;
use crate::context::AddressParserContext;
use crate::model::{boundary_bits, dictionary_bits, AddressParserModel};
use crate::token::{TokenKind, TokenizedString};

/// Ordered, deduplicated feature accumulator.
struct FeatureSet {
    seen: std::collections::HashSet<String>,
    out: Vec<String>,
}

impl FeatureSet {
    fn new() -> Self {
        Self { seen: std::collections::HashSet::new(), out: Vec::new() }
    }

    fn push(&mut self, feature: String) {
        if self.seen.insert(feature.clone()) {
            self.out.push(feature);
        }
    }
}

fn lowercase_strip_trailing_period(text: &str) -> String {
    let lower = text.to_lowercase();
    match lower.strip_suffix('.') {
        Some(stripped) => stripped.to_string(),
        None => lower,
    }
}

fn prev_non_whitespace(ts: &TokenizedString, idx: usize) -> Option<usize> {
    (0..idx).rev().find(|&k| !ts.tokens[k].is_whitespace())
}

fn next_non_whitespace(ts: &TokenizedString, idx: usize) -> Option<usize> {
    (idx + 1..ts.tokens.len()).find(|&k| !ts.tokens[k].is_whitespace())
}

/// The priority-resolved phrase span covering token `idx`, if any: the
/// dictionary phrase when present and at least as long as a competing
/// component phrase, otherwise the component phrase; then extended (never
/// shrunk) by an overlapping postal-code span.
fn effective_span(ctx: &AddressParserContext, idx: usize) -> Option<(usize, usize)> {
    let dict = ctx.dictionary.get(idx);
    let comp = ctx.component.get(idx);
    let mut span = match (dict, comp) {
        (Some(d), Some(c)) => {
            if d.length >= c.length {
                Some((d.start_idx, d.end_idx))
            } else {
                Some((c.start_idx, c.end_idx))
            }
        }
        (Some(d), None) => Some((d.start_idx, d.end_idx)),
        (None, Some(c)) => Some((c.start_idx, c.end_idx)),
        (None, None) => None,
    };
    if let Some(pc) = ctx.postal_code.get(idx) {
        span = Some(match span {
            Some((s, e)) => (s.min(pc.start_idx), e.max(pc.end_idx)),
            None => (pc.start_idx, pc.end_idx),
        });
    }
    span
}

/// The text to use for token `idx` in a prev/next-word feature: the
/// priority-resolved phrase text if `idx` is inside one, otherwise the
/// lower-cased token text.
fn effective_text(ts: &TokenizedString, ctx: &AddressParserContext, idx: usize) -> String {
    let dict = ctx.dictionary.get(idx);
    let comp = ctx.component.get(idx);
    match (dict, comp) {
        (Some(d), Some(c)) => {
            if d.length >= c.length {
                d.phrase_text.clone()
            } else {
                c.phrase_text.clone()
            }
        }
        (Some(d), None) => d.phrase_text.clone(),
        (None, Some(c)) => c.phrase_text.clone(),
        (None, None) => ts.tokens[idx].text.to_lowercase(),
    }
}

fn baseline_features(out: &mut FeatureSet, ts: &TokenizedString, idx: usize) {
    out.push("bias".to_string());
    let token = &ts.tokens[idx];

    if matches!(token.kind, TokenKind::Word | TokenKind::Abbreviation | TokenKind::Acronym) {
        let w = lowercase_strip_trailing_period(&token.text);
        out.push(format!("word={w}"));
        out.push(format!("word_length={}", w.len()));
        if token.text.chars().next().is_some_and(|c| c.is_uppercase()) {
            out.push("is_capitalized".to_string());
        }
        if token.text.chars().all(|c| c.is_uppercase() || c == '.') {
            out.push("is_all_caps".to_string());
        }
        if token.text.contains('.') {
            out.push("has_period".to_string());
        }

        let w_chars: Vec<char> = w.chars().collect();
        if w_chars.len() >= 6 {
            for n in 3..=6.min(w_chars.len()) {
                let prefix: String = w_chars[..n].iter().collect();
                let suffix: String = w_chars[w_chars.len() - n..].iter().collect();
                out.push(format!("word:prefix{n}={prefix}"));
                out.push(format!("word:suffix{n}={suffix}"));
            }
        }

        if w.contains('-') {
            for part in w.split('-').filter(|p| !p.is_empty()) {
                out.push(format!("sub_word={part}"));
            }
        }
    }

    if token.kind == TokenKind::Numeric {
        out.push("is_numeric".to_string());
    }

    if let Some(prev_idx) = prev_non_whitespace(ts, idx) {
        if ts.tokens[prev_idx].is_comma() {
            out.push("after_comma".to_string());
        }
    }

    if let Some(first) = ts.non_whitespace().map(|(i, _)| i).next() {
        if first == idx {
            out.push("position=first".to_string());
        }
    }
    if let Some(last) = ts.non_whitespace().map(|(i, _)| i).last() {
        if last == idx {
            out.push("position=last".to_string());
        }
    }
}

fn phrase_aware_context_features(out: &mut FeatureSet, ts: &TokenizedString, ctx: &AddressParserContext, idx: usize) {
    let span = effective_span(ctx, idx).unwrap_or((idx, idx));
    let w = lowercase_strip_trailing_period(&ts.tokens[idx].text);

    if let Some(prev_idx) = prev_non_whitespace(ts, span.0) {
        let x = effective_text(ts, ctx, prev_idx);
        out.push(format!("prev_word={x}"));
        out.push(format!("prev_word+word={x} {w}"));
    }
    if let Some(next_idx) = next_non_whitespace(ts, span.1) {
        let y = effective_text(ts, ctx, next_idx);
        out.push(format!("next_word={y}"));
        out.push(format!("word+next_word={w} {y}"));
    }
}

fn dictionary_phrase_features(out: &mut FeatureSet, ctx: &AddressParserContext, model: &AddressParserModel, idx: usize) {
    let Some(p) = ctx.dictionary.get(idx) else { return };
    out.push(format!("phrase:{}", p.phrase_text));
    let Some(components) = model.phrase_type(p.phrase_id) else { return };
    for &(bit, name) in dictionary_bits::ALL {
        if components & bit != 0 {
            out.push(format!("phrase:{name}"));
        }
    }
    if components != 0 && components & (components - 1) == 0 {
        let name = dictionary_bits::ALL.iter().find(|&&(bit, _)| bit == components).map(|&(_, name)| name);
        if let Some(name) = name {
            out.push(format!("unambiguous phrase type:{name}"));
            out.push(format!("unambiguous phrase type+phrase:{name}:{}", p.phrase_text));
        }
    }
}

fn component_phrase_features(out: &mut FeatureSet, ctx: &AddressParserContext, model: &AddressParserModel, idx: usize) {
    let Some(p) = ctx.component.get(idx) else { return };
    out.push(format!("phrase:{}", p.phrase_text));
    let Some(types) = model.component_phrase_type(p.phrase_id) else { return };
    let mask = types.components;

    for &(bit, name) in boundary_bits::ALL {
        if mask == bit {
            out.push(format!("unambiguous phrase type:{name}"));
            out.push(format!("unambiguous phrase type+phrase:{name}:{}", p.phrase_text));
        } else if mask & bit != 0 {
            out.push(format!("phrase:{name}"));
            out.push(format!("phrase type+phrase:{name}:{}", p.phrase_text));
        }
    }

    let ambiguous = mask != 0 && mask & (mask - 1) != 0;
    if ambiguous {
        if let Some(common_bit) = boundary_bits::ordinal_to_bit(types.most_common) {
            if mask & common_bit != 0 {
                if let Some(&(_, name)) = boundary_bits::ALL.iter().find(|&&(bit, _)| bit == common_bit) {
                    out.push(format!("commonly {name}:{}", p.phrase_text));
                }
            }
        }
    }
}

fn postal_code_context_features(out: &mut FeatureSet, ts: &TokenizedString, ctx: &AddressParserContext, model: &AddressParserModel, idx: usize) {
    let Some(pc) = ctx.postal_code.get(idx) else { return };
    let Some(graph) = model.postal_code_graph.as_ref() else { return };

    let neighbor = prev_non_whitespace(ts, pc.start_idx)
        .and_then(|i| ctx.component.get(i))
        .or_else(|| next_non_whitespace(ts, pc.end_idx).and_then(|i| ctx.component.get(i)));

    let lower_text = ts.tokens[idx].text.to_lowercase();
    let have_context = neighbor.is_some_and(|n| graph.has_edge(pc.phrase_id, n.phrase_id));

    if have_context {
        out.push("postcode have context".to_string());
        out.push(format!("postcode have context:{lower_text}"));
    } else {
        out.push(format!("postcode no context:{lower_text}"));
    }
}

fn venue_detection_features(out: &mut FeatureSet, ts: &TokenizedString, ctx: &AddressParserContext, model: &AddressParserModel, idx: usize) {
    if ts.non_whitespace_index_of(idx) != Some(0) {
        return;
    }
    let token = &ts.tokens[idx];
    if token.kind != TokenKind::Word {
        return;
    }
    let lower = token.text.to_lowercase();
    if model.vocabulary.contains_key(&lower) {
        return;
    }
    let owned = ctx.dictionary.get(idx).is_some() || ctx.component.get(idx).is_some() || ctx.postal_code.get(idx).is_some();
    if owned {
        return;
    }

    let mut seen_number = false;
    let mut seen_phrase = false;
    let mut k = idx;
    while let Some(next_k) = next_non_whitespace(ts, k) {
        k = next_k;
        let t = &ts.tokens[k];

        if t.kind == TokenKind::Numeric {
            seen_number = true;
            let relation = if seen_phrase { "after phrase" } else { "before phrase" };
            out.push(format!("first word unknown+number right:{relation}"));
            out.push(format!("first word unknown+number right:{relation}:{}", t.text.to_lowercase()));
            if seen_phrase {
                break;
            }
            continue;
        }

        if let Some(p) = ctx.dictionary.get(k) {
            if ctx.dictionary.is_start_of(k) {
                let components = model.phrase_type(p.phrase_id).unwrap_or(0);
                let is_road = components & dictionary_bits::ROAD != 0;
                let is_name = components & dictionary_bits::NAME != 0;
                let relation = if seen_number { "after number" } else { "before number" };
                let pw = p.phrase_text.clone();
                let end_idx = p.end_idx;

                if is_road && !is_name {
                    out.push(format!("first word unknown+street phrase right:{relation}"));
                    out.push(format!("first word unknown+street phrase right:{relation}:{pw}"));
                    break;
                } else if is_name && !is_road {
                    out.push(format!("first word unknown+venue phrase right:{relation}"));
                    out.push(format!("first word unknown+venue phrase right:{relation}:{pw}"));
                    seen_phrase = true;
                    k = end_idx;
                    continue;
                } else if is_road && is_name && seen_number {
                    out.push("first word unknown+number+ambiguous phrase right".to_string());
                    out.push(format!("first word unknown+number+ambiguous phrase right:{pw}"));
                    break;
                }
                k = end_idx;
            }
        }
    }
}

/// Extract the full feature set for the non-whitespace token at `ts.tokens[idx]`.
pub fn extract_features(
    ts: &TokenizedString,
    idx: usize,
    ctx: &AddressParserContext,
    model: &AddressParserModel,
    config: &ParserConfig,
) -> Vec<String> {
    let mut out = FeatureSet::new();

    baseline_features(&mut out, ts, idx);
    if config.enable_phrase_aware_context {
        phrase_aware_context_features(&mut out, ts, ctx, idx);
    }
    dictionary_phrase_features(&mut out, ctx, model, idx);
    component_phrase_features(&mut out, ctx, model, idx);
    postal_code_context_features(&mut out, ts, ctx, model, idx);
    if config.enable_venue_detection {
        venue_detection_features(&mut out, ts, ctx, model, idx);
    }

    out.out
}
