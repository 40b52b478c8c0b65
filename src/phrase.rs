//! Phrase matching and first-wins phrase-ownership tracking (`spec.md` §4.G).
//!
//! Reference upstream implementation: the teacher's `TrieNode::walk_prefixes`
//! (`trie.rs`) already returns ordered, length-increasing matches from a
//! start position over one word's characters. `search_tokens` generalizes
//! that same incremental-growth shape from "walk characters of one word" to
//! "walk tokens of a sequence, joined by spaces", and is implemented as a
//! lazy iterator for the same reason the teacher's walk is: callers usually
//! only need the first hit or two, not every growing match materialized
//! up front.

use unicode_normalization::UnicodeNormalization;

use crate::token::{Token, TokenizedString};
use crate::trie::Trie;

/// One matched phrase spanning a contiguous run of non-whitespace tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhraseMatch {
    pub phrase_text: String,
    pub phrase_id: u32,
    pub start_idx: usize,
    pub end_idx: usize,
    pub length: usize,
}

fn normalize(word: &str, normalized: bool) -> String {
    if normalized {
        word.nfd().filter(|c| !unicode_normalization::char::is_combining_mark(*c)).collect::<String>().to_lowercase()
    } else {
        word.to_string()
    }
}

/// Probe a trie entry, honoring the `|prefix` / `suffix|` marker conventions:
/// a key starting with `|` matches when `word` starts with the rest; a key
/// ending with `|` matches when `word` ends with the rest. A plain key
/// matches only on exact equality (handled by the caller via `trie.get`).
fn matches_affix(key: &str, word: &str) -> bool {
    if let Some(rest) = key.strip_prefix('|') {
        return word.starts_with(rest);
    }
    if let Some(rest) = key.strip_suffix('|') {
        return word.ends_with(rest);
    }
    false
}

/// Look up `word` against a phrase trie, first by exact match, then by
/// scanning registered affix-marker keys. Multiple affix keys could in
/// principle match; the first one found by trie enumeration wins, mirroring
/// the trie's unspecified enumeration order for prefix matches.
fn lookup_phrase_word(trie: &Trie<u32>, word: &str) -> Option<u32> {
    if let Some(id) = trie.get(word) {
        return Some(id);
    }
    trie.keys()
        .into_iter()
        .find(|(key, _)| (key.starts_with('|') || key.ends_with('|')) && matches_affix(key, word))
        .map(|(_, id)| id)
}

/// Enumerates growing phrase matches starting at a given token index.
pub struct PhraseMatcher<'a> {
    trie: &'a Trie<u32>,
    ts: &'a TokenizedString,
    normalized: bool,
    max_prefix_enumeration: usize,
}

impl<'a> PhraseMatcher<'a> {
    pub fn new(trie: &'a Trie<u32>, ts: &'a TokenizedString, normalized: bool) -> Self {
        Self::with_max_prefix_enumeration(trie, ts, normalized, usize::MAX)
    }

    /// As [`PhraseMatcher::new`], capping every trie prefix enumeration this
    /// matcher performs at `max_prefix_enumeration` results (`ParserConfig`'s
    /// defensive knob, `SPEC_FULL.md` §2/§4.I).
    pub fn with_max_prefix_enumeration(
        trie: &'a Trie<u32>,
        ts: &'a TokenizedString,
        normalized: bool,
        max_prefix_enumeration: usize,
    ) -> Self {
        Self { trie, ts, normalized, max_prefix_enumeration }
    }

    /// Lazily enumerate every growing match starting at non-whitespace token
    /// index `start` (an index into `ts.tokens`, which must not itself be
    /// whitespace).
    pub fn search_tokens(&self, start: usize) -> impl Iterator<Item = PhraseMatch> + 'a {
        SearchTokens {
            trie: self.trie,
            tokens: &self.ts.tokens,
            normalized: self.normalized,
            max_prefix_enumeration: self.max_prefix_enumeration,
            start,
            cursor: start,
            built: String::new(),
            length: 0,
            done: false,
        }
    }
}

struct SearchTokens<'a> {
    trie: &'a Trie<u32>,
    tokens: &'a [Token],
    normalized: bool,
    max_prefix_enumeration: usize,
    start: usize,
    cursor: usize,
    built: String,
    length: usize,
    done: bool,
}

impl<'a> Iterator for SearchTokens<'a> {
    type Item = PhraseMatch;

    fn next(&mut self) -> Option<PhraseMatch> {
        loop {
            if self.done {
                return None;
            }
            // advance cursor to next non-whitespace token
            while self.cursor < self.tokens.len() && self.tokens[self.cursor].is_whitespace() {
                self.cursor += 1;
            }
            if self.cursor >= self.tokens.len() {
                self.done = true;
                return None;
            }
            let piece = normalize(&self.tokens[self.cursor].text, self.normalized);
            if !self.built.is_empty() {
                self.built.push(' ');
            }
            self.built.push_str(&piece);
            self.length += 1;
            let end_idx = self.cursor;
            self.cursor += 1;

            match lookup_phrase_word(self.trie, &self.built) {
                Some(phrase_id) => {
                    return Some(PhraseMatch {
                        phrase_text: self.built.clone(),
                        phrase_id,
                        start_idx: self.start,
                        end_idx,
                        length: self.length,
                    });
                }
                None => {
                    if self
                        .trie
                        .prefix_matches_capped(&self.built, self.max_prefix_enumeration)
                        .is_empty()
                    {
                        self.done = true;
                        return None;
                    }
                    continue;
                }
            }
        }
    }
}

/// Tracks, per non-whitespace token index, which phrase (if any) owns it.
/// Enforces first-wins: a token already owned is never reassigned.
#[derive(Debug, Clone, Default)]
pub struct PhraseMembership {
    owner: Vec<Option<PhraseMatch>>,
}

impl PhraseMembership {
    pub fn new(num_tokens: usize) -> Self {
        Self { owner: vec![None; num_tokens] }
    }

    /// Register `m`, claiming every token in `[m.start_idx, m.end_idx]` that
    /// is not already owned. First-wins is evaluated per slot, not per match:
    /// a slot already claimed by an earlier match keeps its owner even if
    /// `m` also covers it, but that does not stop `m` from claiming any of
    /// its other, still-unowned slots.
    pub fn register(&mut self, m: PhraseMatch) {
        for idx in m.start_idx..=m.end_idx {
            if idx >= self.owner.len() {
                break;
            }
            if self.owner[idx].is_none() {
                self.owner[idx] = Some(m.clone());
            }
        }
    }

    pub fn get(&self, idx: usize) -> Option<&PhraseMatch> {
        self.owner.get(idx)?.as_ref()
    }

    pub fn is_start_of(&self, idx: usize) -> bool {
        self.get(idx).is_some_and(|m| m.start_idx == idx)
    }

    pub fn is_end_of(&self, idx: usize) -> bool {
        self.get(idx).is_some_and(|m| m.end_idx == idx)
    }

    pub fn is_middle_of(&self, idx: usize) -> bool {
        self.get(idx)
            .is_some_and(|m| m.length >= 3 && idx > m.start_idx && idx < m.end_idx)
    }
}

/// Run `matcher` from every non-whitespace token index and feed every match
/// found into `membership`, capping each trie prefix enumeration at
/// `max_prefix_enumeration` results.
pub fn fill_phrases(
    trie: &Trie<u32>,
    ts: &TokenizedString,
    normalized: bool,
    membership: &mut PhraseMembership,
    max_prefix_enumeration: usize,
) {
    let matcher = PhraseMatcher::with_max_prefix_enumeration(trie, ts, normalized, max_prefix_enumeration);
    for (idx, token) in ts.tokens.iter().enumerate() {
        if token.is_whitespace() {
            continue;
        }
        for m in matcher.search_tokens(idx) {
            membership.register(m);
        }
    }
}
