//! Token and TokenizedString data model.
//!
//! Reference upstream implementation: `spec.md` §3/§6. The token kinds are
//! named after the external tokenizer contract; the concrete producer lives
//! in [`crate::tokenizer`].

/// The structural kind of a single token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Word,
    Abbreviation,
    Acronym,
    Numeric,
    Whitespace,
    Newline,
    Comma,
    Punctuation,
}

impl TokenKind {
    pub fn is_whitespace(self) -> bool {
        matches!(self, TokenKind::Whitespace | TokenKind::Newline)
    }
}

/// A single immutable token produced by tokenization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub kind: TokenKind,
    pub byte_offset: usize,
    pub byte_length: usize,
}

impl Token {
    pub fn new(text: impl Into<String>, kind: TokenKind, byte_offset: usize) -> Self {
        let text = text.into();
        let byte_length = text.len();
        Self {
            text,
            kind,
            byte_offset,
            byte_length,
        }
    }

    pub fn is_whitespace(&self) -> bool {
        self.kind.is_whitespace()
    }

    pub fn is_comma(&self) -> bool {
        matches!(self.kind, TokenKind::Comma)
    }
}

/// An ordered sequence of tokens covering the original source string.
#[derive(Debug, Clone)]
pub struct TokenizedString {
    pub source: String,
    pub tokens: Vec<Token>,
}

impl TokenizedString {
    pub fn new(source: impl Into<String>, tokens: Vec<Token>) -> Self {
        Self {
            source: source.into(),
            tokens,
        }
    }

    /// Iterate over all tokens, skipping whitespace/newline.
    pub fn non_whitespace(&self) -> impl Iterator<Item = (usize, &Token)> {
        self.tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.is_whitespace())
    }

    /// Number of non-whitespace tokens.
    pub fn non_whitespace_count(&self) -> usize {
        self.non_whitespace().count()
    }

    /// Map a token index (into `self.tokens`) to its position among
    /// non-whitespace tokens only, if it is one.
    pub fn non_whitespace_index_of(&self, token_index: usize) -> Option<usize> {
        if self.tokens.get(token_index)?.is_whitespace() {
            return None;
        }
        Some(
            self.tokens[..token_index]
                .iter()
                .filter(|t| !t.is_whitespace())
                .count(),
        )
    }
}
