//! Parser context: runs the three phrase matchers over one tokenized input
//! and caches their memberships (`spec.md` §2 component H).

use crate::phrase::{fill_phrases, PhraseMembership};
use crate::token::TokenizedString;
use crate::trie::Trie;

/// Which of the three phrase layers owns a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhraseLayer {
    Dictionary,
    Component,
    PostalCode,
}

/// Scratch state for one `parse` call: runs `fill_phrases` against whichever
/// of the dictionary/component/postal-code tries are present in the loaded
/// model, and caches the resulting [`PhraseMembership`]s for the feature
/// extractor to consult. Owned exclusively by the call that creates it —
/// never stored on `AddressParser` (see `spec.md` §5).
pub struct AddressParserContext<'a> {
    ts: &'a TokenizedString,
    pub dictionary: PhraseMembership,
    pub component: PhraseMembership,
    pub postal_code: PhraseMembership,
}

impl<'a> AddressParserContext<'a> {
    pub fn new(ts: &'a TokenizedString) -> Self {
        let n = ts.tokens.len();
        Self {
            ts,
            dictionary: PhraseMembership::new(n),
            component: PhraseMembership::new(n),
            postal_code: PhraseMembership::new(n),
        }
    }

    /// Run every available phrase trie against the tokenized string, filling
    /// the corresponding membership. Absent tries (model feature not
    /// loaded) leave their membership empty, which the feature extractor
    /// must tolerate. `max_prefix_enumeration` caps each trie prefix
    /// enumeration performed along the way (`ParserConfig`'s defensive knob).
    pub fn fill_phrases(
        &mut self,
        dictionary_trie: Option<&Trie<u32>>,
        component_trie: Option<&Trie<u32>>,
        postal_code_trie: Option<&Trie<u32>>,
        max_prefix_enumeration: usize,
    ) {
        if let Some(trie) = dictionary_trie {
            fill_phrases(trie, self.ts, true, &mut self.dictionary, max_prefix_enumeration);
        }
        if let Some(trie) = component_trie {
            fill_phrases(trie, self.ts, true, &mut self.component, max_prefix_enumeration);
        }
        if let Some(trie) = postal_code_trie {
            fill_phrases(trie, self.ts, true, &mut self.postal_code, max_prefix_enumeration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::{DefaultTokenizer, Tokenizer};

    #[test]
    fn absent_tries_leave_empty_memberships() {
        let ts = DefaultTokenizer.tokenize("123 main street");
        let mut ctx = AddressParserContext::new(&ts);
        ctx.fill_phrases(None, None, None, usize::MAX);
        assert!(ctx.dictionary.get(0).is_none());
        assert!(ctx.component.get(0).is_none());
        assert!(ctx.postal_code.get(0).is_none());
    }

    #[test]
    fn fills_dictionary_membership_from_trie() {
        let mut trie = Trie::new();
        trie.insert("main street", 1).unwrap();
        let ts = DefaultTokenizer.tokenize("main street brooklyn");
        let mut ctx = AddressParserContext::new(&ts);
        ctx.fill_phrases(Some(&trie), None, None, usize::MAX);
        assert!(ctx.dictionary.get(0).is_some());
        assert!(ctx.dictionary.get(0).unwrap().phrase_id == 1);
    }
}
