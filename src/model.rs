//! Loaded model data and the model-directory loader (`spec.md` §4.K).
//!
//! Reference upstream implementation: generalized from the teacher's
//! `Model { lexicon: Arc<Lexicon>, word_bigram: Arc<WordBigram>, ... }`
//! optional-subsystem loading in `lib.rs` — every auxiliary resource beyond
//! the one required file is loaded if present and skipped (logged, not
//! errored) if absent.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::crf::Crf;
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::reader::ByteReader;
use crate::trie::Trie;

/// Bit flags for dictionary-phrase component types (`spec.md` §4.I).
pub mod dictionary_bits {
    pub const ROAD: u16 = 1 << 0;
    pub const UNIT: u16 = 1 << 1;
    pub const LEVEL: u16 = 1 << 2;
    pub const PO_BOX: u16 = 1 << 3;
    pub const ENTRANCE: u16 = 1 << 4;
    pub const STAIRCASE: u16 = 1 << 5;
    pub const HOUSE: u16 = 1 << 6;
    pub const NAME: u16 = 1 << 7;
    pub const CATEGORY: u16 = 1 << 8;

    /// Name used in feature strings for a single set bit, in fixed iteration
    /// order matching the spec's enumeration.
    pub const ALL: &[(u16, &str)] = &[
        (ROAD, "street"),
        (UNIT, "unit"),
        (LEVEL, "level"),
        (PO_BOX, "po_box"),
        (ENTRANCE, "entrance"),
        (STAIRCASE, "staircase"),
        (HOUSE, "house"),
        (NAME, "name"),
        (CATEGORY, "category"),
    ];
}

/// Bit flags for administrative-boundary component types, in the
/// enumeration order fixed by `spec.md` §4.I (note: this order differs from
/// the `most_common_ordinal` decode table in §9 — Island and StateDistrict
/// swap positions between the two encodings; both are reproduced verbatim
/// from the spec).
pub mod boundary_bits {
    pub const SUBURB: u16 = 1 << 0;
    pub const CITY_DISTRICT: u16 = 1 << 1;
    pub const CITY: u16 = 1 << 2;
    pub const ISLAND: u16 = 1 << 3;
    pub const STATE_DISTRICT: u16 = 1 << 4;
    pub const STATE: u16 = 1 << 5;
    pub const COUNTRY_REGION: u16 = 1 << 6;
    pub const COUNTRY: u16 = 1 << 7;
    pub const WORLD_REGION: u16 = 1 << 8;

    pub const ALL: &[(u16, &str)] = &[
        (SUBURB, "suburb"),
        (CITY_DISTRICT, "city_district"),
        (CITY, "city"),
        (ISLAND, "island"),
        (STATE_DISTRICT, "state_district"),
        (STATE, "state"),
        (COUNTRY_REGION, "country_region"),
        (COUNTRY, "country"),
        (WORLD_REGION, "world_region"),
    ];

    /// Fixed `most_common_ordinal` decode table from `spec.md` §9:
    /// `{0:None, 1:Suburb, 2:CityDistrict, 3:City, 4:StateDistrict, 5:Island,
    /// 6:State, 7:CountryRegion, 8:Country, 9:WorldRegion}`.
    pub fn ordinal_to_bit(ordinal: u16) -> Option<u16> {
        match ordinal {
            1 => Some(SUBURB),
            2 => Some(CITY_DISTRICT),
            3 => Some(CITY),
            4 => Some(STATE_DISTRICT),
            5 => Some(ISLAND),
            6 => Some(STATE),
            7 => Some(COUNTRY_REGION),
            8 => Some(COUNTRY),
            9 => Some(WORLD_REGION),
            _ => None,
        }
    }
}

/// Per-phrase administrative-boundary metadata for component phrases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentPhraseTypes {
    pub components: u16,
    pub most_common: u16,
}

/// Every resource a loaded model may carry. Immutable after construction;
/// shared behind an `Arc` across concurrent `parse` calls (`spec.md` §5).
pub struct AddressParserModel {
    pub crf: Crf,
    pub vocabulary: Trie<u32>,
    pub phrases: Option<Trie<u32>>,
    pub phrase_types: Option<Vec<u16>>,
    pub postal_codes: Option<Trie<u32>>,
    pub postal_code_graph: Option<Graph>,
    pub component_phrases: Option<Trie<u32>>,
    pub component_phrase_types: Option<Vec<ComponentPhraseTypes>>,
}

const CRF_FILE: &str = "address_parser_crf.dat";
const VOCAB_FILE: &str = "address_parser_vocab.trie";
const PHRASES_FILE: &str = "address_parser_phrases.dat";
const POSTAL_CODES_FILE: &str = "address_parser_postal_codes.dat";
const COMPONENTS_FILE: &str = "address_parser_components.dat";

fn read_optional(dir: &Path, name: &str) -> Result<Option<Vec<u8>>> {
    let path = dir.join(name);
    if !path.exists() {
        debug!(file = name, "optional model file not present, feature disabled");
        return Ok(None);
    }
    Ok(Some(std::fs::read(&path)?))
}

fn read_required(dir: &Path, name: &str) -> Result<Vec<u8>> {
    let path = dir.join(name);
    if !path.exists() {
        warn!(file = name, "required model file missing");
        return Err(Error::MissingRequiredFile(path));
    }
    Ok(std::fs::read(&path)?)
}

/// Parse a phrase container: `u32 trie_len, trie_len trie bytes, u32
/// array_len, array_len * u16 phrase-type bitset`.
fn parse_phrase_container(bytes: &[u8]) -> Result<(Trie<u32>, Vec<u16>)> {
    let mut r = ByteReader::new(bytes);
    let trie_len = r.read_u32()? as usize;
    let trie_bytes = r.read_bytes(trie_len)?;
    let trie = Trie::load(trie_bytes)?;
    let array_len = r.read_u32()? as usize;
    let mut types = Vec::with_capacity(array_len);
    for _ in 0..array_len {
        types.push(r.read_u16()?);
    }
    Ok((trie, types))
}

/// Parse a component-phrase container: same trie framing, but the trailing
/// array is `(components: u16, most_common: u16)` pairs.
fn parse_component_container(bytes: &[u8]) -> Result<(Trie<u32>, Vec<ComponentPhraseTypes>)> {
    let mut r = ByteReader::new(bytes);
    let trie_len = r.read_u32()? as usize;
    let trie_bytes = r.read_bytes(trie_len)?;
    let trie = Trie::load(trie_bytes)?;
    let array_len = r.read_u32()? as usize;
    let mut types = Vec::with_capacity(array_len);
    for _ in 0..array_len {
        let components = r.read_u16()?;
        let most_common = r.read_u16()?;
        types.push(ComponentPhraseTypes { components, most_common });
    }
    Ok((trie, types))
}

/// Parse a postal-code container: `u32 trie_len, trie_len trie bytes,
/// remaining bytes are a `Graph::load` payload`.
fn parse_postal_container(bytes: &[u8]) -> Result<(Trie<u32>, Graph)> {
    let mut r = ByteReader::new(bytes);
    let trie_len = r.read_u32()? as usize;
    let trie_bytes = r.read_bytes(trie_len)?;
    let trie = Trie::load(trie_bytes)?;
    let rest_start = r.position();
    let graph = Graph::load(&bytes[rest_start..])?;
    Ok((trie, graph))
}

impl AddressParserModel {
    /// Load a model directory. Only `address_parser_crf.dat` is required;
    /// every other file is optional and absence degrades the corresponding
    /// feature family rather than failing the load.
    pub fn load_from_directory(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(Error::DirectoryNotFound(PathBuf::from(dir)));
        }

        let crf_bytes = read_required(dir, CRF_FILE)?;
        let crf = Crf::load(&crf_bytes)?;

        let vocabulary = match read_optional(dir, VOCAB_FILE)? {
            Some(bytes) => Trie::load(&bytes)?,
            None => Trie::new(),
        };

        let (phrases, phrase_types) = match read_optional(dir, PHRASES_FILE)? {
            Some(bytes) => {
                let (trie, types) = parse_phrase_container(&bytes)?;
                (Some(trie), Some(types))
            }
            None => (None, None),
        };

        let (postal_codes, postal_code_graph) = match read_optional(dir, POSTAL_CODES_FILE)? {
            Some(bytes) => {
                let (trie, graph) = parse_postal_container(&bytes)?;
                (Some(trie), Some(graph))
            }
            None => (None, None),
        };

        let (component_phrases, component_phrase_types) = match read_optional(dir, COMPONENTS_FILE)? {
            Some(bytes) => {
                let (trie, types) = parse_component_container(&bytes)?;
                (Some(trie), Some(types))
            }
            None => (None, None),
        };

        info!(
            labels = crf.num_labels(),
            vocabulary = vocabulary.len(),
            has_phrases = phrases.is_some(),
            has_postal_codes = postal_codes.is_some(),
            has_component_phrases = component_phrases.is_some(),
            "loaded address parser model"
        );

        Ok(Self {
            crf,
            vocabulary,
            phrases,
            phrase_types,
            postal_codes,
            postal_code_graph,
            component_phrases,
            component_phrase_types,
        })
    }

    /// Look up a dictionary phrase's type bitset by phrase id, if loaded.
    pub fn phrase_type(&self, phrase_id: u32) -> Option<u16> {
        self.phrase_types.as_ref()?.get(phrase_id as usize).copied()
    }

    /// Look up a component phrase's boundary metadata by phrase id, if
    /// loaded.
    pub fn component_phrase_type(&self, phrase_id: u32) -> Option<ComponentPhraseTypes> {
        self.component_phrase_types.as_ref()?.get(phrase_id as usize).copied()
    }
}
