//! Symbol vocabulary.
//!
//! A Vocabulary is an immutable bijection between symbol tokens and dense
//! ids `0..n`. It is built once from the corpus, persisted as a JSON
//! object (`token -> id`), and reloaded read-only by training and
//! generation. The fingerprint ties a trained model to the mapping it was
//! trained with.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{MelodyError, Result};
use crate::types::Symbol;

/// Bijective mapping between symbols and ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    symbols: Vec<Symbol>,
    ids: HashMap<Symbol, usize>,
}

impl Vocabulary {
    /// Builds a vocabulary from symbols, assigning ids in order of first
    /// appearance.
    pub fn from_symbols<'a>(symbols: impl IntoIterator<Item = &'a Symbol>) -> Self {
        let mut vocab = Self {
            symbols: Vec::new(),
            ids: HashMap::new(),
        };
        for symbol in symbols {
            if !vocab.ids.contains_key(symbol) {
                vocab.ids.insert(*symbol, vocab.symbols.len());
                vocab.symbols.push(*symbol);
            }
        }
        vocab
    }

    /// Returns the number of symbols.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Returns the id of a symbol.
    pub fn id_of(&self, symbol: &Symbol) -> Result<usize> {
        self.ids
            .get(symbol)
            .copied()
            .ok_or_else(|| MelodyError::unknown_symbol(&symbol.to_string()))
    }

    /// Returns the id of a textual token.
    pub fn id_of_token(&self, token: &str) -> Result<usize> {
        let symbol: Symbol = token
            .parse()
            .map_err(|_| MelodyError::unknown_symbol(token))?;
        self.id_of(&symbol)
    }

    /// Returns the symbol for an id.
    pub fn symbol_of(&self, id: usize) -> Result<Symbol> {
        self.symbols
            .get(id)
            .copied()
            .ok_or_else(|| MelodyError::unknown_id(id, self.len()))
    }

    /// Returns true if the symbol has an id.
    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.ids.contains_key(symbol)
    }

    /// Maps a symbol sequence to ids.
    pub fn encode(&self, symbols: &[Symbol]) -> Result<Vec<usize>> {
        symbols.iter().map(|s| self.id_of(s)).collect()
    }

    /// Maps an id sequence back to symbols.
    pub fn decode(&self, ids: &[usize]) -> Result<Vec<Symbol>> {
        ids.iter().map(|&id| self.symbol_of(id)).collect()
    }

    /// Symbols in id order.
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Computes a short, stable fingerprint of the id assignment.
    ///
    /// The fingerprint is the first 16 hex characters of the SHA256 hash of
    /// the tokens in id order, newline-separated.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for symbol in &self.symbols {
            hasher.update(symbol.to_string().as_bytes());
            hasher.update(b"\n");
        }
        let digest = hasher.finalize();
        hex::encode(&digest[..8])
    }

    /// Serializes to a pretty JSON object `token -> id` with sorted keys.
    pub fn to_json(&self) -> Result<String> {
        let mapping: BTreeMap<String, usize> = self
            .symbols
            .iter()
            .enumerate()
            .map(|(id, s)| (s.to_string(), id))
            .collect();
        serde_json::to_string_pretty(&mapping).map_err(|e| {
            MelodyError::with_source(
                crate::error::ErrorCode::InvalidArtifact,
                "Failed to serialize vocabulary",
                e,
            )
        })
    }

    /// Parses a JSON mapping, validating that ids are exactly `0..n`.
    pub fn from_json(json: &str) -> Result<Self> {
        let mapping: HashMap<String, usize> = serde_json::from_str(json).map_err(|e| {
            MelodyError::with_source(
                crate::error::ErrorCode::InvalidArtifact,
                "Failed to parse vocabulary mapping",
                e,
            )
        })?;

        let n = mapping.len();
        let mut slots: Vec<Option<Symbol>> = vec![None; n];
        for (token, id) in &mapping {
            let symbol: Symbol = token.parse().map_err(|_| {
                MelodyError::invalid_artifact(format!("invalid token '{}' in mapping", token))
            })?;
            let slot = slots.get_mut(*id).ok_or_else(|| {
                MelodyError::invalid_artifact(format!(
                    "id {} for '{}' is outside 0..{}",
                    id, token, n
                ))
            })?;
            if slot.is_some() {
                return Err(MelodyError::invalid_artifact(format!(
                    "id {} is assigned twice",
                    id
                )));
            }
            *slot = Some(symbol);
        }

        // n distinct in-range ids over n slots fill every slot.
        let symbols: Vec<Symbol> = slots.into_iter().flatten().collect();
        let ids = symbols.iter().enumerate().map(|(i, s)| (*s, i)).collect::<HashMap<_, _>>();
        if ids.len() != symbols.len() {
            return Err(MelodyError::invalid_artifact(
                "two tokens in the mapping denote the same symbol",
            ));
        }
        Ok(Self { symbols, ids })
    }

    /// Writes the mapping file.
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?).map_err(|e| MelodyError::io(path, e))
    }

    /// Reads a mapping file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(MelodyError::missing_artifact(path));
        }
        let json = std::fs::read_to_string(path).map_err(|e| MelodyError::io(path, e))?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::types::parse_symbols;

    fn corpus_vocab() -> Vocabulary {
        let symbols = parse_symbols("60 _ 62 _ r _ 60 _ / / / /").unwrap();
        Vocabulary::from_symbols(&symbols)
    }

    #[test]
    fn ids_follow_first_appearance() {
        let vocab = corpus_vocab();
        assert_eq!(vocab.len(), 5);
        assert_eq!(vocab.id_of(&Symbol::Pitch(60)).unwrap(), 0);
        assert_eq!(vocab.id_of(&Symbol::Hold).unwrap(), 1);
        assert_eq!(vocab.id_of(&Symbol::Pitch(62)).unwrap(), 2);
        assert_eq!(vocab.id_of(&Symbol::Rest).unwrap(), 3);
        assert_eq!(vocab.id_of(&Symbol::Delimiter).unwrap(), 4);
    }

    #[test]
    fn bijective() {
        let vocab = corpus_vocab();
        for symbol in vocab.symbols() {
            let id = vocab.id_of(symbol).unwrap();
            assert_eq!(vocab.symbol_of(id).unwrap(), *symbol);
        }
        for id in 0..vocab.len() {
            assert_eq!(vocab.id_of(&vocab.symbol_of(id).unwrap()).unwrap(), id);
        }
    }

    #[test]
    fn unknown_lookups() {
        let vocab = corpus_vocab();
        assert_eq!(
            vocab.id_of(&Symbol::Pitch(99)).unwrap_err().code,
            ErrorCode::Lookup
        );
        assert_eq!(vocab.id_of_token("xyz").unwrap_err().code, ErrorCode::Lookup);
        assert_eq!(vocab.symbol_of(5).unwrap_err().code, ErrorCode::Lookup);
    }

    #[test]
    fn json_round_trip() {
        let vocab = corpus_vocab();
        let json = vocab.to_json().unwrap();
        assert!(json.contains("\"60\": 0"));
        let reloaded = Vocabulary::from_json(&json).unwrap();
        assert_eq!(reloaded, vocab);
        assert_eq!(reloaded.fingerprint(), vocab.fingerprint());
    }

    #[test]
    fn rejects_non_contiguous_ids() {
        let err = Vocabulary::from_json(r#"{"60": 0, "_": 2}"#).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidArtifact);

        let err = Vocabulary::from_json(r#"{"60": 0, "_": 0}"#).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidArtifact);

        let err = Vocabulary::from_json(r#"{"sixty": 0}"#).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidArtifact);
    }

    #[test]
    fn fingerprint_depends_on_order() {
        let a = Vocabulary::from_symbols(&[Symbol::Rest, Symbol::Hold]);
        let b = Vocabulary::from_symbols(&[Symbol::Hold, Symbol::Rest]);
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 16);
    }

    #[test]
    fn load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Vocabulary::load(&dir.path().join("mapping.json")).unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingArtifact);
    }
}
