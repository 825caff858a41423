//! Growable word vocabulary with JSON persistence.
//!
//! A [`Vocabulary`] maps normalized words to integer IDs in both directions.
//! IDs `0..=4` are reserved for the special tokens in [`special_tokens`];
//! new words receive the next free ID until the configured capacity is
//! reached.
//!
//! # Capacity Fallback
//!
//! Once `next_id` reaches `vocab_size`, a new word is still inserted but its
//! ID is derived from [`stable_hash`]:
//!
//! ```text
//! id = fnv1a64(word) % (vocab_size - 5) + 5
//! ```
//!
//! The slot is not checked for prior use, so two words can share an ID and
//! the later one wins in `id_to_word`. Decoding such an ID is lossy.
//!
//! # Snapshot Format
//!
//! ```text
//! {
//!   "word_to_id": { "<PAD>": 0, ..., "hello": 5 },
//!   "id_to_word": { "0": "<PAD>", ..., "5": "hello" },
//!   "vocab_size": 60000,
//!   "next_id": 6
//! }
//! ```
//!
//! `id_to_word` keys are decimal strings. `vocab_size` and `next_id` are
//! optional on load and default to the number of `word_to_id` entries.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reserved token IDs present in every vocabulary.
pub mod special_tokens {
    pub const PAD: u32 = 0;
    pub const EOS: u32 = 1;
    pub const UNK: u32 = 2;
    pub const SEP: u32 = 3;
    pub const BOS: u32 = 4;

    /// Number of reserved IDs; the first ordinary word gets this ID.
    pub const NUM_SPECIAL_TOKENS: u32 = 5;

    /// Surface strings of the reserved tokens, indexed by ID.
    pub const SPECIAL_TOKEN_STRINGS: [&str; NUM_SPECIAL_TOKENS as usize] =
        ["<PAD>", "<EOS>", "<UNK>", "<SEP>", "<BOS>"];
}

use special_tokens::{NUM_SPECIAL_TOKENS, SPECIAL_TOKEN_STRINGS};

/// Default capacity for sequential ID assignment.
pub const DEFAULT_VOCAB_SIZE: u32 = 60_000;

const FNV1A_OFFSET: u64 = 0xcbf29ce484222325;
const FNV1A_PRIME: u64 = 0x100000001b3;

/// Errors that can occur when saving or loading a vocabulary snapshot.
#[derive(Error, Debug)]
pub enum VocabError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Invalid vocabulary JSON: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Invalid vocabulary entry: {0}")]
    ParseError(String),
}

/// 64-bit FNV-1a hash of `bytes`.
///
/// Unseeded, so the overflow IDs it produces are identical across runs and platforms.
pub fn stable_hash(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV1A_OFFSET, |hash, &byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV1A_PRIME)
    })
}

#[derive(Serialize)]
struct SnapshotOut<'a> {
    word_to_id: BTreeMap<&'a str, u32>,
    id_to_word: BTreeMap<u32, &'a str>,
    vocab_size: u32,
    next_id: u32,
}

#[derive(Deserialize)]
struct SnapshotIn {
    word_to_id: FxHashMap<String, u32>,
    id_to_word: FxHashMap<String, String>,
    #[serde(default)]
    vocab_size: Option<u32>,
    #[serde(default)]
    next_id: Option<u32>,
}

/// Bidirectional word/ID table with a capacity-bounded ID counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    word_to_id: FxHashMap<String, u32>,
    id_to_word: FxHashMap<u32, String>,
    next_id: u32,
    vocab_size: u32,
}

impl Vocabulary {
    /// Create a vocabulary holding only the special tokens.
    pub fn new(vocab_size: u32) -> Self {
        let mut word_to_id = FxHashMap::default();
        let mut id_to_word = FxHashMap::default();
        for (id, token) in (0u32..).zip(SPECIAL_TOKEN_STRINGS) {
            word_to_id.insert(token.to_string(), id);
            id_to_word.insert(id, token.to_string());
        }

        Self {
            word_to_id,
            id_to_word,
            next_id: NUM_SPECIAL_TOKENS,
            vocab_size,
        }
    }

    /// Return the ID of `word`, assigning one if it has not been seen.
    ///
    /// While `next_id < vocab_size` the next sequential ID is used. After
    /// that the ID comes from [`stable_hash`] and may collide with another
    /// word's; the colliding `id_to_word` entry is overwritten.
    pub fn lookup_or_assign(&mut self, word: &str) -> u32 {
        if let Some(&id) = self.word_to_id.get(word) {
            return id;
        }

        let id = if self.next_id < self.vocab_size {
            let id = self.next_id;
            self.next_id += 1;
            if self.next_id == self.vocab_size {
                log::debug!(
                    "vocabulary reached capacity ({}), new words now use hashed IDs",
                    self.vocab_size
                );
            }
            id
        } else {
            self.hashed_id(word)
        };

        self.word_to_id.insert(word.to_string(), id);
        if let Some(previous) = self.id_to_word.insert(id, word.to_string()) {
            log::trace!("hashed ID {} reassigned from {:?} to {:?}", id, previous, word);
        }
        id
    }

    fn hashed_id(&self, word: &str) -> u32 {
        let range = u64::from(self.vocab_size.saturating_sub(NUM_SPECIAL_TOKENS).max(1));
        // The remainder is below `range`, which fits in u32.
        (stable_hash(word.as_bytes()) % range) as u32 + NUM_SPECIAL_TOKENS
    }

    /// Look up a word without assigning.
    pub fn get_id(&self, word: &str) -> Option<u32> {
        self.word_to_id.get(word).copied()
    }

    /// Look up the word currently stored for `id`.
    pub fn get_word(&self, id: u32) -> Option<&str> {
        self.id_to_word.get(&id).map(String::as_str)
    }

    /// Number of words, including special tokens and hash-fallback words.
    pub fn len(&self) -> usize {
        self.word_to_id.len()
    }

    /// Always false once constructed, since special tokens are seeded.
    pub fn is_empty(&self) -> bool {
        self.word_to_id.is_empty()
    }

    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    pub fn vocab_size(&self) -> u32 {
        self.vocab_size
    }

    /// Forward map (word -> ID).
    pub fn word_to_id(&self) -> &FxHashMap<String, u32> {
        &self.word_to_id
    }

    /// Reverse map (ID -> word).
    pub fn id_to_word(&self) -> &FxHashMap<u32, String> {
        &self.id_to_word
    }

    // -- Persistence --------------------------------------------------------

    /// Serialize to the pretty-printed snapshot format.
    pub fn to_json(&self) -> Result<String, VocabError> {
        let snapshot = SnapshotOut {
            word_to_id: self
                .word_to_id
                .iter()
                .map(|(word, &id)| (word.as_str(), id))
                .collect(),
            id_to_word: self
                .id_to_word
                .iter()
                .map(|(&id, word)| (id, word.as_str()))
                .collect(),
            vocab_size: self.vocab_size,
            next_id: self.next_id,
        };
        Ok(serde_json::to_string_pretty(&snapshot)?)
    }

    /// Parse a snapshot produced by [`to_json`](Self::to_json) or written by hand.
    pub fn from_json(data: &str) -> Result<Self, VocabError> {
        let SnapshotIn {
            word_to_id,
            id_to_word,
            vocab_size,
            next_id,
        } = serde_json::from_str(data)?;

        let id_to_word = id_to_word
            .into_iter()
            .map(|(key, word)| {
                key.trim()
                    .parse::<u32>()
                    .map(|id| (id, word))
                    .map_err(|_| VocabError::ParseError(format!("invalid token ID key: {:?}", key)))
            })
            .collect::<Result<FxHashMap<_, _>, _>>()?;

        let derived = u32::try_from(word_to_id.len()).map_err(|_| {
            VocabError::ParseError(format!("too many words: {}", word_to_id.len()))
        })?;

        Ok(Self {
            word_to_id,
            id_to_word,
            next_id: next_id.unwrap_or(derived),
            vocab_size: vocab_size.unwrap_or(derived),
        })
    }

    /// Write a snapshot to `path`.
    ///
    /// The data goes to a sibling temporary file that is then renamed over
    /// `path`, so an existing snapshot is untouched if the write fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), VocabError> {
        let json = self.to_json()?;
        write_replacing(path.as_ref(), json.as_bytes())?;
        Ok(())
    }

    /// Read a snapshot from `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, VocabError> {
        let data = fs::read_to_string(path)?;
        Self::from_json(&data)
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new(DEFAULT_VOCAB_SIZE)
    }
}

fn temp_path(path: &Path) -> io::Result<PathBuf> {
    let name = path.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("not a file path: {}", path.display()),
        )
    })?;
    let mut tmp_name = std::ffi::OsString::from(".");
    tmp_name.push(name);
    tmp_name.push(".tmp");
    Ok(path.with_file_name(tmp_name))
}

fn write_replacing(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = temp_path(path)?;
    let result = File::create(&tmp).and_then(|file| {
        let mut writer = BufWriter::new(file);
        writer.write_all(bytes)?;
        writer.flush()?;
        drop(writer);
        fs::rename(&tmp, path)
    });
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::special_tokens::*;
    use super::*;

    #[test]
    fn test_new_has_special_tokens() {
        let vocab = Vocabulary::new(100);
        assert_eq!(vocab.len(), 5);
        assert_eq!(vocab.next_id(), 5);
        assert_eq!(vocab.get_id("<PAD>"), Some(PAD));
        assert_eq!(vocab.get_id("<EOS>"), Some(EOS));
        assert_eq!(vocab.get_id("<UNK>"), Some(UNK));
        assert_eq!(vocab.get_id("<SEP>"), Some(SEP));
        assert_eq!(vocab.get_id("<BOS>"), Some(BOS));
        assert_eq!(vocab.get_word(EOS), Some("<EOS>"));
    }

    #[test]
    fn test_lookup_is_idempotent() {
        let mut vocab = Vocabulary::new(100);
        let first = vocab.lookup_or_assign("hello");
        let next = vocab.next_id();
        let second = vocab.lookup_or_assign("hello");
        assert_eq!(first, second);
        assert_eq!(vocab.next_id(), next);
    }

    #[test]
    fn test_sequential_ids_are_dense() {
        let mut vocab = Vocabulary::new(100);
        let ids: Vec<u32> = ["a", "b", "c", "a", "d"]
            .iter()
            .map(|w| vocab.lookup_or_assign(w))
            .collect();
        assert_eq!(ids, vec![5, 6, 7, 5, 8]);
        assert_eq!(vocab.next_id(), 9);
        assert_eq!(vocab.get_word(7), Some("c"));
    }

    #[test]
    fn test_hash_fallback_when_full() {
        let mut vocab = Vocabulary::new(7);
        assert_eq!(vocab.lookup_or_assign("one"), 5);
        assert_eq!(vocab.lookup_or_assign("two"), 6);
        assert_eq!(vocab.next_id(), 7);

        let id = vocab.lookup_or_assign("three");
        let expected = (stable_hash(b"three") % 2) as u32 + 5;
        assert_eq!(id, expected);
        assert_eq!(vocab.next_id(), 7);
        // The word is still recorded even though the ID range is exhausted.
        assert_eq!(vocab.len(), 8);
        assert_eq!(vocab.get_id("three"), Some(id));
        assert_eq!(vocab.get_word(id), Some("three"));
    }

    #[test]
    fn test_hash_fallback_overwrites_reverse_entry() {
        // A single hash slot forces every overflow word onto ID 5.
        let mut vocab = Vocabulary::new(6);
        assert_eq!(vocab.lookup_or_assign("first"), 5);
        assert_eq!(vocab.lookup_or_assign("second"), 5);
        assert_eq!(vocab.get_id("first"), Some(5));
        assert_eq!(vocab.get_id("second"), Some(5));
        assert_eq!(vocab.get_word(5), Some("second"));
        assert_eq!(vocab.len(), 7);
    }

    #[test]
    fn test_tiny_capacity_does_not_panic() {
        let mut vocab = Vocabulary::new(0);
        assert_eq!(vocab.lookup_or_assign("word"), 5);
        assert_eq!(vocab.lookup_or_assign("other"), 5);
    }

    #[test]
    fn test_stable_hash_known_values() {
        assert_eq!(stable_hash(b""), 0xcbf29ce484222325);
        assert_eq!(stable_hash(b"a"), 0xaf63dc4c8601ec8c);
        assert_eq!(stable_hash(b"foobar"), 0x85944171f73967e8);
    }

    #[test]
    fn test_json_roundtrip() {
        let mut vocab = Vocabulary::new(8);
        for word in ["merhaba", "dünya", "здравей", "x", "y", "z"] {
            vocab.lookup_or_assign(word);
        }
        let json = vocab.to_json().unwrap();
        let restored = Vocabulary::from_json(&json).unwrap();
        assert_eq!(restored, vocab);
    }

    #[test]
    fn test_json_keeps_non_ascii_literal() {
        let mut vocab = Vocabulary::new(100);
        vocab.lookup_or_assign("çiçek");
        let json = vocab.to_json().unwrap();
        assert!(json.contains("\"çiçek\""));
        assert!(json.contains("\"5\": \"çiçek\""));
    }

    #[test]
    fn test_from_json_derives_missing_counters() {
        let data = r#"{
            "word_to_id": {"<PAD>": 0, "<EOS>": 1, "<UNK>": 2, "<SEP>": 3, "<BOS>": 4, "hi": 5},
            "id_to_word": {"0": "<PAD>", "1": "<EOS>", "2": "<UNK>", "3": "<SEP>", "4": "<BOS>", "5": "hi"}
        }"#;
        let vocab = Vocabulary::from_json(data).unwrap();
        assert_eq!(vocab.len(), 6);
        assert_eq!(vocab.vocab_size(), 6);
        assert_eq!(vocab.next_id(), 6);
        assert_eq!(vocab.get_word(5), Some("hi"));
    }

    #[test]
    fn test_from_json_rejects_bad_key() {
        let data = r#"{"word_to_id": {"a": 5}, "id_to_word": {"five": "a"}}"#;
        assert!(matches!(
            Vocabulary::from_json(data),
            Err(VocabError::ParseError(_))
        ));
    }

    #[test]
    fn test_from_json_rejects_malformed() {
        assert!(matches!(
            Vocabulary::from_json("{not json"),
            Err(VocabError::JsonError(_))
        ));
        assert!(matches!(
            Vocabulary::from_json(r#"{"word_to_id": {}}"#),
            Err(VocabError::JsonError(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = Vocabulary::load(dir.path().join("missing.json"));
        assert!(matches!(result, Err(VocabError::IoError(_))));
    }

    #[test]
    fn test_save_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocab.json");
        fs::write(&path, "old contents").unwrap();

        let mut vocab = Vocabulary::new(50);
        vocab.lookup_or_assign("fresh");
        vocab.save(&path).unwrap();

        assert_eq!(Vocabulary::load(&path).unwrap(), vocab);
        assert!(!dir.path().join(".vocab.json.tmp").exists());
    }
}
