use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::segmenter::segment;
use super::vocab::special_tokens::{BOS, EOS, NUM_SPECIAL_TOKENS, PAD, SEP, UNK};
use super::vocab::{VocabError, Vocabulary, DEFAULT_VOCAB_SIZE};

#[derive(Error, Debug)]
pub enum TokenizerError {
    #[error("Vocabulary error: {0}")]
    VocabError(#[from] VocabError),
}

/// Default target length for [`Tokenizer::encode`].
pub const DEFAULT_MAX_LENGTH: usize = 512;

/// IDs dropped by `decode` when `skip_special_tokens` is set. EOS is not
/// listed because decoding always stops there.
const SKIPPED_SPECIAL_IDS: [u32; 4] = [PAD, UNK, SEP, BOS];

/// Construction options for a [`Tokenizer`].
///
/// Deserializes with every field optional, so it can be embedded in a larger
/// config file:
///
/// ```
/// use alphapack::TokenizerConfig;
///
/// let config: TokenizerConfig = serde_json::from_str(r#"{"vocab_size": 1000}"#).unwrap();
/// assert_eq!(config.vocab_size, 1000);
/// assert!(config.vocab_path.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    /// Capacity ceiling for sequential ID assignment.
    pub vocab_size: u32,
    /// Snapshot to restore from if it exists. A missing file is not an error.
    pub vocab_path: Option<PathBuf>,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            vocab_size: DEFAULT_VOCAB_SIZE,
            vocab_path: None,
        }
    }
}

/// Whether `encode` pads short sequences up to `max_length`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Padding {
    /// Right-pad with PAD to exactly `max_length`.
    #[default]
    MaxLength,
    /// Leave sequences shorter than `max_length` as they are.
    DoNotPad,
}

/// Result of [`Tokenizer::encode`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Encoding {
    pub input_ids: Vec<u32>,
}

impl Encoding {
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }

    pub fn into_ids(self) -> Vec<u32> {
        self.input_ids
    }
}

/// Token IDs accepted by [`Tokenizer::decode`].
///
/// A nested batch is unwrapped to its first row; an empty batch decodes to
/// the empty string.
#[derive(Debug, Clone, Copy)]
pub enum TokenIds<'a> {
    Flat(&'a [u32]),
    Nested(&'a [Vec<u32>]),
}

impl<'a> TokenIds<'a> {
    fn as_flat(self) -> &'a [u32] {
        match self {
            TokenIds::Flat(ids) => ids,
            TokenIds::Nested(rows) => rows.first().map(Vec::as_slice).unwrap_or(&[]),
        }
    }
}

impl<'a> From<&'a [u32]> for TokenIds<'a> {
    fn from(ids: &'a [u32]) -> Self {
        TokenIds::Flat(ids)
    }
}

impl<'a, const N: usize> From<&'a [u32; N]> for TokenIds<'a> {
    fn from(ids: &'a [u32; N]) -> Self {
        TokenIds::Flat(ids)
    }
}

impl<'a> From<&'a Vec<u32>> for TokenIds<'a> {
    fn from(ids: &'a Vec<u32>) -> Self {
        TokenIds::Flat(ids)
    }
}

impl<'a> From<&'a [Vec<u32>]> for TokenIds<'a> {
    fn from(rows: &'a [Vec<u32>]) -> Self {
        TokenIds::Nested(rows)
    }
}

impl<'a> From<&'a Vec<Vec<u32>>> for TokenIds<'a> {
    fn from(rows: &'a Vec<Vec<u32>>) -> Self {
        TokenIds::Nested(rows)
    }
}

impl<'a> From<&'a Encoding> for TokenIds<'a> {
    fn from(encoding: &'a Encoding) -> Self {
        TokenIds::Flat(&encoding.input_ids)
    }
}

/// Word-level tokenizer with a vocabulary that grows as it encodes.
///
/// Each tokenizer owns its vocabulary, so independent instances (one per
/// language, say) never share IDs. The vocabulary sits behind a mutex:
/// `encode` takes the lock once per call, which keeps concurrent callers
/// from interleaving their lookup-then-insert steps.
///
/// # Example
///
/// ```
/// use alphapack::{Padding, Tokenizer};
///
/// let tokenizer = Tokenizer::default();
/// let encoding = tokenizer.encode("Hello, World!", 8, Padding::MaxLength);
/// assert_eq!(encoding.input_ids, vec![5, 6, 7, 8, 1, 0, 0, 0]);
/// assert_eq!(tokenizer.decode(&encoding, true), "hello , world !");
/// ```
pub struct Tokenizer {
    vocab: Mutex<Vocabulary>,
}

impl Tokenizer {
    /// Create a tokenizer from `config`.
    ///
    /// If `vocab_path` names an existing file it is loaded and its stored
    /// `vocab_size` replaces the configured one.
    ///
    /// # Errors
    /// Returns an error if the snapshot exists but cannot be read or parsed.
    pub fn new(config: TokenizerConfig) -> Result<Self, TokenizerError> {
        match config.vocab_path {
            Some(ref path) if path.exists() => Self::from_vocab_file(path),
            _ => Ok(Self::with_vocab_size(config.vocab_size)),
        }
    }

    /// Create a tokenizer with an empty vocabulary of the given capacity.
    pub fn with_vocab_size(vocab_size: u32) -> Self {
        log::info!(
            "new vocabulary: vocab_size={}, special_tokens={}",
            vocab_size,
            NUM_SPECIAL_TOKENS
        );
        Self::from_vocabulary(Vocabulary::new(vocab_size))
    }

    /// Create a tokenizer from a saved snapshot.
    ///
    /// Unlike [`TokenizerConfig::vocab_path`], a missing file is an error.
    pub fn from_vocab_file<P: AsRef<Path>>(path: P) -> Result<Self, TokenizerError> {
        let path = path.as_ref();
        let vocab = Vocabulary::load(path)?;
        log::info!("vocabulary loaded: {} ({} words)", path.display(), vocab.len());
        Ok(Self::from_vocabulary(vocab))
    }

    /// Wrap an existing vocabulary.
    pub fn from_vocabulary(vocab: Vocabulary) -> Self {
        Self {
            vocab: Mutex::new(vocab),
        }
    }

    /// Every mutation leaves the two maps consistent, so a poisoned lock is safe to reuse.
    fn vocab(&self) -> MutexGuard<'_, Vocabulary> {
        self.vocab.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -- Encoding -----------------------------------------------------------

    /// Split text into normalized word and punctuation tokens without assigning IDs.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        segment(text)
    }

    /// Encode `text` to exactly `max_length` IDs (or fewer with [`Padding::DoNotPad`]).
    ///
    /// Unseen words are added to the vocabulary. EOS is appended before
    /// truncation, so it is cut off when the words alone fill `max_length`.
    pub fn encode(&self, text: &str, max_length: usize, padding: Padding) -> Encoding {
        let tokens = segment(text);

        let mut ids = Vec::with_capacity(tokens.len() + 1);
        {
            let mut vocab = self.vocab();
            ids.extend(tokens.iter().map(|token| vocab.lookup_or_assign(token)));
        }
        ids.push(EOS);

        if ids.len() > max_length {
            ids.truncate(max_length);
        } else if padding == Padding::MaxLength {
            ids.resize(max_length, PAD);
        }

        Encoding { input_ids: ids }
    }

    /// Encode several texts in order with the same length settings.
    pub fn encode_batch<S: AsRef<str>>(
        &self,
        texts: &[S],
        max_length: usize,
        padding: Padding,
    ) -> Vec<Encoding> {
        texts
            .iter()
            .map(|text| self.encode(text.as_ref(), max_length, padding))
            .collect()
    }

    // -- Decoding -----------------------------------------------------------

    /// Decode IDs to space-joined words.
    ///
    /// Stops at the first EOS. IDs with no entry are rendered as `[id]`.
    /// Original spacing is not restored: `"hello, world"` decodes as
    /// `"hello , world"`.
    pub fn decode<'a, T: Into<TokenIds<'a>>>(&self, ids: T, skip_special_tokens: bool) -> String {
        let ids = ids.into().as_flat();
        let vocab = self.vocab();

        let mut words: Vec<String> = Vec::with_capacity(ids.len());
        for &id in ids {
            if id == EOS {
                break;
            }
            if skip_special_tokens && SKIPPED_SPECIAL_IDS.contains(&id) {
                continue;
            }
            match vocab.get_word(id) {
                Some(word) => words.push(word.to_string()),
                None => words.push(format!("[{}]", id)),
            }
        }

        words.join(" ")
    }

    /// Decode several ID lists in order.
    pub fn decode_batch(&self, token_lists: &[Vec<u32>], skip_special_tokens: bool) -> Vec<String> {
        token_lists
            .iter()
            .map(|ids| self.decode(ids, skip_special_tokens))
            .collect()
    }

    // -- Persistence --------------------------------------------------------

    /// Write the vocabulary snapshot to `path`.
    pub fn save_vocab<P: AsRef<Path>>(&self, path: P) -> Result<(), TokenizerError> {
        let path = path.as_ref();
        let vocab = self.vocab();
        vocab.save(path)?;
        log::info!("vocabulary saved: {} ({} words)", path.display(), vocab.len());
        Ok(())
    }

    /// Replace the vocabulary with the snapshot at `path`.
    ///
    /// On error the current vocabulary is left as it was.
    pub fn load_vocab<P: AsRef<Path>>(&self, path: P) -> Result<(), TokenizerError> {
        let path = path.as_ref();
        let loaded = Vocabulary::load(path)?;
        let words = loaded.len();
        *self.vocab() = loaded;
        log::info!("vocabulary loaded: {} ({} words)", path.display(), words);
        Ok(())
    }

    // -- Inspection ---------------------------------------------------------

    /// Number of known words, including special tokens and hash-fallback words.
    pub fn size(&self) -> usize {
        self.vocab().len()
    }

    /// Copy of the word -> ID map.
    pub fn vocabulary_snapshot(&self) -> FxHashMap<String, u32> {
        self.vocab().word_to_id().clone()
    }

    /// Run `f` with read access to the vocabulary.
    pub fn with_vocabulary<R>(&self, f: impl FnOnce(&Vocabulary) -> R) -> R {
        f(&self.vocab())
    }

    /// Capacity ceiling for sequential assignment.
    pub fn vocab_size(&self) -> u32 {
        self.vocab().vocab_size()
    }

    /// ID the next unseen word will receive while capacity remains.
    pub fn next_id(&self) -> u32 {
        self.vocab().next_id()
    }

    /// Look up a normalized word without assigning it an ID.
    pub fn token_to_id(&self, word: &str) -> Option<u32> {
        self.vocab().get_id(word)
    }

    pub fn id_to_token(&self, id: u32) -> Option<String> {
        self.vocab().get_word(id).map(str::to_string)
    }

    pub fn pad_token_id(&self) -> u32 {
        PAD
    }

    pub fn eos_token_id(&self) -> u32 {
        EOS
    }

    pub fn unk_token_id(&self) -> u32 {
        UNK
    }

    pub fn sep_token_id(&self) -> u32 {
        SEP
    }

    pub fn bos_token_id(&self) -> u32 {
        BOS
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::with_vocab_size(DEFAULT_VOCAB_SIZE)
    }
}

impl Clone for Tokenizer {
    fn clone(&self) -> Self {
        // The clone gets its own vocabulary; later growth is not shared.
        Self::from_vocabulary(self.vocab().clone())
    }
}
