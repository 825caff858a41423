//! Core tokenization engine for alphapack.
//!
//! This module contains the word-level tokenizer:
//! - Lowercasing word/punctuation segmentation
//! - A growable vocabulary with sequential IDs and a hashed overflow range
//! - Fixed-length encoding with EOS, padding and truncation
//! - JSON vocabulary snapshots for reproducible IDs across runs
//!
//! # Architecture
//!
//! - [`segmenter`]: text normalization and splitting into tokens
//! - [`Vocabulary`]: word/ID maps, ID assignment and persistence
//! - [`Tokenizer`]: encode/decode over a mutex-guarded vocabulary
//!
//! # Token Layout
//!
//! ```text
//! 0          = <PAD>
//! 1          = <EOS>
//! 2          = <UNK>  (reserved, never produced by encode)
//! 3          = <SEP>
//! 4          = <BOS>
//! 5..size    = words, in order of first appearance
//! ```
//!
//! After `vocab_size` IDs are in use, new words are hashed into `5..vocab_size`.

pub mod segmenter;
mod tokenizer;
mod vocab;

pub use segmenter::{is_delimiter, normalize, segment, PUNCTUATION};
pub use tokenizer::{
    Encoding, Padding, TokenIds, Tokenizer, TokenizerConfig, TokenizerError, DEFAULT_MAX_LENGTH,
};
pub use vocab::{special_tokens, stable_hash, VocabError, Vocabulary, DEFAULT_VOCAB_SIZE};
