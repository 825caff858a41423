pub mod core;
#[cfg(feature = "python")]
mod python;

pub use crate::core::{
    special_tokens, Encoding, Padding, TokenIds, Tokenizer, TokenizerConfig, TokenizerError,
    VocabError, Vocabulary, DEFAULT_MAX_LENGTH, DEFAULT_VOCAB_SIZE,
};
