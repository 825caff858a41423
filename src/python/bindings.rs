//! Python bindings for the alphapack tokenizer.
//!
//! This module provides a PyO3 wrapper around the core Rust tokenizer with
//! the call conventions ML pipelines expect (`tokenizer(text)`,
//! `{"input_ids": [...]}` results, `skip_special_tokens`).
//!
//! # Tensor Output
//!
//! `return_tensors="pt"` wraps the IDs as a `[1, max_length]` PyTorch tensor.
//! PyTorch is imported only when that option is used; if it is not installed
//! the call raises `ImportError` and plain encoding keeps working.
//!
//! # Example
//!
//! ```python
//! from alphapack import AlphaPackTokenizer
//!
//! tokenizer = AlphaPackTokenizer(vocab_size=60000, vocab_path="vocab.json")
//!
//! ids = tokenizer("Merhaba dünya!", max_length=16)["input_ids"]
//! text = tokenizer.decode(ids)
//!
//! tokenizer.save_vocab("vocab.json")
//! ```

use std::path::PathBuf;

use pyo3::exceptions::{PyIOError, PyImportError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;
use rustc_hash::FxHashMap;

use crate::core::{
    Padding, Tokenizer, TokenizerConfig, TokenizerError, VocabError, DEFAULT_MAX_LENGTH,
    DEFAULT_VOCAB_SIZE,
};

/// Python wrapper for the Rust Tokenizer.
#[pyclass(name = "AlphaPackTokenizer")]
pub struct PyTokenizer {
    inner: Tokenizer,
}

#[pymethods]
impl PyTokenizer {
    /// Create a tokenizer.
    ///
    /// Args:
    ///     vocab_size: Capacity for sequential ID assignment (default: 60000)
    ///     vocab_path: Snapshot to restore if the file exists
    ///
    /// Raises:
    ///     IOError: If the snapshot exists but cannot be read
    ///     ValueError: If the snapshot is not a valid vocabulary
    #[new]
    #[pyo3(signature = (vocab_size=DEFAULT_VOCAB_SIZE, vocab_path=None))]
    fn new(vocab_size: u32, vocab_path: Option<PathBuf>) -> PyResult<Self> {
        let config = TokenizerConfig {
            vocab_size,
            vocab_path,
        };
        let inner = Tokenizer::new(config).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Convert text to token IDs.
    ///
    /// Args:
    ///     text: Input string
    ///     max_length: Maximum sequence length (default: 512)
    ///     padding: "max_length" to pad to max_length, anything else to leave short
    ///     return_tensors: "pt" for a PyTorch tensor of shape [1, n], None for a list
    ///
    /// Returns:
    ///     Dict with an "input_ids" key
    ///
    /// Raises:
    ///     ImportError: If return_tensors="pt" and PyTorch is not installed
    ///     ValueError: If return_tensors is not "pt" or None
    #[pyo3(signature = (text, max_length=DEFAULT_MAX_LENGTH, padding=Some("max_length"), return_tensors=None))]
    fn encode<'py>(
        &self,
        py: Python<'py>,
        text: &str,
        max_length: usize,
        padding: Option<&str>,
        return_tensors: Option<&str>,
    ) -> PyResult<Bound<'py, PyDict>> {
        // Resolve the optional capability before the vocabulary is touched.
        let torch = match return_tensors {
            None => None,
            Some("pt") => Some(import_torch(py)?),
            Some(other) => {
                return Err(PyValueError::new_err(format!(
                    "Unsupported return_tensors: {:?}. Use 'pt' or None.",
                    other
                )))
            }
        };

        let padding = match padding {
            Some("max_length") => Padding::MaxLength,
            _ => Padding::DoNotPad,
        };
        let ids = self.inner.encode(text, max_length, padding).into_ids();

        let result = PyDict::new(py);
        match torch {
            Some(torch) => {
                let tensor = torch.call_method1("tensor", (vec![ids],))?;
                result.set_item("input_ids", tensor)?;
            }
            None => result.set_item("input_ids", ids)?,
        }
        Ok(result)
    }

    /// Callable interface, same as `encode`.
    #[pyo3(signature = (text, max_length=DEFAULT_MAX_LENGTH, padding=Some("max_length"), return_tensors=None))]
    fn __call__<'py>(
        &self,
        py: Python<'py>,
        text: &str,
        max_length: usize,
        padding: Option<&str>,
        return_tensors: Option<&str>,
    ) -> PyResult<Bound<'py, PyDict>> {
        self.encode(py, text, max_length, padding, return_tensors)
    }

    /// Convert token IDs back to text.
    ///
    /// Args:
    ///     ids: List of IDs, a list holding one list of IDs, or a tensor
    ///     skip_special_tokens: Drop PAD/UNK/SEP/BOS (default: True)
    ///
    /// Returns:
    ///     Words joined by single spaces, stopping at the first EOS
    #[pyo3(signature = (ids, skip_special_tokens=true))]
    fn decode(&self, ids: &Bound<'_, PyAny>, skip_special_tokens: bool) -> PyResult<String> {
        let ids = if ids.hasattr("tolist")? {
            ids.call_method0("tolist")?
        } else {
            ids.clone()
        };

        if let Ok(flat) = ids.extract::<Vec<u32>>() {
            return Ok(self.inner.decode(&flat, skip_special_tokens));
        }
        let rows: Vec<Vec<u32>> = ids.extract().map_err(|_| {
            PyValueError::new_err("ids must be a list of ints or a list containing one list of ints")
        })?;
        Ok(self.inner.decode(&rows, skip_special_tokens))
    }

    /// Split text into normalized tokens without assigning IDs.
    fn tokenize(&self, text: &str) -> Vec<String> {
        self.inner.tokenize(text)
    }

    /// Save the vocabulary to a JSON file.
    fn save_vocab(&self, path: PathBuf) -> PyResult<()> {
        self.inner.save_vocab(path).map_err(to_py_err)
    }

    /// Replace the vocabulary with a JSON snapshot.
    ///
    /// Raises:
    ///     IOError: If the file cannot be read
    ///     ValueError: If the file is not a valid vocabulary
    fn load_vocab(&self, path: PathBuf) -> PyResult<()> {
        self.inner.load_vocab(path).map_err(to_py_err)
    }

    /// Return a copy of the word -> ID dictionary.
    fn get_vocab(&self) -> FxHashMap<String, u32> {
        self.inner.vocabulary_snapshot()
    }

    fn token_to_id(&self, word: &str) -> Option<u32> {
        self.inner.token_to_id(word)
    }

    fn id_to_token(&self, id: u32) -> Option<String> {
        self.inner.id_to_token(id)
    }

    /// Number of words in the vocabulary, including special tokens.
    fn __len__(&self) -> usize {
        self.inner.size()
    }

    #[getter]
    fn vocab_size(&self) -> u32 {
        self.inner.vocab_size()
    }

    #[getter]
    fn next_id(&self) -> u32 {
        self.inner.next_id()
    }

    #[getter]
    fn pad_token_id(&self) -> u32 {
        self.inner.pad_token_id()
    }

    #[getter]
    fn eos_token_id(&self) -> u32 {
        self.inner.eos_token_id()
    }

    #[getter]
    fn unk_token_id(&self) -> u32 {
        self.inner.unk_token_id()
    }

    #[getter]
    fn sep_token_id(&self) -> u32 {
        self.inner.sep_token_id()
    }

    #[getter]
    fn bos_token_id(&self) -> u32 {
        self.inner.bos_token_id()
    }

    fn __repr__(&self) -> String {
        format!(
            "AlphaPackTokenizer(vocab_size={}, words={})",
            self.inner.vocab_size(),
            self.inner.size()
        )
    }
}

fn import_torch(py: Python<'_>) -> PyResult<Bound<'_, PyModule>> {
    py.import("torch")
        .map_err(|_| PyImportError::new_err("PyTorch is required for return_tensors='pt'"))
}

fn to_py_err(err: TokenizerError) -> PyErr {
    match err {
        TokenizerError::VocabError(VocabError::IoError(e)) => PyIOError::new_err(e.to_string()),
        other => PyValueError::new_err(other.to_string()),
    }
}
