mod bindings;

use crate::core::special_tokens::{BOS, EOS, PAD, SEP, UNK};
pub use bindings::PyTokenizer;

use pyo3::prelude::*;

/// AlphaPack - word-level tokenizer with a persistable vocabulary
///
/// - Lowercasing word/punctuation segmentation
/// - Sequential IDs with a stable hashed overflow range
/// - Fixed-length encoding with EOS, padding and truncation
/// - JSON vocabulary snapshots
/// - Optional PyTorch tensor output
#[pymodule]
fn alphapack(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyTokenizer>()?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add("PAD_TOKEN_ID", PAD)?;
    m.add("EOS_TOKEN_ID", EOS)?;
    m.add("UNK_TOKEN_ID", UNK)?;
    m.add("SEP_TOKEN_ID", SEP)?;
    m.add("BOS_TOKEN_ID", BOS)?;
    Ok(())
}
