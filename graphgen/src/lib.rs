//! The shell around the [`ddcsbm`] core: tab-separated input reading, the
//! instruction-script language, and instruction execution against a single
//! active model.

/// Tab-separated node/edge file reading
pub mod tsv;

/// Tokenizer and parser for the instruction-script format
pub mod script;

/// Instruction execution and active-model state
pub mod exec;
