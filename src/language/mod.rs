//! Language support: tree-sitter grammars, error-tolerant and incremental
//! parsing, and the per-language structural vocabulary the detectors query.

pub mod factory;
pub mod javascript;
pub mod language_trait;
pub mod parser;
pub mod python;
pub mod tree_cache;
pub mod typescript;

pub use factory::{get_language_impl, language_impl_for_extension};
pub use language_trait::LanguageImpl;
pub use parser::{parse, SyntaxTree};
