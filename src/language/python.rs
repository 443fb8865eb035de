use super::language_trait::LanguageImpl;
use tree_sitter::{Language as TSLanguage, Node};

/// Implementation of LanguageImpl for Python
pub struct PythonLanguage;

impl Default for PythonLanguage {
    fn default() -> Self {
        Self::new()
    }
}

impl PythonLanguage {
    pub fn new() -> Self {
        PythonLanguage
    }
}

impl LanguageImpl for PythonLanguage {
    fn get_tree_sitter_language(&self) -> TSLanguage {
        tree_sitter_python::LANGUAGE.into()
    }

    fn is_function_node(&self, node: &Node) -> bool {
        node.kind() == "function_definition"
    }

    fn is_loop_node(&self, node: &Node) -> bool {
        matches!(node.kind(), "for_statement" | "while_statement")
    }

    fn is_number_literal(&self, node: &Node) -> bool {
        matches!(node.kind(), "integer" | "float")
    }

    fn is_declaration_value_parent(&self, node: &Node) -> bool {
        // Python has no separate declaration form; a top-level assignment
        // and a parameter default are its declaration contexts.
        matches!(node.kind(), "assignment" | "default_parameter")
    }

    fn is_unary_wrapper(&self, node: &Node) -> bool {
        node.kind() == "unary_operator"
    }

    fn comment_prefixes(&self) -> &'static [&'static str] {
        &["#"]
    }
}
