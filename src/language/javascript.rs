use super::language_trait::LanguageImpl;
use tree_sitter::{Language as TSLanguage, Node};

/// Implementation of LanguageImpl for JavaScript
pub struct JavaScriptLanguage;

impl Default for JavaScriptLanguage {
    fn default() -> Self {
        Self::new()
    }
}

impl JavaScriptLanguage {
    pub fn new() -> Self {
        JavaScriptLanguage
    }
}

impl LanguageImpl for JavaScriptLanguage {
    fn get_tree_sitter_language(&self) -> TSLanguage {
        tree_sitter_javascript::LANGUAGE.into()
    }

    fn is_function_node(&self, node: &Node) -> bool {
        matches!(
            node.kind(),
            "function_declaration"
                | "function_expression"
                | "function"
                | "arrow_function"
                | "method_definition"
                | "generator_function"
                | "generator_function_declaration"
        )
    }

    fn is_loop_node(&self, node: &Node) -> bool {
        matches!(
            node.kind(),
            "for_statement" | "for_in_statement" | "while_statement" | "do_statement"
        )
    }

    fn is_number_literal(&self, node: &Node) -> bool {
        node.kind() == "number"
    }

    fn is_declaration_value_parent(&self, node: &Node) -> bool {
        // `const X = 42` and class field initializers are declarations;
        // a bare `x = 42` assignment expression is not.
        matches!(node.kind(), "variable_declarator" | "field_definition")
    }

    fn is_unary_wrapper(&self, node: &Node) -> bool {
        node.kind() == "unary_expression"
    }

    fn comment_prefixes(&self) -> &'static [&'static str] {
        &["//", "/*", "*"]
    }
}
