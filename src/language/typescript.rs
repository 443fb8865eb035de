use super::language_trait::LanguageImpl;
use tree_sitter::{Language as TSLanguage, Node};

/// Implementation of LanguageImpl for TypeScript and TSX
pub struct TypeScriptLanguage {
    tsx: bool,
}

impl TypeScriptLanguage {
    pub fn new_typescript() -> Self {
        TypeScriptLanguage { tsx: false }
    }

    pub fn new_tsx() -> Self {
        TypeScriptLanguage { tsx: true }
    }
}

impl LanguageImpl for TypeScriptLanguage {
    fn get_tree_sitter_language(&self) -> TSLanguage {
        if self.tsx {
            tree_sitter_typescript::LANGUAGE_TSX.into()
        } else {
            tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()
        }
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
        // Declarators, enum member assignments, and class field
        // initializers. Plain assignment expressions stay flagged.
        matches!(
            node.kind(),
            "variable_declarator" | "enum_assignment" | "public_field_definition"
        )
    }

    fn is_unary_wrapper(&self, node: &Node) -> bool {
        node.kind() == "unary_expression"
    }

    fn comment_prefixes(&self) -> &'static [&'static str] {
        &["//", "/*", "*"]
    }
}
