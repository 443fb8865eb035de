use tree_sitter::{Language as TSLanguage, Node};

/// Trait that defines the structural vocabulary of one supported language.
///
/// The detector queries are language-agnostic; everything grammar-specific
/// (which node kinds are functions, loops, literals, declaration values)
/// lives behind this trait, so adding a language never touches a detector.
pub trait LanguageImpl: Send + Sync {
    /// Get the tree-sitter language for parsing
    fn get_tree_sitter_language(&self) -> TSLanguage;

    /// Whether a node is a function or method definition with a body.
    fn is_function_node(&self, node: &Node) -> bool;

    /// Whether a node is a loop statement.
    fn is_loop_node(&self, node: &Node) -> bool;

    /// Whether a node is a numeric literal.
    fn is_number_literal(&self, node: &Node) -> bool;

    /// Whether a literal directly under this node is the assigned value of a
    /// variable/constant declaration or enum member, which exempts it from
    /// the magic-number rule.
    fn is_declaration_value_parent(&self, node: &Node) -> bool;

    /// Whether a node is a unary sign wrapper that should be looked through
    /// when deciding declaration context (`const X = -42`).
    fn is_unary_wrapper(&self, node: &Node) -> bool;

    /// Line prefixes that mark a comment-only line for logical-line counting.
    fn comment_prefixes(&self) -> &'static [&'static str];

    /// Best-effort name of a function node, for detector metadata.
    fn function_name(&self, node: &Node, source: &[u8]) -> Option<String> {
        let name = node.child_by_field_name("name")?;
        name.utf8_text(source).ok().map(|s| s.to_string())
    }
}
