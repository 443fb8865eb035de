use crate::language::javascript::JavaScriptLanguage;
use crate::language::language_trait::LanguageImpl;
use crate::language::python::PythonLanguage;
use crate::language::typescript::TypeScriptLanguage;
use crate::models::Language;

/// Factory function to get the language implementation for a supported language
pub fn get_language_impl(language: Language) -> Box<dyn LanguageImpl> {
    match language {
        Language::TypeScript => Box::new(TypeScriptLanguage::new_typescript()),
        Language::JavaScript => Box::new(JavaScriptLanguage::new()),
        Language::Python => Box::new(PythonLanguage::new()),
    }
}

/// Resolve a language implementation from a file extension, for callers that
/// work from paths rather than host language identifiers.
pub fn language_impl_for_extension(extension: &str) -> Option<(Language, Box<dyn LanguageImpl>)> {
    match extension {
        "ts" => Some((
            Language::TypeScript,
            Box::new(TypeScriptLanguage::new_typescript()),
        )),
        "tsx" => Some((Language::TypeScript, Box::new(TypeScriptLanguage::new_tsx()))),
        "js" | "jsx" | "mjs" | "cjs" => Some((Language::JavaScript, Box::new(JavaScriptLanguage::new()))),
        "py" => Some((Language::Python, Box::new(PythonLanguage::new()))),
        _ => None,
    }
}
