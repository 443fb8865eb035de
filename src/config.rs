use serde::{Deserialize, Serialize};

use crate::models::Category;

/// Detection aggressiveness selected by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Flag everything the rules match, at computed severity.
    Aggressive,
    /// Skip conventional literals (-1, 0, 1, 2) and downgrade severity one step.
    #[default]
    Gentle,
}

/// Settings snapshot consumed on each `analyze` call.
///
/// The host owns these values and may change them at any time; the engine
/// re-reads a fresh snapshot per call rather than holding mutable global
/// state, so changes apply without restart or invalidation logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Categories the host wants surfaced. Patterns classified into a
    /// disabled category are detected but filtered from the response.
    #[serde(default = "all_categories")]
    pub enabled_categories: Vec<Category>,
    /// Function bodies strictly longer than this many logical lines trigger
    /// the long-function rule.
    #[serde(default = "default_min_function_lines")]
    pub min_function_lines: usize,
    #[serde(default)]
    pub mode: Mode,
}

fn all_categories() -> Vec<Category> {
    Category::ALL.to_vec()
}

fn default_min_function_lines() -> usize {
    50
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            enabled_categories: all_categories(),
            min_function_lines: default_min_function_lines(),
            mode: Mode::default(),
        }
    }
}

impl EngineSettings {
    pub fn category_enabled(&self, category: Category) -> bool {
        self.enabled_categories.contains(&category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_every_category() {
        let settings = EngineSettings::default();
        for category in Category::ALL {
            assert!(settings.category_enabled(category));
        }
        assert_eq!(settings.min_function_lines, 50);
        assert_eq!(settings.mode, Mode::Gentle);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let settings: EngineSettings =
            serde_json::from_str(r#"{"min_function_lines": 30}"#).unwrap();
        assert_eq!(settings.min_function_lines, 30);
        assert_eq!(settings.enabled_categories.len(), 5);
    }

    #[test]
    fn disabled_category_is_reported() {
        let settings: EngineSettings =
            serde_json::from_str(r#"{"enabled_categories": ["performance"]}"#).unwrap();
        assert!(settings.category_enabled(Category::Performance));
        assert!(!settings.category_enabled(Category::Readability));
    }
}
