//! Deterministic mapping from raw pattern occurrences to issue categories.

use tracing::debug;

use crate::models::{Category, ClassifiedPattern, Language, PatternKind, PatternOccurrence};

/// Confidence below which a classification is logged for observability.
/// Classification itself is never gated on confidence.
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// The rule table: every kind maps to exactly one category, per language.
///
/// The mapping is a pure function of (kind, language); it can never be
/// ambiguous or empty, which is what keeps the single-category invariant
/// trivially true.
fn rule_table(kind: PatternKind, language: Language) -> (Category, f64) {
    match kind {
        PatternKind::LongFunction => (Category::LogicClarity, 0.92),
        PatternKind::NestedLoop => (Category::Performance, 0.9),
        PatternKind::DuplicatedCode => (Category::LogicClarity, 0.8),
        PatternKind::MagicNumber => {
            // Idiomatic Python leans on bare literals more than TS/JS does,
            // so the same signal is weaker there.
            let confidence = match language {
                Language::Python => 0.75,
                _ => 0.85,
            };
            (Category::Readability, confidence)
        }
    }
}

/// Classify one occurrence. Always returns exactly one category.
pub fn classify(occurrence: PatternOccurrence, language: Language) -> ClassifiedPattern {
    let (category, base_confidence) = rule_table(occurrence.kind, language);
    let confidence = adjust_confidence(base_confidence, &occurrence);

    if confidence < LOW_CONFIDENCE_THRESHOLD {
        debug!(
            kind = occurrence.kind.as_str(),
            file = %occurrence.file,
            line = occurrence.range.start.line,
            confidence,
            "low confidence classification"
        );
    }

    ClassifiedPattern {
        occurrence,
        category,
        confidence,
    }
}

/// Dampen confidence for borderline detections; the detectors record how
/// close to their thresholds the match was.
fn adjust_confidence(base: f64, occurrence: &PatternOccurrence) -> f64 {
    let meta = |key: &str| -> Option<usize> {
        occurrence.metadata.get(key).and_then(|v| v.parse().ok())
    };

    let adjusted = match occurrence.kind {
        PatternKind::LongFunction => {
            // Barely over the line limit is a much weaker signal than 2x.
            match (meta("logical_lines"), meta("threshold")) {
                (Some(lines), Some(threshold)) if lines <= threshold + 5 => base - 0.25,
                _ => base,
            }
        }
        PatternKind::DuplicatedCode => match meta("span_lines") {
            Some(len) if len <= 6 => base - 0.2,
            _ => base,
        },
        _ => base,
    };
    adjusted.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Severity, SourceRange};
    use std::collections::HashMap;

    fn occurrence(kind: PatternKind, metadata: &[(&str, &str)]) -> PatternOccurrence {
        PatternOccurrence {
            id: PatternOccurrence::identity(kind, "t.ts", 0, 0),
            kind,
            file: "t.ts".to_string(),
            range: SourceRange::new(0, 0, 1, 0),
            severity: Severity::Medium,
            metadata: metadata
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        }
    }

    #[test]
    fn rule_table_covers_every_kind() {
        for kind in [
            PatternKind::LongFunction,
            PatternKind::MagicNumber,
            PatternKind::NestedLoop,
            PatternKind::DuplicatedCode,
        ] {
            for language in [Language::TypeScript, Language::JavaScript, Language::Python] {
                let classified = classify(occurrence(kind, &[]), language);
                assert!(Category::ALL.contains(&classified.category));
                assert!((0.0..=1.0).contains(&classified.confidence));
            }
        }
    }

    #[test]
    fn long_function_maps_to_logic_clarity() {
        let classified = classify(
            occurrence(
                PatternKind::LongFunction,
                &[("logical_lines", "60"), ("threshold", "50")],
            ),
            Language::TypeScript,
        );
        assert_eq!(classified.category, Category::LogicClarity);
    }

    #[test]
    fn magic_number_maps_to_readability() {
        let classified = classify(occurrence(PatternKind::MagicNumber, &[]), Language::JavaScript);
        assert_eq!(classified.category, Category::Readability);
        assert!(classified.confidence >= LOW_CONFIDENCE_THRESHOLD);
    }

    #[test]
    fn nested_loop_maps_to_performance() {
        let classified = classify(occurrence(PatternKind::NestedLoop, &[]), Language::Python);
        assert_eq!(classified.category, Category::Performance);
    }

    #[test]
    fn borderline_long_function_is_low_confidence_but_still_classified() {
        let classified = classify(
            occurrence(
                PatternKind::LongFunction,
                &[("logical_lines", "52"), ("threshold", "50")],
            ),
            Language::TypeScript,
        );
        assert_eq!(classified.category, Category::LogicClarity);
        assert!(classified.confidence < LOW_CONFIDENCE_THRESHOLD);
    }
}
