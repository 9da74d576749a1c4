// Domain tags and the keyword tables behind coordination gating and agent triggering

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainTag {
    Glucose,
    Nutrition,
    Exercise,
}

pub type KeywordTable = [(DomainTag, &'static [&'static str])];

/// Decides whether a message spans domains. Keywords match anywhere in the
/// lowercased text, so "eat" covers "overeating" and also "great".
pub const GATING_KEYWORDS: &KeywordTable = &[
    (DomainTag::Glucose, &["glucose", "sugar", "diabetes"]),
    (DomainTag::Nutrition, &["food", "meal", "eat", "nutrition"]),
    (DomainTag::Exercise, &["exercise", "workout", "activity"]),
];

/// Decides which domain agents a coordinated answer consults
pub const TRIGGER_KEYWORDS: &KeywordTable = &[
    (DomainTag::Glucose, &["glucose", "sugar", "blood", "diabetes", "high", "low"]),
    (DomainTag::Nutrition, &["food", "meal", "eat", "diet", "nutrition", "carb"]),
    (DomainTag::Exercise, &["exercise", "workout", "activity", "tired", "energy"]),
];

/// Any of these alone warrants coordination
const OPTIMIZE_KEYWORDS: &[&str] = &["improve", "better", "optimize", "reduce", "increase", "how can i"];

fn any_keyword(lowered: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| lowered.contains(k))
}

/// Domains in `table` with at least one keyword present in `message`
pub fn matched_tags(message: &str, table: &KeywordTable) -> BTreeSet<DomainTag> {
    let lowered = message.to_lowercase();
    table
        .iter()
        .filter(|(_, keywords)| any_keyword(&lowered, keywords))
        .map(|(tag, _)| *tag)
        .collect()
}

pub fn mentions_optimization(message: &str) -> bool {
    any_keyword(&message.to_lowercase(), OPTIMIZE_KEYWORDS)
}

pub fn starts_with_why(message: &str) -> bool {
    message.trim_start().to_lowercase().starts_with("why")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_tags() {
        let tags = matched_tags("Does my diet affect blood sugar after a workout?", TRIGGER_KEYWORDS);
        assert_eq!(
            tags.into_iter().collect::<Vec<_>>(),
            vec![DomainTag::Glucose, DomainTag::Nutrition, DomainTag::Exercise]
        );
        assert!(matched_tags("Hello there", TRIGGER_KEYWORDS).is_empty());
    }

    #[test]
    fn test_gating_is_narrower_than_triggering() {
        let message = "Is my blood low after a big diet change?";
        assert!(matched_tags(message, GATING_KEYWORDS).is_empty());
        assert_eq!(
            matched_tags(message, TRIGGER_KEYWORDS).into_iter().collect::<Vec<_>>(),
            vec![DomainTag::Glucose, DomainTag::Nutrition]
        );
    }

    #[test]
    fn test_keywords_match_inside_words() {
        assert_eq!(
            matched_tags("too many carbs", TRIGGER_KEYWORDS).into_iter().collect::<Vec<_>>(),
            vec![DomainTag::Nutrition]
        );
        assert_eq!(
            matched_tags("Am I prediabetic or prediabetes?", TRIGGER_KEYWORDS).into_iter().collect::<Vec<_>>(),
            vec![DomainTag::Glucose]
        );
        assert_eq!(
            matched_tags("Does overeating spike my bloodsugar?", GATING_KEYWORDS).into_iter().collect::<Vec<_>>(),
            vec![DomainTag::Glucose, DomainTag::Nutrition]
        );
        assert_eq!(
            matched_tags("That was great", GATING_KEYWORDS).into_iter().collect::<Vec<_>>(),
            vec![DomainTag::Nutrition]
        );
    }

    #[test]
    fn test_optimization_and_why() {
        assert!(mentions_optimization("How can I sleep more?"));
        assert!(mentions_optimization("I want to improve"));
        assert!(!mentions_optimization("I ate lunch"));
        assert!(starts_with_why("  WHY is this happening"));
        assert!(!starts_with_why("Tell me why"));
    }
}
