//! Priority 1: title, composer and instrument names

use super::{Detected, Tier, ValidationResult};
use crate::models::ScoreDocument;

/// Titles recognizers and notation programs emit when nothing was read
pub const PLACEHOLDER_TITLES: &[&str] = &[
    "untitled",
    "score",
    "title",
    "untitled score",
    "untitled document",
    "new score",
];

const TITLE_PENALTY: i32 = 40;
const COMPOSER_PENALTY: i32 = 30;
const PART_NAME_PENALTY: i32 = 30;

pub fn is_placeholder_title(title: &str) -> bool {
    let normalized = title.trim().to_lowercase();
    PLACEHOLDER_TITLES.contains(&normalized.as_str())
}

pub fn validate(doc: &ScoreDocument) -> ValidationResult {
    let mut confidence = 100;
    let mut issues = Vec::new();

    let title = doc.title.trim();
    if title.is_empty() {
        confidence -= TITLE_PENALTY;
        issues.push("title is missing".to_string());
    } else if is_placeholder_title(title) {
        confidence -= TITLE_PENALTY;
        issues.push(format!("title {:?} looks like a placeholder", title));
    }

    let composer = doc
        .composer
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());
    if composer.is_none() {
        confidence -= COMPOSER_PENALTY;
        issues.push("composer is missing".to_string());
    }

    let total = doc.parts.len() as i32;
    let unnamed = doc.parts.iter().filter(|p| p.name.trim().is_empty()).count() as i32;
    if total == 0 {
        confidence -= PART_NAME_PENALTY;
        issues.push("document has no parts, so no instruments were identified".to_string());
    } else if unnamed > 0 {
        // Proportional, rounded half up
        confidence -= (PART_NAME_PENALTY * unnamed + total / 2) / total;
        issues.push(format!("{} of {} parts have no instrument name", unnamed, total));
    }

    let mut instruments: Vec<String> = Vec::new();
    for part in &doc.parts {
        let name = part.name.trim();
        if !name.is_empty() && !instruments.iter().any(|i| i == name) {
            instruments.push(name.to_string());
        }
    }

    ValidationResult::new(
        Tier::Metadata,
        confidence,
        Detected::Metadata {
            title: title.to_string(),
            composer: composer.map(str::to_string),
            instruments,
        },
    )
    .with_issues(issues)
}
