//! Priority 4: tempo markings
//!
//! Absence of tempo text is common in real scores, so a score with no
//! markings gets a soft 50 rather than 0.

use super::{Detected, Tier, ValidationResult};
use crate::models::ScoreDocument;

const MARKING_BASE: i32 = 60;
const METRONOME_BONUS: i32 = 25;
const NOTHING_FOUND: i32 = 50;

pub fn validate(doc: &ScoreDocument) -> ValidationResult {
    // Part-major document order, duplicates kept: repeated markings are
    // meaningful tempo changes
    let markings: Vec<_> = doc
        .parts
        .iter()
        .flat_map(|p| p.measures.iter())
        .flat_map(|m| m.directions.iter())
        .filter(|d| d.is_tempo_marking())
        .collect();

    if markings.is_empty() {
        return ValidationResult::new(Tier::Tempos, NOTHING_FOUND, Detected::Tempos { markings: Vec::new() })
            .with_issues(vec!["no tempo markings found".to_string()]);
    }

    let mut confidence = MARKING_BASE;
    if markings.iter().any(|d| d.metronome.is_some()) {
        confidence += METRONOME_BONUS;
    }

    let markings = markings.iter().map(|d| d.display()).collect();
    ValidationResult::new(Tier::Tempos, confidence.min(100), Detected::Tempos { markings })
}
