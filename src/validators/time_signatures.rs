//! Priority 3: time signatures
//!
//! Measures are visited by index with parts in order inside each index, so
//! parts that start together in a system are compared side by side. A real
//! signature change is kept; only identical adjacent entries collapse.

use super::{Detected, Tier, ValidationResult};
use crate::models::{ScoreDocument, TimeSignature};

const DISAGREEMENT_PENALTY: i32 = 10;
const MISSING_PENALTY: i32 = 15;

pub fn validate(doc: &ScoreDocument) -> ValidationResult {
    let measure_count = doc.max_measures();
    if measure_count == 0 {
        return ValidationResult::new(Tier::TimeSignatures, 0, Detected::TimeSignatures { signatures: Vec::new() })
            .with_issues(vec!["no measures to read time signatures from".to_string()])
            .with_fallback(true);
    }

    let mut collected: Vec<TimeSignature> = Vec::new();
    let mut in_effect: Vec<Option<TimeSignature>> = vec![None; doc.parts.len()];
    let mut disagreements = 0i32;
    let mut issues = Vec::new();

    for position in 0..measure_count {
        let mut starting: Vec<(usize, TimeSignature)> = Vec::new();

        for (p, part) in doc.parts.iter().enumerate() {
            let Some(measure) = part.measures.get(position) else {
                continue;
            };
            if let Some(ts) = measure.time_signature {
                in_effect[p] = Some(ts);
                if collected.last() != Some(&ts) {
                    collected.push(ts);
                }
            }
            if let Some(ts) = in_effect[p] {
                starting.push((p, ts));
            }
        }

        let first = starting.first().map(|(_, ts)| *ts);
        if starting.iter().any(|(_, ts)| Some(*ts) != first) {
            disagreements += 1;
            let listing: Vec<String> = starting
                .iter()
                .map(|(p, ts)| format!("{} {}", doc.parts[*p].id, ts))
                .collect();
            issues.push(format!(
                "measure {}: parts disagree on the time signature ({})",
                position + 1,
                listing.join(", ")
            ));
        }
    }

    let mut confidence = 100 - DISAGREEMENT_PENALTY * disagreements;
    let none_found = collected.is_empty();
    if none_found {
        confidence -= MISSING_PENALTY;
        issues.push("no time signature found; 4/4 assumed".to_string());
    }

    let signatures = collected.iter().map(|ts| ts.to_string()).collect();
    ValidationResult::new(Tier::TimeSignatures, confidence, Detected::TimeSignatures { signatures })
        .with_issues(issues)
        .with_fallback(none_found)
}
