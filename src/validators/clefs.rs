//! Priority 2: clefs
//!
//! Counts clefs, flags unrecognized signs, and sanity-checks mid-part clef
//! changes against the notes written after them. The range check is a
//! heuristic: OMR engines often misread a clef on one staff of a system, and
//! the notes that follow are then transposed by a sixth or more.

use std::collections::BTreeMap;

use super::{Detected, Tier, ValidationResult};
use crate::models::pitch::midi_name;
use crate::models::{ClefSign, Part, ScoreDocument};

const OTHER_SIGN_PENALTY: i32 = 5;
const UNUSUAL_CHANGE_PENALTY: i32 = 2;

pub fn validate(doc: &ScoreDocument) -> ValidationResult {
    let mut count = 0usize;
    let mut other_signs = 0i32;
    let mut unusual_changes = 0i32;
    let mut types: Vec<ClefSign> = Vec::new();
    let mut issues = Vec::new();

    for part in &doc.parts {
        let mut current: BTreeMap<u8, ClefSign> = BTreeMap::new();

        for (position, measure) in part.measures.iter().enumerate() {
            for clef in &measure.clefs {
                count += 1;
                if !types.contains(&clef.sign) {
                    types.push(clef.sign);
                }

                if clef.sign == ClefSign::Other {
                    other_signs += 1;
                    issues.push(format!(
                        "unrecognized clef in part {}, measure {} (staff {}, line {})",
                        part.label(),
                        measure.index,
                        clef.staff,
                        clef.line
                    ));
                }

                let previous = current.insert(clef.staff, clef.sign);
                let changed = matches!(previous, Some(prev) if prev != clef.sign);
                if !changed {
                    continue;
                }
                let Some(range) = clef.sign.plausible_range() else {
                    continue;
                };
                if let Some(mean) = mean_pitch_from(part, position, clef.staff) {
                    if !range.contains(&mean) {
                        unusual_changes += 1;
                        issues.push(format!(
                            "clef change to {} in part {}, measure {} is not supported by the notes that follow (around {})",
                            clef.sign.name(),
                            part.label(),
                            measure.index,
                            midi_name(mean)
                        ));
                    }
                }
            }
        }
    }

    if count == 0 {
        return ValidationResult::new(Tier::Clefs, 0, Detected::Clefs { count, types })
            .with_issues(vec!["no clefs detected".to_string()])
            .with_fallback(true);
    }

    let confidence = 100 - OTHER_SIGN_PENALTY * other_signs - UNUSUAL_CHANGE_PENALTY * unusual_changes;
    ValidationResult::new(Tier::Clefs, confidence, Detected::Clefs { count, types }).with_issues(issues)
}

/// Mean MIDI pitch of the first measure at or after `position` that has
/// pitched notes on `staff`
fn mean_pitch_from(part: &Part, position: usize, staff: u8) -> Option<i32> {
    part.measures[position..].iter().find_map(|measure| {
        let pitches: Vec<i32> = measure
            .notes
            .iter()
            .filter(|n| n.staff == staff)
            .filter_map(|n| n.pitch.map(|p| p.midi_number()))
            .collect();
        if pitches.is_empty() {
            None
        } else {
            Some(pitches.iter().sum::<i32>() / pitches.len() as i32)
        }
    })
}
