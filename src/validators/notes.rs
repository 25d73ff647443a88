//! Priority 5: notes
//!
//! Two checks over every measure: do the note and rest durations fill the
//! governing time signature, and do the pitches sit inside a plausible
//! instrumental range.

use num_rational::{Ratio, Rational32};
use std::collections::BTreeMap;

use super::{Detected, Tier, ValidationResult};
use crate::models::pitch::midi_name;
use crate::models::{Duration, Measure, ScoreDocument, TimeSignature};
use crate::policy::NoteRange;

const DURATION_PENALTY_CAP: f64 = 40.0;
const RANGE_PENALTY_PER_ISSUE: f64 = 0.5;
const RANGE_PENALTY_CAP: f64 = 20.0;

/// Durations closer than a 256th note are treated as equal
pub fn duration_tolerance() -> Duration {
    Rational32::new(1, 256)
}

pub fn validate(doc: &ScoreDocument, range: &NoteRange) -> ValidationResult {
    let mut count = 0usize;
    let mut rests = 0usize;
    let mut duration_issues = 0usize;
    let mut range_issues = 0usize;
    let mut issues = Vec::new();

    let any_signature = doc
        .parts
        .iter()
        .flat_map(|p| p.measures.iter())
        .any(|m| m.time_signature.is_some());

    for part in &doc.parts {
        let mut in_effect: Option<TimeSignature> = None;

        for measure in &part.measures {
            if let Some(ts) = measure.time_signature {
                in_effect = Some(ts);
            }
            let governing = in_effect.unwrap_or_default();

            for note in &measure.notes {
                let Some(pitch) = note.pitch else {
                    rests += 1;
                    continue;
                };
                count += 1;
                let midi = pitch.midi_number();
                if !range.contains(midi) {
                    range_issues += 1;
                    issues.push(format!(
                        "note {} in part {}, measure {} is outside the plausible range {}-{}",
                        pitch,
                        part.label(),
                        measure.index,
                        midi_name(range.lowest as i32),
                        midi_name(range.highest as i32)
                    ));
                }
            }

            let expected = governing.measure_length();
            let gap = match measure_content(measure) {
                Ok(None) => continue,
                Ok(Some(content)) if measure.implicit && content < expected => continue,
                Ok(Some(content)) if content > expected => {
                    checked_sub(content, expected).map(|gap| (content, gap))
                }
                Ok(Some(content)) => checked_sub(expected, content).map(|gap| (content, gap)),
                Err(DurationOverflow) => None,
            };
            match gap {
                Some((_, gap)) if gap <= duration_tolerance() => {}
                Some((content, _)) => {
                    duration_issues += 1;
                    issues.push(format!(
                        "part {}, measure {}: notes last {} of a whole note, {} expects {}",
                        part.label(),
                        measure.index,
                        content,
                        governing,
                        expected
                    ));
                }
                None => {
                    duration_issues += 1;
                    issues.push(format!(
                        "part {}, measure {}: note durations are too finely divided to total exactly",
                        part.label(),
                        measure.index
                    ));
                }
            }
        }
    }

    if count == 0 {
        issues.insert(0, "no notes detected".to_string());
        return ValidationResult::new(Tier::Notes, 0, Detected::Notes { count, rests })
            .with_issues(issues)
            .with_fallback(true);
    }

    if !any_signature {
        issues.insert(0, "no time signature found; durations checked against 4/4".to_string());
    }

    let penalty = (duration_issues as f64).min(DURATION_PENALTY_CAP)
        + (range_issues as f64 * RANGE_PENALTY_PER_ISSUE).min(RANGE_PENALTY_CAP);
    let confidence = (100.0 - penalty).round() as i32;

    ValidationResult::new(Tier::Notes, confidence, Detected::Notes { count, rests })
        .with_issues(issues)
        .with_fallback(!any_signature)
}

/// A voice total that does not fit in a `Duration`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationOverflow;

/// Length of the longest voice in the measure. Chord members share the
/// previous note's time slot. `Ok(None)` for an empty measure.
pub fn measure_content(measure: &Measure) -> Result<Option<Duration>, DurationOverflow> {
    let mut voices: BTreeMap<(u8, u8), Duration> = BTreeMap::new();
    for note in measure.notes.iter().filter(|n| !n.chord) {
        let total = voices.entry((note.staff, note.voice)).or_insert_with(|| Rational32::from_integer(0));
        *total = checked_add(*total, note.duration).ok_or(DurationOverflow)?;
    }
    Ok(voices.into_values().max())
}

pub fn checked_add(a: Duration, b: Duration) -> Option<Duration> {
    combine(a, b, 1)
}

pub fn checked_sub(a: Duration, b: Duration) -> Option<Duration> {
    combine(a, b, -1)
}

/// a ± b computed in i64, then narrowed back
fn combine(a: Duration, b: Duration, sign: i64) -> Option<Duration> {
    let (an, ad) = (i64::from(*a.numer()), i64::from(*a.denom()));
    let (bn, bd) = (i64::from(*b.numer()), i64::from(*b.denom()));
    let wide = Ratio::new(an * bd + sign * bn * ad, ad * bd);
    Some(Rational32::new_raw(
        i32::try_from(*wide.numer()).ok()?,
        i32::try_from(*wide.denom()).ok()?,
    ))
}
