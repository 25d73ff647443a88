// Property tests over generated score documents

use num_rational::Rational32;
use omr_confidence::models::{Clef, ClefSign, Measure, Note, Part, Pitch, TimeSignature};
use omr_confidence::pipeline::{aggregate, Orchestrator};
use omr_confidence::{Detected, Mode, Policy, ScoreDocument, Tier, TierWeights, ValidationResult};
use proptest::prelude::*;

const SIGNS: [ClefSign; 6] = [
    ClefSign::Treble,
    ClefSign::Bass,
    ClefSign::Alto,
    ClefSign::Tenor,
    ClefSign::Percussion,
    ClefSign::Other,
];

prop_compose! {
    fn note()(step in 0u8..7, octave in -1i8..10, alter in -2i8..3, rest in any::<bool>(),
              denom_exp in 0u32..5, chord in any::<bool>(), voice in 1u8..3) -> Note {
        let duration = Rational32::new(1, 1 << denom_exp);
        let note = if rest {
            Note::rest(duration)
        } else {
            Note::pitched(Pitch::new(step, alter, octave).unwrap(), duration)
        };
        let note = note.in_voice(voice);
        if chord { note.as_chord() } else { note }
    }
}

prop_compose! {
    fn measure()(clef in prop::option::of(0usize..6), beats in 0u32..13, beat_exp in 0u32..4,
                 implicit in any::<bool>(), notes in prop::collection::vec(note(), 0..6)) -> Measure {
        Measure {
            clefs: clef.map(|i| vec![Clef::new(SIGNS[i], 2)]).unwrap_or_default(),
            time_signature: TimeSignature::new(beats, 1 << beat_exp),
            implicit,
            notes,
            ..Measure::default()
        }
    }
}

prop_compose! {
    fn part()(named in any::<bool>(), measures in prop::collection::vec(measure(), 0..5)) -> Part {
        let mut part = Part::new("P", if named { "Horn" } else { "" });
        for m in measures {
            part.push_measure(m);
        }
        part
    }
}

prop_compose! {
    fn document()(title in "[A-Za-z ]{0,12}", composer in prop::option::of("[A-Za-z]{0,8}"),
                  parts in prop::collection::vec(part(), 0..4)) -> ScoreDocument {
        ScoreDocument { title, composer, parts, ..ScoreDocument::default() }
    }
}

fn results(confidences: [u8; 5]) -> [ValidationResult; 5] {
    std::array::from_fn(|i| {
        ValidationResult::new(Tier::ALL[i], i32::from(confidences[i]), Detected::NotEvaluated)
    })
}

proptest! {
    #[test]
    fn prop_confidences_are_bounded(doc in document(), strict in any::<bool>()) {
        let mode = if strict { Mode::Strict } else { Mode::Permissive };
        let policy = Policy::default().with_mode(mode);
        let run = Orchestrator::new(&policy).run(&doc);

        for result in &run.results {
            prop_assert!(result.confidence <= 100);
        }
        let overall = aggregate(&run.results, &TierWeights::default());
        prop_assert!((0.0..=100.0).contains(&overall));
    }

    #[test]
    fn prop_permissive_evaluates_every_tier(doc in document()) {
        let run = Orchestrator::new(&Policy::permissive()).run(&doc);
        prop_assert!(run.results.iter().all(|r| !r.is_placeholder()));
        for (result, tier) in run.results.iter().zip(Tier::ALL) {
            prop_assert_eq!(result.tier(), tier);
        }
    }

    #[test]
    fn prop_strict_below_floor_has_placeholders(doc in document(), floor in 0u32..=100) {
        let policy = Policy::strict().with_floor(floor);
        let run = Orchestrator::new(&policy).run(&doc);
        if u32::from(run.results[0].confidence) < floor {
            for result in &run.results[1..] {
                prop_assert_eq!(result.confidence, 0);
                prop_assert!(result.used_fallback);
            }
        } else {
            prop_assert!(run.results.iter().all(|r| !r.is_placeholder()));
        }
    }

    #[test]
    fn prop_notes_tier_moves_overall_by_at_most_its_weight(
        upper in prop::array::uniform4(0u8..=100),
        before in 0u8..=100,
        after in 0u8..=100,
    ) {
        let weights = TierWeights::default();
        let a = aggregate(&results([upper[0], upper[1], upper[2], upper[3], before]), &weights);
        let b = aggregate(&results([upper[0], upper[1], upper[2], upper[3], after]), &weights);
        prop_assert!((a - b).abs() <= weights.fraction(4) * 100.0 + 1e-9);
    }
}
