use super::*;
use crate::models::{ClefSign, TimeSignature};
use num_rational::Rational32;

fn wrap(parts: &str, part_list: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE score-partwise PUBLIC "-//Recordare//DTD MusicXML 4.0 Partwise//EN" "http://www.musicxml.org/dtds/partwise.dtd">
<score-partwise version="4.0">
  <work><work-title>Etude</work-title></work>
  <identification>
    <creator type="composer">Anna Example</creator>
    <encoding><software>Audiveris 5.3</software></encoding>
  </identification>
  <part-list>{}</part-list>
  {}
</score-partwise>"#,
        part_list, parts
    )
}

fn single_part(measures: &str) -> String {
    wrap(
        &format!(r#"<part id="P1">{}</part>"#, measures),
        r#"<score-part id="P1"><part-name>Piano</part-name></score-part>"#,
    )
}

const FULL_MEASURE: &str = r#"
  <attributes><divisions>1</divisions><time><beats>4</beats><beat-type>4</beat-type></time>
    <clef><sign>G</sign><line>2</line></clef></attributes>
  <note><pitch><step>C</step><octave>4</octave></pitch><duration>4</duration><voice>1</voice></note>"#;

#[test]
fn test_metadata_extraction() {
    let xml = single_part(&format!(r#"<measure number="1">{}</measure>"#, FULL_MEASURE));
    let normalized = normalize(&xml, Mode::Strict).unwrap();
    let doc = &normalized.document;

    assert_eq!(doc.title, "Etude");
    assert_eq!(doc.composer.as_deref(), Some("Anna Example"));
    assert_eq!(doc.source.as_str(), "Audiveris 5.3");
    assert_eq!(doc.parts.len(), 1);
    assert_eq!(doc.parts[0].name, "Piano");
    assert!(normalized.deferred.is_empty());
    assert!(normalized.repairs.is_empty());
}

#[test]
fn test_movement_title_wins() {
    let xml = single_part(&format!(r#"<measure number="1">{}</measure>"#, FULL_MEASURE))
        .replace("<work>", "<movement-title>Finale</movement-title><work>");
    let doc = normalize(&xml, Mode::Strict).unwrap().document;
    assert_eq!(doc.title, "Finale");
}

#[test]
fn test_untyped_creator_is_composer_fallback() {
    let xml = single_part(&format!(r#"<measure number="1">{}</measure>"#, FULL_MEASURE))
        .replace(r#"<creator type="composer">"#, "<creator>");
    let doc = normalize(&xml, Mode::Strict).unwrap().document;
    assert_eq!(doc.composer.as_deref(), Some("Anna Example"));
}

#[test]
fn test_measure_contents() {
    let xml = single_part(&format!(r#"<measure number="1">{}</measure>"#, FULL_MEASURE));
    let doc = normalize(&xml, Mode::Strict).unwrap().document;
    let measure = &doc.parts[0].measures[0];

    assert_eq!(measure.index, 1);
    assert_eq!(measure.time_signature, TimeSignature::new(4, 4));
    assert_eq!(measure.clefs.len(), 1);
    assert_eq!(measure.clefs[0].sign, ClefSign::Treble);
    assert_eq!(measure.notes.len(), 1);
    assert_eq!(measure.notes[0].duration, Rational32::from_integer(1));
    assert_eq!(measure.notes[0].pitch.unwrap().midi_number(), 60);
}

#[test]
fn test_not_xml_is_malformed() {
    let err = normalize("this is not xml", Mode::Permissive).unwrap_err();
    assert!(matches!(err, MalformedDocument::InvalidXml(_)));
}

#[test]
fn test_timewise_is_unsupported() {
    let err = normalize("<score-timewise/>", Mode::Permissive).unwrap_err();
    assert!(matches!(err, MalformedDocument::UnsupportedFormat(_)));
}

#[test]
fn test_zero_parts_depends_on_mode() {
    let xml = wrap("", "");
    assert_eq!(normalize(&xml, Mode::Strict).unwrap_err(), MalformedDocument::NoParts);

    let normalized = normalize(&xml, Mode::Permissive).unwrap();
    assert!(normalized.document.parts.is_empty());
    assert!(normalized
        .deferred
        .iter()
        .any(|i| i.tier == Tier::Metadata && i.message.contains("no parts")));
}

#[test]
fn test_empty_part_is_dropped() {
    let xml = wrap(
        &format!(
            r#"<part id="P1"><measure number="1">{}</measure></part><part id="P2"></part>"#,
            FULL_MEASURE
        ),
        r#"<score-part id="P1"><part-name>Piano</part-name></score-part>
           <score-part id="P2"><part-name>Ghost</part-name></score-part>"#,
    );
    let normalized = normalize(&xml, Mode::Strict).unwrap();

    assert_eq!(normalized.document.parts.len(), 1);
    assert!(normalized.repairs.drops_part(1));
    assert!(normalized.repairs.drops_score_part("P2"));
    assert_eq!(normalized.deferred.len(), 1);
    assert_eq!(normalized.deferred[0].tier, Tier::Metadata);
}

#[test]
fn test_part_list_entry_without_music() {
    let xml = wrap(
        &format!(r#"<part id="P1"><measure number="1">{}</measure></part>"#, FULL_MEASURE),
        r#"<score-part id="P1"><part-name>Piano</part-name></score-part>
           <score-part id="P9"><part-name>Orphan</part-name></score-part>"#,
    );
    let normalized = normalize(&xml, Mode::Strict).unwrap();
    assert!(normalized.repairs.drops_score_part("P9"));
    assert!(normalized.repairs.dropped_parts.is_empty());
}

#[test]
fn test_measure_gap_is_renumbered() {
    let xml = single_part(&format!(
        r#"<measure number="1">{m}</measure><measure number="4">{m}</measure>"#,
        m = FULL_MEASURE
    ));
    let normalized = normalize(&xml, Mode::Strict).unwrap();
    let part = &normalized.document.parts[0];

    assert_eq!(part.measures[1].index, 2);
    assert_eq!(part.measures[1].source_number.as_deref(), Some("4"));
    assert!(normalized.repairs.renumbers_part(0));
    assert_eq!(normalized.deferred.len(), 1);
    assert_eq!(normalized.deferred[0].tier, Tier::Notes);
    assert!(normalized.deferred[0].message.contains("from 1 to 4"));
}

#[test]
fn test_divisions_carry_across_measures() {
    let xml = single_part(
        r#"<measure number="1"><attributes><divisions>2</divisions></attributes>
             <note><pitch><step>D</step><octave>4</octave></pitch><duration>1</duration></note></measure>
           <measure number="2">
             <note><pitch><step>D</step><octave>4</octave></pitch><duration>1</duration></note></measure>"#,
    );
    let doc = normalize(&xml, Mode::Strict).unwrap().document;
    assert_eq!(doc.parts[0].measures[1].notes[0].duration, Rational32::new(1, 8));
}

#[test]
fn test_tuplet_duration_is_exact() {
    let xml = single_part(
        r#"<measure number="1"><attributes><divisions>3</divisions></attributes>
             <note><pitch><step>E</step><octave>4</octave></pitch><duration>1</duration>
               <time-modification><actual-notes>3</actual-notes><normal-notes>2</normal-notes></time-modification>
             </note></measure>"#,
    );
    let normalized = normalize(&xml, Mode::Strict).unwrap();
    assert_eq!(normalized.document.parts[0].measures[0].notes[0].duration, Rational32::new(1, 12));
    assert!(normalized.deferred.is_empty());
}

#[test]
fn test_inexact_duration_is_snapped() {
    let xml = single_part(
        r#"<measure number="1"><attributes><divisions>3</divisions></attributes>
             <note><pitch><step>E</step><octave>4</octave></pitch><duration>1</duration></note></measure>"#,
    );
    let normalized = normalize(&xml, Mode::Strict).unwrap();
    // 1/12 on the 1/256 grid is 21/256
    assert_eq!(normalized.document.parts[0].measures[0].notes[0].duration, Rational32::new(21, 256));
    assert_eq!(normalized.deferred[0].tier, Tier::Notes);
}

#[test]
fn test_grace_and_zero_duration_notes() {
    let xml = single_part(
        r#"<measure number="1"><attributes><divisions>1</divisions></attributes>
             <note><grace/><pitch><step>B</step><octave>4</octave></pitch></note>
             <note><pitch><step>C</step><octave>5</octave></pitch><duration>0</duration></note>
             <note><rest/><duration>4</duration></note></measure>"#,
    );
    let normalized = normalize(&xml, Mode::Strict).unwrap();
    let notes = &normalized.document.parts[0].measures[0].notes;
    assert_eq!(notes.len(), 1);
    assert!(notes[0].is_rest());
    // only the zero-duration note is a coercion; grace notes are skipped silently
    assert_eq!(normalized.deferred.len(), 1);
}

#[test]
fn test_bad_pitch_becomes_rest() {
    let xml = single_part(
        r#"<measure number="1"><attributes><divisions>1</divisions></attributes>
             <note><pitch><step>H</step><octave>4</octave></pitch><duration>4</duration></note></measure>"#,
    );
    let normalized = normalize(&xml, Mode::Strict).unwrap();
    assert!(normalized.document.parts[0].measures[0].notes[0].is_rest());
    assert_eq!(normalized.deferred[0].tier, Tier::Notes);
}

#[test]
fn test_note_details() {
    let xml = single_part(
        r#"<measure number="1"><attributes><divisions>1</divisions></attributes>
             <note><pitch><step>F</step><alter>1</alter><octave>5</octave></pitch><duration>2</duration>
               <voice>2</voice><accidental>sharp</accidental><staff>2</staff>
               <notations><articulations><staccato/></articulations><fermata/></notations></note>
             <note><chord/><pitch><step>A</step><octave>5</octave></pitch><duration>2</duration></note></measure>"#,
    );
    let doc = normalize(&xml, Mode::Strict).unwrap().document;
    let notes = &doc.parts[0].measures[0].notes;

    assert_eq!(notes[0].accidental, Accidental::Sharp);
    assert_eq!(notes[0].voice, 2);
    assert_eq!(notes[0].staff, 2);
    assert!(notes[0].articulations.contains(&Articulation::Staccato));
    assert!(notes[0].articulations.contains(&Articulation::Fermata));
    assert!(notes[1].chord);
}

#[test]
fn test_tempo_directions() {
    let xml = single_part(
        r#"<measure number="1">
             <direction><direction-type><words>Allegro</words></direction-type>
               <direction-type><metronome><beat-unit>quarter</beat-unit><per-minute>120</per-minute></metronome></direction-type>
             </direction>
             <direction><direction-type><words>dolce</words></direction-type></direction>
             <sound tempo="88"/>
           </measure>"#,
    );
    let doc = normalize(&xml, Mode::Strict).unwrap().document;
    let directions = &doc.parts[0].measures[0].directions;

    assert_eq!(directions.len(), 2);
    assert_eq!(directions[0].text.as_deref(), Some("Allegro"));
    assert_eq!(directions[0].metronome.as_ref().map(|m| m.per_minute), Some(120));
    assert_eq!(directions[1].metronome.as_ref().map(|m| m.per_minute), Some(88));
}

#[test]
fn test_bad_time_signature_is_dropped() {
    let xml = single_part(
        r#"<measure number="1"><attributes><time><beats>0</beats><beat-type>4</beat-type></time></attributes></measure>"#,
    );
    let normalized = normalize(&xml, Mode::Strict).unwrap();
    assert!(normalized.document.parts[0].measures[0].time_signature.is_none());
    assert_eq!(normalized.deferred[0].tier, Tier::TimeSignatures);
}

#[test]
fn test_unknown_clef_is_kept_as_other() {
    let xml = single_part(
        r#"<measure number="1"><attributes><clef><sign>X</sign></clef></attributes></measure>"#,
    );
    let normalized = normalize(&xml, Mode::Strict).unwrap();
    assert_eq!(normalized.document.parts[0].measures[0].clefs[0].sign, ClefSign::Other);
    assert_eq!(normalized.deferred[0].tier, Tier::Clefs);
}

#[test]
fn test_largest_measure_numbers_do_not_overflow() {
    let xml = single_part(&format!(
        r#"<measure number="4294967295">{m}</measure><measure number="4294967295">{m}</measure>"#,
        m = FULL_MEASURE
    ));
    let normalized = normalize(&xml, Mode::Strict).unwrap();
    let part = &normalized.document.parts[0];

    assert_eq!(part.measures.len(), 2);
    assert_eq!(part.measures[1].index, 2);
    assert!(normalized.repairs.renumbers_part(0));
    // no gap: the renumbering itself is the only Notes-tier note
    assert_eq!(normalized.deferred.len(), 1);
    assert!(normalized.deferred[0].message.contains("rewritten"));
}

#[test]
fn test_long_inexact_duration_is_snapped_without_overflow() {
    let xml = single_part(
        r#"<measure number="1"><attributes><divisions>3</divisions></attributes>
             <note><pitch><step>E</step><octave>4</octave></pitch><duration>100000000</duration></note></measure>"#,
    );
    let normalized = normalize(&xml, Mode::Strict).unwrap();
    // 100000000 / 12 whole notes on the 1/256 grid
    assert_eq!(
        normalized.document.parts[0].measures[0].notes[0].duration,
        Rational32::new(2_133_333_333, 256)
    );
}

#[test]
fn test_unrepresentable_snapped_duration_is_dropped() {
    let xml = single_part(
        r#"<measure number="1"><attributes><divisions>3</divisions></attributes>
             <note><pitch><step>E</step><octave>4</octave></pitch><duration>2000000000</duration></note></measure>"#,
    );
    let normalized = normalize(&xml, Mode::Strict).unwrap();
    assert!(normalized.document.parts[0].measures[0].notes.is_empty());
    assert!(normalized.deferred[0].message.contains("out of range"));
}
