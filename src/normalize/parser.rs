//! XML access layer for MusicXML documents
//!
//! Small helpers around roxmltree nodes plus the element-level parsers the
//! normalizer needs (time signatures, clefs, pitches, metronome marks). The
//! element parsers report problems as plain strings; the normalizer decides
//! which tier the resulting coercion belongs to.

use once_cell::sync::Lazy;
use roxmltree::Node;
use std::borrow::Cow;
use std::collections::HashSet;

use crate::models::{Clef, ClefSign, Metronome, Pitch, TimeSignature};

// ============================================================================
// DOCUMENT-LEVEL HELPERS
// ============================================================================

/// Remove a `<!DOCTYPE ...>` declaration (roxmltree rejects DTDs)
pub fn strip_doctype(xml: &str) -> Cow<'_, str> {
    let Some(start) = xml.find("<!DOCTYPE") else {
        return Cow::Borrowed(xml);
    };
    let rest = &xml[start..];
    let end = match (rest.find('['), rest.find('>')) {
        (Some(bracket), Some(close)) if bracket < close => rest.find("]>").map(|i| i + 2),
        (_, Some(close)) => Some(close + 1),
        _ => None,
    };
    match end {
        Some(end) => Cow::Owned(format!("{}{}", &xml[..start], &rest[end..])),
        None => Cow::Borrowed(xml),
    }
}

/// Get first child element with given tag name
pub fn get_child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == tag)
}

/// All child elements with given tag name
pub fn children_named<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    tag: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |n| n.is_element() && n.tag_name().name() == tag)
}

pub fn has_child(node: Node, tag: &str) -> bool {
    get_child(node, tag).is_some()
}

/// Trimmed text of first child with given tag; `None` when absent or blank
pub fn get_child_text<'a>(node: Node<'a, '_>, tag: &str) -> Option<&'a str> {
    get_child(node, tag)
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// First run of digits in `text` ("c. 120" -> 120)
pub fn leading_number(text: &str) -> Option<u32> {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

// ============================================================================
// ATTRIBUTES
// ============================================================================

/// Parse divisions from an attributes element
pub fn parse_divisions(attributes_node: Node) -> Option<Result<u32, String>> {
    let text = get_child_text(attributes_node, "divisions")?;
    Some(match text.parse::<u32>() {
        Ok(d) if d > 0 => Ok(d),
        _ => Err(format!("invalid divisions {:?}", text)),
    })
}

/// Parse a `<time>` element. Additive numerators ("3+2") are summed.
pub fn parse_time(time_node: Node) -> Result<TimeSignature, String> {
    if has_child(time_node, "senza-misura") {
        return Err("senza-misura has no time signature".to_string());
    }
    let beats_text = get_child_text(time_node, "beats")
        .ok_or_else(|| "time signature without beats".to_string())?;
    let beat_type_text = get_child_text(time_node, "beat-type")
        .ok_or_else(|| "time signature without beat-type".to_string())?;

    let beats = beats_text
        .split('+')
        .map(|b| b.trim().parse::<u32>())
        .try_fold(0u32, |acc, b| b.ok().and_then(|b| acc.checked_add(b)))
        .ok_or_else(|| format!("unreadable beats {:?}", beats_text))?;
    let beat_type = beat_type_text
        .parse::<u32>()
        .map_err(|_| format!("unreadable beat-type {:?}", beat_type_text))?;

    TimeSignature::new(beats, beat_type)
        .ok_or_else(|| format!("impossible time signature {}/{}", beats_text, beat_type_text))
}

/// Parse a `<clef>` element. Unknown signs come back as `other` together with
/// a description of the coercion.
pub fn parse_clef(clef_node: Node) -> (Clef, Option<String>) {
    let sign = get_child_text(clef_node, "sign").unwrap_or_default();
    let line = get_child_text(clef_node, "line").and_then(|l| l.parse::<i8>().ok());
    let staff = clef_node
        .attribute("number")
        .and_then(|n| n.trim().parse::<u8>().ok())
        .unwrap_or(1);

    let line_or_default = line.unwrap_or_else(|| ClefSign::standard_line(sign));
    match ClefSign::from_musicxml(sign, line) {
        Some(mapped) => (Clef::new(mapped, line_or_default).on_staff(staff), None),
        None => (
            Clef::new(ClefSign::Other, line_or_default).on_staff(staff),
            Some(format!("unrecognized clef sign {:?} treated as other", sign)),
        ),
    }
}

// ============================================================================
// PITCH
// ============================================================================

/// Parse a `<pitch>` element. Microtonal alterations round to the nearest
/// semitone.
pub fn parse_pitch(pitch_node: Node) -> Result<Pitch, String> {
    parse_spelled_pitch(pitch_node, "step", "octave")
}

/// Parse the display position of an `<unpitched>` element
pub fn parse_unpitched(unpitched_node: Node) -> Result<Pitch, String> {
    parse_spelled_pitch(unpitched_node, "display-step", "display-octave")
}

fn parse_spelled_pitch(node: Node, step_tag: &str, octave_tag: &str) -> Result<Pitch, String> {
    let step_text = get_child_text(node, step_tag).ok_or_else(|| format!("missing {}", step_tag))?;
    let step = Pitch::step_from_letter(step_text).ok_or_else(|| format!("invalid step {:?}", step_text))?;

    let octave_text = get_child_text(node, octave_tag).ok_or_else(|| format!("missing {}", octave_tag))?;
    let octave: i8 = octave_text
        .parse()
        .map_err(|_| format!("invalid octave {:?}", octave_text))?;

    let alter = get_child_text(node, "alter")
        .and_then(|a| a.parse::<f32>().ok())
        .map(|a| a.round().clamp(-2.0, 2.0) as i8)
        .unwrap_or(0);

    Pitch::new(step, alter, octave)
}

// ============================================================================
// TEMPO DIRECTIONS
// ============================================================================

static TEMPO_TERMS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "grave", "largo", "larghetto", "lento", "adagio", "adagietto", "andante",
        "andantino", "moderato", "allegretto", "allegro", "vivace", "vivacissimo",
        "presto", "prestissimo", "maestoso", "tempo", "rit", "ritard", "ritardando",
        "rall", "rallentando", "accel", "accelerando", "rubato", "animato", "comodo",
        "sostenuto", "allargando", "stringendo", "slow", "slowly", "moderately",
        "fast", "lively", "quickly", "briskly", "brightly",
    ]
    .into_iter()
    .collect()
});

const TEMPO_PHRASES: &[&str] = &["a tempo", "più mosso", "piu mosso", "meno mosso", "l'istesso tempo"];

/// Whether free text reads as a tempo indication ("Allegro con brio", "rit.")
pub fn is_tempo_text(text: &str) -> bool {
    let lowered = text.trim().to_lowercase();
    if TEMPO_PHRASES.iter().any(|p| lowered.starts_with(p)) {
        return true;
    }
    lowered
        .split_whitespace()
        .next()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .map_or(false, |w| TEMPO_TERMS.contains(w))
}

/// Parse a `<metronome>` element
pub fn parse_metronome(metronome_node: Node) -> Result<Metronome, String> {
    let beat_unit = get_child_text(metronome_node, "beat-unit")
        .ok_or_else(|| "metronome mark without beat-unit".to_string())?;
    let per_minute_text = get_child_text(metronome_node, "per-minute")
        .ok_or_else(|| "metronome mark without per-minute".to_string())?;
    let per_minute = leading_number(per_minute_text)
        .filter(|bpm| *bpm > 0)
        .ok_or_else(|| format!("unreadable per-minute {:?}", per_minute_text))?;

    Ok(Metronome {
        beat_unit: beat_unit.to_string(),
        dotted: has_child(metronome_node, "beat-unit-dot"),
        per_minute,
    })
}

/// Quarter-note metronome from a `<sound tempo="...">` attribute
pub fn metronome_from_sound(sound_node: Node) -> Option<Metronome> {
    let bpm = sound_node.attribute("tempo")?.trim().parse::<f64>().ok()?;
    let rounded = bpm.round();
    if !rounded.is_finite() || rounded < 1.0 || rounded > u32::MAX as f64 {
        return None;
    }
    Some(Metronome {
        beat_unit: "quarter".to_string(),
        dotted: false,
        per_minute: rounded as u32,
    })
}
