//! MusicXML normalizer
//!
//! Turns the raw MusicXML an OMR engine produced into a `ScoreDocument`.
//!
//! # Architecture
//!
//! ```text
//! MusicXML String
//!   ↓ [strip DOCTYPE, parse with roxmltree]
//! XML DOM
//!   ↓ [extract metadata, parts, measures]
//! ScoreDocument  +  deferred coercion issues  +  RepairPlan
//! ```
//!
//! Malformed fragments are repaired or dropped rather than failing the whole
//! conversion. Every such decision is recorded as a `CoercionIssue` tagged
//! with the tier it belongs to, and every decision that also changes the
//! cleaned output is recorded in the `RepairPlan`.

pub mod parser;

use num_rational::{Ratio, Rational32};
use roxmltree::{Document as XmlDocument, Node};
use std::collections::BTreeSet;

use crate::errors::MalformedDocument;
use crate::models::{
    Accidental, Articulation, Direction, Measure, Note, Part, Pitch, ScoreDocument, SourceTag,
};
use crate::policy::Mode;
use crate::validators::Tier;
use parser::{
    children_named, get_child, get_child_text, has_child, is_tempo_text, leading_number,
    metronome_from_sound, parse_clef, parse_divisions, parse_metronome, parse_pitch, parse_time, parse_unpitched,
    strip_doctype,
};

/// Grid non-tuplet durations are snapped to when the source is inexact
const SNAP_GRID: i32 = 256;

/// A non-fatal repair the normalizer made, reported on its owning tier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoercionIssue {
    pub tier: Tier,
    pub message: String,
}

impl CoercionIssue {
    pub fn new(tier: Tier, message: impl Into<String>) -> Self {
        Self {
            tier,
            message: message.into(),
        }
    }
}

/// Output-affecting repairs decided during normalization
///
/// Parts are identified by their position among the `<part>` elements, since
/// OMR output does not always carry unique ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairPlan {
    /// `<part>` positions to remove
    pub dropped_parts: BTreeSet<usize>,
    /// `<score-part>` ids to remove from the part list
    pub dropped_score_parts: BTreeSet<String>,
    /// `<part>` positions whose measures are renumbered 1..n
    pub renumbered_parts: BTreeSet<usize>,
}

impl RepairPlan {
    pub fn is_empty(&self) -> bool {
        self.dropped_parts.is_empty()
            && self.dropped_score_parts.is_empty()
            && self.renumbered_parts.is_empty()
    }

    pub fn drops_part(&self, position: usize) -> bool {
        self.dropped_parts.contains(&position)
    }

    pub fn drops_score_part(&self, id: &str) -> bool {
        self.dropped_score_parts.contains(id)
    }

    pub fn renumbers_part(&self, position: usize) -> bool {
        self.renumbered_parts.contains(&position)
    }
}

/// Result of normalization
#[derive(Debug, Clone)]
pub struct NormalizedScore {
    pub document: ScoreDocument,
    pub deferred: Vec<CoercionIssue>,
    pub repairs: RepairPlan,
}

/// Normalize a raw MusicXML document
///
/// Fails only when no `ScoreDocument` can be built at all: the input is not
/// XML, is not `score-partwise`, or (in strict mode) has no usable part.
pub fn normalize(xml: &str, mode: Mode) -> Result<NormalizedScore, MalformedDocument> {
    let source = strip_doctype(xml);
    let doc = XmlDocument::parse(&source)
        .map_err(|e| MalformedDocument::InvalidXml(e.to_string()))?;

    let root = doc.root_element();
    match root.tag_name().name() {
        "score-partwise" => {}
        "score-timewise" => {
            return Err(MalformedDocument::UnsupportedFormat(
                "score-timewise format (use score-partwise instead)".to_string(),
            ))
        }
        other => {
            return Err(MalformedDocument::UnsupportedFormat(format!(
                "expected <score-partwise>, found <{}>",
                other
            )))
        }
    }

    let mut normalizer = Normalizer::default();
    let document = normalizer.score(root);

    if document.parts.is_empty() {
        match mode {
            Mode::Strict => return Err(MalformedDocument::NoParts),
            Mode::Permissive => {
                log::warn!("Document has no usable parts; continuing with an empty score");
                normalizer.coerce(Tier::Metadata, "document contains no parts with measures");
            }
        }
    }

    log::debug!(
        "Normalized {} parts with {} coercions",
        document.parts.len(),
        normalizer.deferred.len()
    );

    Ok(NormalizedScore {
        document,
        deferred: normalizer.deferred,
        repairs: normalizer.repairs,
    })
}

/// Per-part parsing state that carries across measures
struct PartState {
    divisions: u32,
    last_number: Option<u32>,
    numbering_gaps: usize,
}

impl Default for PartState {
    fn default() -> Self {
        Self {
            divisions: 1,
            last_number: None,
            numbering_gaps: 0,
        }
    }
}

#[derive(Default)]
struct Normalizer {
    deferred: Vec<CoercionIssue>,
    repairs: RepairPlan,
}

impl Normalizer {
    fn coerce(&mut self, tier: Tier, message: impl Into<String>) {
        let issue = CoercionIssue::new(tier, message);
        log::debug!("Coercion [{}]: {}", issue.tier, issue.message);
        self.deferred.push(issue);
    }

    fn score(&mut self, root: Node) -> ScoreDocument {
        let names = self.part_names(root);

        let mut parts = Vec::new();
        let mut seen_ids: BTreeSet<String> = BTreeSet::new();
        for (position, part_node) in children_named(root, "part").enumerate() {
            let id = part_node
                .attribute("id")
                .map(str::to_string)
                .unwrap_or_else(|| format!("P{}", position + 1));
            seen_ids.insert(id.clone());
            let name = names
                .iter()
                .find(|(listed, _)| *listed == id)
                .map(|(_, name)| name.clone())
                .unwrap_or_default();
            if let Some(part) = self.part(position, part_node, id, name) {
                parts.push(part);
            }
        }

        // part-list entries with no music at all
        for (id, _) in &names {
            if !seen_ids.contains(id) {
                self.coerce(
                    Tier::Metadata,
                    format!("part-list entry {} has no music and was dropped", id),
                );
                self.repairs.dropped_score_parts.insert(id.clone());
            }
        }

        ScoreDocument {
            title: extract_title(root),
            composer: extract_composer(root),
            parts,
            source: extract_source(root),
        }
    }

    /// `(id, part-name)` pairs in part-list order
    fn part_names(&mut self, root: Node) -> Vec<(String, String)> {
        let mut names = Vec::new();
        let Some(part_list) = get_child(root, "part-list") else {
            self.coerce(Tier::Metadata, "part-list is missing; instrument names are unavailable");
            return names;
        };
        for score_part in children_named(part_list, "score-part") {
            if let Some(id) = score_part.attribute("id") {
                let name = get_child_text(score_part, "part-name").unwrap_or_default();
                names.push((id.to_string(), name.to_string()));
            }
        }
        names
    }

    fn part(&mut self, position: usize, node: Node, id: String, name: String) -> Option<Part> {
        let mut part = Part::new(id, name);
        let measure_nodes: Vec<Node> = children_named(node, "measure").collect();

        if measure_nodes.is_empty() {
            self.coerce(
                Tier::Metadata,
                format!("part {} has no measures and was dropped", part.label()),
            );
            self.repairs.dropped_parts.insert(position);
            self.repairs.dropped_score_parts.insert(part.id.clone());
            return None;
        }

        let mut state = PartState::default();
        let mut renumbered = false;
        for measure_node in measure_nodes {
            let index = part.measures.len() as u32 + 1;
            let source_number = measure_node.attribute("number").map(|n| n.trim().to_string());
            if source_number.as_deref() != Some(index.to_string().as_str()) {
                renumbered = true;
            }
            self.check_numbering(&part, &mut state, source_number.as_deref());

            let measure = self.measure(&part, &mut state, measure_node, index, source_number);
            part.push_measure(measure);
        }

        if renumbered {
            self.repairs.renumbered_parts.insert(position);
            if state.numbering_gaps == 0 {
                self.coerce(
                    Tier::Notes,
                    format!(
                        "part {}: measure numbers rewritten to run 1-{}",
                        part.label(),
                        part.measures.len()
                    ),
                );
            }
        }
        Some(part)
    }

    fn check_numbering(&mut self, part: &Part, state: &mut PartState, number: Option<&str>) {
        let Some(number) = number.and_then(leading_number) else {
            return;
        };
        if let Some(previous) = state.last_number {
            if previous.checked_add(1).map_or(false, |next| number > next) {
                state.numbering_gaps += 1;
                self.coerce(
                    Tier::Notes,
                    format!(
                        "part {}: measure numbering jumps from {} to {}; gap closed",
                        part.label(),
                        previous,
                        number
                    ),
                );
            }
        }
        state.last_number = Some(number);
    }

    fn measure(
        &mut self,
        part: &Part,
        state: &mut PartState,
        node: Node,
        index: u32,
        source_number: Option<String>,
    ) -> Measure {
        let mut measure = Measure::new(index);
        measure.source_number = source_number;
        measure.implicit = node.attribute("implicit") == Some("yes");
        let location = format!("part {}, measure {}", part.label(), index);

        for child in node.children().filter(|n| n.is_element()) {
            match child.tag_name().name() {
                "attributes" => self.attributes(state, child, &mut measure, &location),
                "direction" => {
                    if let Some(direction) = self.direction(child, &location) {
                        measure.directions.push(direction);
                    }
                }
                "sound" => {
                    if let Some(metronome) = metronome_from_sound(child) {
                        measure.directions.push(Direction {
                            text: None,
                            metronome: Some(metronome),
                        });
                    }
                }
                "note" => {
                    if let Some(note) = self.note(state, child, &location) {
                        measure.notes.push(note);
                    }
                }
                _ => {}
            }
        }
        measure
    }

    fn attributes(&mut self, state: &mut PartState, node: Node, measure: &mut Measure, location: &str) {
        match parse_divisions(node) {
            Some(Ok(divisions)) => state.divisions = divisions,
            Some(Err(reason)) => self.coerce(
                Tier::Notes,
                format!("{}: {}; keeping {} per quarter", location, reason, state.divisions),
            ),
            None => {}
        }

        for time_node in children_named(node, "time") {
            match parse_time(time_node) {
                Ok(ts) => {
                    if measure.time_signature.is_none() {
                        measure.time_signature = Some(ts);
                    }
                }
                Err(reason) => self.coerce(
                    Tier::TimeSignatures,
                    format!("{}: {}; time signature ignored", location, reason),
                ),
            }
        }

        for clef_node in children_named(node, "clef") {
            let (clef, coercion) = parse_clef(clef_node);
            if let Some(reason) = coercion {
                self.coerce(Tier::Clefs, format!("{}: {}", location, reason));
            }
            measure.clefs.push(clef);
        }
    }

    fn direction(&mut self, node: Node, location: &str) -> Option<Direction> {
        let mut words: Vec<&str> = Vec::new();
        let mut metronome = None;

        for direction_type in children_named(node, "direction-type") {
            for child in direction_type.children().filter(|n| n.is_element()) {
                match child.tag_name().name() {
                    "words" => {
                        if let Some(text) = child.text().map(str::trim).filter(|t| !t.is_empty()) {
                            words.push(text);
                        }
                    }
                    "metronome" => match parse_metronome(child) {
                        Ok(mark) => {
                            if metronome.is_none() {
                                metronome = Some(mark);
                            }
                        }
                        Err(reason) => self.coerce(
                            Tier::Tempos,
                            format!("{}: {}; metronome mark ignored", location, reason),
                        ),
                    },
                    _ => {}
                }
            }
        }

        if metronome.is_none() {
            metronome = get_child(node, "sound").and_then(metronome_from_sound);
        }
        let text = words.join(" ");
        let text = (!text.is_empty() && is_tempo_text(&text)).then_some(text);

        let direction = Direction { text, metronome };
        direction.is_tempo_marking().then_some(direction)
    }

    fn note(&mut self, state: &PartState, node: Node, location: &str) -> Option<Note> {
        if has_child(node, "grace") {
            return None;
        }

        let divisions = match get_child_text(node, "duration").and_then(|d| d.parse::<u32>().ok()) {
            Some(d) if d > 0 => d,
            _ => {
                self.coerce(Tier::Notes, format!("{}: note without a usable duration dropped", location));
                return None;
            }
        };
        let (Ok(numer), Ok(denom)) = (
            i32::try_from(divisions),
            i32::try_from(u64::from(state.divisions) * 4),
        ) else {
            self.coerce(Tier::Notes, format!("{}: note duration out of range dropped", location));
            return None;
        };

        let mut duration = Rational32::new(numer, denom);
        let tuplet = has_child(node, "time-modification");
        if !tuplet && !(*duration.denom() as u32).is_power_of_two() {
            // scaled in i64 so long notes at odd divisions cannot overflow
            let scaled = Ratio::new(
                i64::from(*duration.numer()) * i64::from(SNAP_GRID),
                i64::from(*duration.denom()),
            );
            let Ok(snapped) = i32::try_from(scaled.round().to_integer().max(1)) else {
                self.coerce(Tier::Notes, format!("{}: note duration out of range dropped", location));
                return None;
            };
            let repaired = Rational32::new(snapped, SNAP_GRID);
            self.coerce(
                Tier::Notes,
                format!("{}: inexact duration {} snapped to {}", location, duration, repaired),
            );
            duration = repaired;
        }

        let pitch = if has_child(node, "rest") {
            None
        } else if let Some(pitch_node) = get_child(node, "pitch") {
            self.pitch_or_rest(parse_pitch(pitch_node), location)
        } else if let Some(unpitched_node) = get_child(node, "unpitched") {
            self.pitch_or_rest(parse_unpitched(unpitched_node), location)
        } else {
            self.coerce(Tier::Notes, format!("{}: note without pitch treated as a rest", location));
            None
        };

        let mut note = match pitch {
            Some(pitch) => Note::pitched(pitch, duration),
            None => Note::rest(duration),
        };
        if let Some(accidental) = get_child_text(node, "accidental") {
            note.accidental = Accidental::from_musicxml(accidental);
        }
        note.voice = get_child_text(node, "voice")
            .and_then(|v| v.parse().ok())
            .unwrap_or(1);
        note.staff = get_child_text(node, "staff")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1);
        note.chord = has_child(node, "chord");

        for notations in children_named(node, "notations") {
            for child in notations.children().filter(|n| n.is_element()) {
                match child.tag_name().name() {
                    "articulations" => {
                        for articulation in child.children().filter(|n| n.is_element()) {
                            note.articulations
                                .insert(Articulation::from_musicxml(articulation.tag_name().name()));
                        }
                    }
                    "fermata" => {
                        note.articulations.insert(Articulation::Fermata);
                    }
                    _ => {}
                }
            }
        }

        Some(note)
    }

    fn pitch_or_rest(
        &mut self,
        parsed: Result<Pitch, String>,
        location: &str,
    ) -> Option<Pitch> {
        match parsed {
            Ok(pitch) => Some(pitch),
            Err(reason) => {
                self.coerce(Tier::Notes, format!("{}: {}; note treated as a rest", location, reason));
                None
            }
        }
    }
}

// ============================================================================
// METADATA
// ============================================================================

/// movement-title first, then work/work-title
fn extract_title(root: Node) -> String {
    if let Some(title) = get_child_text(root, "movement-title") {
        return title.to_string();
    }
    get_child(root, "work")
        .and_then(|work| get_child_text(work, "work-title"))
        .unwrap_or_default()
        .to_string()
}

/// creator type="composer" first, then the first untyped creator
fn extract_composer(root: Node) -> Option<String> {
    let identification = get_child(root, "identification")?;
    let creators: Vec<Node> = children_named(identification, "creator").collect();

    let text_of = |n: &Node| n.text().map(str::trim).filter(|t| !t.is_empty()).map(str::to_string);

    creators
        .iter()
        .filter(|c| c.attribute("type") == Some("composer"))
        .find_map(text_of)
        .or_else(|| {
            creators
                .iter()
                .filter(|c| c.attribute("type").is_none())
                .find_map(text_of)
        })
}

/// identification/encoding/software, e.g. "Audiveris 5.3"
fn extract_source(root: Node) -> SourceTag {
    get_child(root, "identification")
        .and_then(|id| get_child(id, "encoding"))
        .and_then(|enc| get_child_text(enc, "software"))
        .map(|s| SourceTag(s.to_string()))
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
