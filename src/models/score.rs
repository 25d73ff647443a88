//! Score document model
//!
//! `ScoreDocument` is built once per conversion by the normalizer and is read
//! (never written) by every validator. Measure indices are 1-based and
//! contiguous within a part.

use num_rational::Rational32;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::ops::RangeInclusive;

use super::pitch::{Accidental, Pitch};

/// Note length in whole notes (a quarter note is 1/4)
pub type Duration = Rational32;

/// Which recognizer produced the document. Informational only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceTag(pub String);

impl SourceTag {
    pub fn unknown() -> Self {
        SourceTag("unknown".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SourceTag {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Root of the document model
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScoreDocument {
    pub title: String,
    pub composer: Option<String>,
    pub parts: Vec<Part>,
    pub source: SourceTag,
}

impl ScoreDocument {
    /// Number of measures in the longest part
    pub fn max_measures(&self) -> usize {
        self.parts.iter().map(|p| p.measures.len()).max().unwrap_or(0)
    }
}

/// One instrument or staff group
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Part {
    /// MusicXML part id (e.g. "P1")
    pub id: String,
    /// Instrument label, possibly empty
    pub name: String,
    pub measures: Vec<Measure>,
}

impl Part {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            measures: Vec::new(),
        }
    }

    /// Append a measure, assigning it the next contiguous index
    pub fn push_measure(&mut self, mut measure: Measure) {
        measure.index = self.measures.len() as u32 + 1;
        self.measures.push(measure);
    }

    /// Label used in issue messages
    pub fn label(&self) -> String {
        if self.name.is_empty() {
            self.id.clone()
        } else {
            format!("{} ({})", self.id, self.name)
        }
    }
}

/// One bar of one part
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Measure {
    /// 1-based position within the part
    pub index: u32,
    /// The `number` attribute as it appeared in the source
    pub source_number: Option<String>,
    /// Pickup or otherwise uncounted measure (`implicit="yes"`)
    pub implicit: bool,
    /// Clefs appearing in this measure, in document order
    pub clefs: Vec<Clef>,
    pub time_signature: Option<TimeSignature>,
    pub directions: Vec<Direction>,
    pub notes: Vec<Note>,
}

impl Measure {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }
}

/// Closed set of clef families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClefSign {
    Treble,
    Bass,
    Alto,
    Tenor,
    Percussion,
    Other,
}

impl ClefSign {
    /// Map a MusicXML `<sign>`/`<line>` pair. `None` for signs outside the
    /// closed set; the caller decides how to record the coercion.
    pub fn from_musicxml(sign: &str, line: Option<i8>) -> Option<Self> {
        match sign.trim() {
            "G" => Some(ClefSign::Treble),
            "F" => Some(ClefSign::Bass),
            "C" if line == Some(4) => Some(ClefSign::Tenor),
            "C" => Some(ClefSign::Alto),
            "percussion" => Some(ClefSign::Percussion),
            _ => None,
        }
    }

    /// Staff line a MusicXML sign sits on when `<line>` is omitted
    pub fn standard_line(sign: &str) -> i8 {
        match sign.trim() {
            "G" => 2,
            "F" => 4,
            "C" => 3,
            _ => 0,
        }
    }

    /// MIDI range a passage written in this clef normally sits in
    pub fn plausible_range(self) -> Option<RangeInclusive<i32>> {
        match self {
            ClefSign::Treble => Some(55..=96),
            ClefSign::Bass => Some(28..=67),
            ClefSign::Alto => Some(48..=79),
            ClefSign::Tenor => Some(43..=74),
            ClefSign::Percussion | ClefSign::Other => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ClefSign::Treble => "treble",
            ClefSign::Bass => "bass",
            ClefSign::Alto => "alto",
            ClefSign::Tenor => "tenor",
            ClefSign::Percussion => "percussion",
            ClefSign::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clef {
    pub sign: ClefSign,
    pub line: i8,
    /// Staff within the part (1 unless the part is multi-staff)
    pub staff: u8,
}

impl Clef {
    pub fn new(sign: ClefSign, line: i8) -> Self {
        Self { sign, line, staff: 1 }
    }

    pub fn on_staff(mut self, staff: u8) -> Self {
        self.staff = staff;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeSignature {
    pub beats: u32,
    pub beat_type: u32,
}

impl TimeSignature {
    /// `None` unless beats is positive and beat type a power of two
    pub fn new(beats: u32, beat_type: u32) -> Option<Self> {
        if beats == 0 || !beat_type.is_power_of_two() || beats > i32::MAX as u32 {
            return None;
        }
        Some(Self { beats, beat_type })
    }

    /// Numerator not a power of two and greater than 3 (6/8, 9/8, 12/8 ...)
    pub fn is_compound(&self) -> bool {
        !self.beats.is_power_of_two() && self.beats > 3
    }

    /// Length of a full measure in whole notes
    pub fn measure_length(&self) -> Duration {
        Rational32::new(self.beats as i32, self.beat_type as i32)
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self { beats: 4, beat_type: 4 }
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.beats, self.beat_type)
    }
}

/// Numeric tempo indication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metronome {
    /// MusicXML note type name ("quarter", "half" ...)
    pub beat_unit: String,
    pub dotted: bool,
    pub per_minute: u32,
}

impl fmt::Display for Metronome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self.beat_unit.as_str() {
            "quarter" => "♩".to_string(),
            "half" => "𝅗𝅥".to_string(),
            "eighth" => "♪".to_string(),
            other => other.to_string(),
        };
        let dot = if self.dotted { "." } else { "" };
        write!(f, "{}{}={}", unit, dot, self.per_minute)
    }
}

/// Tempo word and/or metronome mark
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Direction {
    pub text: Option<String>,
    pub metronome: Option<Metronome>,
}

impl Direction {
    pub fn is_tempo_marking(&self) -> bool {
        self.text.is_some() || self.metronome.is_some()
    }

    /// Human-readable form used in the report
    pub fn display(&self) -> String {
        match (&self.text, &self.metronome) {
            (Some(text), Some(mark)) => format!("{} ({})", text, mark),
            (Some(text), None) => text.clone(),
            (None, Some(mark)) => mark.to_string(),
            (None, None) => String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Articulation {
    Accent,
    Staccato,
    Staccatissimo,
    Tenuto,
    Marcato,
    Fermata,
    Other,
}

impl Articulation {
    pub fn from_musicxml(tag: &str) -> Self {
        match tag {
            "accent" => Articulation::Accent,
            "staccato" => Articulation::Staccato,
            "staccatissimo" => Articulation::Staccatissimo,
            "tenuto" => Articulation::Tenuto,
            "strong-accent" => Articulation::Marcato,
            "fermata" => Articulation::Fermata,
            _ => Articulation::Other,
        }
    }
}

/// A note or rest
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    /// `None` for rests
    pub pitch: Option<Pitch>,
    pub duration: Duration,
    pub accidental: Accidental,
    pub articulations: BTreeSet<Articulation>,
    pub voice: u8,
    pub staff: u8,
    /// Chord member sounding with the previous note (does not advance time)
    pub chord: bool,
}

impl Note {
    pub fn pitched(pitch: Pitch, duration: Duration) -> Self {
        Self {
            pitch: Some(pitch),
            duration,
            accidental: Accidental::from_alter(pitch.alter),
            articulations: BTreeSet::new(),
            voice: 1,
            staff: 1,
            chord: false,
        }
    }

    pub fn rest(duration: Duration) -> Self {
        Self {
            pitch: None,
            duration,
            accidental: Accidental::None,
            articulations: BTreeSet::new(),
            voice: 1,
            staff: 1,
            chord: false,
        }
    }

    pub fn in_voice(mut self, voice: u8) -> Self {
        self.voice = voice;
        self
    }

    pub fn on_staff(mut self, staff: u8) -> Self {
        self.staff = staff;
        self
    }

    pub fn as_chord(mut self) -> Self {
        self.chord = true;
        self
    }

    pub fn is_rest(&self) -> bool {
        self.pitch.is_none()
    }
}
