//! Pitch representation for recognized notes
//!
//! Western pitch spelled the way MusicXML spells it: a step letter, a
//! semitone alteration and an octave (C4 = middle C).

use serde::{Deserialize, Serialize};
use std::fmt;

const STEP_NAMES: [char; 7] = ['C', 'D', 'E', 'F', 'G', 'A', 'B'];
const STEP_SEMITONES: [i32; 7] = [0, 2, 4, 5, 7, 9, 11];

/// Musical pitch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pitch {
    /// Scale degree (0=C, 1=D, 2=E, 3=F, 4=G, 5=A, 6=B)
    pub step: u8,

    /// Semitone alteration (-2=double flat ... +2=double sharp)
    pub alter: i8,

    /// Octave number (4 = middle C octave)
    pub octave: i8,
}

impl Pitch {
    /// Create a new pitch with validation
    pub fn new(step: u8, alter: i8, octave: i8) -> Result<Self, String> {
        if step > 6 {
            return Err(format!("Invalid step: {} (must be 0-6)", step));
        }
        if !(-2..=2).contains(&alter) {
            return Err(format!("Invalid alteration: {} (must be -2 to +2)", alter));
        }
        if !(-1..=9).contains(&octave) {
            return Err(format!("Invalid octave: {} (must be -1 to 9)", octave));
        }
        Ok(Self { step, alter, octave })
    }

    /// Parse a MusicXML step letter into a scale degree
    pub fn step_from_letter(letter: &str) -> Option<u8> {
        let mut chars = letter.trim().chars();
        let first = chars.next()?.to_ascii_uppercase();
        if chars.next().is_some() {
            return None;
        }
        STEP_NAMES.iter().position(|&c| c == first).map(|i| i as u8)
    }

    /// MIDI note number (60 = C4). Not clamped, so out-of-range pitches stay
    /// out of range for plausibility checks.
    pub fn midi_number(&self) -> i32 {
        STEP_SEMITONES[self.step as usize] + self.alter as i32 + (self.octave as i32 + 1) * 12
    }

    pub fn step_letter(&self) -> char {
        STEP_NAMES[self.step as usize]
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let accidental = match self.alter {
            -2 => "bb",
            -1 => "b",
            1 => "#",
            2 => "##",
            _ => "",
        };
        write!(f, "{}{}{}", self.step_letter(), accidental, self.octave)
    }
}

/// Name a MIDI number the way issue messages show pitches (sharps only)
pub fn midi_name(midi: i32) -> String {
    const NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];
    let octave = midi.div_euclid(12) - 1;
    format!("{}{}", NAMES[midi.rem_euclid(12) as usize], octave)
}

/// Written accidental on a note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accidental {
    Sharp,
    Flat,
    Natural,
    #[default]
    None,
}

impl Accidental {
    /// Map a MusicXML `<accidental>` value
    pub fn from_musicxml(value: &str) -> Self {
        match value.trim() {
            "sharp" | "double-sharp" | "sharp-sharp" | "natural-sharp" => Accidental::Sharp,
            "flat" | "flat-flat" | "natural-flat" => Accidental::Flat,
            "natural" => Accidental::Natural,
            _ => Accidental::None,
        }
    }

    /// Derive the accidental implied by an alteration when no glyph is given
    pub fn from_alter(alter: i8) -> Self {
        match alter {
            a if a > 0 => Accidental::Sharp,
            a if a < 0 => Accidental::Flat,
            _ => Accidental::None,
        }
    }
}
