//! Trust policy
//!
//! Every threshold the pipeline uses lives here and is passed in explicitly.
//! Policies can be written by hand or loaded from JSON or YAML; field names
//! are camelCase in both formats.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::PolicyError;

/// How a weak top-priority tier is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// A metadata score under the floor aborts the remaining tiers
    Strict,
    /// Every tier is always evaluated
    #[default]
    Permissive,
}

/// MIDI range a note must fall in to count as plausible (inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteRange {
    pub lowest: u8,
    pub highest: u8,
}

impl NoteRange {
    pub fn contains(&self, midi: i32) -> bool {
        (self.lowest as i32..=self.highest as i32).contains(&midi)
    }
}

impl Default for NoteRange {
    /// Piano range, A0 to C8
    fn default() -> Self {
        Self { lowest: 21, highest: 108 }
    }
}

pub const DEFAULT_TIER_WEIGHTS: [f64; 5] = [0.35, 0.25, 0.20, 0.12, 0.08];
pub const DEFAULT_STRICT_METADATA_FLOOR: u32 = 50;
pub const DEFAULT_ISSUE_LIMIT: usize = 100;

const BASIS_POINTS: u32 = 10_000;
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Policy {
    pub mode: Mode,
    /// Metadata confidence below this aborts a strict run (0-100)
    pub strict_metadata_floor: u32,
    /// Aggregation weights for tiers 1-5, highest priority first
    pub tier_weights: [f64; 5],
    pub note_range: NoteRange,
    /// Run independent validators on the rayon pool
    pub parallel: bool,
    /// Maximum issue strings kept per tier; `None` keeps all
    pub issue_limit: Option<usize>,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            mode: Mode::Permissive,
            strict_metadata_floor: DEFAULT_STRICT_METADATA_FLOOR,
            tier_weights: DEFAULT_TIER_WEIGHTS,
            note_range: NoteRange::default(),
            parallel: true,
            issue_limit: Some(DEFAULT_ISSUE_LIMIT),
        }
    }
}

impl Policy {
    pub fn strict() -> Self {
        Self {
            mode: Mode::Strict,
            ..Self::default()
        }
    }

    pub fn permissive() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_floor(mut self, floor: u32) -> Self {
        self.strict_metadata_floor = floor;
        self
    }

    /// Check every option; returns the first problem found
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.strict_metadata_floor > 100 {
            return Err(PolicyError::FloorOutOfRange(self.strict_metadata_floor));
        }
        if self.note_range.lowest > self.note_range.highest {
            return Err(PolicyError::EmptyNoteRange {
                lowest: self.note_range.lowest,
                highest: self.note_range.highest,
            });
        }
        TierWeights::from_fractions(&self.tier_weights)?;
        Ok(())
    }

    /// Validated aggregation weights
    pub fn weights(&self) -> Result<TierWeights, PolicyError> {
        TierWeights::from_fractions(&self.tier_weights)
    }

    pub fn from_json_str(text: &str) -> Result<Self, PolicyError> {
        let policy: Policy = serde_json::from_str(text)?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, PolicyError> {
        let policy: Policy = serde_yaml::from_str(text)?;
        policy.validate()?;
        Ok(policy)
    }

    /// Load a policy file, picking the format from its extension
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let text = std::fs::read_to_string(path)?;
        log::debug!("Loading {} policy from {}", extension, path.display());
        match extension.as_str() {
            "json" => Self::from_json_str(&text),
            "yaml" | "yml" => Self::from_yaml_str(&text),
            _ => Err(PolicyError::UnsupportedExtension(extension)),
        }
    }
}

/// Tier weights held as integer basis points summing to 10 000, so the
/// weighted sum is exact and reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierWeights {
    basis_points: [u32; 5],
}

impl TierWeights {
    pub fn from_fractions(weights: &[f64; 5]) -> Result<Self, PolicyError> {
        for (index, &value) in weights.iter().enumerate() {
            if !value.is_finite() || value < 0.0 {
                return Err(PolicyError::InvalidWeight { index: index + 1, value });
            }
        }
        let sum: f64 = weights.iter().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(PolicyError::WeightsSum(sum));
        }
        for rank in 1..weights.len() {
            if weights[rank] > weights[rank - 1] + WEIGHT_SUM_TOLERANCE {
                return Err(PolicyError::WeightsNotDescending {
                    rank: rank + 1,
                    higher: rank,
                });
            }
        }

        // Largest remainder: floor everything, then hand the missing points
        // to the biggest fractional parts, earlier tiers first on ties
        let scaled = weights.map(|w| w * BASIS_POINTS as f64);
        let mut basis_points = scaled.map(|w| w.floor() as u32);
        let mut by_remainder: Vec<usize> = (0..scaled.len()).collect();
        by_remainder.sort_by(|&a, &b| scaled[b].fract().total_cmp(&scaled[a].fract()));
        let residue = BASIS_POINTS.saturating_sub(basis_points.iter().sum()) as usize;
        for &index in by_remainder.iter().cycle().take(residue) {
            basis_points[index] += 1;
        }
        // Inputs are only non-increasing within tolerance
        basis_points.sort_unstable_by(|a, b| b.cmp(a));

        Ok(Self { basis_points })
    }

    pub fn basis_points(&self) -> &[u32; 5] {
        &self.basis_points
    }

    /// Weight of the tier at `index` (0-based) as a fraction
    pub fn fraction(&self, index: usize) -> f64 {
        self.basis_points[index] as f64 / BASIS_POINTS as f64
    }

    pub fn total_basis_points() -> u32 {
        BASIS_POINTS
    }
}

impl Default for TierWeights {
    fn default() -> Self {
        Self {
            basis_points: [3500, 2500, 2000, 1200, 800],
        }
    }
}
