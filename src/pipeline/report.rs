//! Validation report assembly

use serde::{Deserialize, Serialize};

use super::aggregator::aggregate;
use super::orchestrator::TierRun;
use crate::models::SourceTag;
use crate::normalize::CoercionIssue;
use crate::policy::{Mode, Policy, TierWeights};
use crate::validators::{Tier, ValidationResult};

/// The structured confidence report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// Always Metadata, Clefs, TimeSignatures, Tempos, Notes
    pub tiers: [ValidationResult; 5],
    pub overall_confidence: f64,
    pub processing_time_ms: u64,
    pub mode: Mode,
    pub aborted: bool,
    pub source: SourceTag,
}

impl ValidationReport {
    pub fn tier(&self, tier: Tier) -> &ValidationResult {
        &self.tiers[tier.index()]
    }

    pub fn confidences(&self) -> [u8; 5] {
        std::array::from_fn(|i| self.tiers[i].confidence)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Collects everything the report needs, then assembles it in one step
pub struct ReportBuilder<'a> {
    policy: &'a Policy,
    weights: &'a TierWeights,
    deferred: Vec<CoercionIssue>,
    source: SourceTag,
    processing_time_ms: u64,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(policy: &'a Policy, weights: &'a TierWeights) -> Self {
        Self {
            policy,
            weights,
            deferred: Vec::new(),
            source: SourceTag::default(),
            processing_time_ms: 0,
        }
    }

    pub fn deferred(mut self, deferred: Vec<CoercionIssue>) -> Self {
        self.deferred = deferred;
        self
    }

    pub fn source(mut self, source: SourceTag) -> Self {
        self.source = source;
        self
    }

    pub fn processing_time_ms(mut self, ms: u64) -> Self {
        self.processing_time_ms = ms;
        self
    }

    pub fn build(self, run: TierRun) -> ValidationReport {
        let mut tiers = run.results;

        for result in tiers.iter_mut() {
            let tier = result.tier();
            let mut issues: Vec<String> = self
                .deferred
                .iter()
                .filter(|issue| issue.tier == tier)
                .map(|issue| issue.message.clone())
                .collect();
            issues.append(&mut result.issues);
            result.issues = truncate_issues(issues, self.policy.issue_limit);
        }

        let overall_confidence = aggregate(&tiers, self.weights);
        ValidationReport {
            tiers,
            overall_confidence,
            processing_time_ms: self.processing_time_ms,
            mode: self.policy.mode,
            aborted: run.state.is_aborted(),
            source: self.source,
        }
    }
}

fn truncate_issues(mut issues: Vec<String>, limit: Option<usize>) -> Vec<String> {
    match limit {
        Some(limit) if issues.len() > limit => {
            let hidden = issues.len() - limit;
            issues.truncate(limit);
            issues.push(format!("… and {} more", hidden));
            issues
        }
        _ => issues,
    }
}
