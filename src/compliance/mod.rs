//! Derived compliance metrics: implementation percentage and keyword-based
//! evidence-to-control suggestions.

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

pub const IMPLEMENTED: &str = "implemented";
pub const NOT_APPLICABLE: &str = "not_applicable";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplianceScore {
    pub total: usize,
    pub applicable: usize,
    pub implemented: usize,
    pub percentage: Decimal,
    pub by_status: BTreeMap<String, usize>,
}

/// Percentage of applicable controls that are implemented, one decimal place.
/// `not_applicable` controls are excluded from the denominator.
pub fn compliance_score<'a>(statuses: impl IntoIterator<Item = &'a str>) -> ComplianceScore {
    let mut by_status: BTreeMap<String, usize> = BTreeMap::new();
    for status in statuses {
        *by_status.entry(status.to_string()).or_default() += 1;
    }

    let total: usize = by_status.values().sum();
    let not_applicable = by_status.get(NOT_APPLICABLE).copied().unwrap_or(0);
    let implemented = by_status.get(IMPLEMENTED).copied().unwrap_or(0);
    let applicable = total - not_applicable;

    let percentage = if applicable == 0 {
        Decimal::ZERO
    } else {
        (Decimal::from(implemented as u64) * Decimal::ONE_HUNDRED / Decimal::from(applicable as u64)).round_dp(1)
    };

    ComplianceScore {
        total,
        applicable,
        implemented,
        percentage,
        by_status,
    }
}

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "with", "that", "this", "from", "all", "any", "not", "into", "its", "has",
    "have", "been", "was", "were", "will", "shall", "must", "should", "may", "such", "each", "other", "than",
    "then", "their", "they", "them", "which", "who", "when", "where", "also", "only", "per", "via", "our",
];

/// Lowercase keyword set of a piece of text
pub fn keywords(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|word| word.chars().count() >= 3 && !STOPWORDS.contains(&word.as_str()))
        .collect()
}

/// Control fields considered when matching evidence
#[derive(Debug, Clone)]
pub struct ControlText<'a> {
    pub id: i64,
    pub code: &'a str,
    pub title: &'a str,
    pub description: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvidenceSuggestion {
    pub control_id: i64,
    pub code: String,
    pub title: String,
    pub score: usize,
    pub matched_keywords: Vec<String>,
}

/// Rank controls by the number of keywords they share with the evidence text.
/// Ties are ordered by control code.
pub fn suggest_evidence_mappings(evidence_text: &str, controls: &[ControlText<'_>], limit: usize) -> Vec<EvidenceSuggestion> {
    let evidence = keywords(evidence_text);
    if evidence.is_empty() {
        return Vec::new();
    }

    let mut suggestions: Vec<EvidenceSuggestion> = controls
        .iter()
        .filter_map(|control| {
            let mut text = format!("{} {}", control.code, control.title);
            if let Some(description) = control.description {
                text.push(' ');
                text.push_str(description);
            }

            let matched: Vec<String> = keywords(&text).intersection(&evidence).cloned().collect();
            if matched.is_empty() {
                return None;
            }

            Some(EvidenceSuggestion {
                control_id: control.id,
                code: control.code.to_string(),
                title: control.title.to_string(),
                score: matched.len(),
                matched_keywords: matched,
            })
        })
        .collect();

    suggestions.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.code.cmp(&b.code)));
    suggestions.truncate(limit);
    suggestions
}
