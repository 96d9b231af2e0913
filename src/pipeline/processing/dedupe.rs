use std::collections::HashMap;
use tracing::debug;

use crate::pipeline::processing::normalize::NormalizedLead;
use crate::types::CompanySize;

/// Result of offering one lead to the deduplicator
#[derive(Debug, Clone, PartialEq)]
pub enum DedupOutcome {
    /// First lead seen for this identity
    New,
    /// Folded into an earlier lead with the same identity
    Merged {
        /// Names of the fields the duplicate filled in
        filled_fields: Vec<String>,
    },
}

/// Identity-keyed merge of leads within one run.
///
/// The first lead seen for an identity keeps its name, website, data source
/// and every field it already has. Later duplicates only fill what is
/// missing, so the output does not depend on how many times a lead is fed
/// back in.
#[derive(Debug, Default)]
pub struct Deduplicator {
    index: HashMap<String, usize>,
    leads: Vec<NormalizedLead>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a lead to the index
    pub fn insert(&mut self, lead: NormalizedLead) -> DedupOutcome {
        match self.index.get(&lead.identity_key) {
            Some(&position) => {
                let existing = &mut self.leads[position];
                let filled_fields = merge_into(existing, lead);
                debug!(
                    "Merged duplicate into '{}' ({}), filled: {:?}",
                    existing.name, existing.identity_key, filled_fields
                );
                DedupOutcome::Merged { filled_fields }
            }
            None => {
                self.index.insert(lead.identity_key.clone(), self.leads.len());
                self.leads.push(lead);
                DedupOutcome::New
            }
        }
    }

    /// Deduplicate a whole batch, preserving first-seen order
    pub fn dedupe(&mut self, leads: impl IntoIterator<Item = NormalizedLead>) -> Vec<NormalizedLead> {
        for lead in leads {
            self.insert(lead);
        }
        self.leads.clone()
    }

    /// Unique leads collected so far, in first-seen order
    pub fn leads(&self) -> &[NormalizedLead] {
        &self.leads
    }

    pub fn len(&self) -> usize {
        self.leads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leads.is_empty()
    }

    /// Hand over the unique leads and leave the index empty
    pub fn take(&mut self) -> Vec<NormalizedLead> {
        self.index.clear();
        std::mem::take(&mut self.leads)
    }

    pub fn reset(&mut self) {
        self.index.clear();
        self.leads.clear();
    }
}

fn fill<T>(target: &mut Option<T>, source: Option<T>, field: &str, filled: &mut Vec<String>) {
    if target.is_none() && source.is_some() {
        *target = source;
        filled.push(field.to_string());
    }
}

/// A concrete bucket also replaces `Unknown`, which says nothing about size
fn fill_company_size(
    existing: &mut NormalizedLead,
    size: Option<CompanySize>,
    text: Option<String>,
    filled: &mut Vec<String>,
) {
    let replace = match (existing.company_size, size) {
        (None, Some(_)) => true,
        (Some(CompanySize::Unknown), Some(incoming)) => incoming != CompanySize::Unknown,
        _ => false,
    };
    if replace {
        existing.company_size = size;
        existing.company_size_text = text;
        filled.push("company_size".to_string());
    }
}

/// Union `duplicate` into `existing`; returns the fields that were filled
fn merge_into(existing: &mut NormalizedLead, duplicate: NormalizedLead) -> Vec<String> {
    let mut filled = Vec::new();

    fill(&mut existing.industry, duplicate.industry, "industry", &mut filled);
    fill(&mut existing.linkedin, duplicate.linkedin, "linkedin", &mut filled);
    fill(&mut existing.email, duplicate.email, "email", &mut filled);
    fill_company_size(existing, duplicate.company_size, duplicate.company_size_text, &mut filled);
    fill(&mut existing.pain_points, duplicate.pain_points, "pain_points", &mut filled);

    // earliest sighting wins
    match (existing.discovered_at, duplicate.discovered_at) {
        (None, Some(later)) => {
            existing.discovered_at = Some(later);
            filled.push("discovered_at".to_string());
        }
        (Some(current), Some(other)) if other < current => existing.discovered_at = Some(other),
        _ => {}
    }

    for (key, value) in duplicate.hints {
        if !existing.hints.contains_key(&key) {
            filled.push(key.clone());
            existing.hints.insert(key, value);
        }
    }

    let sources = std::iter::once(duplicate.data_source).chain(duplicate.merged_sources);
    for source in sources {
        if source != existing.data_source && !existing.merged_sources.contains(&source) {
            existing.merged_sources.push(source);
        }
    }

    for warning in duplicate.normalization.warnings {
        if !existing.normalization.warnings.contains(&warning) {
            existing.normalization.warnings.push(warning);
        }
    }

    filled
}
