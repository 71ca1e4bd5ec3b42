use super::profile::StackProfile;
use super::rules::{DetectionRule, Strength, DEFAULT_RULES};
use super::tree::Tree;
use crate::fs::FileSystem;
use std::path::Path;
use tracing::debug;

/// Classifies a checked-out tree by evaluating an ordered rule table.
///
/// Detection never fails. Trees that match no rule produce
/// [`StackProfile::unknown`], and unreadable marker files are treated as
/// absent.
#[derive(Debug, Clone, Copy)]
pub struct StackDetector {
    rules: &'static [DetectionRule],
}

impl StackDetector {
    pub fn new() -> Self {
        Self::with_rules(DEFAULT_RULES)
    }

    pub fn with_rules(rules: &'static [DetectionRule]) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[DetectionRule] {
        self.rules
    }

    pub fn detect(&self, fs: &dyn FileSystem, root: &Path) -> StackProfile {
        let tree = Tree::new(fs, root);

        let mut matched: Vec<&DetectionRule> = self
            .rules
            .iter()
            .filter(|rule| rule.strength != Strength::Heuristic)
            .filter(|rule| rule.matches(&tree))
            .collect();

        if matched.is_empty() {
            matched = self
                .rules
                .iter()
                .filter(|rule| rule.strength == Strength::Heuristic)
                .filter(|rule| rule.matches(&tree))
                .collect();
        }

        let Some(winner) = matched.first() else {
            debug!(root = %root.display(), "No detection rule matched, using generic profile");
            return StackProfile::unknown();
        };

        let extraction = (winner.extract)(&tree);
        let mut profile = StackProfile::new(winner.primary()).with_evidence(extraction.evidence);

        for rule in &matched {
            for tag in rule.tags {
                profile.add_tag(*tag);
            }
        }
        for tag in extraction.extra_tags {
            profile.add_tag(tag);
        }

        debug!(
            rule = winner.name,
            primary = %profile.primary,
            tags = ?profile.tags,
            entry_point = ?profile.evidence.entry_point,
            "Stack detected"
        );

        profile
    }
}

impl Default for StackDetector {
    fn default() -> Self {
        Self::new()
    }
}
