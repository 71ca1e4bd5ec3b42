use super::StackTag;
use serde::{Deserialize, Serialize};

/// Facts pulled out of the tree by the rule that won classification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    /// Path of the file (or binary name, for compiled stacks) that starts the app.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_point: Option<String>,
    /// Dependency manifest, relative to the repository root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<String>,
    /// Declared runtime version, normalized to what base image tags expect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_version: Option<String>,
}

/// Result of classifying a checked-out tree.
///
/// `primary` is always populated; a tree nothing recognizes yields
/// [`StackProfile::unknown`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackProfile {
    pub primary: StackTag,
    pub tags: Vec<StackTag>,
    #[serde(flatten)]
    pub evidence: Evidence,
}

impl StackProfile {
    pub fn new(primary: StackTag) -> Self {
        Self {
            primary,
            tags: vec![primary],
            evidence: Evidence::default(),
        }
    }

    pub fn unknown() -> Self {
        Self::new(StackTag::Unknown)
    }

    pub fn with_evidence(mut self, evidence: Evidence) -> Self {
        self.evidence = evidence;
        self
    }

    /// Appends a tag unless it is already present.
    pub fn add_tag(&mut self, tag: StackTag) {
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
    }

    pub fn has_tag(&self, tag: StackTag) -> bool {
        self.tags.contains(&tag)
    }

    pub fn entry_point(&self) -> Option<&str> {
        self.evidence.entry_point.as_deref()
    }

    pub fn manifest(&self) -> Option<&str> {
        self.evidence.manifest.as_deref()
    }

    pub fn runtime_version(&self) -> Option<&str> {
        self.evidence.runtime_version.as_deref()
    }

    pub fn is_unknown(&self) -> bool {
        self.primary == StackTag::Unknown
    }
}
