//! Technology stack detection.
//!
//! A checkout is classified by an explicit, ordered table of rules
//! ([`rules::DEFAULT_RULES`]). Each rule pairs a condition over marker files
//! with the tags it emits and an extractor that pulls evidence (entry point,
//! manifest, runtime version) out of the tree.
//!
//! # Example
//!
//! ```no_run
//! use stackcraft::fs::RealFileSystem;
//! use stackcraft::stack::StackDetector;
//! use std::path::Path;
//!
//! let profile = StackDetector::new().detect(&RealFileSystem::new(), Path::new("."));
//! println!("{} {:?}", profile.primary, profile.tags);
//! ```

#[macro_use]
pub mod id_enum_macro;

pub mod detector;
pub mod extract;
pub mod profile;
pub mod rules;
pub mod tag;
pub mod tree;

pub use detector::StackDetector;
pub use profile::{Evidence, StackProfile};
pub use rules::{DetectionRule, Marker, Strength, DEFAULT_RULES};
pub use tag::StackTag;
pub use tree::Tree;
