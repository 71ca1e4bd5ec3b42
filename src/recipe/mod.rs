//! Recipe (Dockerfile) synthesis and syntax checking.

pub mod generator;
pub mod instruction;
pub mod template;
pub mod validation;

pub use generator::RecipeGenerator;
pub use instruction::Instruction;
pub use template::{PackageManager, Template, TemplateContext};
pub use validation::{ParsedInstruction, ValidationRule, Validator};

use crate::stack::StackProfile;
use std::fmt;

/// Generated Dockerfile text, the template that produced it, and the
/// profile it was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    text: String,
    template: Template,
    profile: StackProfile,
}

impl Recipe {
    pub fn new(text: String, template: Template, profile: StackProfile) -> Self {
        Self {
            text,
            template,
            profile,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn template(&self) -> Template {
        self.template
    }

    pub fn profile(&self) -> &StackProfile {
        &self.profile
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
