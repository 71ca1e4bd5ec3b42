//! Output formatting for multiple formats
//!
//! Generation results render as JSON, YAML, human-readable text, or the bare
//! recipe so `stackcraft generate URL -f dockerfile > Dockerfile` works.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::build::BuildResult;
use crate::config::StackcraftConfig;
use crate::pipeline::Generation;
use crate::publish::PublishResult;
use crate::stack::StackProfile;

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    Human,
    /// The recipe text only; other results fall back to human text.
    Dockerfile,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationView<'a> {
    dockerfile: &'a str,
    template: &'static str,
    tech_stack: &'a StackProfile,
}

impl<'a> From<&'a Generation> for GenerationView<'a> {
    fn from(generation: &'a Generation) -> Self {
        Self {
            dockerfile: generation.recipe.text(),
            template: generation.recipe.template().name(),
            tech_stack: &generation.profile,
        }
    }
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_generation(&self, generation: &Generation) -> Result<String> {
        let view = GenerationView::from(generation);
        match self.format {
            OutputFormat::Json => to_json(&view),
            OutputFormat::Yaml => to_yaml(&view),
            OutputFormat::Dockerfile => Ok(generation.recipe.text().to_string()),
            OutputFormat::Human => Ok(human_generation(generation)),
        }
    }

    pub fn format_build(&self, result: &BuildResult) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(result),
            OutputFormat::Yaml => to_yaml(result),
            OutputFormat::Human | OutputFormat::Dockerfile => {
                let mut output = String::new();
                output.push_str("\u{2713} Build completed\n");
                output.push_str(RULE);
                output.push_str("\n\n");
                output.push_str(&format!("Image:  {}\n", result.image_tag));
                if let Some(id) = &result.image_id {
                    output.push_str(&format!("ID:     {}\n", id));
                }
                Ok(output)
            }
        }
    }

    pub fn format_publish(&self, result: &PublishResult) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(result),
            OutputFormat::Yaml => to_yaml(result),
            OutputFormat::Human | OutputFormat::Dockerfile => Ok(format!(
                "\u{2713} Recipe pushed\n{}\n\nBranch:  {}\nCommit:  {}\n",
                RULE, result.branch, result.commit
            )),
        }
    }

    pub fn format_config(&self, config: &StackcraftConfig) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(&config.to_display_map()),
            OutputFormat::Yaml => to_yaml(&config.to_display_map()),
            OutputFormat::Human | OutputFormat::Dockerfile => Ok(config.to_string()),
        }
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize output to JSON")
}

fn to_yaml<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_yaml::to_string(value).context("Failed to serialize output to YAML")
}

fn human_generation(generation: &Generation) -> String {
    let profile = &generation.profile;
    let mut output = String::new();

    if profile.is_unknown() {
        output.push_str("\u{26A0} Stack not recognized (generic recipe)\n");
    } else {
        output.push_str("\u{2713} Stack Detection Result\n");
    }
    output.push_str(RULE);
    output.push_str("\n\n");

    output.push_str(&format!("Primary:   {}\n", profile.primary));
    let tags: Vec<String> = profile.tags.iter().map(|t| t.to_string()).collect();
    output.push_str(&format!("Tags:      {}\n", tags.join(", ")));
    output.push_str(&format!("Template:  {}\n", generation.recipe.template().name()));

    let evidence = [
        ("Manifest", profile.manifest()),
        ("Entry", profile.entry_point()),
        ("Runtime", profile.runtime_version()),
    ];
    let present: Vec<_> = evidence
        .iter()
        .filter_map(|(label, value)| value.map(|v| (label, v)))
        .collect();
    if !present.is_empty() {
        output.push_str("\nEvidence:\n");
        for (i, (label, value)) in present.iter().enumerate() {
            let connector = if i == present.len() - 1 { "\u{2514}" } else { "\u{251C}" };
            output.push_str(&format!("{}\u{2500} {:<9} {}\n", connector, format!("{}:", label), value));
        }
    }

    output.push_str("\nDockerfile:\n");
    output.push_str(generation.recipe.text());
    output
}
