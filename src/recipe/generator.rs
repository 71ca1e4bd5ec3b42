use super::instruction::render;
use super::template::{PackageManager, Template, TemplateContext};
use super::{Recipe, Validator};
use crate::fs::FileSystem;
use crate::stack::{StackProfile, StackTag, Tree};
use crate::util::is_plain_token;
use regex::Regex;
use std::path::Path;
use tracing::{debug, warn};

/// Maps a [`StackProfile`] to Dockerfile text.
///
/// Generation never fails: a profile no template claims gets the generic
/// copy-all recipe, and so does a rendering that does not pass the
/// [`Validator`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RecipeGenerator;

impl RecipeGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Renders the template for `profile.primary`, reading lockfiles and
    /// build configuration under `root` to fill in the details.
    pub fn generate(&self, fs: &dyn FileSystem, root: &Path, profile: &StackProfile) -> Recipe {
        let template = Template::for_tag(profile.primary);
        let context = self.context(fs, root, profile);
        debug!(
            template = template.name(),
            package_manager = ?context.package_manager,
            "Rendering recipe"
        );
        let text = render(&template.instructions(profile, &context));
        if let Err(e) = Validator::new().validate(&text) {
            warn!(template = template.name(), error = %e, "Rendered recipe failed validation, using generic template");
            let fallback = Template::Generic;
            let text = render(&fallback.instructions(profile, &context));
            return Recipe::new(text, fallback, profile.clone());
        }
        Recipe::new(text, template, profile.clone())
    }

    pub fn context(&self, fs: &dyn FileSystem, root: &Path, profile: &StackProfile) -> TemplateContext {
        let tree = Tree::new(fs, root);
        let mut context = TemplateContext::default();

        if !(profile.has_tag(StackTag::Node) || profile.has_tag(StackTag::Frontend)) {
            return context;
        }

        let package = tree
            .read("package.json")
            .and_then(|c| serde_json::from_str::<serde_json::Value>(&c).ok());

        let (package_manager, has_lockfile) = if tree.has("pnpm-lock.yaml") {
            (PackageManager::Pnpm, true)
        } else if tree.has("yarn.lock") {
            (PackageManager::Yarn, true)
        } else if tree.has("package-lock.json") {
            (PackageManager::Npm, true)
        } else {
            let declared = package
                .as_ref()
                .and_then(|pkg| pkg["packageManager"].as_str())
                .unwrap_or_default();
            if declared.starts_with("pnpm") {
                (PackageManager::Pnpm, false)
            } else if declared.starts_with("yarn") {
                (PackageManager::Yarn, false)
            } else {
                (PackageManager::Npm, false)
            }
        };
        context.package_manager = package_manager;
        context.has_lockfile = has_lockfile;
        context.has_build_script = package
            .as_ref()
            .is_some_and(|pkg| pkg["scripts"]["build"].is_string());

        if let Some(output) = angular_output(&tree)
            .or_else(|| vite_output(&tree))
            .filter(|output| is_plain_token(output))
        {
            context.frontend_output = output;
        }

        context
    }
}

/// Output directory of the first project in `angular.json`. The
/// `application` builder nests browser assets one level deeper.
fn angular_output(tree: &Tree) -> Option<String> {
    let config: serde_json::Value = serde_json::from_str(&tree.read("angular.json")?).ok()?;
    let (name, project) = config["projects"].as_object()?.iter().next()?;
    let build = &project["architect"]["build"];
    let output = &build["options"]["outputPath"];

    let base = output
        .as_str()
        .or_else(|| output["base"].as_str())
        .map(String::from)
        .unwrap_or_else(|| format!("dist/{}", name));

    let application_builder = build["builder"]
        .as_str()
        .is_some_and(|b| b.ends_with(":application"));
    if application_builder {
        Some(format!("{}/browser", base.trim_end_matches('/')))
    } else {
        Some(base)
    }
}

fn vite_output(tree: &Tree) -> Option<String> {
    let config = tree
        .first_existing(&["vite.config.ts", "vite.config.js", "vite.config.mjs"])
        .and_then(|name| tree.read(name))?;
    let re = Regex::new(r#"outDir\s*:\s*['"]([^'"]+)['"]"#).ok()?;
    Some(re.captures(&config)?.get(1)?.as_str().to_string())
}
