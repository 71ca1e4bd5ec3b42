//! The ordered detection rule table.
//!
//! Order is significant: the first matching rule decides the primary tag, so
//! framework config files come before language manifests, and language
//! manifests come before loose file-extension counts. Python manifests sit
//! ahead of `package.json` so a Python service that ships a tooling
//! `package.json` is still classified as Python.

use super::extract::{self, Extraction};
use super::tree::Tree;
use super::StackTag;
use regex::Regex;

/// A single file-system test.
#[derive(Debug, Clone, Copy)]
pub enum Marker {
    /// The file exists at the given root-relative path.
    File(&'static str),
    /// At least one of the files exists.
    AnyFile(&'static [&'static str]),
    /// The file exists and its content matches the regex.
    FileMatches {
        file: &'static str,
        pattern: &'static str,
    },
    /// At least `min` files anywhere in the tree carry one of the extensions.
    Extension {
        extensions: &'static [&'static str],
        min: usize,
    },
}

impl Marker {
    pub fn holds(&self, tree: &Tree) -> bool {
        match self {
            Marker::File(name) => tree.has(name),
            Marker::AnyFile(names) => tree.first_existing(names).is_some(),
            Marker::FileMatches { file, pattern } => tree
                .read(file)
                .zip(Regex::new(pattern).ok())
                .is_some_and(|(content, re)| re.is_match(&content)),
            Marker::Extension { extensions, min } => tree.count_extension(extensions) >= *min,
        }
    }
}

/// How strong a rule's signal is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strength {
    /// Explicit framework configuration.
    Config,
    /// A dependency manifest.
    Manifest,
    /// Loose evidence; only consulted when no config or manifest rule matched.
    Heuristic,
}

pub struct DetectionRule {
    pub name: &'static str,
    /// Emitted tags; the first one is the primary candidate.
    pub tags: &'static [StackTag],
    /// All markers must hold.
    pub condition: &'static [Marker],
    pub strength: Strength,
    pub extract: fn(&Tree) -> Extraction,
}

impl DetectionRule {
    pub fn matches(&self, tree: &Tree) -> bool {
        self.condition.iter().all(|marker| marker.holds(tree))
    }

    pub fn primary(&self) -> StackTag {
        self.tags.first().copied().unwrap_or(StackTag::Unknown)
    }
}

impl std::fmt::Debug for DetectionRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectionRule")
            .field("name", &self.name)
            .field("tags", &self.tags)
            .field("strength", &self.strength)
            .finish()
    }
}

pub static DEFAULT_RULES: &[DetectionRule] = &[
    DetectionRule {
        name: "nextjs-config",
        tags: &[StackTag::Node, StackTag::NextJs],
        condition: &[Marker::AnyFile(&[
            "next.config.js",
            "next.config.mjs",
            "next.config.ts",
        ])],
        strength: Strength::Config,
        extract: extract::extract_node,
    },
    DetectionRule {
        name: "spa-config",
        tags: &[StackTag::Frontend, StackTag::Node],
        condition: &[
            Marker::AnyFile(&[
                "vite.config.js",
                "vite.config.mjs",
                "vite.config.ts",
                "angular.json",
            ]),
            Marker::File("package.json"),
        ],
        strength: Strength::Config,
        extract: extract::extract_node,
    },
    DetectionRule {
        name: "django-manage",
        tags: &[StackTag::Python, StackTag::Django],
        condition: &[Marker::File("manage.py")],
        strength: Strength::Config,
        extract: extract::extract_django,
    },
    DetectionRule {
        name: "python-manifest",
        tags: &[StackTag::Python],
        condition: &[Marker::AnyFile(&[
            "pyproject.toml",
            "Pipfile",
            "setup.py",
            "requirements.txt",
        ])],
        strength: Strength::Manifest,
        extract: extract::extract_python,
    },
    DetectionRule {
        name: "rails-gemfile",
        tags: &[StackTag::Ruby, StackTag::Rails],
        condition: &[Marker::FileMatches {
            file: "Gemfile",
            pattern: r#"(?m)^\s*gem\s+['"]rails['"]"#,
        }],
        strength: Strength::Config,
        extract: extract::extract_ruby,
    },
    DetectionRule {
        name: "ruby-gemfile",
        tags: &[StackTag::Ruby],
        condition: &[Marker::File("Gemfile")],
        strength: Strength::Manifest,
        extract: extract::extract_ruby,
    },
    DetectionRule {
        name: "go-module",
        tags: &[StackTag::Go],
        condition: &[Marker::File("go.mod")],
        strength: Strength::Manifest,
        extract: extract::extract_go,
    },
    DetectionRule {
        name: "cargo-manifest",
        tags: &[StackTag::Rust],
        condition: &[Marker::File("Cargo.toml")],
        strength: Strength::Manifest,
        extract: extract::extract_rust,
    },
    DetectionRule {
        name: "maven-pom",
        tags: &[StackTag::Java, StackTag::Maven],
        condition: &[Marker::File("pom.xml")],
        strength: Strength::Manifest,
        extract: extract::extract_maven,
    },
    DetectionRule {
        name: "gradle-build",
        tags: &[StackTag::Java, StackTag::Gradle],
        condition: &[Marker::AnyFile(&["build.gradle", "build.gradle.kts"])],
        strength: Strength::Manifest,
        extract: extract::extract_gradle,
    },
    DetectionRule {
        name: "composer-manifest",
        tags: &[StackTag::Php],
        condition: &[Marker::File("composer.json")],
        strength: Strength::Manifest,
        extract: extract::extract_php,
    },
    DetectionRule {
        name: "node-manifest",
        tags: &[StackTag::Node],
        condition: &[Marker::File("package.json")],
        strength: Strength::Manifest,
        extract: extract::extract_node,
    },
    DetectionRule {
        name: "static-index",
        tags: &[StackTag::Static],
        condition: &[Marker::File("index.html")],
        strength: Strength::Manifest,
        extract: extract::extract_static,
    },
    DetectionRule {
        name: "python-sources",
        tags: &[StackTag::Python],
        condition: &[Marker::Extension {
            extensions: &["py"],
            min: 1,
        }],
        strength: Strength::Heuristic,
        extract: extract::extract_python,
    },
    DetectionRule {
        name: "node-sources",
        tags: &[StackTag::Node],
        condition: &[Marker::Extension {
            extensions: &["js", "mjs", "cjs"],
            min: 1,
        }],
        strength: Strength::Heuristic,
        extract: extract::extract_node,
    },
    DetectionRule {
        name: "html-sources",
        tags: &[StackTag::Static],
        condition: &[Marker::Extension {
            extensions: &["html", "htm"],
            min: 1,
        }],
        strength: Strength::Heuristic,
        extract: extract::extract_static,
    },
];
