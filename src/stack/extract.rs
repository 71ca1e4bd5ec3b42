//! Evidence extraction, one function per rule family.
//!
//! Extractors never fail: missing or malformed files simply leave the
//! corresponding evidence field empty.

use super::profile::Evidence;
use super::tree::Tree;
use super::StackTag;
use crate::util::is_plain_token;
use regex::Regex;

/// What a rule's extractor contributes to the profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub evidence: Evidence,
    pub extra_tags: Vec<StackTag>,
}

const NODE_ENTRY_CANDIDATES: &[&str] = &[
    "server.js",
    "index.js",
    "app.js",
    "src/index.js",
    "src/server.js",
];

const PYTHON_MANIFESTS: &[&str] = &["requirements.txt", "pyproject.toml", "Pipfile", "setup.py"];

const PYTHON_ENTRY_CANDIDATES: &[&str] = &["app.py", "main.py", "wsgi.py", "server.py", "run.py"];

fn capture(pattern: &str, content: &str) -> Option<String> {
    let re = Regex::new(pattern).ok()?;
    Some(re.captures(content)?.get(1)?.as_str().to_string())
}

pub fn extract_node(tree: &Tree) -> Extraction {
    let mut extraction = Extraction::default();

    let package = tree
        .read("package.json")
        .and_then(|c| serde_json::from_str::<serde_json::Value>(&c).ok());

    if tree.has("package.json") {
        extraction.evidence.manifest = Some("package.json".to_string());
    }

    let declared_entry = package.as_ref().and_then(|pkg| {
        pkg["main"]
            .as_str()
            .map(String::from)
            .or_else(|| {
                pkg["scripts"]["start"]
                    .as_str()
                    .and_then(|start| capture(r"^node\s+(\S+)", start.trim()))
            })
    });

    extraction.evidence.entry_point = declared_entry.or_else(|| {
        tree.first_existing(NODE_ENTRY_CANDIDATES)
            .map(String::from)
    });

    extraction.evidence.runtime_version = package
        .as_ref()
        .and_then(|pkg| pkg["engines"]["node"].as_str().map(String::from))
        .or_else(|| tree.read(".nvmrc"))
        .and_then(|v| capture(r"(\d+)", &v));

    if tree.has("tsconfig.json") {
        extraction.extra_tags.push(StackTag::TypeScript);
    }

    extraction
}

pub fn extract_python(tree: &Tree) -> Extraction {
    let mut extraction = Extraction::default();

    let manifest = tree.first_existing(PYTHON_MANIFESTS);
    extraction.evidence.manifest = manifest.map(String::from);
    extraction.evidence.entry_point = tree
        .first_existing(PYTHON_ENTRY_CANDIDATES)
        .map(String::from);

    let manifest_content = manifest.and_then(|m| tree.read(m)).unwrap_or_default();

    extraction.evidence.runtime_version = tree
        .read(".python-version")
        .and_then(|v| capture(r"^(\d+\.\d+)", v.trim()))
        .or_else(|| {
            tree.read("pyproject.toml")
                .and_then(|c| capture(r#"requires-python\s*=\s*"[^"\d]*(\d+\.\d+)"#, &c))
        })
        .or_else(|| {
            tree.read("Pipfile")
                .and_then(|c| capture(r#"python_version\s*=\s*"(\d+\.\d+)""#, &c))
        });

    let lowered = manifest_content.to_lowercase();
    let mentions = |package: &str| {
        Regex::new(&format!(r"(?m)(^|[\s'\x22\[]){}\b", package))
            .map(|re| re.is_match(&lowered))
            .unwrap_or(false)
    };
    if mentions("fastapi") {
        extraction.extra_tags.push(StackTag::FastApi);
    }
    if mentions("flask") {
        extraction.extra_tags.push(StackTag::Flask);
    }

    extraction
}

pub fn extract_django(tree: &Tree) -> Extraction {
    let mut extraction = extract_python(tree);
    extraction.evidence.entry_point = Some("manage.py".to_string());
    extraction
}

pub fn extract_go(tree: &Tree) -> Extraction {
    let mut extraction = Extraction::default();

    if tree.has("go.mod") {
        extraction.evidence.manifest = Some("go.mod".to_string());
    }

    extraction.evidence.runtime_version = tree
        .read("go.mod")
        .and_then(|c| capture(r"(?m)^go\s+(\d+\.\d+)", &c));

    extraction.evidence.entry_point = if tree.has("main.go") {
        Some("main.go".to_string())
    } else {
        tree.read_dir("cmd")
            .iter()
            .filter(|entry| entry.is_dir() && is_plain_token(entry.file_name()))
            .map(|entry| format!("cmd/{}/main.go", entry.file_name()))
            .find(|candidate| tree.has(candidate))
    };

    extraction
}

pub fn extract_rust(tree: &Tree) -> Extraction {
    let mut extraction = Extraction::default();
    extraction.evidence.manifest = Some("Cargo.toml".to_string());

    let manifest = tree
        .read("Cargo.toml")
        .and_then(|c| toml::from_str::<toml::Value>(&c).ok());

    extraction.evidence.entry_point = manifest.as_ref().and_then(|m| {
        m.get("bin")
            .and_then(|bins| bins.as_array())
            .and_then(|bins| bins.first())
            .and_then(|bin| bin.get("name"))
            .or_else(|| m.get("package").and_then(|p| p.get("name")))
            .and_then(|name| name.as_str())
            .map(String::from)
    });

    extraction.evidence.runtime_version = tree
        .read("rust-toolchain.toml")
        .and_then(|c| capture(r#"channel\s*=\s*"(\d+\.\d+(?:\.\d+)?)""#, &c))
        .or_else(|| {
            tree.read("rust-toolchain")
                .and_then(|c| capture(r"^(\d+\.\d+(?:\.\d+)?)", c.trim()))
        })
        .or_else(|| {
            manifest.as_ref().and_then(|m| {
                m.get("package")
                    .and_then(|p| p.get("rust-version"))
                    .and_then(|v| v.as_str())
                    .filter(|v| is_plain_token(v))
                    .map(String::from)
            })
        });

    extraction
}

/// Maps legacy `1.8`-style Java versions to the major number images use.
fn normalize_java_version(raw: &str) -> String {
    let raw = raw.trim();
    match raw.strip_prefix("1.") {
        Some(rest) => rest.to_string(),
        None => raw.to_string(),
    }
}

pub fn extract_maven(tree: &Tree) -> Extraction {
    let mut extraction = Extraction::default();
    extraction.evidence.manifest = Some("pom.xml".to_string());

    let Some(content) = tree.read("pom.xml") else {
        return extraction;
    };
    let Ok(doc) = roxmltree::Document::parse(&content) else {
        return extraction;
    };

    let property = |name: &str| {
        doc.descendants()
            .find(|node| node.tag_name().name() == name)
            .and_then(|node| node.text())
            .map(str::trim)
            .filter(|text| !text.is_empty() && !text.starts_with("${"))
            .map(String::from)
    };

    extraction.evidence.runtime_version = property("java.version")
        .or_else(|| property("maven.compiler.release"))
        .or_else(|| property("maven.compiler.source"))
        .map(|v| normalize_java_version(&v))
        .filter(|v| is_plain_token(v));

    extraction.extra_tags.push(StackTag::Maven);
    extraction
}

pub fn extract_gradle(tree: &Tree) -> Extraction {
    let mut extraction = Extraction::default();

    let manifest = tree.first_existing(&["build.gradle.kts", "build.gradle"]);
    extraction.evidence.manifest = manifest.map(String::from);

    extraction.evidence.runtime_version = manifest.and_then(|m| tree.read(m)).and_then(|c| {
        capture(r"JavaLanguageVersion\.of\(\s*(\d+)\s*\)", &c).or_else(|| {
            capture(r"VERSION_(\d+(?:_\d+)?)", &c)
                .map(|v| normalize_java_version(&v.replace('_', ".")))
        })
    });

    extraction.extra_tags.push(StackTag::Gradle);
    extraction
}

pub fn extract_ruby(tree: &Tree) -> Extraction {
    let mut extraction = Extraction::default();
    extraction.evidence.manifest = Some("Gemfile".to_string());

    extraction.evidence.entry_point = tree
        .first_existing(&["config.ru", "app.rb"])
        .map(String::from);

    extraction.evidence.runtime_version = tree
        .read(".ruby-version")
        .and_then(|v| capture(r"(\d+\.\d+(?:\.\d+)?)", &v))
        .or_else(|| {
            tree.read("Gemfile").and_then(|c| {
                capture(r#"(?m)^\s*ruby\s+['"](\d+\.\d+(?:\.\d+)?)['"]"#, &c)
            })
        });

    extraction
}

pub fn extract_php(tree: &Tree) -> Extraction {
    let mut extraction = Extraction::default();
    extraction.evidence.manifest = Some("composer.json".to_string());

    extraction.evidence.entry_point = tree
        .first_existing(&["public/index.php", "index.php"])
        .map(String::from);

    extraction.evidence.runtime_version = tree
        .read("composer.json")
        .and_then(|c| serde_json::from_str::<serde_json::Value>(&c).ok())
        .and_then(|composer| composer["require"]["php"].as_str().map(String::from))
        .and_then(|constraint| capture(r"(\d+\.\d+)", &constraint));

    extraction
}

pub fn extract_static(tree: &Tree) -> Extraction {
    let mut extraction = Extraction::default();
    extraction.evidence.entry_point = tree
        .first_existing(&["index.html", "public/index.html"])
        .map(String::from);
    extraction
}
