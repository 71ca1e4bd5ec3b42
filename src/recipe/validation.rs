//! Syntactic checks for recipe text.
//!
//! Recipes arriving at the build endpoint are caller-supplied, so they are
//! parsed and checked here before any container engine is contacted.

use anyhow::Result;
use std::collections::VecDeque;

const KNOWN_INSTRUCTIONS: &[&str] = &[
    "ADD",
    "ARG",
    "CMD",
    "COPY",
    "ENTRYPOINT",
    "ENV",
    "EXPOSE",
    "FROM",
    "HEALTHCHECK",
    "LABEL",
    "MAINTAINER",
    "ONBUILD",
    "RUN",
    "SHELL",
    "STOPSIGNAL",
    "USER",
    "VOLUME",
    "WORKDIR",
];

/// An instruction as it appears in recipe text, continuations folded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedInstruction {
    /// 1-based line where the instruction starts.
    pub line: usize,
    /// Upper-cased keyword.
    pub keyword: String,
    pub args: String,
}

/// Splits recipe text into instructions, skipping blank and comment lines,
/// joining continuations, and passing over heredoc bodies.
///
/// The continuation character is `\` unless an `# escape=` parser directive
/// at the top of the text changes it.
pub fn parse(text: &str) -> Vec<ParsedInstruction> {
    let escape = escape_directive(text);
    let mut instructions = Vec::new();
    let mut pending: Option<(usize, String)> = None;
    let mut heredocs: VecDeque<String> = VecDeque::new();

    for (idx, raw) in text.lines().enumerate() {
        if let Some(terminator) = heredocs.front() {
            if raw.trim() == terminator {
                heredocs.pop_front();
            }
            continue;
        }

        let line = raw.trim();
        if pending.is_none() && (line.is_empty() || line.starts_with('#')) {
            continue;
        }
        if pending.is_some() && line.starts_with('#') {
            continue;
        }

        let (continues, body) = match line.strip_suffix(escape) {
            Some(body) => (true, body.trim_end()),
            None => (false, line),
        };

        let (start, mut buffer) = pending.take().unwrap_or((idx + 1, String::new()));
        if !buffer.is_empty() && !body.is_empty() {
            buffer.push(' ');
        }
        buffer.push_str(body);

        if continues {
            pending = Some((start, buffer));
        } else {
            let instruction = split_instruction(start, &buffer);
            if matches!(instruction.keyword.as_str(), "RUN" | "COPY" | "ADD") {
                heredocs.extend(heredoc_terminators(&instruction.args));
            }
            instructions.push(instruction);
        }
    }

    if let Some((start, buffer)) = pending {
        instructions.push(split_instruction(start, &buffer));
    }
    instructions
}

/// Reads `# escape=` from the leading block of parser directives. The block
/// ends at the first line that is not a `# key=value` comment.
fn escape_directive(text: &str) -> char {
    for line in text.lines() {
        let Some(directive) = line.trim().strip_prefix('#') else {
            break;
        };
        let Some((key, value)) = directive.split_once('=') else {
            break;
        };
        let key = key.trim();
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric()) {
            break;
        }
        if key.eq_ignore_ascii_case("escape") {
            return if value.trim() == "`" { '`' } else { '\\' };
        }
    }
    '\\'
}

/// Terminator words of the heredocs opened by `args` (`<<EOF`, `<<-EOF`,
/// `<<"EOF"`), in order. Here-strings (`<<<`) open nothing.
fn heredoc_terminators(args: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut cursor = 0;
    while let Some(offset) = args[cursor..].find("<<") {
        let at = cursor + offset;
        cursor = at + 2;
        let rest = &args[cursor..];
        if rest.starts_with('<') || args[..at].ends_with('<') {
            cursor += rest.len() - rest.trim_start_matches('<').len();
            continue;
        }
        let rest = rest.strip_prefix('-').unwrap_or(rest);
        let rest = rest.trim_start_matches(['"', '\'']);
        let word: String = rest
            .chars()
            .take_while(|c| !c.is_whitespace() && !"\"'<>|;&".contains(*c))
            .collect();
        if word.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
            words.push(word);
        }
    }
    words
}

fn split_instruction(line: usize, text: &str) -> ParsedInstruction {
    let text = text.trim();
    let (keyword, args) = match text.split_once(char::is_whitespace) {
        Some((keyword, args)) => (keyword, args.trim()),
        None => (text, ""),
    };
    ParsedInstruction {
        line,
        keyword: keyword.to_ascii_uppercase(),
        args: args.to_string(),
    }
}

pub trait ValidationRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn validate(&self, instructions: &[ParsedInstruction]) -> Result<()>;
}

pub struct NonEmptyRecipeRule;

impl ValidationRule for NonEmptyRecipeRule {
    fn name(&self) -> &'static str {
        "NonEmptyRecipe"
    }

    fn validate(&self, instructions: &[ParsedInstruction]) -> Result<()> {
        if instructions.is_empty() {
            anyhow::bail!("Recipe contains no instructions");
        }
        Ok(())
    }
}

pub struct KnownInstructionsRule;

impl ValidationRule for KnownInstructionsRule {
    fn name(&self) -> &'static str {
        "KnownInstructions"
    }

    fn validate(&self, instructions: &[ParsedInstruction]) -> Result<()> {
        for instruction in instructions {
            if !KNOWN_INSTRUCTIONS.contains(&instruction.keyword.as_str()) {
                anyhow::bail!(
                    "Unknown instruction '{}' on line {}",
                    instruction.keyword,
                    instruction.line
                );
            }
        }
        Ok(())
    }
}

/// Only `ARG` may precede the first `FROM`.
pub struct BaseImageFirstRule;

impl ValidationRule for BaseImageFirstRule {
    fn name(&self) -> &'static str {
        "BaseImageFirst"
    }

    fn validate(&self, instructions: &[ParsedInstruction]) -> Result<()> {
        match instructions.iter().find(|i| i.keyword != "ARG") {
            Some(first) if first.keyword == "FROM" => Ok(()),
            Some(first) => anyhow::bail!(
                "Line {}: '{}' appears before any FROM instruction",
                first.line,
                first.keyword
            ),
            None => anyhow::bail!("Recipe has no FROM instruction"),
        }
    }
}

pub struct NonEmptyArgumentsRule;

impl ValidationRule for NonEmptyArgumentsRule {
    fn name(&self) -> &'static str {
        "NonEmptyArguments"
    }

    fn validate(&self, instructions: &[ParsedInstruction]) -> Result<()> {
        for instruction in instructions {
            if instruction.args.is_empty() {
                anyhow::bail!(
                    "Line {}: {} requires at least one argument",
                    instruction.line,
                    instruction.keyword
                );
            }
        }
        Ok(())
    }
}

/// `FROM [--platform=...] image [AS name]`
pub struct FromSyntaxRule;

impl ValidationRule for FromSyntaxRule {
    fn name(&self) -> &'static str {
        "FromSyntax"
    }

    fn validate(&self, instructions: &[ParsedInstruction]) -> Result<()> {
        for instruction in instructions.iter().filter(|i| i.keyword == "FROM") {
            let words: Vec<&str> = instruction
                .args
                .split_whitespace()
                .filter(|w| !w.starts_with("--"))
                .collect();
            let valid = match words.as_slice() {
                [_image] => true,
                [_image, as_kw, _alias] => as_kw.eq_ignore_ascii_case("as"),
                _ => false,
            };
            if !valid {
                anyhow::bail!(
                    "Line {}: expected 'FROM <image> [AS <name>]', found 'FROM {}'",
                    instruction.line,
                    instruction.args
                );
            }
        }
        Ok(())
    }
}

/// Exec-form arguments (`["a", "b"]`) must be a JSON array of strings.
pub struct ExecFormRule;

impl ValidationRule for ExecFormRule {
    fn name(&self) -> &'static str {
        "ExecForm"
    }

    fn validate(&self, instructions: &[ParsedInstruction]) -> Result<()> {
        for instruction in instructions {
            if !matches!(instruction.keyword.as_str(), "CMD" | "ENTRYPOINT" | "RUN") {
                continue;
            }
            if !instruction.args.starts_with('[') {
                continue;
            }
            if serde_json::from_str::<Vec<String>>(&instruction.args).is_err() {
                anyhow::bail!(
                    "Line {}: {} exec form must be a JSON array of strings",
                    instruction.line,
                    instruction.keyword
                );
            }
        }
        Ok(())
    }
}

pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: Vec<Box<dyn ValidationRule>>) -> Self {
        Self { rules }
    }

    pub fn validate(&self, text: &str) -> Result<()> {
        let instructions = parse(text);
        for rule in &self.rules {
            if let Err(e) = rule.validate(&instructions) {
                anyhow::bail!("[{}] {}", rule.name(), e);
            }
        }
        Ok(())
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            rules: vec![
                Box::new(NonEmptyRecipeRule),
                Box::new(KnownInstructionsRule),
                Box::new(BaseImageFirstRule),
                Box::new(NonEmptyArgumentsRule),
                Box::new(FromSyntaxRule),
                Box::new(ExecFormRule),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[test]
    fn test_parse_folds_continuations_and_skips_comments() {
        let text = "# syntax comment\n\nFROM alpine:3.20\nRUN apk add \\\n    curl \\\n    git\ncmd [\"sh\"]\n";
        let parsed = parse(text);

        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].keyword, "FROM");
        assert_eq!(parsed[0].line, 3);
        assert_eq!(parsed[1].args, "apk add curl git");
        assert_eq!(parsed[1].line, 4);
        assert_eq!(parsed[2].keyword, "CMD");
    }

    #[parameterized(
        plain = { "FROM alpine\nRUN <<EOF\napk add curl\nset -e\nEOF\nCMD [\"sh\"]\n" },
        quoted_word = { "FROM alpine\nRUN <<\"SCRIPT\"\ninstall packages\nSCRIPT\nCMD [\"sh\"]\n" },
        tab_stripped = { "FROM alpine\nRUN <<-EOF\n\tmake all\n\tEOF\nCMD [\"sh\"]\n" },
        two_bodies = { "FROM alpine\nCOPY <<a.txt <<b.txt /dst/\nfirst body\na.txt\nsecond body\nb.txt\nCMD [\"sh\"]\n" },
        comment_in_body = { "FROM alpine\nRUN <<EOF\n# not an instruction\necho hi\nEOF\nCMD [\"sh\"]\n" },
    )]
    fn test_heredoc_bodies_are_not_instructions(text: &str) {
        let parsed = parse(text);
        let keywords: Vec<&str> = parsed.iter().map(|i| i.keyword.as_str()).collect();
        assert_eq!(keywords.len(), 3, "parsed {:?}", keywords);
        assert_eq!(keywords[0], "FROM");
        assert_eq!(keywords[2], "CMD");
        Validator::new().validate(text).unwrap();
    }

    #[test]
    fn test_here_string_opens_no_body() {
        let parsed = parse("FROM alpine\nRUN cat <<<hello\nCMD [\"sh\"]\n");
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[1].args, "cat <<<hello");
    }

    #[parameterized(
        backtick = { "# escape=`\nFROM mcr.microsoft.com/windows/servercore\nRUN dir `\n    C:\\\nCMD [\"cmd\"]\n", "dir C:\\" },
        after_syntax = { "# syntax=docker/dockerfile:1\n# escape=`\nFROM alpine\nRUN echo a `\n    b\n", "echo a b" },
        backslash_default = { "FROM alpine\nRUN echo a \\\n    b\n", "echo a b" },
        late_directive_ignored = { "FROM alpine\n# escape=`\nRUN echo a\\\n b\n", "echo a b" },
    )]
    fn test_escape_directive_sets_continuation(text: &str, run_args: &str) {
        let parsed = parse(text);
        let run = parsed.iter().find(|i| i.keyword == "RUN").unwrap();
        assert_eq!(run.args, run_args);
    }

    #[test]
    fn test_valid_recipe_passes() {
        let text = "ARG VERSION=20\nFROM node:${VERSION}-alpine AS build\nWORKDIR /app\nCOPY . .\nCMD [\"node\", \"index.js\"]\n";
        Validator::new().validate(text).unwrap();
    }

    #[parameterized(
        empty = { "", "NonEmptyRecipe" },
        comments_only = { "# nothing here\n", "NonEmptyRecipe" },
        unknown_keyword = { "FROM alpine\nINSTALL curl\n", "KnownInstructions" },
        run_before_from = { "RUN echo hi\nFROM alpine\n", "BaseImageFirst" },
        missing_from = { "ARG X=1\n", "BaseImageFirst" },
        bare_workdir = { "FROM alpine\nWORKDIR\n", "NonEmptyArguments" },
        bad_from = { "FROM alpine extra words\n", "FromSyntax" },
        broken_exec = { "FROM alpine\nCMD [\"sh\"\n", "ExecForm" },
    )]
    fn test_invalid_recipe_names_rule(text: &str, rule: &str) {
        let err = Validator::new().validate(text).unwrap_err();
        assert!(
            err.to_string().starts_with(&format!("[{}]", rule)),
            "unexpected error: {}",
            err
        );
    }

    #[test]
    fn test_platform_flag_is_accepted() {
        Validator::new()
            .validate("FROM --platform=linux/amd64 debian:bookworm-slim AS runtime\nCMD [\"true\"]\n")
            .unwrap();
    }
}
