use std::fmt;

/// One Dockerfile instruction as emitted by the templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    From {
        image: String,
        alias: Option<String>,
    },
    Workdir(String),
    Copy {
        sources: Vec<String>,
        dest: String,
        from: Option<String>,
    },
    Run(String),
    Env {
        key: String,
        value: String,
    },
    Expose(u16),
    /// Exec-form command; rendered as a JSON array.
    Cmd(Vec<String>),
}

impl Instruction {
    pub fn from_image(image: impl Into<String>) -> Self {
        Instruction::From {
            image: image.into(),
            alias: None,
        }
    }

    pub fn from_stage(image: impl Into<String>, alias: impl Into<String>) -> Self {
        Instruction::From {
            image: image.into(),
            alias: Some(alias.into()),
        }
    }

    pub fn workdir(dir: impl Into<String>) -> Self {
        Instruction::Workdir(dir.into())
    }

    pub fn copy(sources: &[&str], dest: impl Into<String>) -> Self {
        Instruction::Copy {
            sources: sources.iter().map(|s| s.to_string()).collect(),
            dest: dest.into(),
            from: None,
        }
    }

    pub fn copy_from(stage: impl Into<String>, source: impl Into<String>, dest: impl Into<String>) -> Self {
        Instruction::Copy {
            sources: vec![source.into()],
            dest: dest.into(),
            from: Some(stage.into()),
        }
    }

    pub fn run(command: impl Into<String>) -> Self {
        Instruction::Run(command.into())
    }

    pub fn env(key: impl Into<String>, value: impl Into<String>) -> Self {
        Instruction::Env {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn cmd<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Instruction::Cmd(args.into_iter().map(Into::into).collect())
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Instruction::From { .. } => "FROM",
            Instruction::Workdir(_) => "WORKDIR",
            Instruction::Copy { .. } => "COPY",
            Instruction::Run(_) => "RUN",
            Instruction::Env { .. } => "ENV",
            Instruction::Expose(_) => "EXPOSE",
            Instruction::Cmd(_) => "CMD",
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::From { image, alias } => match alias {
                Some(alias) => write!(f, "FROM {} AS {}", image, alias),
                None => write!(f, "FROM {}", image),
            },
            Instruction::Workdir(dir) => write!(f, "WORKDIR {}", dir),
            Instruction::Copy {
                sources,
                dest,
                from,
            } => {
                f.write_str("COPY ")?;
                if let Some(stage) = from {
                    write!(f, "--from={} ", stage)?;
                }
                write!(f, "{} {}", sources.join(" "), dest)
            }
            Instruction::Run(command) => write!(f, "RUN {}", command),
            Instruction::Env { key, value } => write!(f, "ENV {}={}", key, value),
            Instruction::Expose(port) => write!(f, "EXPOSE {}", port),
            Instruction::Cmd(args) => {
                let quoted: Vec<String> = args
                    .iter()
                    .map(|a| serde_json::Value::String(a.clone()).to_string())
                    .collect();
                write!(f, "CMD [{}]", quoted.join(", "))
            }
        }
    }
}

/// Renders instructions one per line with a trailing newline.
pub fn render(instructions: &[Instruction]) -> String {
    let mut out = String::new();
    for instruction in instructions {
        out.push_str(&instruction.to_string());
        out.push('\n');
    }
    out
}
