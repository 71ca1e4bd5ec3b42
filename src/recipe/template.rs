//! Dockerfile templates, one per primary stack tag.
//!
//! Every template yields the same shape: base image, working directory,
//! dependency manifests, install step, remaining sources, start command.
//! Multi-stage templates repeat the shape per stage.

use super::instruction::Instruction;
use crate::stack::{StackProfile, StackTag};
use crate::util::is_plain_token;

/// Which Node package manager the checkout was set up with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PackageManager {
    #[default]
    Npm,
    Yarn,
    Pnpm,
}

impl PackageManager {
    pub fn lockfile(&self) -> &'static str {
        match self {
            PackageManager::Npm => "package-lock.json",
            PackageManager::Yarn => "yarn.lock",
            PackageManager::Pnpm => "pnpm-lock.yaml",
        }
    }

    fn manifests(&self, has_lockfile: bool) -> Vec<&'static str> {
        if has_lockfile {
            vec!["package.json", self.lockfile()]
        } else {
            vec!["package.json"]
        }
    }

    fn install(&self, has_lockfile: bool, production: bool) -> String {
        match (self, has_lockfile) {
            (PackageManager::Npm, true) if production => "npm ci --omit=dev".to_string(),
            (PackageManager::Npm, true) => "npm ci".to_string(),
            (PackageManager::Npm, false) if production => "npm install --omit=dev".to_string(),
            (PackageManager::Npm, false) => "npm install".to_string(),
            (PackageManager::Yarn, locked) => {
                let mut cmd = "yarn install".to_string();
                if locked {
                    cmd.push_str(" --frozen-lockfile");
                }
                if production {
                    cmd.push_str(" --production");
                }
                cmd
            }
            (PackageManager::Pnpm, locked) => {
                let mut cmd = "corepack enable && pnpm install".to_string();
                if locked {
                    cmd.push_str(" --frozen-lockfile");
                }
                if production {
                    cmd.push_str(" --prod");
                }
                cmd
            }
        }
    }

    fn run_script(&self, script: &str) -> String {
        match self {
            PackageManager::Npm => format!("npm run {}", script),
            PackageManager::Yarn => format!("yarn {}", script),
            PackageManager::Pnpm => format!("pnpm run {}", script),
        }
    }

    fn start_command(&self) -> Vec<&'static str> {
        match self {
            PackageManager::Npm => vec!["npm", "start"],
            PackageManager::Yarn => vec!["yarn", "start"],
            PackageManager::Pnpm => vec!["pnpm", "start"],
        }
    }
}

/// Workspace facts a template needs beyond the stack profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateContext {
    pub package_manager: PackageManager,
    pub has_lockfile: bool,
    /// `scripts.build` is declared in package.json.
    pub has_build_script: bool,
    /// Directory a frontend build writes its static bundle to.
    pub frontend_output: String,
}

impl Default for TemplateContext {
    fn default() -> Self {
        Self {
            package_manager: PackageManager::Npm,
            has_lockfile: false,
            has_build_script: false,
            frontend_output: "dist".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    Node,
    Frontend,
    Python,
    Go,
    Rust,
    Java,
    Ruby,
    Php,
    Static,
    Generic,
}

impl Template {
    pub fn for_tag(tag: StackTag) -> Self {
        match tag {
            StackTag::Node => Template::Node,
            StackTag::Frontend => Template::Frontend,
            StackTag::Python => Template::Python,
            StackTag::Go => Template::Go,
            StackTag::Rust => Template::Rust,
            StackTag::Java => Template::Java,
            StackTag::Ruby => Template::Ruby,
            StackTag::Php => Template::Php,
            StackTag::Static => Template::Static,
            StackTag::Unknown
            | StackTag::TypeScript
            | StackTag::NextJs
            | StackTag::Django
            | StackTag::Flask
            | StackTag::FastApi
            | StackTag::Rails
            | StackTag::Maven
            | StackTag::Gradle => Template::Generic,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Template::Node => "node",
            Template::Frontend => "frontend",
            Template::Python => "python",
            Template::Go => "go",
            Template::Rust => "rust",
            Template::Java => "java",
            Template::Ruby => "ruby",
            Template::Php => "php",
            Template::Static => "static",
            Template::Generic => "generic",
        }
    }

    pub fn instructions(&self, profile: &StackProfile, ctx: &TemplateContext) -> Vec<Instruction> {
        match self {
            Template::Node => node(profile, ctx),
            Template::Frontend => frontend(profile, ctx),
            Template::Python => python(profile),
            Template::Go => go(profile),
            Template::Rust => rust(profile),
            Template::Java => java(profile),
            Template::Ruby => ruby(profile),
            Template::Php => php(profile),
            Template::Static => static_site(profile),
            Template::Generic => generic(),
        }
    }
}

fn version_or<'a>(profile: &'a StackProfile, default: &'a str) -> &'a str {
    plain_or(profile.runtime_version(), default)
}

/// Falls back to `default` unless `value` is safe to splice into a line.
fn plain_or<'a>(value: Option<&'a str>, default: &'a str) -> &'a str {
    value.filter(|v| is_plain_token(v)).unwrap_or(default)
}

fn plain_entry_point(profile: &StackProfile) -> Option<&str> {
    profile.entry_point().filter(|entry| is_plain_token(entry))
}

fn node(profile: &StackProfile, ctx: &TemplateContext) -> Vec<Instruction> {
    let pm = ctx.package_manager;
    let has_manifest = profile.manifest() == Some("package.json");
    let next = profile.has_tag(StackTag::NextJs);
    let needs_build = next || (profile.has_tag(StackTag::TypeScript) && ctx.has_build_script);

    let mut out = vec![
        Instruction::from_image(format!("node:{}-alpine", version_or(profile, "20"))),
        Instruction::workdir("/app"),
    ];

    if has_manifest {
        out.push(Instruction::copy(&pm.manifests(ctx.has_lockfile), "./"));
        out.push(Instruction::run(pm.install(ctx.has_lockfile, !needs_build)));
    }
    out.push(Instruction::copy(&["."], "."));
    if has_manifest && needs_build {
        out.push(Instruction::run(pm.run_script("build")));
    }

    out.push(Instruction::env("NODE_ENV", "production"));
    out.push(Instruction::Expose(3000));

    let cmd = match profile.entry_point() {
        Some(entry) if !next => Instruction::cmd(["node", entry]),
        _ if has_manifest => Instruction::cmd(pm.start_command()),
        _ => Instruction::cmd(["node", "index.js"]),
    };
    out.push(cmd);
    out
}

fn frontend(profile: &StackProfile, ctx: &TemplateContext) -> Vec<Instruction> {
    let pm = ctx.package_manager;
    vec![
        Instruction::from_stage(
            format!("node:{}-alpine", version_or(profile, "20")),
            "build",
        ),
        Instruction::workdir("/app"),
        Instruction::copy(&pm.manifests(ctx.has_lockfile), "./"),
        Instruction::run(pm.install(ctx.has_lockfile, false)),
        Instruction::copy(&["."], "."),
        Instruction::run(pm.run_script("build")),
        Instruction::from_image("nginx:alpine"),
        Instruction::copy_from(
            "build",
            format!("/app/{}", plain_or(Some(ctx.frontend_output.trim_matches('/')), "dist")),
            "/usr/share/nginx/html",
        ),
        Instruction::Expose(80),
        Instruction::cmd(["nginx", "-g", "daemon off;"]),
    ]
}

/// `main.py` becomes `main`, `src/api/app.py` becomes `src.api.app`.
fn python_module(entry: &str) -> String {
    entry.trim_end_matches(".py").replace('/', ".")
}

fn python(profile: &StackProfile) -> Vec<Instruction> {
    let mut out = vec![
        Instruction::from_image(format!("python:{}-slim", version_or(profile, "3.12"))),
        Instruction::env("PYTHONDONTWRITEBYTECODE", "1"),
        Instruction::env("PYTHONUNBUFFERED", "1"),
        Instruction::workdir("/app"),
    ];

    match profile.manifest() {
        Some("requirements.txt") => {
            out.push(Instruction::copy(&["requirements.txt"], "./"));
            out.push(Instruction::run("pip install --no-cache-dir -r requirements.txt"));
            out.push(Instruction::copy(&["."], "."));
        }
        Some("Pipfile") => {
            out.push(Instruction::copy(&["Pipfile", "Pipfile.lock*"], "./"));
            out.push(Instruction::run(
                "pip install --no-cache-dir pipenv && pipenv install --system --skip-lock",
            ));
            out.push(Instruction::copy(&["."], "."));
        }
        Some(_) => {
            // pyproject.toml and setup.py builds need the package sources.
            out.push(Instruction::copy(&["."], "."));
            out.push(Instruction::run("pip install --no-cache-dir ."));
        }
        None => out.push(Instruction::copy(&["."], ".")),
    }

    out.push(Instruction::Expose(8000));

    let entry = profile.entry_point();
    let cmd = if profile.has_tag(StackTag::Django) {
        Instruction::cmd(["python", "manage.py", "runserver", "0.0.0.0:8000"])
    } else if profile.has_tag(StackTag::FastApi) {
        let module = format!("{}:app", python_module(entry.unwrap_or("main.py")));
        Instruction::cmd(vec![
            "uvicorn".to_string(),
            module,
            "--host".to_string(),
            "0.0.0.0".to_string(),
            "--port".to_string(),
            "8000".to_string(),
        ])
    } else {
        Instruction::cmd(["python", entry.unwrap_or("main.py")])
    };
    out.push(cmd);
    out
}

fn go(profile: &StackProfile) -> Vec<Instruction> {
    let package = match plain_entry_point(profile) {
        Some(entry) => match entry.rsplit_once('/') {
            Some((dir, _)) => format!("./{}", dir),
            None => ".".to_string(),
        },
        None => ".".to_string(),
    };

    vec![
        Instruction::from_stage(
            format!("golang:{}-alpine", version_or(profile, "1.22")),
            "build",
        ),
        Instruction::workdir("/src"),
        Instruction::copy(&["go.mod", "go.sum*"], "./"),
        Instruction::run("go mod download"),
        Instruction::copy(&["."], "."),
        Instruction::run(format!("CGO_ENABLED=0 go build -o /out/app {}", package)),
        Instruction::from_image("gcr.io/distroless/static-debian12"),
        Instruction::copy_from("build", "/out/app", "/app"),
        Instruction::Expose(8080),
        Instruction::cmd(["/app"]),
    ]
}

fn rust(profile: &StackProfile) -> Vec<Instruction> {
    let binary = plain_or(profile.entry_point(), "app");
    let installed = format!("/usr/local/bin/{}", binary);

    vec![
        Instruction::from_stage(format!("rust:{}-slim", version_or(profile, "1")), "build"),
        Instruction::workdir("/src"),
        Instruction::copy(&["."], "."),
        Instruction::run("cargo build --release --locked || cargo build --release"),
        Instruction::from_image("debian:bookworm-slim"),
        Instruction::copy_from("build", format!("/src/target/release/{}", binary), installed.clone()),
        Instruction::cmd(vec![installed]),
    ]
}

fn java(profile: &StackProfile) -> Vec<Instruction> {
    let version = version_or(profile, "21");
    let gradle = profile.has_tag(StackTag::Gradle);

    let mut out = if gradle {
        let manifest = profile.manifest().unwrap_or("build.gradle");
        vec![
            Instruction::from_stage(format!("gradle:8-jdk{}", version), "build"),
            Instruction::workdir("/src"),
            Instruction::copy(&[manifest, "settings.gradle*"], "./"),
            Instruction::copy(&["."], "."),
            Instruction::run("gradle build -x test --no-daemon"),
        ]
    } else {
        vec![
            Instruction::from_stage(format!("maven:3.9-eclipse-temurin-{}", version), "build"),
            Instruction::workdir("/src"),
            Instruction::copy(&["pom.xml"], "./"),
            Instruction::run("mvn -B dependency:go-offline"),
            Instruction::copy(&["."], "."),
            Instruction::run("mvn -B package -DskipTests"),
        ]
    };

    let artifact = if gradle {
        "/src/build/libs/*.jar"
    } else {
        "/src/target/*.jar"
    };
    out.extend([
        Instruction::from_image(format!("eclipse-temurin:{}-jre", version)),
        Instruction::workdir("/app"),
        Instruction::copy_from("build", artifact, "app.jar"),
        Instruction::Expose(8080),
        Instruction::cmd(["java", "-jar", "app.jar"]),
    ]);
    out
}

fn ruby(profile: &StackProfile) -> Vec<Instruction> {
    let mut out = vec![
        Instruction::from_image(format!("ruby:{}-slim", version_or(profile, "3.3"))),
        Instruction::workdir("/app"),
        Instruction::run(
            "apt-get update && apt-get install -y --no-install-recommends build-essential && rm -rf /var/lib/apt/lists/*",
        ),
        Instruction::copy(&["Gemfile", "Gemfile.lock*"], "./"),
        Instruction::run("bundle install"),
        Instruction::copy(&["."], "."),
    ];

    let (port, cmd) = if profile.has_tag(StackTag::Rails) {
        (
            3000,
            Instruction::cmd(["bundle", "exec", "rails", "server", "-b", "0.0.0.0"]),
        )
    } else {
        match profile.entry_point() {
            Some("config.ru") => (
                9292,
                Instruction::cmd(["bundle", "exec", "rackup", "--host", "0.0.0.0"]),
            ),
            Some(entry) => (4567, Instruction::cmd(["bundle", "exec", "ruby", entry])),
            None => (4567, Instruction::cmd(["bundle", "exec", "ruby", "app.rb"])),
        }
    };
    out.push(Instruction::Expose(port));
    out.push(cmd);
    out
}

fn php(profile: &StackProfile) -> Vec<Instruction> {
    let mut out = vec![
        Instruction::from_image(format!("php:{}-apache", version_or(profile, "8.3"))),
        Instruction::workdir("/var/www/html"),
        Instruction::run(
            "apt-get update && apt-get install -y --no-install-recommends git unzip && rm -rf /var/lib/apt/lists/*",
        ),
        Instruction::copy_from("composer:2", "/usr/bin/composer", "/usr/bin/composer"),
        Instruction::copy(&["composer.json", "composer.lock*"], "./"),
        Instruction::run("composer install --no-dev --no-scripts --no-interaction --prefer-dist"),
        Instruction::copy(&["."], "."),
    ];

    if profile.entry_point() == Some("public/index.php") {
        out.push(Instruction::env("APACHE_DOCUMENT_ROOT", "/var/www/html/public"));
        out.push(Instruction::run(
            "sed -ri -e 's!/var/www/html!${APACHE_DOCUMENT_ROOT}!g' /etc/apache2/sites-available/*.conf",
        ));
    }

    out.push(Instruction::Expose(80));
    out.push(Instruction::cmd(["apache2-foreground"]));
    out
}

fn static_site(profile: &StackProfile) -> Vec<Instruction> {
    let source = match profile.entry_point() {
        Some("public/index.html") => "public/",
        _ => ".",
    };
    vec![
        Instruction::from_image("nginx:alpine"),
        Instruction::workdir("/usr/share/nginx/html"),
        Instruction::copy(&[source], "/usr/share/nginx/html"),
        Instruction::Expose(80),
        Instruction::cmd(["nginx", "-g", "daemon off;"]),
    ]
}

/// Copy-all fallback with no install step.
fn generic() -> Vec<Instruction> {
    vec![
        Instruction::from_image("alpine:3.20"),
        Instruction::workdir("/app"),
        Instruction::copy(&["."], "."),
        Instruction::cmd(["sh"]),
    ]
}
