crate::define_tag_enum! {
    /// A recognized technology. The first group can be a profile's primary
    /// tag and selects a recipe template; the second group only annotates.
    StackTag {
        Node => "node" : "Node" | "nodejs" | "javascript",
        Frontend => "frontend" : "Frontend" | "spa",
        Python => "python" : "Python",
        Go => "go" : "Go" | "golang",
        Rust => "rust" : "Rust",
        Java => "java" : "Java" | "jvm",
        Ruby => "ruby" : "Ruby",
        Php => "php" : "PHP",
        Static => "static" : "Static" | "html",
        Unknown => "unknown" : "Unknown" | "generic",

        TypeScript => "typescript" : "TypeScript" | "ts",
        NextJs => "nextjs" : "Next.js" | "next",
        Django => "django" : "Django",
        Flask => "flask" : "Flask",
        FastApi => "fastapi" : "FastAPI",
        Rails => "rails" : "Rails" | "ruby-on-rails",
        Maven => "maven" : "Maven",
        Gradle => "gradle" : "Gradle",
    }
}

impl StackTag {
    /// Whether this tag may head a profile and key a recipe template.
    pub fn is_primary(&self) -> bool {
        matches!(
            self,
            StackTag::Node
                | StackTag::Frontend
                | StackTag::Python
                | StackTag::Go
                | StackTag::Rust
                | StackTag::Java
                | StackTag::Ruby
                | StackTag::Php
                | StackTag::Static
                | StackTag::Unknown
        )
    }
}
