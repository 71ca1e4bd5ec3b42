use super::engine::{ContainerEngine, EngineOutput};
use crate::error::BuildError;
use async_trait::async_trait;
use bollard::image::BuildImageOptions;
use bollard::Docker;
use futures_util::StreamExt;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// [`ContainerEngine`] backed by the local Docker daemon.
#[derive(Debug, Clone)]
pub struct DockerEngine {
    docker: Docker,
}

impl DockerEngine {
    /// Connects using `DOCKER_HOST` or the platform's default socket. No
    /// request is made until the first call.
    pub fn connect() -> Result<Self, BuildError> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| BuildError::EngineUnavailable(e.to_string()))?;
        Ok(Self { docker })
    }
}

#[async_trait]
impl ContainerEngine for DockerEngine {
    async fn ping(&self) -> Result<(), BuildError> {
        let version = self
            .docker
            .version()
            .await
            .map_err(|e| BuildError::EngineUnavailable(e.to_string()))?;
        debug!(
            api_version = version.api_version.as_deref().unwrap_or("unknown"),
            "Docker engine reachable"
        );
        Ok(())
    }

    async fn build(
        &self,
        context_dir: &Path,
        recipe_file: &str,
        tag: &str,
    ) -> Result<EngineOutput, BuildError> {
        let dir = context_dir.to_path_buf();
        let context = tokio::task::spawn_blocking(move || archive_context(&dir))
            .await
            .map_err(|e| BuildError::Join(e.to_string()))??;

        debug!(tag, bytes = context.len(), "Sending build context");

        let options = BuildImageOptions {
            dockerfile: recipe_file.to_string(),
            t: tag.to_string(),
            rm: true,
            forcerm: true,
            ..Default::default()
        };

        let mut stream = self
            .docker
            .build_image(options, None, Some(context.into()));

        let mut output = EngineOutput {
            success: true,
            ..Default::default()
        };

        while let Some(item) = stream.next().await {
            match item {
                Ok(info) => {
                    if let Some(line) = info.stream {
                        trace!(line = line.trim_end(), "build");
                        output.log.push_str(&line);
                    }
                    if let Some(status) = info.status {
                        output.log.push_str(&status);
                        output.log.push('\n');
                    }
                    if let Some(error) = info.error {
                        output.log.push_str(&error);
                        output.log.push('\n');
                        output.success = false;
                    }
                    if let Some(id) = info.aux.and_then(|aux| aux.id) {
                        output.image_id = Some(id);
                    }
                }
                Err(e) => {
                    output.log.push_str(&e.to_string());
                    output.log.push('\n');
                    output.success = false;
                    break;
                }
            }
        }

        Ok(output)
    }
}

/// Tars the checkout for the build context, leaving out `.git`.
fn archive_context(dir: &Path) -> Result<Vec<u8>, BuildError> {
    let mut builder = tar::Builder::new(Vec::new());
    builder.follow_symlinks(false);

    // `DirEntry::file_type` does not follow symlinks, so a link to a
    // directory outside the checkout is stored as a link, not walked.
    let mut entries: Vec<(PathBuf, bool)> = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_name() == ".git" {
            continue;
        }
        entries.push((entry.path(), entry.file_type()?.is_dir()));
    }
    entries.sort();

    for (path, is_dir) in entries {
        let Some(name) = path.file_name() else {
            continue;
        };
        if is_dir {
            builder.append_dir_all(name, &path)?;
        } else {
            builder.append_path_with_name(&path, name)?;
        }
    }

    Ok(builder.into_inner()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[cfg(unix)]
    #[test]
    fn test_archive_keeps_symlinks_as_links() {
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("secret.txt"), "host-only").unwrap();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Dockerfile"), "FROM scratch\n").unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("leak")).unwrap();
        std::fs::create_dir_all(dir.path().join("nested")).unwrap();
        std::os::unix::fs::symlink(
            outside.path().join("secret.txt"),
            dir.path().join("nested/secret.txt"),
        )
        .unwrap();

        let bytes = archive_context(dir.path()).unwrap();
        let mut archive = tar::Archive::new(bytes.as_slice());
        let mut seen = Vec::new();
        for entry in archive.entries().unwrap() {
            let mut entry = entry.unwrap();
            let name = entry.path().unwrap().to_string_lossy().trim_end_matches('/').to_string();
            let kind = entry.header().entry_type();
            let mut contents = String::new();
            if kind.is_file() {
                entry.read_to_string(&mut contents).unwrap();
            }
            assert!(!contents.contains("host-only"), "{name} leaked host contents");
            seen.push((name, kind));
        }

        let kind_of = |name: &str| seen.iter().find(|(n, _)| n == name).map(|(_, k)| *k);
        assert_eq!(kind_of("leak"), Some(tar::EntryType::Symlink));
        assert_eq!(kind_of("nested/secret.txt"), Some(tar::EntryType::Symlink));
        assert!(!seen.iter().any(|(n, _)| n.starts_with("leak/")));
    }

    #[test]
    fn test_archive_skips_git_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".git/objects")).unwrap();
        std::fs::write(dir.path().join(".git/HEAD"), "ref: refs/heads/main").unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/app.py"), "print('hi')").unwrap();
        std::fs::write(dir.path().join("Dockerfile"), "FROM python:3.12-slim\n").unwrap();

        let bytes = archive_context(dir.path()).unwrap();
        let mut archive = tar::Archive::new(bytes.as_slice());
        let mut names = Vec::new();
        for entry in archive.entries().unwrap() {
            let mut entry = entry.unwrap();
            let name = entry.path().unwrap().to_string_lossy().to_string();
            if name == "Dockerfile" {
                let mut contents = String::new();
                entry.read_to_string(&mut contents).unwrap();
                assert_eq!(contents, "FROM python:3.12-slim\n");
            }
            names.push(name);
        }

        assert!(names.contains(&"Dockerfile".to_string()));
        assert!(names.iter().any(|n| n.trim_end_matches('/') == "src/app.py"));
        assert!(!names.iter().any(|n| n.starts_with(".git")));
    }
}
