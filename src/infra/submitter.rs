//! Queue tool invocation for batch submissions

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::config::defaults::SUBMIT_DESCRIPTOR_FILE;
use crate::core::submit::{SubmitOptions, Submission};
use crate::error::SubmitError;
use crate::infra::filesystem::write_file;

/// Runs the submission tool from the recipe root
#[derive(Debug, Clone)]
pub struct Submitter {
    tool: PathBuf,
    recipe_root: PathBuf,
}

impl Submitter {
    /// Resolve `tool` on `PATH`
    pub fn new(tool: &str, recipe_root: &Path) -> Result<Self, SubmitError> {
        let tool = which::which(tool).map_err(|_| SubmitError::ToolNotFound {
            tool: tool.to_string(),
        })?;
        Ok(Self {
            tool,
            recipe_root: recipe_root.to_path_buf(),
        })
    }

    /// Write the descriptor, create the remote package if needed, submit
    ///
    /// Returns the tool's output lines that mention how to follow the build.
    pub async fn submit(
        &self,
        submission: &Submission,
        options: &SubmitOptions,
    ) -> Result<Vec<String>, SubmitError> {
        write_descriptor(&self.recipe_root, submission)?;

        let full_package = submission.full_package(options);
        let exists = self.status(&submission.exists_args(options)).await?;
        if exists != 0 {
            tracing::info!("Creating package {full_package}");
            let code = self.status(&submission.create_args(options)).await?;
            if code != 0 {
                return Err(SubmitError::CreatePackage {
                    package: full_package,
                    code,
                });
            }
        }

        let args = submission.submit_args(options);
        tracing::info!("Submitting batch {}: {}", submission.key, args.join(" "));
        let output = Command::new(&self.tool)
            .args(&args)
            .current_dir(&self.recipe_root)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| SubmitError::Spawn {
                command: self.display(&args),
                error: e.to_string(),
            })?;

        let code = output.status.code().unwrap_or(-1);
        if code != 0 {
            tracing::debug!("{}", String::from_utf8_lossy(&output.stderr));
            return Err(SubmitError::Rejected {
                key: submission.key.clone(),
                code,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout
            .lines()
            .filter(|line| line.contains("tail") && line.contains(&full_package))
            .map(str::to_string)
            .collect())
    }

    async fn status(&self, args: &[String]) -> Result<i32, SubmitError> {
        let status = Command::new(&self.tool)
            .args(args)
            .current_dir(&self.recipe_root)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| SubmitError::Spawn {
                command: self.display(args),
                error: e.to_string(),
            })?;
        Ok(status.code().unwrap_or(-1))
    }

    fn display(&self, args: &[String]) -> String {
        format!("{} {}", self.tool.display(), args.join(" "))
    }
}

/// Write the submission descriptor into `recipe_root`
pub fn write_descriptor(recipe_root: &Path, submission: &Submission) -> Result<PathBuf, SubmitError> {
    let path = recipe_root.join(SUBMIT_DESCRIPTOR_FILE);
    write_file(&path, &submission.descriptor)?;
    Ok(path)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::error::FilesystemError;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn options() -> SubmitOptions {
        SubmitOptions {
            user: "team".to_string(),
            queue: "q".to_string(),
            labels: vec!["dev".to_string()],
            platforms: vec!["linux-64".to_string()],
            dry_run: false,
        }
    }

    /// Fake queue tool logging its arguments; `list-all` fails, so the
    /// package is created first
    fn fake_tool(dir: &Path) -> PathBuf {
        let path = dir.join("fake-anaconda");
        let log = dir.join("calls.log");
        std::fs::write(
            &path,
            format!(
                "#!/bin/sh\necho \"$@\" >> '{}'\n\
                 case \"$2\" in list-all) exit 1;; submit) echo \"tail -f team/recipeci-app\";; esac\n\
                 exit 0\n",
                log.display()
            ),
        )
        .unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    async fn test_submit_creates_then_submits() {
        let tools = TempDir::new().unwrap();
        let recipes = TempDir::new().unwrap();
        let tool = fake_tool(tools.path());

        let submitter = Submitter::new(tool.to_str().unwrap(), recipes.path()).unwrap();
        let submission = Submission::new("app", vec!["app".into()], &options()).unwrap();
        let tail = submitter.submit(&submission, &options()).await.unwrap();

        assert_eq!(tail, vec!["tail -f team/recipeci-app"]);
        assert!(recipes.path().join(".binstar.yml").is_file());

        let calls = std::fs::read_to_string(tools.path().join("calls.log")).unwrap();
        let calls: Vec<&str> = calls.lines().collect();
        assert_eq!(
            calls,
            vec![
                "build list-all team/recipeci-app",
                "package --create team/recipeci-app",
                "build submit ./ --queue team/q --label dev",
            ]
        );
    }

    #[test]
    fn test_write_descriptor() {
        let recipes = TempDir::new().unwrap();
        let submission = Submission::new("app", vec!["app".into()], &options()).unwrap();

        let path = write_descriptor(recipes.path(), &submission).unwrap();
        assert_eq!(path, recipes.path().join(".binstar.yml"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), submission.descriptor);

        let not_a_dir = recipes.path().join("file");
        std::fs::write(&not_a_dir, "").unwrap();
        assert!(matches!(
            write_descriptor(&not_a_dir, &submission),
            Err(SubmitError::Descriptor(FilesystemError::CreateDir { .. }))
        ));
    }

    #[test]
    fn test_missing_tool() {
        let recipes = TempDir::new().unwrap();
        assert!(matches!(
            Submitter::new("recipeci-no-such-queue-tool", recipes.path()),
            Err(SubmitError::ToolNotFound { .. })
        ));
    }
}
