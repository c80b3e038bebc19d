//! Batch submission planning
//!
//! A submission hands one batch to a remote build queue: a descriptor file is
//! written into the recipe root and the queue tool is asked to build it under
//! a per-batch package name.

use serde::Serialize;

use crate::config::defaults::SUBMIT_PACKAGE_PREFIX;
use crate::core::partition::BatchMap;
use crate::error::SubmitError;

/// Where and how batches are submitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOptions {
    pub user: String,
    pub queue: String,
    pub labels: Vec<String>,
    pub platforms: Vec<String>,
    /// Ask the remote build to run as a dry run as well
    pub dry_run: bool,
}

/// Everything needed to submit one batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub key: String,
    /// Remote package name, `recipeci-<key>`
    pub package: String,
    /// Packages the remote build runs, in build order
    pub packages: Vec<String>,
    /// Descriptor file contents
    pub descriptor: String,
}

impl Submission {
    /// Plan the submission of `key` whose packages are `packages`
    pub fn new(
        key: &str,
        packages: Vec<String>,
        options: &SubmitOptions,
    ) -> Result<Self, SubmitError> {
        let package = format!("{SUBMIT_PACKAGE_PREFIX}{key}");
        let descriptor =
            render_descriptor(&package, &packages, options).map_err(|e| SubmitError::Render {
                key: key.to_string(),
                error: e.to_string(),
            })?;
        Ok(Self {
            key: key.to_string(),
            package,
            packages,
            descriptor,
        })
    }

    /// `<user>/<package>`
    pub fn full_package(&self, options: &SubmitOptions) -> String {
        format!("{}/{}", options.user, self.package)
    }

    /// Arguments checking whether the remote package exists
    pub fn exists_args(&self, options: &SubmitOptions) -> Vec<String> {
        vec![
            "build".to_string(),
            "list-all".to_string(),
            self.full_package(options),
        ]
    }

    /// Arguments creating the remote package
    pub fn create_args(&self, options: &SubmitOptions) -> Vec<String> {
        vec![
            "package".to_string(),
            "--create".to_string(),
            self.full_package(options),
        ]
    }

    /// Arguments submitting the recipe root to `<user>/<queue>`
    pub fn submit_args(&self, options: &SubmitOptions) -> Vec<String> {
        let mut args = vec![
            "build".to_string(),
            "submit".to_string(),
            "./".to_string(),
            "--queue".to_string(),
            format!("{}/{}", options.user, options.queue),
        ];
        for label in &options.labels {
            args.push("--label".to_string());
            args.push(label.clone());
        }
        args
    }
}

/// Total package count of a batch map, keys included
pub fn total_packages(batches: &BatchMap) -> usize {
    batches.len() + batches.values().map(Vec::len).sum::<usize>()
}

/// Contents of the `.binstar.yml` descriptor
#[derive(Debug, Serialize)]
struct Descriptor<'a> {
    package: &'a str,
    user: &'a str,
    platform: &'a [String],
    engine: Vec<&'static str>,
    script: Vec<String>,
}

fn render_descriptor(
    package: &str,
    packages: &[String],
    options: &SubmitOptions,
) -> Result<String, serde_yaml::Error> {
    let mut command = String::from("recipeci build .");
    for name in packages {
        command.push_str(&format!(" --package \"{name}\""));
    }
    if options.dry_run {
        command.push_str(" --dry-run");
    }

    serde_yaml::to_string(&Descriptor {
        package,
        user: &options.user,
        platform: &options.platforms,
        engine: vec!["python"],
        script: vec![command],
    })
}
