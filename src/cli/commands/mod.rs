//! CLI command implementations
//!
//! Each command is implemented in its own submodule.

pub mod build;
pub mod order;
pub mod split;
pub mod submit;

use anyhow::{bail, Context as _, Result};
use clap::{Args, Subcommand};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::cli::output::OutputConfig;
use crate::core::batch_file::{batch_packages, read_batch_file};
use crate::core::changes::parse_changed_paths;
use crate::core::dirty::dirty_set;
use crate::core::graph::DependencyGraph;
use crate::core::planner::Selection;
use crate::infra::filesystem::read_file;
use crate::core::recipe::TomlRecipeReader;
use crate::core::scan::{DirtyMode, GraphBuilder};
use crate::core::settings::Settings;
use crate::infra::dirs::RecipeciDirs;

/// State shared by all commands
#[derive(Debug, Clone)]
pub struct Context {
    pub output: OutputConfig,
    /// Explicit settings file
    pub config: Option<PathBuf>,
}

impl Context {
    /// Settings that apply to the recipe directory `recipe_root`
    pub fn settings(&self, recipe_root: &Path) -> Result<Settings> {
        Settings::discover(self.config.as_deref(), recipe_root, &RecipeciDirs::new())
            .context("Failed to load settings")
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build packages in dependency order
    Build {
        #[command(flatten)]
        target: TargetArgs,

        /// Record packages as built without running the build tool
        #[arg(long)]
        dry_run: bool,

        /// Build dependents of failed packages anyway
        #[arg(long)]
        no_autofail: bool,

        /// Cumulative build time budget in seconds
        #[arg(long, value_name = "SECS")]
        job_timeout: Option<u64>,

        /// Seconds of the budget kept in reserve
        #[arg(long, value_name = "SECS")]
        timeout_buffer: Option<u64>,

        /// Extra arguments for the build tool, whitespace separated
        #[arg(long, value_name = "ARGS", allow_hyphen_values = true)]
        args: Option<String>,

        /// Copy DIR/<pkg>/<file> over the recipes before building
        #[arg(long, value_name = "DIR")]
        overlay: Option<PathBuf>,

        /// Skip packages whose artifact is already in the build cache
        #[arg(long)]
        skip_built: bool,
    },

    /// Print the build order without building
    Order {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Split the recipe graph into self-contained batches
    Split {
        /// Directory of recipes
        path: PathBuf,

        /// Target number of packages per batch
        #[arg(short, long, value_name = "N")]
        target_size: Option<usize>,

        /// Batch file to write
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Also read recipes one directory level deeper
        #[arg(long)]
        nested: bool,
    },

    /// Submit batches to a remote build queue
    Submit {
        /// Directory of recipes
        path: PathBuf,

        /// Batch file to read keys from
        #[arg(long, value_name = "FILE", requires = "keys", conflicts_with = "all_batches")]
        batch_file: Option<PathBuf>,

        /// Batch key to submit (repeatable)
        #[arg(short, long = "key", value_name = "KEY", requires = "batch_file")]
        keys: Vec<String>,

        /// Submit every batch of this file
        #[arg(long, value_name = "FILE")]
        all_batches: Option<PathBuf>,

        /// Target platform (repeatable)
        #[arg(long = "platform", value_name = "PLATFORM")]
        platforms: Vec<String>,

        /// Account owning the submitted packages
        #[arg(long)]
        user: Option<String>,

        /// Build queue name
        #[arg(long)]
        queue: Option<String>,

        /// Label for the submitted builds (repeatable)
        #[arg(long = "label", value_name = "LABEL")]
        labels: Vec<String>,

        /// Copy DIR/<pkg>/<file> over the recipes before submitting
        #[arg(long, value_name = "DIR")]
        overlay: Option<PathBuf>,

        /// Write the descriptor and print the commands without submitting
        #[arg(long)]
        dry_run: bool,
    },
}

/// Which recipes a build or order command is about
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Directory of recipes
    pub path: PathBuf,

    /// Package to build (repeatable)
    #[arg(short, long = "package", value_name = "NAME")]
    pub packages: Vec<String>,

    /// Build every recipe
    #[arg(long, conflicts_with_all = ["packages", "batch_file", "changed", "changed_from"])]
    pub all: bool,

    /// Batch file written by `split`
    #[arg(long, value_name = "FILE", requires = "keys")]
    pub batch_file: Option<PathBuf>,

    /// Batch key to build (repeatable)
    #[arg(short, long = "key", value_name = "KEY", requires = "batch_file")]
    pub keys: Vec<String>,

    /// Changed recipe directory (repeatable)
    #[arg(long, value_name = "DIR")]
    pub changed: Vec<String>,

    /// File listing changed paths, one per line (`-` for stdin)
    #[arg(long, value_name = "FILE")]
    pub changed_from: Option<PathBuf>,

    /// Rounds of dependents added around changed recipes
    #[arg(long, default_value_t = 1)]
    pub depth: usize,

    /// Rounds of dependencies added around selected packages
    #[arg(short, long, default_value_t = 0)]
    pub level: usize,

    /// Also read recipes one directory level deeper
    #[arg(long)]
    pub nested: bool,
}

impl TargetArgs {
    fn changed_set(&self) -> Result<Option<BTreeSet<String>>> {
        if self.changed.is_empty() && self.changed_from.is_none() {
            return Ok(None);
        }

        let mut changed: BTreeSet<String> = self.changed.iter().cloned().collect();
        if let Some(path) = &self.changed_from {
            let text = if path.as_os_str() == "-" {
                std::io::read_to_string(std::io::stdin()).context("Failed to read stdin")?
            } else {
                read_file(path)?
            };
            changed.extend(parse_changed_paths(&text));
        }
        Ok(Some(changed))
    }

    /// Scan the recipes and work out the selection
    ///
    /// `None` means the selection is empty (nothing changed).
    pub fn resolve(&self, settings: &Settings) -> Result<(DependencyGraph, Option<Selection>)> {
        let changed = self.changed_set()?;
        let mode = match (&changed, self.all) {
            (Some(set), _) => DirtyMode::Changed(set.clone()),
            (None, true) => DirtyMode::All,
            (None, false) => DirtyMode::Clean,
        };

        let mut graph = scan(&self.path, settings, self.nested, &mode)?;

        let selection = if self.all {
            Some(Selection::All)
        } else if !self.packages.is_empty() {
            Some(Selection::packages(self.packages.iter().cloned()))
        } else if let Some(file) = &self.batch_file {
            let batches = read_batch_file(file)?;
            let mut packages: Vec<String> = Vec::new();
            for key in &self.keys {
                for name in batch_packages(&batches, key, file)? {
                    if !packages.contains(&name) {
                        packages.push(name);
                    }
                }
            }
            Some(Selection::Packages(packages))
        } else if changed.is_some() {
            let dirty = dirty_set(&mut graph, self.depth);
            tracing::info!("Packages affected by changes: {}", dirty.len());
            (!dirty.is_empty()).then(|| Selection::packages(dirty))
        } else {
            bail!("No packages selected: use --package, --all, --batch-file with --key, or --changed");
        };

        Ok((graph, selection))
    }
}

/// Read the recipe directory into a graph
pub fn scan(
    path: &Path,
    settings: &Settings,
    nested: bool,
    mode: &DirtyMode,
) -> Result<DependencyGraph> {
    let reader = TomlRecipeReader::new(settings.recipe_file());
    GraphBuilder::new(reader)
        .nested(nested || settings.nested())
        .build(path, mode)
        .with_context(|| format!("Failed to read recipes from {}", path.display()))
}

impl Commands {
    /// Execute the command, returning the process exit status
    pub async fn run(self, context: &Context) -> Result<i32> {
        match self {
            Self::Build {
                target,
                dry_run,
                no_autofail,
                job_timeout,
                timeout_buffer,
                args,
                overlay,
                skip_built,
            } => {
                let options = build::BuildOptions {
                    dry_run,
                    no_autofail,
                    job_timeout,
                    timeout_buffer,
                    args,
                    overlay,
                    skip_built,
                };
                build::execute(context, &target, options).await
            }
            Self::Order { target } => order::execute(context, &target),
            Self::Split {
                path,
                target_size,
                output,
                nested,
            } => split::execute(context, &path, target_size, output, nested),
            Self::Submit {
                path,
                batch_file,
                keys,
                all_batches,
                platforms,
                user,
                queue,
                labels,
                overlay,
                dry_run,
            } => {
                let options = submit::SubmitArgs {
                    batch_file,
                    keys,
                    all_batches,
                    platforms,
                    user,
                    queue,
                    labels,
                    overlay,
                    dry_run,
                };
                submit::execute(context, &path, options).await
            }
        }
    }
}
