//! Default configuration values

/// Recipe file looked up in each package directory
pub const DEFAULT_RECIPE_FILE: &str = "recipe.toml";

/// Project-level settings file in the recipe root
pub const PROJECT_SETTINGS_FILE: &str = "recipeci.toml";

/// Build tool invoked once per package
pub const DEFAULT_BUILD_TOOL: &str = "conda";

/// Arguments placed before the recipe directory
pub const DEFAULT_BUILD_ARGS: &[&str] = &["build", "-q"];

/// Resource sampling interval while a build runs (milliseconds)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Seconds reserved for reporting before an outer job timeout
pub const DEFAULT_TIMEOUT_BUFFER_SECS: u64 = 300;

/// Extension of built artifacts in the local build cache
pub const DEFAULT_ARTIFACT_EXTENSION: &str = "tar.bz2";

/// Packages per batch when splitting
pub const DEFAULT_TARGET_BATCH_SIZE: usize = 10;

/// Batch file written by `split`
pub const DEFAULT_BATCH_FILE: &str = "package_tree.json";

/// Submission tool
pub const DEFAULT_SUBMIT_TOOL: &str = "anaconda";

/// Submission user
pub const DEFAULT_SUBMIT_USER: &str = "conda-team";

/// Submission queue
pub const DEFAULT_SUBMIT_QUEUE: &str = "build_recipes";

/// Labels applied to submitted builds
pub const DEFAULT_SUBMIT_LABELS: &[&str] = &["dev"];

/// Descriptor written into the recipe root before each submission
pub const SUBMIT_DESCRIPTOR_FILE: &str = ".binstar.yml";

/// Prefix of remote package names created for batches
pub const SUBMIT_PACKAGE_PREFIX: &str = "recipeci-";

/// Exit status reported when the run was interrupted
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Largest exit status a failed-package count is reported as
pub const MAX_EXIT_CODE: i32 = 255;
