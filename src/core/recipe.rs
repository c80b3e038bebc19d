//! Recipe reading
//!
//! A recipe is a directory describing one package. The shipped reader
//! understands `recipe.toml`:
//!
//! ```toml
//! [package]
//! name = "libfoo"
//! version = "1.2.0"
//!
//! [build]
//! number = 0
//!
//! [requirements]
//! build = ["zlib", "openssl 1.1.*"]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::defaults::DEFAULT_RECIPE_FILE;
use crate::error::RecipeError;

/// Package metadata read from a recipe directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    /// Declared package name
    pub name: String,

    /// Declared version (informational)
    pub version: String,

    /// Build number (informational)
    pub build_number: u64,

    /// Build dependency name -> version constraint (may be empty)
    pub dependencies: BTreeMap<String, String>,

    /// Recipe directory handed to the build tool
    pub path: PathBuf,
}

impl Recipe {
    /// File name of the built artifact, as found in a local build cache
    pub fn artifact_name(&self, extension: &str) -> String {
        format!(
            "{}-{}-{}.{extension}",
            self.name, self.version, self.build_number
        )
    }
}

/// Reads a recipe directory into a [`Recipe`]
pub trait RecipeReader {
    /// Read the recipe in `dir`
    fn read(&self, dir: &Path) -> Result<Recipe, RecipeError>;
}

/// On-disk layout of `recipe.toml`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecipeFile {
    /// Package section
    pub package: RecipePackage,

    /// Build section
    #[serde(default)]
    pub build: RecipeBuild,

    /// Requirements section
    #[serde(default)]
    pub requirements: RecipeRequirements,
}

/// `[package]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecipePackage {
    /// Package name
    pub name: String,

    /// Package version
    #[serde(default)]
    pub version: String,
}

/// `[build]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RecipeBuild {
    /// Build number
    #[serde(default)]
    pub number: u64,
}

/// `[requirements]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RecipeRequirements {
    /// Build-time requirements, `"name"` or `"name constraint"`
    #[serde(default)]
    pub build: Vec<String>,
}

impl RecipeFile {
    /// Parse from TOML string
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Convert into a [`Recipe`] located at `path`
    pub fn into_recipe(self, path: PathBuf) -> Recipe {
        Recipe {
            name: self.package.name,
            version: self.package.version,
            build_number: self.build.number,
            dependencies: parse_requirements(&self.requirements.build),
            path,
        }
    }
}

/// Split requirement strings into a name -> constraint map
///
/// Exactly two whitespace-separated tokens give `name -> constraint`; any other
/// count keeps only the first token with an empty constraint. Blank entries are
/// ignored.
pub fn parse_requirements(entries: &[String]) -> BTreeMap<String, String> {
    let mut deps = BTreeMap::new();
    for entry in entries {
        let tokens: Vec<&str> = entry.split_whitespace().collect();
        match tokens.as_slice() {
            [] => {}
            [name, constraint] => {
                deps.insert((*name).to_string(), (*constraint).to_string());
            }
            [name, ..] => {
                deps.insert((*name).to_string(), String::new());
            }
        }
    }
    deps
}

/// Reader for `recipe.toml` files
#[derive(Debug, Clone)]
pub struct TomlRecipeReader {
    file_name: String,
}

impl Default for TomlRecipeReader {
    fn default() -> Self {
        Self::new(DEFAULT_RECIPE_FILE)
    }
}

impl TomlRecipeReader {
    /// Create a reader looking for `file_name` in each directory
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }
}

impl RecipeReader for TomlRecipeReader {
    fn read(&self, dir: &Path) -> Result<Recipe, RecipeError> {
        let file = dir.join(&self.file_name);
        if !file.is_file() {
            return Err(RecipeError::NotFound { path: file });
        }

        let content = std::fs::read_to_string(&file).map_err(|e| RecipeError::Read {
            path: file.clone(),
            error: e.to_string(),
        })?;

        let parsed = RecipeFile::from_toml(&content).map_err(|e| RecipeError::Malformed {
            path: file.clone(),
            error: e.to_string(),
        })?;

        if parsed.package.name.trim().is_empty() {
            return Err(RecipeError::Malformed {
                path: file,
                error: "package name is empty".to_string(),
            });
        }

        Ok(parsed.into_recipe(dir.to_path_buf()))
    }
}
