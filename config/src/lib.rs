//! Configuration loading for flint.
//!
//! Settings live in a TOML file with a single `[checker]` table. The file is
//! looked up in order: the path in `FLINT_CONFIG`, `.flint.toml` in the
//! current directory, then `~/.flint/config.toml`. No file means defaults.

use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
};

use flint_check::{CheckError, CheckerConfig};
use flint_types::ColumnUnit;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "FLINT_CONFIG";

/// Per-project config file name, looked up in the current directory.
pub const LOCAL_CONFIG_FILE: &str = ".flint.toml";

fn default_command() -> String {
    "eslint".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlintConfig {
    #[serde(default)]
    pub checker: CheckerSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckerSection {
    /// Executable name (searched on `PATH`) or path.
    #[serde(default = "default_command")]
    pub command: String,
    #[serde(default)]
    pub args: ExtraArgs,
    /// Overrides project-root discovery for every document.
    pub project_root: Option<String>,
    #[serde(default)]
    pub column_unit: ColumnUnit,
    /// File names marking a project root, e.g. `package.json`. Empty runs
    /// the analyzer in each document's directory.
    #[serde(default)]
    pub root_markers: Vec<String>,
}

impl Default for CheckerSection {
    fn default() -> Self {
        Self {
            command: default_command(),
            args: ExtraArgs::default(),
            project_root: None,
            column_unit: ColumnUnit::default(),
            root_markers: Vec::new(),
        }
    }
}

/// Extra analyzer arguments: a single string is passed as one argument.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ExtraArgs {
    One(String),
    Many(Vec<String>),
}

impl Default for ExtraArgs {
    fn default() -> Self {
        ExtraArgs::Many(Vec::new())
    }
}

impl ExtraArgs {
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            ExtraArgs::One(arg) => vec![arg.clone()],
            ExtraArgs::Many(args) => args.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

/// Replace `${VAR}` with the variable's value. Unset variables expand to
/// nothing; an unclosed `${` is kept as written.
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(open) = rest.find("${") {
        let after = &rest[open + 2..];
        let Some(close) = after.find('}') else {
            break;
        };
        out.push_str(&rest[..open]);
        let var = &after[..close];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &after[close + 1..];
    }

    out.push_str(rest);
    out
}

impl FlintConfig {
    /// Load from the first config file found, or defaults when there is none.
    pub fn load() -> Result<Self, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => {
                tracing::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load from an explicit path. A missing file is an error here.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => {
                tracing::debug!(path = %path.display(), "Loaded config");
                Ok(config)
            }
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    #[must_use]
    pub fn column_unit(&self) -> ColumnUnit {
        self.checker.column_unit
    }

    /// Expand variables, locate the analyzer and assemble its launch
    /// parameters.
    pub fn to_checker_config(&self) -> Result<CheckerConfig, CheckError> {
        let section = &self.checker;
        let command = expand_env_vars(&section.command);
        let args = section
            .args
            .to_vec()
            .iter()
            .map(|arg| expand_env_vars(arg))
            .collect();
        let project_root = section
            .project_root
            .as_deref()
            .map(expand_env_vars)
            .filter(|root| !root.is_empty())
            .map(PathBuf::from);

        Ok(CheckerConfig::resolve(&command)?
            .with_extra_args(args)
            .with_project_root(project_root)
            .with_root_markers(section.root_markers.clone()))
    }
}

/// The config file [`FlintConfig::load`] would read, if any.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    let explicit = env::var_os(CONFIG_ENV)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from);
    let cwd = env::current_dir().ok();
    let home = dirs::home_dir();
    locate(explicit, cwd.as_deref(), home.as_deref())
}

fn locate(explicit: Option<PathBuf>, cwd: Option<&Path>, home: Option<&Path>) -> Option<PathBuf> {
    // An explicit path is returned even when missing so the read error
    // names it.
    if explicit.is_some() {
        return explicit;
    }
    let local = cwd.map(|dir| dir.join(LOCAL_CONFIG_FILE));
    let global = home.map(|dir| dir.join(".flint").join("config.toml"));
    [local, global].into_iter().flatten().find(|path| path.is_file())
}
