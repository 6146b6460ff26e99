//! Public types consumed by the host.
//!
//! The host constructs a [`CheckerConfig`], submits documents to the
//! controller, and observes run outcomes as [`RunState`]s. Failures to start
//! a run surface as [`CheckError`].

use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use flint_types::{Document, DocumentId, RunId};

/// Flags that make the analyzer read the document from stdin, name it by
/// path for config lookup, and report every file plainly.
pub(crate) const BASE_ARGS: [&str; 4] =
    ["--no-color", "--no-ignore", "--stdin", "--stdin-filename"];

/// Static parameters for launching the analyzer.
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    program: PathBuf,
    extra_args: Vec<String>,
    project_root: Option<PathBuf>,
    root_markers: Vec<String>,
}

impl CheckerConfig {
    /// Use `program` as given, without searching `PATH`.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            extra_args: Vec::new(),
            project_root: None,
            root_markers: Vec::new(),
        }
    }

    /// Locate `command` on `PATH` (or accept it as a path).
    ///
    /// A missing executable means no check can ever run; callers report
    /// that once instead of attempting runs.
    pub fn resolve(command: &str) -> Result<Self, CheckError> {
        let program = which::which(command).map_err(|e| CheckError::ToolUnavailable {
            command: command.to_string(),
            reason: e.to_string(),
        })?;
        tracing::debug!(command, program = %program.display(), "Resolved analyzer executable");
        Ok(Self::new(program))
    }

    /// Arguments appended verbatim after the built-in flags.
    #[must_use]
    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    /// Directory to run the analyzer in, instead of the document's directory.
    #[must_use]
    pub fn with_project_root(mut self, root: Option<PathBuf>) -> Self {
        self.project_root = root;
        self
    }

    /// File names that mark a project root, e.g. `package.json`.
    #[must_use]
    pub fn with_root_markers(mut self, markers: Vec<String>) -> Self {
        self.root_markers = markers;
        self
    }

    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    #[must_use]
    pub fn extra_args(&self) -> &[String] {
        &self.extra_args
    }

    #[must_use]
    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }

    /// Full argument vector for checking `document`.
    #[must_use]
    pub fn args_for(&self, document: &Document) -> Vec<String> {
        let mut args: Vec<String> = BASE_ARGS.iter().map(ToString::to_string).collect();
        args.push(document.path().to_string_lossy().into_owned());
        args.extend(self.extra_args.iter().cloned());
        args
    }

    #[must_use]
    pub fn root_markers(&self) -> &[String] {
        &self.root_markers
    }

    /// Working directory for checking `document`.
    ///
    /// A configured project root wins. Otherwise the nearest ancestor of the
    /// document holding a root marker, falling back to the document's own
    /// directory. `None` inherits the host's.
    #[must_use]
    pub fn working_dir_for(&self, document: &Document) -> Option<PathBuf> {
        if let Some(root) = &self.project_root {
            return Some(root.clone());
        }
        let dir = document.directory()?;
        Some(find_project_root(dir, &self.root_markers).unwrap_or_else(|| dir.to_path_buf()))
    }
}

/// Walk up from `start` to the first directory containing any of `markers`.
#[must_use]
pub fn find_project_root(start: &Path, markers: &[String]) -> Option<PathBuf> {
    if markers.is_empty() {
        return None;
    }
    start
        .ancestors()
        .find(|dir| markers.iter().any(|marker| dir.join(marker).exists()))
        .map(Path::to_path_buf)
}

/// Reasons a check could not be started.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error("analyzer `{command}` is not available: {reason}")]
    ToolUnavailable { command: String, reason: String },
    #[error("failed to spawn analyzer `{}`: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CheckError {
    /// Both variants mean "no check performed"; this separates a missing
    /// executable from other launch failures.
    #[must_use]
    pub fn is_tool_unavailable(&self) -> bool {
        match self {
            Self::ToolUnavailable { .. } => true,
            Self::Spawn { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
        }
    }
}

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    /// Process alive, output still being captured.
    Running,
    /// Exited and its diagnostics were delivered.
    Completed,
    /// Replaced or cancelled; its output was discarded.
    Superseded,
    /// Capturing output or reaping the process failed; nothing delivered.
    Failed,
}

impl RunState {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Superseded => "superseded",
            Self::Failed => "failed",
        }
    }
}

/// Outcome of one run as observed by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    pub document: DocumentId,
    pub run: RunId,
    pub state: RunState,
}

/// Message from a run task back to the controller.
#[derive(Debug)]
pub(crate) enum RunEvent {
    Finished {
        document: DocumentId,
        run: RunId,
        status: ExitStatus,
        output: String,
    },
    Failed {
        document: DocumentId,
        run: RunId,
        error: String,
    },
}

impl RunEvent {
    pub(crate) fn document(&self) -> DocumentId {
        match self {
            Self::Finished { document, .. } | Self::Failed { document, .. } => *document,
        }
    }

    pub(crate) fn run(&self) -> RunId {
        match self {
            Self::Finished { run, .. } | Self::Failed { run, .. } => *run,
        }
    }
}
