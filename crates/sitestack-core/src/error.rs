use sitestack_cloud::{ProvisionError, StepKind};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SiteError {
    #[error("Invalid site configuration: {0}")]
    Validation(String),

    #[error("Plan dependency error")]
    Dependency(#[from] DependencyError),

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error(
        "Site file not found\nHint: create site.kdl in the current directory or pass --config"
    )]
    SiteFileNotFound,

    #[error("Failed to read site file {}", .path.display())]
    SiteFileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse site file {}: {}", .path.display(), kdl_details(.error))]
    SiteFileParse { path: PathBuf, error: kdl::KdlError },

    #[error("KDL parse error: {}", kdl_details(.0))]
    KdlParse(kdl::KdlError),

    #[error("Invalid site file: {0}")]
    InvalidSiteFile(String),

    #[error("IO error")]
    Io(#[from] std::io::Error),
}

impl From<kdl::KdlError> for SiteError {
    fn from(err: kdl::KdlError) -> Self {
        Self::KdlParse(err)
    }
}

impl SiteError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn is_zone_not_found(&self) -> bool {
        matches!(self, Self::Provision(ProvisionError::ZoneNotFound(_)))
    }
}

/// Violations of the step graph invariants
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DependencyError {
    #[error("step '{step}' references '{dependency}', which is not in the plan")]
    MissingDependency { step: StepKind, dependency: StepKind },

    #[error("step '{0}' appears more than once")]
    DuplicateStep(StepKind),

    #[error("dependency cycle between steps: {}", display_kinds(.0))]
    Cycle(Vec<StepKind>),

    #[error("step '{step}' ran before its dependency '{dependency}' produced a handle")]
    UnresolvedHandle { step: StepKind, dependency: StepKind },
}

fn display_kinds(kinds: &[StepKind]) -> String {
    kinds
        .iter()
        .map(StepKind::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, SiteError>;

/// `line N: message` for each diagnostic, joined with `; `
fn kdl_details(err: &kdl::KdlError) -> String {
    let details: Vec<String> = err
        .diagnostics
        .iter()
        .map(|diagnostic| {
            let message = diagnostic.message.as_deref().unwrap_or("unexpected input");
            let line = err
                .input
                .get(..diagnostic.span.offset())
                .map(|before| before.matches('\n').count() + 1);
            let mut detail = match line {
                Some(line) => format!("line {line}: {message}"),
                None => message.to_string(),
            };
            if let Some(help) = &diagnostic.help {
                detail.push_str(&format!(" ({help})"));
            }
            detail
        })
        .collect();

    if details.is_empty() {
        "invalid KDL document".to_string()
    } else {
        details.join("; ")
    }
}

/// Site file path shown in parse errors
pub(crate) fn file_context(path: &Path, err: SiteError) -> SiteError {
    match err {
        SiteError::InvalidSiteFile(msg) => {
            SiteError::InvalidSiteFile(format!("{}: {msg}", path.display()))
        }
        SiteError::KdlParse(error) => SiteError::SiteFileParse {
            path: path.to_path_buf(),
            error,
        },
        other => other,
    }
}
