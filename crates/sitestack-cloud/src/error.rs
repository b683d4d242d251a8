//! Provisioning error types

use crate::step::StepKind;
use thiserror::Error;

/// Errors raised while turning a planned step into a live resource
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// The hosted zone for a custom domain does not exist. Zones are never
    /// created on the caller's behalf.
    #[error(
        "Hosted zone not found: {0}. Register the domain and delegate it to the platform's name servers first"
    )]
    ZoneNotFound(String),

    #[error("Step {step} requires a {dependency} handle that was not provided")]
    MissingDependency { step: StepKind, dependency: StepKind },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("IO error")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ProvisionError>;
