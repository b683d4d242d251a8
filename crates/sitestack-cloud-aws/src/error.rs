//! AWS platform error types

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AwsError {
    #[error("Route 53 request failed: {0}")]
    Route53(String),

    #[error("Site source directory not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("Logical ID already used in template: {0}")]
    DuplicateResource(String),

    #[error("Resource handle is missing attribute '{attribute}' ({resource})")]
    MissingAttribute { resource: String, attribute: String },

    #[error("IO error")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    CloudError(#[from] sitestack_cloud::ProvisionError),
}

pub type Result<T> = std::result::Result<T, AwsError>;

impl From<AwsError> for sitestack_cloud::ProvisionError {
    fn from(err: AwsError) -> Self {
        use sitestack_cloud::ProvisionError;
        match err {
            AwsError::CloudError(e) => e,
            AwsError::IoError(e) => ProvisionError::Io(e),
            AwsError::Route53(msg) => ProvisionError::Api(msg),
            e @ (AwsError::SourceNotFound(_)
            | AwsError::DuplicateResource(_)
            | AwsError::MissingAttribute { .. }) => ProvisionError::InvalidConfig(e.to_string()),
        }
    }
}
