//! sitestack cloud abstraction
//!
//! This crate defines the resource step model shared by the planner and the
//! provisioning backends, and the traits a cloud platform implements to turn
//! planned steps into live resources.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 sitestack CLI                    │
//! │             (validate / plan / synth)            │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                sitestack-core                    │
//! │  resolve(config) → plan(config, mode) → apply    │
//! └─────────────────┬───────────────────────────────┘
//!                   │ ResourceStep + ResolvedDependencies
//! ┌─────────────────▼───────────────────────────────┐
//! │               sitestack-cloud                    │
//! │  trait ProvisioningClient { create(...) }        │
//! │  trait CloudPlatform      { one call per API }   │
//! └───────┬─────────────────┬───────────────────────┘
//!         │                 │
//! ┌───────▼───────┐ ┌───────▼───────┐
//! │ cloud-aws     │ │ fake          │
//! │ (template)    │ │ (recording)   │
//! └───────────────┘ └───────────────┘
//! ```

pub mod error;
pub mod fake;
pub mod provider;
pub mod step;

// Re-exports
pub use error::{ProvisionError, Result};
pub use fake::{RecordedCall, RecordingClient};
pub use provider::{
    CloudPlatform, PlatformClient, ProvisionedResource, ProvisioningClient, ResolvedDependencies,
};
pub use step::{
    AccessIdentityParams, AllowedMethods, BucketParams, BucketPolicyParams, CertificateParams,
    ContentDeploymentParams, DistributionParams, DnsRecordParams, ErrorResponse, Plan,
    PlanSummary, RedirectBucketParams, ResourceStep, StepKind, StepParams, ValidationMethod,
    ViewerProtocolPolicy, ZoneLookupParams,
};
