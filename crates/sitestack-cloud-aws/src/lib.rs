//! AWS platform for sitestack
//!
//! This crate implements [`sitestack_cloud::CloudPlatform`] by synthesizing
//! CloudFormation templates instead of calling the AWS APIs directly.
//! Deploying the templates is left to CloudFormation itself, which also owns
//! reconciliation and rollback.
//!
//! # Resources
//!
//! - S3 bucket (site content) and optional apex redirect bucket
//! - CloudFront origin access identity, bucket policy and distribution
//! - ACM certificate, requested in `us-east-1` through its own stack when the
//!   site stack lives elsewhere
//! - Route 53 alias record in an existing hosted zone
//!
//! # Hosted zones
//!
//! Zones are never created. They are resolved through a [`ZoneLookup`]:
//! [`StaticZones`] (zone ids written in the site file) or, with the `route53`
//! feature, `Route53Zones`, which asks the Route 53 API.
//!
//! # Example
//!
//! ```ignore
//! use sitestack_cloud::PlatformClient;
//! use sitestack_cloud_aws::{CfnSynthesizer, StaticZones};
//!
//! let zones = StaticZones::new().with_zone("example.com", "Z0123456789ABC");
//! let client = PlatformClient::new(CfnSynthesizer::new("my-site", Some("eu-west-1".into()), zones));
//!
//! let deployment = sitestack_core::apply(&plan, &client).await?;
//! let synthesis = client.into_inner().finish();
//! println!("{}", serde_json::to_string_pretty(&synthesis)?);
//! ```

pub mod error;
pub mod synth;
pub mod template;
pub mod zones;

pub use error::{AwsError, Result};
pub use synth::{AssetUpload, CfnSynthesizer, StackTemplate, Synthesis};
pub use template::{Template, TemplateOutput, TemplateResource};
#[cfg(feature = "route53")]
pub use zones::Route53Zones;
pub use zones::{HostedZone, StaticZones, ZoneLookup};
