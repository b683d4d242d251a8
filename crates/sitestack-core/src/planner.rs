//! Resource planner
//!
//! Turns a [`WebsiteConfig`] and a [`DeploymentMode`] into an ordered
//! [`Plan`]. Steps are collected per mode and then put in topological order
//! over their references; independent steps keep [`StepKind`] order.

use crate::config::{WebsiteConfig, normalize_region};
use crate::error::{DependencyError, Result, SiteError};
use serde::{Deserialize, Serialize};
use sitestack_cloud::{
    AccessIdentityParams, AllowedMethods, BucketParams, BucketPolicyParams, CertificateParams,
    ContentDeploymentParams, DistributionParams, DnsRecordParams, ErrorResponse, Plan,
    RedirectBucketParams, ResourceStep, StepKind, StepParams, ValidationMethod,
    ViewerProtocolPolicy, ZoneLookupParams,
};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

/// The CDN only accepts certificates issued in this region
pub const CERTIFICATE_REGION: &str = "us-east-1";

/// Origin errors rewritten to the index document for client-side routing
const REWRITTEN_ERROR_CODES: [u16; 2] = [403, 404];

const ACCESS_IDENTITY_COMMENT: &str =
    "Origin Access Identity for CloudFront Distribution to access S3 Bucket";

/// How the site is exposed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeploymentMode {
    /// Public website bucket, no CDN
    BucketOnly,
    /// Private bucket behind a CDN on its generated domain
    #[serde(rename = "cdn")]
    CdnOnly,
    /// CDN on `subdomain.domain` with a certificate and DNS alias
    #[default]
    #[serde(rename = "cdn-custom-domain")]
    CdnWithCustomDomain,
}

impl DeploymentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentMode::BucketOnly => "bucket-only",
            DeploymentMode::CdnOnly => "cdn",
            DeploymentMode::CdnWithCustomDomain => "cdn-custom-domain",
        }
    }

    pub fn uses_cdn(&self) -> bool {
        !matches!(self, DeploymentMode::BucketOnly)
    }

    pub fn uses_custom_domain(&self) -> bool {
        matches!(self, DeploymentMode::CdnWithCustomDomain)
    }
}

impl std::fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeploymentMode {
    type Err = SiteError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bucket-only" | "bucket" => Ok(DeploymentMode::BucketOnly),
            "cdn" | "cdn-only" => Ok(DeploymentMode::CdnOnly),
            "cdn-custom-domain" | "custom-domain" => Ok(DeploymentMode::CdnWithCustomDomain),
            other => Err(SiteError::validation(format!(
                "unknown deployment mode '{other}' (expected bucket-only, cdn or cdn-custom-domain)"
            ))),
        }
    }
}

/// Optional extras on top of the mode's base plan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanOptions {
    /// Region of the stack. Never affects the certificate region.
    pub stack_region: Option<String>,

    /// Add a bucket on the apex domain that redirects to the site host
    pub redirect_apex: bool,

    /// Upload the source directory after the resources exist
    pub deploy_content: bool,
}

/// Plan the steps for `mode` with default options
pub fn plan(config: &WebsiteConfig, mode: DeploymentMode) -> Result<Plan> {
    plan_with(config, mode, &PlanOptions::default())
}

/// Plan the steps for `mode`
pub fn plan_with(
    config: &WebsiteConfig,
    mode: DeploymentMode,
    options: &PlanOptions,
) -> Result<Plan> {
    let site_domain = config.site_domain();
    let stack_region = options
        .stack_region
        .as_deref()
        .map(normalize_region)
        .transpose()?;
    let mut steps = vec![ResourceStep::new(
        StepParams::Bucket(BucketParams {
            name: site_domain.clone(),
            public_read: !mode.uses_cdn(),
            index_document: config.index_document().to_string(),
            error_document: config.error_document().to_string(),
            encrypted: true,
            region: stack_region,
        }),
        [],
    )];

    if options.redirect_apex {
        steps.push(ResourceStep::new(
            StepParams::RedirectBucket(RedirectBucketParams {
                name: config.domain_name().to_string(),
                redirect_host: site_domain.clone(),
                index_document: config.index_document().to_string(),
                protocol: "https".to_string(),
                status_code: 302,
            }),
            [StepKind::Bucket],
        ));
    }

    if mode.uses_custom_domain() {
        steps.push(ResourceStep::new(
            StepParams::HostedZoneLookup(ZoneLookupParams {
                domain_name: config.domain_name().to_string(),
            }),
            [],
        ));
        steps.push(ResourceStep::new(
            StepParams::Certificate(CertificateParams {
                domain_name: config.domain_name().to_string(),
                alternative_names: vec![config.wildcard_domain()],
                region: CERTIFICATE_REGION.to_string(),
                validation: ValidationMethod::Dns,
            }),
            [StepKind::HostedZoneLookup],
        ));
    }

    if mode.uses_cdn() {
        steps.push(ResourceStep::new(
            StepParams::AccessIdentity(AccessIdentityParams {
                comment: ACCESS_IDENTITY_COMMENT.to_string(),
            }),
            [],
        ));
        steps.push(ResourceStep::new(
            StepParams::BucketPolicy(BucketPolicyParams {
                actions: vec!["s3:GetObject".to_string()],
                object_pattern: "*".to_string(),
            }),
            [StepKind::Bucket, StepKind::AccessIdentity],
        ));

        let mut depends_on = vec![
            StepKind::Bucket,
            StepKind::AccessIdentity,
            StepKind::BucketPolicy,
        ];
        let mut aliases = Vec::new();
        if mode.uses_custom_domain() {
            depends_on.push(StepKind::Certificate);
            aliases.push(site_domain.clone());
        }
        steps.push(ResourceStep::new(
            StepParams::Distribution(DistributionParams {
                aliases,
                default_root_object: config.index_document().to_string(),
                viewer_protocol_policy: ViewerProtocolPolicy::RedirectToHttps,
                allowed_methods: AllowedMethods::GetHead,
                compress: true,
                error_responses: REWRITTEN_ERROR_CODES
                    .iter()
                    .map(|&error_code| ErrorResponse {
                        error_code,
                        response_code: 200,
                        response_page_path: format!("/{}", config.index_document()),
                    })
                    .collect(),
            }),
            depends_on,
        ));
    }

    if mode.uses_custom_domain() {
        steps.push(ResourceStep::new(
            StepParams::DnsRecord(DnsRecordParams {
                record_name: site_domain,
                record_type: "A".to_string(),
            }),
            [StepKind::HostedZoneLookup, StepKind::Distribution],
        ));
    }

    if options.deploy_content {
        let (depends_on, invalidation_paths) = if mode.uses_cdn() {
            (
                vec![StepKind::Bucket, StepKind::Distribution],
                vec!["/*".to_string()],
            )
        } else {
            (vec![StepKind::Bucket], Vec::new())
        };
        steps.push(ResourceStep::new(
            StepParams::ContentDeployment(ContentDeploymentParams {
                source: config.source_code_location().to_path_buf(),
                invalidation_paths,
            }),
            depends_on,
        ));
    }

    let plan = order_steps(steps)?;
    tracing::debug!(mode = %mode, summary = %plan.summary(), "Planned resources");
    Ok(plan)
}

/// Put steps in dependency order
///
/// Every referenced kind must be present exactly once and the references
/// must not form a cycle. Among steps whose references are all satisfied,
/// the lowest [`StepKind`] goes first.
pub fn order_steps(steps: Vec<ResourceStep>) -> std::result::Result<Plan, DependencyError> {
    let mut by_kind: BTreeMap<StepKind, ResourceStep> = BTreeMap::new();
    for step in steps {
        let kind = step.kind;
        if by_kind.insert(kind, step).is_some() {
            return Err(DependencyError::DuplicateStep(kind));
        }
    }

    let mut remaining: BTreeMap<StepKind, BTreeSet<StepKind>> = BTreeMap::new();
    for step in by_kind.values() {
        for &dependency in &step.depends_on {
            if !by_kind.contains_key(&dependency) {
                return Err(DependencyError::MissingDependency {
                    step: step.kind,
                    dependency,
                });
            }
        }
        remaining.insert(step.kind, step.depends_on.iter().copied().collect());
    }

    let mut ready: BTreeSet<StepKind> = remaining
        .iter()
        .filter(|(_, deps)| deps.is_empty())
        .map(|(&kind, _)| kind)
        .collect();
    let mut ordered = Vec::with_capacity(by_kind.len());

    while let Some(kind) = ready.pop_first() {
        remaining.remove(&kind);
        for (&other, deps) in remaining.iter_mut() {
            if deps.remove(&kind) && deps.is_empty() {
                ready.insert(other);
            }
        }
        if let Some(step) = by_kind.remove(&kind) {
            ordered.push(step);
        }
    }

    if !remaining.is_empty() {
        return Err(DependencyError::Cycle(remaining.into_keys().collect()));
    }

    Ok(Plan::new(ordered))
}
