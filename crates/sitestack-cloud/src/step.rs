//! Resource step types
//!
//! A [`Plan`] is an ordered list of [`ResourceStep`]s. Each step names the
//! kind of resource it creates, the kinds it references, and the typed
//! parameters the platform needs to create it.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Kind of resource a step creates
///
/// The variant order is the declaration order used to break ties between
/// steps that are otherwise independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepKind {
    /// Storage container holding the site content
    Bucket,
    /// Apex-domain container that redirects to the site host
    RedirectBucket,
    /// Lookup of an already registered DNS zone
    HostedZoneLookup,
    /// TLS certificate for the custom domain
    Certificate,
    /// CDN principal allowed to read the bucket
    AccessIdentity,
    /// Read grant from the bucket to the access identity
    BucketPolicy,
    /// CDN distribution fronting the bucket
    Distribution,
    /// Alias record pointing the site host at the distribution
    DnsRecord,
    /// Upload of the local site content
    ContentDeployment,
}

impl StepKind {
    pub const ALL: [StepKind; 9] = [
        StepKind::Bucket,
        StepKind::RedirectBucket,
        StepKind::HostedZoneLookup,
        StepKind::Certificate,
        StepKind::AccessIdentity,
        StepKind::BucketPolicy,
        StepKind::Distribution,
        StepKind::DnsRecord,
        StepKind::ContentDeployment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Bucket => "bucket",
            StepKind::RedirectBucket => "redirect-bucket",
            StepKind::HostedZoneLookup => "hosted-zone-lookup",
            StepKind::Certificate => "certificate",
            StepKind::AccessIdentity => "access-identity",
            StepKind::BucketPolicy => "bucket-policy",
            StepKind::Distribution => "distribution",
            StepKind::DnsRecord => "dns-record",
            StepKind::ContentDeployment => "content-deployment",
        }
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of the site bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketParams {
    /// Bucket name, always the site host (e.g. `www.example.com`)
    pub name: String,

    /// Grant public read access. Only set when no CDN fronts the bucket.
    pub public_read: bool,

    pub index_document: String,
    pub error_document: String,

    /// Server-side encryption with platform-managed keys
    pub encrypted: bool,

    /// Region of the rest of the stack, if the caller pinned one
    pub region: Option<String>,
}

/// Parameters of the apex redirect bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectBucketParams {
    /// Bucket name, the apex domain (e.g. `example.com`)
    pub name: String,

    /// Host every request is redirected to
    pub redirect_host: String,

    pub index_document: String,

    pub protocol: String,
    pub status_code: u16,
}

/// Parameters of the hosted zone lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneLookupParams {
    pub domain_name: String,
}

/// How certificate ownership is proven
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationMethod {
    Dns,
}

/// Parameters of the TLS certificate request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateParams {
    pub domain_name: String,
    pub alternative_names: Vec<String>,

    /// Region the certificate is issued in. The CDN only trusts certificates
    /// from its own fixed region.
    pub region: String,

    pub validation: ValidationMethod,
}

/// Parameters of the origin access identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessIdentityParams {
    pub comment: String,
}

/// Parameters of the bucket read policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketPolicyParams {
    pub actions: Vec<String>,

    /// Object key pattern the grant applies to
    pub object_pattern: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewerProtocolPolicy {
    RedirectToHttps,
}

impl std::fmt::Display for ViewerProtocolPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViewerProtocolPolicy::RedirectToHttps => write!(f, "redirect-to-https"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AllowedMethods {
    GetHead,
}

impl AllowedMethods {
    pub fn methods(&self) -> &'static [&'static str] {
        match self {
            AllowedMethods::GetHead => &["GET", "HEAD"],
        }
    }
}

/// Rewrite of an origin error into a regular response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error_code: u16,
    pub response_code: u16,
    pub response_page_path: String,
}

/// Parameters of the CDN distribution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionParams {
    /// Custom host names. Empty means the platform-generated domain is used.
    pub aliases: Vec<String>,

    pub default_root_object: String,
    pub viewer_protocol_policy: ViewerProtocolPolicy,
    pub allowed_methods: AllowedMethods,
    pub compress: bool,
    pub error_responses: Vec<ErrorResponse>,
}

/// Parameters of the DNS alias record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecordParams {
    pub record_name: String,
    pub record_type: String,
}

/// Parameters of the content upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentDeploymentParams {
    pub source: PathBuf,

    /// Cache paths invalidated after the upload. Empty without a CDN.
    pub invalidation_paths: Vec<String>,
}

/// Typed parameters of a step, one variant per [`StepKind`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepParams {
    Bucket(BucketParams),
    RedirectBucket(RedirectBucketParams),
    HostedZoneLookup(ZoneLookupParams),
    Certificate(CertificateParams),
    AccessIdentity(AccessIdentityParams),
    BucketPolicy(BucketPolicyParams),
    Distribution(DistributionParams),
    DnsRecord(DnsRecordParams),
    ContentDeployment(ContentDeploymentParams),
}

impl StepParams {
    pub fn kind(&self) -> StepKind {
        match self {
            StepParams::Bucket(_) => StepKind::Bucket,
            StepParams::RedirectBucket(_) => StepKind::RedirectBucket,
            StepParams::HostedZoneLookup(_) => StepKind::HostedZoneLookup,
            StepParams::Certificate(_) => StepKind::Certificate,
            StepParams::AccessIdentity(_) => StepKind::AccessIdentity,
            StepParams::BucketPolicy(_) => StepKind::BucketPolicy,
            StepParams::Distribution(_) => StepKind::Distribution,
            StepParams::DnsRecord(_) => StepKind::DnsRecord,
            StepParams::ContentDeployment(_) => StepKind::ContentDeployment,
        }
    }
}

/// A single resource-creation step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceStep {
    /// Kind of resource created by this step
    pub kind: StepKind,

    /// Steps whose handles this step references
    pub depends_on: Vec<StepKind>,

    /// Parameters derived from the website configuration
    pub params: StepParams,
}

impl ResourceStep {
    pub fn new(params: StepParams, depends_on: impl IntoIterator<Item = StepKind>) -> Self {
        Self {
            kind: params.kind(),
            depends_on: depends_on.into_iter().collect(),
            params,
        }
    }

    pub fn depends_on(&self, kind: StepKind) -> bool {
        self.depends_on.contains(&kind)
    }

    /// Short human readable description of the step
    pub fn description(&self) -> String {
        match &self.params {
            StepParams::Bucket(p) if p.public_read => format!("bucket {} (public read)", p.name),
            StepParams::Bucket(p) => format!("bucket {}", p.name),
            StepParams::RedirectBucket(p) => format!(
                "redirect bucket {} -> {}://{}",
                p.name, p.protocol, p.redirect_host
            ),
            StepParams::HostedZoneLookup(p) => format!("look up hosted zone {}", p.domain_name),
            StepParams::Certificate(p) => format!(
                "certificate {} [{}] in {}",
                p.domain_name,
                p.alternative_names.join(", "),
                p.region
            ),
            StepParams::AccessIdentity(_) => "origin access identity".to_string(),
            StepParams::BucketPolicy(p) => {
                format!("grant {} on {}", p.actions.join(", "), p.object_pattern)
            }
            StepParams::Distribution(p) if p.aliases.is_empty() => format!(
                "distribution (generated domain, {})",
                p.viewer_protocol_policy
            ),
            StepParams::Distribution(p) => format!(
                "distribution {} ({})",
                p.aliases.join(", "),
                p.viewer_protocol_policy
            ),
            StepParams::DnsRecord(p) => format!(
                "{} alias record {} -> distribution",
                p.record_type, p.record_name
            ),
            StepParams::ContentDeployment(p) => format!("upload {}", p.source.display()),
        }
    }
}

/// Ordered list of steps to provision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub steps: Vec<ResourceStep>,
}

impl Plan {
    pub fn new(steps: Vec<ResourceStep>) -> Self {
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceStep> {
        self.steps.iter()
    }

    /// Step kinds in execution order
    pub fn kinds(&self) -> Vec<StepKind> {
        self.steps.iter().map(|s| s.kind).collect()
    }

    pub fn get(&self, kind: StepKind) -> Option<&ResourceStep> {
        self.steps.iter().find(|s| s.kind == kind)
    }

    pub fn contains(&self, kind: StepKind) -> bool {
        self.get(kind).is_some()
    }

    /// Position of a step in execution order
    pub fn position(&self, kind: StepKind) -> Option<usize> {
        self.steps.iter().position(|s| s.kind == kind)
    }

    pub fn summary(&self) -> PlanSummary {
        let count = |kinds: &[StepKind]| {
            self.steps
                .iter()
                .filter(|s| kinds.contains(&s.kind))
                .count()
        };
        PlanSummary {
            storage: count(&[
                StepKind::Bucket,
                StepKind::RedirectBucket,
                StepKind::ContentDeployment,
            ]),
            cdn: count(&[
                StepKind::AccessIdentity,
                StepKind::BucketPolicy,
                StepKind::Distribution,
            ]),
            dns: count(&[
                StepKind::HostedZoneLookup,
                StepKind::Certificate,
                StepKind::DnsRecord,
            ]),
        }
    }
}

/// Summary of planned steps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSummary {
    pub storage: usize,
    pub cdn: usize,
    pub dns: usize,
}

impl PlanSummary {
    pub fn total(&self) -> usize {
        self.storage + self.cdn + self.dns
    }
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} steps: {} storage, {} cdn, {} dns",
            self.total(),
            self.storage,
            self.cdn,
            self.dns
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_step() -> ResourceStep {
        ResourceStep::new(
            StepParams::AccessIdentity(AccessIdentityParams {
                comment: "test".to_string(),
            }),
            [],
        )
    }

    #[test]
    fn test_step_kind_follows_params() {
        let step = ResourceStep::new(
            StepParams::HostedZoneLookup(ZoneLookupParams {
                domain_name: "example.com".to_string(),
            }),
            [],
        );
        assert_eq!(step.kind, StepKind::HostedZoneLookup);
        assert!(step.depends_on.is_empty());
    }

    #[test]
    fn test_step_kind_declaration_order() {
        let mut kinds = StepKind::ALL.to_vec();
        kinds.reverse();
        kinds.sort();
        assert_eq!(kinds, StepKind::ALL.to_vec());
        assert!(StepKind::Bucket < StepKind::AccessIdentity);
        assert!(StepKind::Distribution < StepKind::DnsRecord);
    }

    #[test]
    fn test_distribution_policies_match_wire_names() {
        let policy = ViewerProtocolPolicy::RedirectToHttps;
        assert_eq!(
            serde_json::to_value(policy).unwrap(),
            serde_json::json!(policy.to_string())
        );
        assert_eq!(AllowedMethods::GetHead.methods(), ["GET", "HEAD"]);
    }

    #[test]
    fn test_step_kind_display() {
        assert_eq!(StepKind::HostedZoneLookup.to_string(), "hosted-zone-lookup");
        assert_eq!(
            serde_json::to_value(StepKind::DnsRecord).unwrap(),
            serde_json::json!("dns-record")
        );
    }

    #[test]
    fn test_plan_lookup() {
        let plan = Plan::new(vec![identity_step()]);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.position(StepKind::AccessIdentity), Some(0));
        assert!(!plan.contains(StepKind::Bucket));
        assert_eq!(
            plan.summary().to_string(),
            "1 steps: 0 storage, 1 cdn, 0 dns"
        );
    }
}
