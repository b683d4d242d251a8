//! Provisioning trait definitions

use crate::error::{ProvisionError, Result};
use crate::step::{
    AccessIdentityParams, BucketParams, BucketPolicyParams, CertificateParams,
    ContentDeploymentParams, DistributionParams, DnsRecordParams, RedirectBucketParams,
    ResourceStep, StepKind, StepParams, ZoneLookupParams,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Creates the resource described by a single step
///
/// Implementations receive the handles of every step the current step
/// references. Steps are always executed one at a time, in plan order.
#[async_trait]
pub trait ProvisioningClient: Send + Sync {
    /// Returns the client name (e.g. "aws-cloudformation", "recording")
    fn name(&self) -> &str;

    /// Create the resource for `step`
    async fn create(
        &self,
        step: &ResourceStep,
        dependencies: &ResolvedDependencies,
    ) -> Result<ProvisionedResource>;
}

/// Handle of a resource created by the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvisionedResource {
    /// Kind of the step that created the resource
    pub kind: StepKind,

    /// Platform-specific identifier
    pub id: String,

    /// Resource attributes (domain names, zone ids, ...)
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl ProvisionedResource {
    pub fn new(kind: StepKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&serde_json::Value> {
        self.attributes.get(key)
    }

    pub fn get_attribute<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// Handles of already created resources, keyed by the step that made them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedDependencies {
    resources: BTreeMap<StepKind, ProvisionedResource>,
}

impl ResolvedDependencies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, resource: ProvisionedResource) {
        self.resources.insert(resource.kind, resource);
    }

    pub fn get(&self, kind: StepKind) -> Option<&ProvisionedResource> {
        self.resources.get(&kind)
    }

    /// Get the handle `step` needs, or fail with [`ProvisionError::MissingDependency`]
    pub fn require(&self, step: StepKind, dependency: StepKind) -> Result<&ProvisionedResource> {
        self.get(dependency)
            .ok_or(ProvisionError::MissingDependency { step, dependency })
    }

    pub fn kinds(&self) -> Vec<StepKind> {
        self.resources.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl FromIterator<ProvisionedResource> for ResolvedDependencies {
    fn from_iter<I: IntoIterator<Item = ProvisionedResource>>(iter: I) -> Self {
        let mut deps = Self::new();
        for resource in iter {
            deps.insert(resource);
        }
        deps
    }
}

/// The cloud platform's resource API, one method per collaborator call
///
/// Wrap an implementation in [`PlatformClient`] to drive it from a plan.
#[async_trait]
pub trait CloudPlatform: Send + Sync {
    /// Returns the platform name (e.g. "aws-cloudformation")
    fn name(&self) -> &str;

    async fn create_storage_container(&self, params: &BucketParams) -> Result<ProvisionedResource>;

    async fn create_redirect_container(
        &self,
        params: &RedirectBucketParams,
        target: &ProvisionedResource,
    ) -> Result<ProvisionedResource>;

    async fn create_access_identity(
        &self,
        params: &AccessIdentityParams,
    ) -> Result<ProvisionedResource>;

    async fn attach_read_policy(
        &self,
        params: &BucketPolicyParams,
        container: &ProvisionedResource,
        principal: &ProvisionedResource,
    ) -> Result<ProvisionedResource>;

    async fn create_cdn_distribution(
        &self,
        params: &DistributionParams,
        origin: &ProvisionedResource,
        access_identity: &ProvisionedResource,
        certificate: Option<&ProvisionedResource>,
    ) -> Result<ProvisionedResource>;

    /// Resolve an existing zone. Fails with [`ProvisionError::ZoneNotFound`]
    /// when the zone is absent; it is never created.
    async fn lookup_existing_dns_zone(
        &self,
        params: &ZoneLookupParams,
    ) -> Result<ProvisionedResource>;

    async fn request_certificate(
        &self,
        params: &CertificateParams,
        zone: &ProvisionedResource,
    ) -> Result<ProvisionedResource>;

    async fn create_dns_alias_record(
        &self,
        params: &DnsRecordParams,
        zone: &ProvisionedResource,
        target: &ProvisionedResource,
    ) -> Result<ProvisionedResource>;

    async fn upload_content(
        &self,
        params: &ContentDeploymentParams,
        container: &ProvisionedResource,
        distribution: Option<&ProvisionedResource>,
    ) -> Result<ProvisionedResource>;
}

/// Adapts a [`CloudPlatform`] into a [`ProvisioningClient`]
pub struct PlatformClient<P> {
    platform: P,
}

impl<P: CloudPlatform> PlatformClient<P> {
    pub fn new(platform: P) -> Self {
        Self { platform }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn into_inner(self) -> P {
        self.platform
    }
}

#[async_trait]
impl<P: CloudPlatform> ProvisioningClient for PlatformClient<P> {
    fn name(&self) -> &str {
        self.platform.name()
    }

    async fn create(
        &self,
        step: &ResourceStep,
        deps: &ResolvedDependencies,
    ) -> Result<ProvisionedResource> {
        let kind = step.kind;

        let resource = match &step.params {
            StepParams::Bucket(p) => self.platform.create_storage_container(p).await?,
            StepParams::RedirectBucket(p) => {
                let target = deps.require(kind, StepKind::Bucket)?;
                self.platform.create_redirect_container(p, target).await?
            }
            StepParams::HostedZoneLookup(p) => self.platform.lookup_existing_dns_zone(p).await?,
            StepParams::Certificate(p) => {
                let zone = deps.require(kind, StepKind::HostedZoneLookup)?;
                self.platform.request_certificate(p, zone).await?
            }
            StepParams::AccessIdentity(p) => self.platform.create_access_identity(p).await?,
            StepParams::BucketPolicy(p) => {
                let container = deps.require(kind, StepKind::Bucket)?;
                let principal = deps.require(kind, StepKind::AccessIdentity)?;
                self.platform
                    .attach_read_policy(p, container, principal)
                    .await?
            }
            StepParams::Distribution(p) => {
                let origin = deps.require(kind, StepKind::Bucket)?;
                let identity = deps.require(kind, StepKind::AccessIdentity)?;
                let certificate = optional_dependency(step, deps, StepKind::Certificate)?;
                self.platform
                    .create_cdn_distribution(p, origin, identity, certificate)
                    .await?
            }
            StepParams::DnsRecord(p) => {
                let zone = deps.require(kind, StepKind::HostedZoneLookup)?;
                let target = deps.require(kind, StepKind::Distribution)?;
                self.platform.create_dns_alias_record(p, zone, target).await?
            }
            StepParams::ContentDeployment(p) => {
                let container = deps.require(kind, StepKind::Bucket)?;
                let distribution = optional_dependency(step, deps, StepKind::Distribution)?;
                self.platform
                    .upload_content(p, container, distribution)
                    .await?
            }
        };

        if resource.kind != kind {
            return Err(ProvisionError::Api(format!(
                "{} returned a {} handle for a {} step",
                self.platform.name(),
                resource.kind,
                kind
            )));
        }

        tracing::debug!(step = %kind, id = %resource.id, "Platform created resource");
        Ok(resource)
    }
}

/// Optional references only resolve when the step declared them
fn optional_dependency<'a>(
    step: &ResourceStep,
    deps: &'a ResolvedDependencies,
    dependency: StepKind,
) -> Result<Option<&'a ProvisionedResource>> {
    if step.depends_on(dependency) {
        deps.require(step.kind, dependency).map(Some)
    } else {
        Ok(None)
    }
}
