//! Recording provisioning client for tests
//!
//! [`RecordingClient`] creates nothing. It remembers every call, answers with
//! deterministic stub handles (`stub-<kind>-<n>`) and can be told to fail.

use crate::error::{ProvisionError, Result};
use crate::provider::{ProvisionedResource, ProvisioningClient, ResolvedDependencies};
use crate::step::{ResourceStep, StepKind, StepParams};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Mutex;

/// One call received by [`RecordingClient`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub step: ResourceStep,

    /// Kinds of the handles that were passed along, in key order
    pub dependencies: Vec<StepKind>,

    /// Id of the stub handle that was returned, if the call succeeded
    pub handle: Option<String>,
}

/// Fake [`ProvisioningClient`] that records calls
#[derive(Debug, Default)]
pub struct RecordingClient {
    calls: Mutex<Vec<RecordedCall>>,
    failing: BTreeSet<StepKind>,
    missing_zone: bool,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every step of `kind` with an API error
    pub fn fail_on(mut self, kind: StepKind) -> Self {
        self.failing.insert(kind);
        self
    }

    /// Report every hosted zone lookup as not found
    pub fn without_hosted_zone(mut self) -> Self {
        self.missing_zone = true;
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().clone()
    }

    /// Kinds of the received steps, in call order
    pub fn call_order(&self) -> Vec<StepKind> {
        self.lock().iter().map(|c| c.step.kind).collect()
    }

    pub fn call_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<RecordedCall>> {
        // A poisoned lock only means a test panicked mid-call; the log is still usable.
        self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn respond(&self, step: &ResourceStep, ordinal: usize) -> Result<ProvisionedResource> {
        if self.failing.contains(&step.kind) {
            return Err(ProvisionError::Api(format!(
                "injected failure for {}",
                step.kind
            )));
        }

        let id = format!("stub-{}-{}", step.kind, ordinal);
        let resource = ProvisionedResource::new(step.kind, id.clone());
        let resource = match &step.params {
            StepParams::HostedZoneLookup(p) if self.missing_zone => {
                return Err(ProvisionError::ZoneNotFound(p.domain_name.clone()));
            }
            StepParams::HostedZoneLookup(p) => resource
                .with_attribute("zone_name", serde_json::json!(p.domain_name))
                .with_attribute("zone_id", serde_json::json!(id)),
            StepParams::Distribution(_) => resource.with_attribute(
                "domain_name",
                serde_json::json!(format!("{id}.cdn.invalid")),
            ),
            StepParams::Bucket(p) => {
                resource.with_attribute("bucket_name", serde_json::json!(p.name))
            }
            _ => resource,
        };
        Ok(resource)
    }
}

#[async_trait]
impl ProvisioningClient for RecordingClient {
    fn name(&self) -> &str {
        "recording"
    }

    async fn create(
        &self,
        step: &ResourceStep,
        dependencies: &ResolvedDependencies,
    ) -> Result<ProvisionedResource> {
        let mut calls = self.lock();
        let result = self.respond(step, calls.len() + 1);
        calls.push(RecordedCall {
            step: step.clone(),
            dependencies: dependencies.kinds(),
            handle: result.as_ref().ok().map(|r| r.id.clone()),
        });
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::{AccessIdentityParams, ZoneLookupParams};

    fn identity_step() -> ResourceStep {
        ResourceStep::new(
            StepParams::AccessIdentity(AccessIdentityParams {
                comment: "oai".to_string(),
            }),
            [],
        )
    }

    fn zone_step() -> ResourceStep {
        ResourceStep::new(
            StepParams::HostedZoneLookup(ZoneLookupParams {
                domain_name: "example.com".to_string(),
            }),
            [],
        )
    }

    #[tokio::test]
    async fn test_records_calls_with_deterministic_handles() {
        let client = RecordingClient::new();
        let deps = ResolvedDependencies::new();

        let first = client.create(&identity_step(), &deps).await.unwrap();
        let second = client.create(&zone_step(), &deps).await.unwrap();

        assert_eq!(first.id, "stub-access-identity-1");
        assert_eq!(second.id, "stub-hosted-zone-lookup-2");
        assert_eq!(
            second.get_attribute::<String>("zone_name").as_deref(),
            Some("example.com")
        );
        assert_eq!(
            client.call_order(),
            vec![StepKind::AccessIdentity, StepKind::HostedZoneLookup]
        );
    }

    #[tokio::test]
    async fn test_failures_are_recorded() {
        let client = RecordingClient::new().fail_on(StepKind::AccessIdentity);
        let err = client
            .create(&identity_step(), &ResolvedDependencies::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ProvisionError::Api(_)));
        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].handle.is_none());
    }

    #[tokio::test]
    async fn test_missing_hosted_zone() {
        let client = RecordingClient::new().without_hosted_zone();
        let err = client
            .create(&zone_step(), &ResolvedDependencies::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProvisionError::ZoneNotFound(ref d) if d == "example.com"
        ));
    }
}
