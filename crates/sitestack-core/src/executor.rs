//! Plan execution
//!
//! Steps run one at a time in plan order. Each step gets the handles of the
//! steps it references; the first failure stops the run and is returned as
//! is. Already created resources are left to the platform.

use crate::error::{DependencyError, Result};
use serde::Serialize;
use sitestack_cloud::{Plan, ProvisionedResource, ProvisioningClient, ResolvedDependencies};
use std::time::Instant;
use tracing::{debug, error, info};

/// Handles produced by a successful run, in execution order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Deployment {
    pub resources: Vec<ProvisionedResource>,
    pub duration_ms: u64,
}

impl Deployment {
    pub fn get(&self, kind: sitestack_cloud::StepKind) -> Option<&ProvisionedResource> {
        self.resources.iter().find(|r| r.kind == kind)
    }
}

/// Execute every step of `plan` against `client`
#[tracing::instrument(skip_all, fields(client = client.name(), steps = plan.len()))]
pub async fn apply<C>(plan: &Plan, client: &C) -> Result<Deployment>
where
    C: ProvisioningClient + ?Sized,
{
    let start = Instant::now();
    let mut resolved = ResolvedDependencies::new();
    let mut resources = Vec::with_capacity(plan.len());

    for (index, step) in plan.iter().enumerate() {
        // A handle can only be missing if the plan was not ordered
        if let Some(&dependency) = step.depends_on.iter().find(|&&d| resolved.get(d).is_none()) {
            return Err(DependencyError::UnresolvedHandle {
                step: step.kind,
                dependency,
            }
            .into());
        }

        info!(step = %step.kind, "[{}/{}] {}", index + 1, plan.len(), step.description());
        let resource = match client.create(step, &resolved).await {
            Ok(resource) => resource,
            Err(e) => {
                error!(step = %step.kind, error = %e, "Step failed, stopping");
                return Err(e.into());
            }
        };
        debug!(step = %step.kind, id = %resource.id, "Step complete");

        resolved.insert(resource.clone());
        resources.push(resource);
    }

    let duration_ms = start.elapsed().as_millis() as u64;
    info!(duration_ms, "All steps complete");
    Ok(Deployment {
        resources,
        duration_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PartialWebsiteConfig, resolve};
    use crate::error::SiteError;
    use crate::planner::{DeploymentMode, plan};
    use sitestack_cloud::{
        AccessIdentityParams, ProvisionError, RecordingClient, ResourceStep, StepKind, StepParams,
    };

    fn example_plan(mode: DeploymentMode) -> Plan {
        let config = resolve(PartialWebsiteConfig::new("example.com")).unwrap();
        plan(&config, mode).unwrap()
    }

    #[tokio::test]
    async fn test_apply_follows_plan_order() {
        let plan = example_plan(DeploymentMode::CdnWithCustomDomain);
        let client = RecordingClient::new();

        let deployment = apply(&plan, &client).await.unwrap();

        assert_eq!(client.call_order(), plan.kinds());
        assert_eq!(deployment.resources.len(), plan.len());
        assert_eq!(
            deployment.get(StepKind::DnsRecord).unwrap().id,
            "stub-dns-record-7"
        );

        for (call, step) in client.calls().iter().zip(plan.iter()) {
            assert_eq!(&call.step, step);
            for dependency in &step.depends_on {
                assert!(call.dependencies.contains(dependency));
            }
        }
    }

    #[tokio::test]
    async fn test_apply_halts_on_first_failure() {
        let plan = example_plan(DeploymentMode::CdnOnly);
        let client = RecordingClient::new().fail_on(StepKind::BucketPolicy);

        let err = apply(&plan, &client).await.unwrap_err();

        assert!(matches!(err, SiteError::Provision(ProvisionError::Api(_))));
        assert_eq!(
            client.call_order(),
            vec![
                StepKind::Bucket,
                StepKind::AccessIdentity,
                StepKind::BucketPolicy,
            ]
        );
    }

    #[tokio::test]
    async fn test_apply_propagates_zone_not_found() {
        let plan = example_plan(DeploymentMode::CdnWithCustomDomain);
        let client = RecordingClient::new().without_hosted_zone();

        let err = apply(&plan, &client).await.unwrap_err();

        assert!(err.is_zone_not_found());
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn test_apply_rejects_unordered_plan() {
        let plan = Plan::new(vec![ResourceStep::new(
            StepParams::AccessIdentity(AccessIdentityParams {
                comment: String::new(),
            }),
            [StepKind::Bucket],
        )]);
        let client = RecordingClient::new();

        let err = apply(&plan, &client).await.unwrap_err();

        assert!(matches!(
            err,
            SiteError::Dependency(DependencyError::UnresolvedHandle { .. })
        ));
        assert_eq!(client.call_count(), 0);
    }
}
