//! Hosted zone lookup
//!
//! A zone must already exist and be delegated from the registrar. A freshly
//! created zone would carry different name servers and DNS validation of the
//! certificate would never complete, so nothing here creates zones.

use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// An existing Route 53 hosted zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedZone {
    /// Zone id without the `/hostedzone/` prefix
    pub id: String,

    /// Zone name without the trailing dot
    pub name: String,
}

/// Source of existing hosted zones
#[async_trait]
pub trait ZoneLookup: Send + Sync {
    /// Find the zone for `domain_name`. `Ok(None)` means it does not exist.
    async fn find_zone(&self, domain_name: &str) -> Result<Option<HostedZone>>;
}

/// Zones known up front, typically from `hosted-zone` entries in the site file
#[derive(Debug, Clone, Default)]
pub struct StaticZones {
    zones: BTreeMap<String, String>,
}

impl StaticZones {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_zone(mut self, name: impl Into<String>, id: impl Into<String>) -> Self {
        self.insert(name, id);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, id: impl Into<String>) {
        let name = normalize_zone_name(&name.into());
        let id = strip_zone_prefix(&id.into()).to_string();
        self.zones.insert(name, id);
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StaticZones {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut zones = Self::new();
        for (name, id) in iter {
            zones.insert(name, id);
        }
        zones
    }
}

#[async_trait]
impl ZoneLookup for StaticZones {
    async fn find_zone(&self, domain_name: &str) -> Result<Option<HostedZone>> {
        let name = normalize_zone_name(domain_name);
        Ok(self.zones.get(&name).map(|id| HostedZone {
            id: id.clone(),
            name,
        }))
    }
}

fn normalize_zone_name(name: &str) -> String {
    name.trim_end_matches('.').to_ascii_lowercase()
}

fn strip_zone_prefix(id: &str) -> &str {
    id.trim_start_matches("/hostedzone/")
}

/// Zones resolved through the Route 53 API
#[cfg(feature = "route53")]
pub struct Route53Zones {
    client: aws_sdk_route53::Client,
}

#[cfg(feature = "route53")]
impl Route53Zones {
    pub fn new(client: aws_sdk_route53::Client) -> Self {
        Self { client }
    }

    /// Build a client from the default AWS credential chain
    pub async fn from_env() -> Self {
        let config = aws_config::load_from_env().await;
        Self::new(aws_sdk_route53::Client::new(&config))
    }
}

#[cfg(feature = "route53")]
#[async_trait]
impl ZoneLookup for Route53Zones {
    async fn find_zone(&self, domain_name: &str) -> Result<Option<HostedZone>> {
        let name = normalize_zone_name(domain_name);
        tracing::debug!(zone = %name, "Looking up hosted zone in Route 53");

        let output = self
            .client
            .list_hosted_zones_by_name()
            .dns_name(&name)
            .send()
            .await
            .map_err(|e| crate::error::AwsError::Route53(e.to_string()))?;

        // The listing starts at `name` and continues alphabetically
        let zone = output
            .hosted_zones()
            .iter()
            .find(|z| normalize_zone_name(z.name()) == name)
            .map(|z| HostedZone {
                id: strip_zone_prefix(z.id()).to_string(),
                name: name.clone(),
            });

        Ok(zone)
    }
}
