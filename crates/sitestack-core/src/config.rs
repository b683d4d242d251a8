//! Website configuration
//!
//! [`PartialWebsiteConfig`] is what the site file and CLI flags produce.
//! [`resolve`] normalizes it, applies defaults and validates it into an
//! immutable [`WebsiteConfig`].

use crate::error::{Result, SiteError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_SUBDOMAIN: &str = "www";
pub const DEFAULT_INDEX_DOCUMENT: &str = "index.html";
pub const DEFAULT_SOURCE: &str = "build";

const MAX_LABEL_LEN: usize = 63;
const MAX_DOMAIN_LEN: usize = 253;
const MAX_BUCKET_NAME_LEN: usize = 63;

/// Website configuration as given by the user, every field optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialWebsiteConfig {
    pub domain_name: Option<String>,
    pub subdomain: Option<String>,
    pub source_code_location: Option<PathBuf>,
    pub index_document: Option<String>,
    pub error_document: Option<String>,
}

impl PartialWebsiteConfig {
    pub fn new(domain_name: impl Into<String>) -> Self {
        Self {
            domain_name: Some(domain_name.into()),
            ..Default::default()
        }
    }

    /// Overlay `other` on top of `self`. Fields set in `other` win.
    pub fn merge(&mut self, other: PartialWebsiteConfig) {
        if other.domain_name.is_some() {
            self.domain_name = other.domain_name;
        }
        if other.subdomain.is_some() {
            self.subdomain = other.subdomain;
        }
        if other.source_code_location.is_some() {
            self.source_code_location = other.source_code_location;
        }
        if other.index_document.is_some() {
            self.index_document = other.index_document;
        }
        if other.error_document.is_some() {
            self.error_document = other.error_document;
        }
    }
}

impl From<WebsiteConfig> for PartialWebsiteConfig {
    fn from(config: WebsiteConfig) -> Self {
        Self {
            domain_name: Some(config.domain_name),
            subdomain: Some(config.subdomain),
            source_code_location: Some(config.source_code_location),
            index_document: Some(config.index_document),
            error_document: Some(config.error_document),
        }
    }
}

/// Fully defaulted and validated website configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebsiteConfig {
    domain_name: String,
    subdomain: String,
    source_code_location: PathBuf,
    index_document: String,
    error_document: String,
}

impl WebsiteConfig {
    /// Apex domain, e.g. `example.com`
    pub fn domain_name(&self) -> &str {
        &self.domain_name
    }

    pub fn subdomain(&self) -> &str {
        &self.subdomain
    }

    pub fn source_code_location(&self) -> &Path {
        &self.source_code_location
    }

    pub fn index_document(&self) -> &str {
        &self.index_document
    }

    pub fn error_document(&self) -> &str {
        &self.error_document
    }

    /// Host the site is served from, e.g. `www.example.com`
    pub fn site_domain(&self) -> String {
        format!("{}.{}", self.subdomain, self.domain_name)
    }

    /// `*.example.com`
    pub fn wildcard_domain(&self) -> String {
        format!("*.{}", self.domain_name)
    }
}

/// Normalize, default and validate a user configuration
pub fn resolve(raw: PartialWebsiteConfig) -> Result<WebsiteConfig> {
    let domain_name = raw
        .domain_name
        .map(|d| normalize_domain(&d))
        .filter(|d| !d.is_empty())
        .ok_or_else(|| SiteError::validation("domain name is required"))?;
    validate_domain(&domain_name)?;

    let subdomain = match raw.subdomain {
        Some(s) => s.trim().to_ascii_lowercase(),
        None => DEFAULT_SUBDOMAIN.to_string(),
    };
    validate_label(&subdomain).map_err(|reason| {
        SiteError::validation(format!("subdomain '{subdomain}' {reason}"))
    })?;

    let site_domain = format!("{subdomain}.{domain_name}");
    if site_domain.len() > MAX_BUCKET_NAME_LEN {
        return Err(SiteError::validation(format!(
            "site host '{site_domain}' is longer than {MAX_BUCKET_NAME_LEN} characters and cannot name a bucket"
        )));
    }

    let index_document = match raw.index_document {
        Some(doc) => normalize_document("index document", &doc)?,
        None => DEFAULT_INDEX_DOCUMENT.to_string(),
    };
    let error_document = match raw.error_document {
        Some(doc) => normalize_document("error document", &doc)?,
        None => index_document.clone(),
    };

    let source_code_location = raw
        .source_code_location
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SOURCE));
    if source_code_location.as_os_str().is_empty() {
        return Err(SiteError::validation("source location must not be empty"));
    }

    let config = WebsiteConfig {
        domain_name,
        subdomain,
        source_code_location,
        index_document,
        error_document,
    };
    tracing::debug!(site = %config.site_domain(), "Resolved website configuration");
    Ok(config)
}

/// Lowercase and check a platform region name, e.g. `US-East-1` -> `us-east-1`
pub fn normalize_region(region: &str) -> Result<String> {
    let region = region.trim().to_ascii_lowercase();
    validate_label(&region)
        .map_err(|reason| SiteError::validation(format!("region '{region}' {reason}")))?;
    Ok(region)
}

fn normalize_domain(domain: &str) -> String {
    let domain = domain.trim().to_ascii_lowercase();
    match domain.strip_suffix('.') {
        Some(stripped) => stripped.to_string(),
        None => domain,
    }
}

fn normalize_document(what: &str, doc: &str) -> Result<String> {
    let doc = doc.trim();
    let doc = doc.strip_prefix('/').unwrap_or(doc);
    if doc.is_empty() {
        return Err(SiteError::validation(format!("{what} must not be empty")));
    }
    if doc.chars().any(char::is_whitespace) {
        return Err(SiteError::validation(format!(
            "{what} '{doc}' must not contain whitespace"
        )));
    }
    Ok(doc.to_string())
}

fn validate_domain(domain: &str) -> Result<()> {
    if domain.len() > MAX_DOMAIN_LEN {
        return Err(SiteError::validation(format!(
            "domain name '{domain}' is longer than {MAX_DOMAIN_LEN} characters"
        )));
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return Err(SiteError::validation(format!(
            "domain name '{domain}' needs at least two labels"
        )));
    }
    for label in labels {
        validate_label(label).map_err(|reason| {
            SiteError::validation(format!("domain name '{domain}': label '{label}' {reason}"))
        })?;
    }
    Ok(())
}

fn validate_label(label: &str) -> std::result::Result<(), &'static str> {
    if label.is_empty() {
        return Err("is empty");
    }
    if label.len() > MAX_LABEL_LEN {
        return Err("is longer than 63 characters");
    }
    if !label
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err("may only contain letters, digits and '-'");
    }
    if label.starts_with('-') || label.ends_with('-') {
        return Err("must not start or end with '-'");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_region() {
        assert_eq!(normalize_region(" US-East-1 ").unwrap(), "us-east-1");
        assert_eq!(normalize_region("eu-west-1").unwrap(), "eu-west-1");
        for bad in ["", "us east 1", "us_east_1", "-us-east-1"] {
            assert!(
                matches!(normalize_region(bad), Err(SiteError::Validation(_))),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn test_resolve_applies_defaults() {
        let config = resolve(PartialWebsiteConfig::new("example.com")).unwrap();

        assert_eq!(config.domain_name(), "example.com");
        assert_eq!(config.subdomain(), "www");
        assert_eq!(config.index_document(), "index.html");
        assert_eq!(config.error_document(), "index.html");
        assert_eq!(config.source_code_location(), Path::new("build"));
        assert_eq!(config.site_domain(), "www.example.com");
        assert_eq!(config.wildcard_domain(), "*.example.com");
    }

    #[test]
    fn test_error_document_defaults_to_index_document() {
        let raw = PartialWebsiteConfig {
            index_document: Some("home.html".to_string()),
            ..PartialWebsiteConfig::new("example.com")
        };
        let config = resolve(raw).unwrap();
        assert_eq!(config.error_document(), "home.html");

        let raw = PartialWebsiteConfig {
            index_document: Some("home.html".to_string()),
            error_document: Some("/404.html".to_string()),
            ..PartialWebsiteConfig::new("example.com")
        };
        let config = resolve(raw).unwrap();
        assert_eq!(config.error_document(), "404.html");
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let inputs = [
            PartialWebsiteConfig::new("Example.COM."),
            PartialWebsiteConfig {
                subdomain: Some("App".to_string()),
                source_code_location: Some("site/".into()),
                index_document: Some("/index.htm".to_string()),
                ..PartialWebsiteConfig::new("shop.example.co.uk")
            },
        ];

        for raw in inputs {
            let once = resolve(raw).unwrap();
            let twice = resolve(once.clone().into()).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_missing_domain_is_validation_error() {
        for domain in [None, Some(""), Some("   "), Some(".")] {
            let raw = PartialWebsiteConfig {
                domain_name: domain.map(String::from),
                ..Default::default()
            };
            assert!(matches!(resolve(raw), Err(SiteError::Validation(_))));
        }
    }

    #[test]
    fn test_invalid_domains_rejected() {
        for domain in [
            "localhost",
            "exa mple.com",
            "-example.com",
            "example-.com",
            "example..com",
            "ex_ample.com",
        ] {
            let result = resolve(PartialWebsiteConfig::new(domain));
            assert!(
                matches!(result, Err(SiteError::Validation(_))),
                "{domain} should be rejected"
            );
        }

        let long_label = format!("{}.com", "a".repeat(64));
        assert!(resolve(PartialWebsiteConfig::new(long_label)).is_err());
    }

    #[test]
    fn test_subdomain_must_be_single_label() {
        for subdomain in ["a.b", "", "-www"] {
            let raw = PartialWebsiteConfig {
                subdomain: Some(subdomain.to_string()),
                ..PartialWebsiteConfig::new("example.com")
            };
            assert!(matches!(resolve(raw), Err(SiteError::Validation(_))));
        }
    }

    #[test]
    fn test_site_host_must_fit_bucket_name() {
        let domain = format!("{}.com", "a".repeat(58));
        assert!(matches!(
            resolve(PartialWebsiteConfig::new(domain)),
            Err(SiteError::Validation(_))
        ));
    }

    #[test]
    fn test_documents_validated() {
        let raw = PartialWebsiteConfig {
            index_document: Some("/".to_string()),
            ..PartialWebsiteConfig::new("example.com")
        };
        assert!(resolve(raw).is_err());

        let raw = PartialWebsiteConfig {
            error_document: Some("not found.html".to_string()),
            ..PartialWebsiteConfig::new("example.com")
        };
        assert!(resolve(raw).is_err());
    }

    #[test]
    fn test_merge_prefers_other() {
        let mut base = PartialWebsiteConfig {
            subdomain: Some("app".to_string()),
            ..PartialWebsiteConfig::new("example.com")
        };
        base.merge(PartialWebsiteConfig {
            domain_name: Some("example.org".to_string()),
            ..Default::default()
        });

        assert_eq!(base.domain_name.as_deref(), Some("example.org"));
        assert_eq!(base.subdomain.as_deref(), Some("app"));
    }
}
