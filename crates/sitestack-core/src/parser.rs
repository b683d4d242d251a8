//! Site file parser
//!
//! ```kdl
//! site "example.com" {
//!     subdomain "www"
//!     source "build"
//!     index-document "index.html"
//!     error-document "index.html"
//!     mode "cdn-custom-domain"
//!     region "eu-west-1"
//!     redirect-apex #true
//!     deploy-content #true
//! }
//! hosted-zone "example.com" id="Z0123456789ABC"
//! ```

use crate::config::PartialWebsiteConfig;
use crate::error::{Result, SiteError, file_context};
use crate::planner::{DeploymentMode, PlanOptions};
use kdl::{KdlDocument, KdlNode};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Contents of a site file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteDocument {
    pub site: PartialWebsiteConfig,
    pub mode: Option<DeploymentMode>,
    pub options: PlanOptions,

    /// Existing hosted zones, name to zone id
    pub hosted_zones: BTreeMap<String, String>,
}

/// Read and parse a site file
pub fn parse_site_file<P: AsRef<Path>>(path: P) -> Result<SiteDocument> {
    let path = path.as_ref();
    debug!(file = %path.display(), "Parsing site file");
    let content = fs::read_to_string(path).map_err(|source| SiteError::SiteFileRead {
        path: path.to_path_buf(),
        source,
    })?;
    parse_site_string(&content).map_err(|e| file_context(path, e))
}

/// Parse site file contents
pub fn parse_site_string(content: &str) -> Result<SiteDocument> {
    let doc: KdlDocument = content.parse()?;
    let mut document = SiteDocument::default();
    let mut seen_site = false;

    for node in doc.nodes() {
        match node.name().value() {
            "site" => {
                if seen_site {
                    return Err(SiteError::InvalidSiteFile(
                        "only one site node is allowed".to_string(),
                    ));
                }
                seen_site = true;
                parse_site(node, &mut document)?;
            }
            "hosted-zone" => {
                let (name, id) = parse_hosted_zone(node)?;
                document.hosted_zones.insert(name, id);
            }
            other => {
                warn!(node = other, "Ignoring unknown node in site file");
            }
        }
    }

    if !seen_site {
        return Err(SiteError::InvalidSiteFile(
            "missing site node (e.g. site \"example.com\" { ... })".to_string(),
        ));
    }
    Ok(document)
}

fn parse_site(node: &KdlNode, document: &mut SiteDocument) -> Result<()> {
    let site = &mut document.site;
    site.domain_name = first_string(node).map(String::from);

    let Some(children) = node.children() else {
        return Ok(());
    };
    for child in children.nodes() {
        let key = child.name().value();
        match key {
            "subdomain" => site.subdomain = Some(require_string(child)?.to_string()),
            "source" => {
                site.source_code_location = Some(PathBuf::from(require_string(child)?));
            }
            "index-document" => site.index_document = Some(require_string(child)?.to_string()),
            "error-document" => site.error_document = Some(require_string(child)?.to_string()),
            "mode" => document.mode = Some(require_string(child)?.parse()?),
            "region" => document.options.stack_region = Some(require_string(child)?.to_string()),
            "redirect-apex" => document.options.redirect_apex = require_bool(child)?,
            "deploy-content" => document.options.deploy_content = require_bool(child)?,
            other => warn!(node = other, "Ignoring unknown setting in site node"),
        }
    }
    Ok(())
}

fn parse_hosted_zone(node: &KdlNode) -> Result<(String, String)> {
    let name = require_string(node)?.to_string();
    let id = node
        .get("id")
        .and_then(|v| v.as_string())
        .ok_or_else(|| {
            SiteError::InvalidSiteFile(format!("hosted-zone \"{name}\" needs id=\"...\""))
        })?;
    Ok((name, id.to_string()))
}

fn first_string(node: &KdlNode) -> Option<&str> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
}

fn require_string(node: &KdlNode) -> Result<&str> {
    first_string(node).ok_or_else(|| {
        SiteError::InvalidSiteFile(format!(
            "'{}' needs a string value",
            node.name().value()
        ))
    })
}

fn require_bool(node: &KdlNode) -> Result<bool> {
    parse_bool_with_hint(node).ok_or_else(|| {
        SiteError::InvalidSiteFile(format!(
            "'{}' needs a boolean value (#true or #false)",
            node.name().value()
        ))
    })
}

/// Read a boolean argument. The strings "true" and "false" are accepted with
/// a warning, since KDL v2 spells booleans `#true` and `#false`.
fn parse_bool_with_hint(node: &KdlNode) -> Option<bool> {
    let value = node.entries().iter().find(|e| e.name().is_none())?.value();
    if let Some(b) = value.as_bool() {
        return Some(b);
    }

    let key = node.name().value();
    match value.as_string()? {
        "true" => {
            warn!(
                "'{key} \"true\"' is a string, not a boolean. In KDL v2, use '{key} #true'"
            );
            Some(true)
        }
        "false" => {
            warn!(
                "'{key} \"false\"' is a string, not a boolean. In KDL v2, use '{key} #false'"
            );
            Some(false)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_site() {
        let kdl = r#"
            site "example.com" {
                subdomain "app"
                source "dist"
                index-document "index.html"
                error-document "404.html"
                mode "cdn"
                region "eu-west-1"
                redirect-apex #true
                deploy-content #false
            }
            hosted-zone "example.com" id="Z0123456789ABC"
        "#;

        let doc = parse_site_string(kdl).unwrap();
        assert_eq!(doc.site.domain_name.as_deref(), Some("example.com"));
        assert_eq!(doc.site.subdomain.as_deref(), Some("app"));
        assert_eq!(doc.site.source_code_location, Some(PathBuf::from("dist")));
        assert_eq!(doc.site.error_document.as_deref(), Some("404.html"));
        assert_eq!(doc.mode, Some(DeploymentMode::CdnOnly));
        assert_eq!(doc.options.stack_region.as_deref(), Some("eu-west-1"));
        assert!(doc.options.redirect_apex);
        assert!(!doc.options.deploy_content);
        assert_eq!(
            doc.hosted_zones.get("example.com").map(String::as_str),
            Some("Z0123456789ABC")
        );
    }

    #[test]
    fn test_parse_minimal_site() {
        let doc = parse_site_string(r#"site "example.com""#).unwrap();
        assert_eq!(doc.site, PartialWebsiteConfig::new("example.com"));
        assert_eq!(doc.mode, None);
        assert_eq!(doc.options, PlanOptions::default());
        assert!(doc.hosted_zones.is_empty());
    }

    #[test]
    fn test_string_booleans_accepted() {
        let kdl = r#"
            site "example.com" {
                redirect-apex "true"
                deploy-content "false"
            }
        "#;
        let doc = parse_site_string(kdl).unwrap();
        assert!(doc.options.redirect_apex);
        assert!(!doc.options.deploy_content);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let cases = [
            r#"site "example.com" { redirect-apex "yes" }"#,
            r#"site "example.com" { subdomain 42 }"#,
            r#"hosted-zone "example.com""#,
            r#"site "a.com"
               site "b.com""#,
        ];
        for kdl in cases {
            assert!(
                matches!(parse_site_string(kdl), Err(SiteError::InvalidSiteFile(_))),
                "{kdl}"
            );
        }

        assert!(matches!(
            parse_site_string(r#"site "example.com" { mode "edge" }"#),
            Err(SiteError::Validation(_))
        ));
        assert!(matches!(
            parse_site_string("site {"),
            Err(SiteError::KdlParse(_))
        ));
    }

    #[test]
    fn test_unknown_nodes_skipped() {
        let kdl = r#"
            project "legacy"
            site "example.com" {
                cache-ttl 300
            }
        "#;
        let doc = parse_site_string(kdl).unwrap();
        assert_eq!(doc.site.domain_name.as_deref(), Some("example.com"));
    }

    #[test]
    fn test_parse_site_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("site.kdl");
        std::fs::write(&path, "site \"example.com\" {\n    subdomain \"www\"\n}\n").unwrap();

        let doc = parse_site_file(&path).unwrap();
        assert_eq!(doc.site.subdomain.as_deref(), Some("www"));

        std::fs::write(&path, "mode \"cdn\"\n").unwrap();
        let err = parse_site_file(&path).unwrap_err();
        assert!(err.to_string().contains("site.kdl"));
    }

    #[test]
    fn test_site_file_errors_name_the_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let missing = temp_dir.path().join("missing.kdl");
        match parse_site_file(&missing) {
            Err(SiteError::SiteFileRead { path, source }) => {
                assert_eq!(path, missing);
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("expected SiteFileRead, got {other:?}"),
        }

        let broken = temp_dir.path().join("site.kdl");
        std::fs::write(&broken, "site {").unwrap();
        match parse_site_file(&broken) {
            Err(SiteError::SiteFileParse { path, .. }) => assert_eq!(path, broken),
            other => panic!("expected SiteFileParse, got {other:?}"),
        }
    }
}
