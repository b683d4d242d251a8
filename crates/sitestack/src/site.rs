//! Site loading: site file + command line overrides

use crate::SiteArgs;
use sitestack_cloud_aws::StaticZones;
use sitestack_core::{
    DeploymentMode, PartialWebsiteConfig, PlanOptions, SiteDocument, SiteError, WebsiteConfig,
};
use std::path::PathBuf;

/// Everything a command needs to plan a site
#[derive(Debug)]
pub struct LoadedSite {
    pub config: WebsiteConfig,
    pub mode: DeploymentMode,
    pub options: PlanOptions,
    pub zones: StaticZones,

    /// Site file the settings came from, if any
    pub file: Option<PathBuf>,
}

impl LoadedSite {
    /// CloudFormation stack name, e.g. `sitestack-www-example-com`
    pub fn stack_name(&self) -> String {
        format!("sitestack-{}", self.config.site_domain().replace('.', "-"))
    }
}

/// Load the site file (if any) and apply the command line on top
pub fn load(args: &SiteArgs) -> sitestack_core::Result<LoadedSite> {
    let (document, file) = match &args.config {
        Some(path) => (sitestack_core::parse_site_file(path)?, Some(path.clone())),
        None => match sitestack_core::find_site_file() {
            Ok(path) => (sitestack_core::parse_site_file(&path)?, Some(path)),
            // Flags alone are enough when they name the domain
            Err(SiteError::SiteFileNotFound) if args.domain_name.is_some() => {
                (SiteDocument::default(), None)
            }
            Err(e) => return Err(e),
        },
    };
    if let Some(path) = &file {
        tracing::debug!(file = %path.display(), "Loaded site file");
    }

    let SiteDocument {
        mut site,
        mode,
        mut options,
        hosted_zones,
    } = document;

    site.merge(PartialWebsiteConfig {
        domain_name: args.domain_name.clone(),
        subdomain: args.subdomain.clone(),
        source_code_location: args.source.clone(),
        index_document: args.index_document.clone(),
        error_document: args.error_document.clone(),
    });
    let config = sitestack_core::resolve(site)?;

    let mode = args.mode.map(DeploymentMode::from).or(mode).unwrap_or_default();

    if args.region.is_some() {
        options.stack_region = args.region.clone();
    }
    options.stack_region = options
        .stack_region
        .as_deref()
        .map(sitestack_core::normalize_region)
        .transpose()?;
    options.redirect_apex |= args.redirect_apex;
    options.deploy_content |= args.deploy_content;

    let zones: StaticZones = hosted_zones
        .into_iter()
        .chain(args.hosted_zones.iter().cloned())
        .collect();

    Ok(LoadedSite {
        config,
        mode,
        options,
        zones,
        file,
    })
}
