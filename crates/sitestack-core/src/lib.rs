//! sitestack core
//!
//! Resolves a website configuration, plans the resources needed to host it
//! and drives a [`ProvisioningClient`](sitestack_cloud::ProvisioningClient)
//! through the plan.
//!
//! ```text
//! site.kdl / flags ─▶ resolve() ─▶ WebsiteConfig ─▶ plan() ─▶ Plan ─▶ apply() ─▶ Deployment
//! ```

pub mod config;
pub mod discovery;
pub mod error;
pub mod executor;
pub mod parser;
pub mod planner;

pub use config::{PartialWebsiteConfig, WebsiteConfig, normalize_region, resolve};
pub use discovery::{find_site_file, find_site_file_from};
pub use error::{DependencyError, Result, SiteError};
pub use executor::{Deployment, apply};
pub use parser::{SiteDocument, parse_site_file, parse_site_string};
pub use planner::{CERTIFICATE_REGION, DeploymentMode, PlanOptions, order_steps, plan, plan_with};
