mod commands;
mod site;

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use sitestack_core::{DeploymentMode, SiteError};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sitestack")]
#[command(
    about = "Static website hosting behind a CDN, planned from a KDL site file",
    long_about = None
)]
struct Cli {
    /// Show debug logs (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the site configuration and print it
    Validate {
        #[command(flatten)]
        site: SiteArgs,
    },
    /// Print the ordered resource steps
    Plan {
        #[command(flatten)]
        site: SiteArgs,
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
    /// Synthesize CloudFormation templates for the plan
    Synth {
        #[command(flatten)]
        site: SiteArgs,
        /// Write the templates to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show version information
    Version,
}

/// Site file location and per-field overrides
#[derive(Args, Debug, Clone, Default)]
pub struct SiteArgs {
    /// Site file (default: $SITESTACK_CONFIG, then site.kdl discovery)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Apex domain, e.g. example.com
    #[arg(long, env = "SITESTACK_DOMAIN_NAME")]
    pub domain_name: Option<String>,

    /// Site subdomain (default: www)
    #[arg(long)]
    pub subdomain: Option<String>,

    /// Local directory with the built site (default: build)
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Index document (default: index.html)
    #[arg(long)]
    pub index_document: Option<String>,

    /// Error document (default: the index document)
    #[arg(long)]
    pub error_document: Option<String>,

    /// Deployment mode (default: cdn-custom-domain)
    #[arg(short, long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Region of the site stack. The certificate always stays in us-east-1.
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,

    /// Redirect the apex domain to the site host
    #[arg(long)]
    pub redirect_apex: bool,

    /// Upload the source directory after the resources are created
    #[arg(long)]
    pub deploy_content: bool,

    /// Existing hosted zone, as NAME=ID (repeatable)
    #[arg(
        long = "hosted-zone",
        value_name = "NAME=ID",
        value_parser = parse_hosted_zone
    )]
    pub hosted_zones: Vec<(String, String)>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    BucketOnly,
    Cdn,
    CdnCustomDomain,
}

impl From<ModeArg> for DeploymentMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::BucketOnly => DeploymentMode::BucketOnly,
            ModeArg::Cdn => DeploymentMode::CdnOnly,
            ModeArg::CdnCustomDomain => DeploymentMode::CdnWithCustomDomain,
        }
    }
}

fn parse_hosted_zone(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((name, id)) if !name.is_empty() && !id.is_empty() => {
            Ok((name.to_string(), id.to_string()))
        }
        _ => Err(format!("expected NAME=ID, got '{value}'")),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli.command).await {
        eprintln!();
        eprintln!("{} {e:#}", "✗".red().bold());
        if let Some(site_error) = e.downcast_ref::<SiteError>() {
            if site_error.is_zone_not_found() {
                eprintln!();
                eprintln!(
                    "Pass the zone id with --hosted-zone NAME=ID or add a hosted-zone node to the site file"
                );
            } else if matches!(site_error, SiteError::SiteFileNotFound) {
                eprintln!();
                eprintln!("Or give the domain directly: sitestack plan --domain-name example.com");
            }
        }
        std::process::exit(1);
    }
}

async fn run(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Validate { site } => commands::validate::handle(&site),
        Commands::Plan { site, json } => commands::plan::handle(&site, json),
        Commands::Synth { site, output } => commands::synth::handle(&site, output).await,
        Commands::Version => {
            println!("sitestack {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hosted_zone() {
        assert_eq!(
            parse_hosted_zone("example.com=Z123").unwrap(),
            ("example.com".to_string(), "Z123".to_string())
        );
        assert!(parse_hosted_zone("example.com").is_err());
        assert!(parse_hosted_zone("=Z123").is_err());
    }

    #[test]
    fn test_mode_arg_names() {
        for (name, mode) in [
            ("bucket-only", DeploymentMode::BucketOnly),
            ("cdn", DeploymentMode::CdnOnly),
            ("cdn-custom-domain", DeploymentMode::CdnWithCustomDomain),
        ] {
            let arg = ModeArg::from_str(name, false).unwrap();
            assert_eq!(DeploymentMode::from(arg), mode);
            assert_eq!(mode.as_str(), name);
        }
    }
}
