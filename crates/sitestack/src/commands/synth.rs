use crate::SiteArgs;
use crate::site::{self, LoadedSite};
use anyhow::Context;
use colored::Colorize;
use sitestack_cloud::PlatformClient;
use sitestack_cloud_aws::{CfnSynthesizer, Synthesis, ZoneLookup};
use std::path::PathBuf;

pub async fn handle(args: &SiteArgs, output: Option<PathBuf>) -> anyhow::Result<()> {
    let site = site::load(args)?;

    #[cfg(feature = "route53")]
    if site.mode.uses_custom_domain() && site.zones.is_empty() {
        let zones = sitestack_cloud_aws::Route53Zones::from_env().await;
        return write(synthesize(&site, zones).await?, output);
    }

    let zones = site.zones.clone();
    write(synthesize(&site, zones).await?, output)
}

async fn synthesize(
    site: &LoadedSite,
    zones: impl ZoneLookup + 'static,
) -> anyhow::Result<Synthesis> {
    let plan = sitestack_core::plan_with(&site.config, site.mode, &site.options)?;
    eprintln!(
        "{} {} ({}, {})",
        "Synthesizing".blue(),
        site.config.site_domain().cyan(),
        site.mode,
        plan.summary()
    );

    let synthesizer = CfnSynthesizer::new(
        site.stack_name(),
        site.options.stack_region.clone(),
        zones,
    );
    let client = PlatformClient::new(synthesizer);
    sitestack_core::apply(&plan, &client).await?;

    Ok(client.into_inner().finish())
}

fn write(synthesis: Synthesis, output: Option<PathBuf>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&synthesis)?;
    match output {
        Some(path) => {
            std::fs::write(&path, format!("{json}\n"))
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!(
                "{} {} stack(s) written to {}",
                "✓".green().bold(),
                synthesis.stacks.len(),
                path.display().to_string().cyan()
            );
        }
        None => println!("{json}"),
    }

    for stack in &synthesis.stacks {
        let region = stack.region.as_deref().unwrap_or("default region");
        eprintln!("  {} ({region})", stack.name);
    }
    for asset in &synthesis.assets {
        eprintln!(
            "  upload {} -> s3://{}",
            asset.source.display(),
            asset.destination_bucket
        );
    }
    Ok(())
}
