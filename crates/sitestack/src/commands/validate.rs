use crate::SiteArgs;
use crate::site;
use colored::Colorize;

pub fn handle(args: &SiteArgs) -> anyhow::Result<()> {
    println!("{}", "Validating site configuration...".blue());

    let site = site::load(args)?;
    if let Some(file) = &site.file {
        println!("Site file: {}", file.display().to_string().cyan());
    }

    let config = &site.config;
    println!("{}", "✓ Site configuration is valid".green().bold());
    println!();
    println!("  domain:         {}", config.domain_name().cyan());
    println!("  site host:      {}", config.site_domain().cyan());
    println!(
        "  source:         {}",
        config.source_code_location().display()
    );
    println!("  index document: {}", config.index_document());
    println!("  error document: {}", config.error_document());
    println!("  mode:           {}", site.mode);
    if let Some(region) = &site.options.stack_region {
        println!("  region:         {region}");
    }
    if site.options.redirect_apex {
        println!(
            "  redirect:       {} -> {}",
            config.domain_name(),
            config.site_domain()
        );
    }

    Ok(())
}
