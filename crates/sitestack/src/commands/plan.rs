use crate::SiteArgs;
use crate::site;
use colored::Colorize;

pub fn handle(args: &SiteArgs, json: bool) -> anyhow::Result<()> {
    let site = site::load(args)?;
    let plan = sitestack_core::plan_with(&site.config, site.mode, &site.options)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    println!(
        "Plan for {} ({})",
        site.config.site_domain().cyan().bold(),
        site.mode
    );
    println!();
    for (i, step) in plan.iter().enumerate() {
        println!(
            "  {:>2}. {} {}",
            i + 1,
            format!("{:<20}", step.kind.as_str()).green(),
            step.description()
        );
        if !step.depends_on.is_empty() {
            let deps: Vec<_> = step.depends_on.iter().map(|d| d.as_str()).collect();
            println!("{:27}{}", "", format!("needs {}", deps.join(", ")).dimmed());
        }
    }
    println!();
    println!("{}", plan.summary());

    Ok(())
}
