#![allow(deprecated)] // TODO: migrate Command::cargo_bin to cargo_bin_cmd!

mod common;

use assert_cmd::Command;
use common::TestProject;
use predicates::prelude::*;

const SITE_KDL: &str = r#"
site "example.com" {
    source "site"
    mode "cdn-custom-domain"
}
hosted-zone "example.com" id="Z0123456789ABC"
"#;

/// Command running in `dir` without site settings leaking in from the environment.
/// `dir` also stands in for the home directory, so a global site file on the
/// machine is never found.
fn sitestack(dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("sitestack").unwrap();
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env_remove("SITESTACK_CONFIG")
        .env_remove("SITESTACK_DOMAIN_NAME")
        .env_remove("AWS_REGION")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_cli_help() {
    let project = TestProject::new();
    sitestack(&project.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("synth"));
}

#[test]
fn test_cli_version() {
    let project = TestProject::new();
    sitestack(&project.path())
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("sitestack"));
}

#[test]
fn test_plan_help_lists_modes() {
    let project = TestProject::new();
    sitestack(&project.path())
        .args(["plan", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--json"))
        .stdout(predicate::str::contains("cdn-custom-domain"))
        .stdout(predicate::str::contains("--hosted-zone"));
}

#[test]
fn test_invalid_command() {
    let project = TestProject::new();
    sitestack(&project.path())
        .arg("invalid-command")
        .assert()
        .failure();
}

#[test]
fn test_validate_site_file() {
    let project = TestProject::new();
    project.write_site_kdl(SITE_KDL);

    sitestack(&project.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("www.example.com"))
        .stdout(predicate::str::contains("index.html"))
        .stdout(predicate::str::contains("cdn-custom-domain"));
}

#[test]
fn test_flags_override_site_file() {
    let project = TestProject::new();
    project.write_site_kdl(SITE_KDL);

    sitestack(&project.path())
        .args(["validate", "--subdomain", "app", "--mode", "cdn"])
        .assert()
        .success()
        .stdout(predicate::str::contains("app.example.com"))
        .stdout(predicate::str::contains("mode:           cdn\n"));

    let output = sitestack(&project.path())
        .args(["plan", "--json", "--mode", "cdn"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(plan["steps"].as_array().unwrap().len(), 4);
}

#[test]
fn test_validate_without_site_file() {
    let project = TestProject::new();
    sitestack(&project.path())
        .arg("validate")
        .args(["--config", "missing.kdl"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read site file missing.kdl"))
        .stderr(predicate::function(|stderr: &str| stderr.matches("os error").count() == 1));
}

#[test]
fn test_broken_site_file_names_the_file() {
    let project = TestProject::new();
    project.write_site_kdl("site {");

    sitestack(&project.path())
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse site file"))
        .stderr(predicate::str::contains("site.kdl"))
        .stderr(predicate::str::contains("Failed to parse KDL document").not());
}

#[test]
fn test_missing_config_env_falls_back_to_discovery() {
    let project = TestProject::new();
    project.write_site_kdl(SITE_KDL);

    sitestack(&project.path())
        .env("SITESTACK_CONFIG", project.path().join("nope.kdl"))
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("www.example.com"));
}

#[cfg(target_os = "linux")]
#[test]
fn test_global_site_file_comes_from_home() {
    let project = TestProject::new();
    let global_dir = project.path().join(".config/sitestack");
    std::fs::create_dir_all(&global_dir).unwrap();
    std::fs::write(global_dir.join("site.kdl"), r#"site "example.org""#).unwrap();

    sitestack(&project.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("www.example.org"));
}

#[test]
fn test_region_is_normalized() {
    let project = TestProject::new();
    project.write_site_kdl(SITE_KDL);

    sitestack(&project.path())
        .args(["validate", "--region", "EU-West-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("region:         eu-west-1\n"));
}

#[test]
fn test_validate_rejects_invalid_domain() {
    let project = TestProject::new();
    sitestack(&project.path())
        .args(["validate", "--domain-name", "not a domain"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid site configuration"));
}

#[test]
fn test_plan_custom_domain_order() {
    let project = TestProject::new();
    project.write_site_kdl(SITE_KDL);

    let output = sitestack(&project.path())
        .args(["plan", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let kinds: Vec<&str> = plan["steps"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["kind"].as_str().unwrap())
        .collect();
    assert_eq!(
        kinds,
        vec![
            "bucket",
            "hosted-zone-lookup",
            "certificate",
            "access-identity",
            "bucket-policy",
            "distribution",
            "dns-record",
        ]
    );
}

#[test]
fn test_plan_from_flags_only() {
    let project = TestProject::new();
    sitestack(&project.path())
        .args([
            "plan",
            "--domain-name",
            "example.com",
            "--mode",
            "bucket-only",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("www.example.com (public read)"))
        .stdout(predicate::str::contains("1 steps"));
}

#[test]
fn test_synth_writes_templates() {
    let project = TestProject::new();
    project.write_site_kdl(SITE_KDL);
    project.create_source_dir("site");
    let output_path = project.path().join("stacks.json");

    sitestack(&project.path())
        .args(["synth", "--region", "eu-west-1", "--deploy-content", "-o"])
        .arg(&output_path)
        .assert()
        .success()
        .stderr(predicate::str::contains("sitestack-www-example-com-certificate"));

    let content = std::fs::read_to_string(&output_path).unwrap();
    let synthesis: serde_json::Value = serde_json::from_str(&content).unwrap();
    let stacks = synthesis["stacks"].as_array().unwrap();
    assert_eq!(stacks.len(), 2);
    assert_eq!(stacks[0]["region"], "us-east-1");

    let main = &stacks[1]["template"]["Resources"];
    assert_eq!(
        main["CloudFrontDistribution"]["Type"],
        "AWS::CloudFront::Distribution"
    );
    assert_eq!(
        main["AliasRecord"]["Properties"]["HostedZoneId"],
        "Z0123456789ABC"
    );
    assert_eq!(
        synthesis["assets"][0]["destination_bucket"],
        "www.example.com"
    );
}

#[test]
fn test_synth_without_hosted_zone_fails() {
    let project = TestProject::new();
    sitestack(&project.path())
        .args(["synth", "--domain-name", "example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Hosted zone not found: example.com"))
        .stderr(predicate::str::contains("--hosted-zone"));
}

#[test]
fn test_synth_cdn_only_to_stdout() {
    let project = TestProject::new();
    let output = sitestack(&project.path())
        .args(["synth", "--domain-name", "example.com", "--mode", "cdn"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let synthesis: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let resources = &synthesis["stacks"][0]["template"]["Resources"];
    assert!(resources.get("Certificate").is_none());
    assert_eq!(
        resources["CloudFrontDistribution"]["Properties"]["DistributionConfig"]
            ["ViewerCertificate"]["CloudFrontDefaultCertificate"],
        true
    );
}
