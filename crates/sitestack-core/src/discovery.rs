//! Site file discovery

use crate::error::{Result, SiteError};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable pointing at a site file
pub const SITE_FILE_ENV: &str = "SITESTACK_CONFIG";

const CANDIDATES: [&str; 4] = ["site.local.kdl", ".site.local.kdl", "site.kdl", ".site.kdl"];
const PROJECT_DIR: &str = ".sitestack";
const GLOBAL_DIR: &str = "sitestack";

/// Find the site file, searching from the current directory
///
/// Search order:
/// 1. `SITESTACK_CONFIG`
/// 2. current directory: site.local.kdl, .site.local.kdl, site.kdl, .site.kdl
/// 3. `./.sitestack/` with the same names
/// 4. `~/.config/sitestack/site.kdl`
pub fn find_site_file() -> Result<PathBuf> {
    let current_dir = std::env::current_dir()?;
    find_site_file_from(&current_dir)
}

/// Same as [`find_site_file`], starting from `dir`
pub fn find_site_file_from(dir: &Path) -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(SITE_FILE_ENV) {
        let path = PathBuf::from(&config_path);
        if path.is_file() {
            debug!(file = %path.display(), "Using site file from {SITE_FILE_ENV}");
            return Ok(path);
        }
        debug!(file = %config_path, "{SITE_FILE_ENV} points at a missing file, searching");
    }

    if let Some(path) = first_candidate(dir) {
        return Ok(path);
    }

    let project_dir = dir.join(PROJECT_DIR);
    if project_dir.is_dir()
        && let Some(path) = first_candidate(&project_dir)
    {
        return Ok(path);
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global = config_dir.join(GLOBAL_DIR).join("site.kdl");
        if global.is_file() {
            debug!(file = %global.display(), "Using global site file");
            return Ok(global);
        }
    }

    Err(SiteError::SiteFileNotFound)
}

fn first_candidate(dir: &Path) -> Option<PathBuf> {
    CANDIDATES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}
