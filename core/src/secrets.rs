//! GitHub secret hunt.
//!
//! Runs beside the recon pipeline rather than inside it: the findings belong
//! to an organization, not to a target, and are written to their own
//! artifact `<output_dir>/github_secrets_<org>.json`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use reconr_common::ports::SecretHunter;
use reconr_common::success;
use serde_json::{Value, json};
use tracing::{info, warn};

pub fn artifact_path(output_dir: &Path, org: &str) -> PathBuf {
    let org: String = org
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    output_dir.join(format!("github_secrets_{org}.json"))
}

/// Hunts for leaked secrets in `org` and writes the findings artifact.
///
/// Without a token the hunt is skipped with a warning and nothing is written.
pub async fn run_secret_hunt(
    hunter: &dyn SecretHunter,
    token: Option<&str>,
    org: &str,
    output_dir: &Path,
) -> anyhow::Result<Vec<Value>> {
    let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) else {
        warn!("no GitHub token configured, skipping secret hunt for {org}");
        return Ok(Vec::new());
    };

    info!("hunting for secrets in GitHub organization {org}");
    let findings = hunter.hunt(token, org).await?;

    let artifact = json!({
        "org": org,
        "scan_timestamp": chrono::Local::now().to_rfc3339(),
        "findings": findings,
        "total_findings": findings.len(),
    });

    fs::create_dir_all(output_dir)
        .with_context(|| format!("creating {}", output_dir.display()))?;
    let path = artifact_path(output_dir, org);
    fs::write(&path, serde_json::to_string_pretty(&artifact)?)
        .with_context(|| format!("writing {}", path.display()))?;

    success!("{} secret findings saved to {}", findings.len(), path.display());
    Ok(findings)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
