//! Phases implemented by an external program.
//!
//! The program receives the recon document as JSON on stdin and prints its
//! result as JSON on stdout. `{target}`, `{root_domain}` and `{org}` in the
//! configured arguments are substituted before the program starts.

use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, bail};
use async_trait::async_trait;
use reconr_common::config::CommandConfig;
use reconr_common::document::ReconDocument;
use reconr_common::ports::{DocumentPhase, SecretHunter};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info};

const STDERR_TAIL_LINES: usize = 5;

#[derive(Debug, Clone)]
pub struct ExternalCommand {
    name: String,
    program: String,
    args: Vec<String>,
    run_timeout: Duration,
}

impl ExternalCommand {
    pub fn new(name: impl Into<String>, cfg: &CommandConfig) -> Self {
        Self {
            name: name.into(),
            program: cfg.program.clone(),
            args: cfg.args.clone(),
            run_timeout: Duration::from_secs(cfg.timeout_secs),
        }
    }

    async fn execute(
        &self,
        input: Vec<u8>,
        vars: &[(&str, &str)],
        env: &[(&str, &str)],
    ) -> anyhow::Result<Value> {
        let args: Vec<String> = self.args.iter().map(|arg| substitute(arg, vars)).collect();
        info!("{}: running {} {}", self.name, self.program, args.join(" "));

        let mut child = Command::new(&self.program)
            .args(&args)
            .envs(env.iter().copied())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to start {}", self.program))?;

        let mut stdin = child.stdin.take().context("child stdin unavailable")?;
        let writer = tokio::spawn(async move {
            // Programs that ignore stdin close it early; a broken pipe is not a failure.
            let _ = stdin.write_all(&input).await;
        });

        let output = timeout(self.run_timeout, child.wait_with_output())
            .await
            .with_context(|| format!("{} timed out after {:?}", self.program, self.run_timeout))??;
        let _ = writer.await;

        if !output.status.success() {
            bail!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr_tail(&output.stderr)
            );
        }

        debug!("{}: {} bytes of output", self.name, output.stdout.len());
        serde_json::from_slice(&output.stdout)
            .with_context(|| format!("{} did not print valid JSON", self.program))
    }
}

#[async_trait]
impl DocumentPhase for ExternalCommand {
    async fn run(&self, document: &ReconDocument) -> anyhow::Result<Value> {
        let input = serde_json::to_vec(document)?;
        let vars = [
            ("target", document.target()),
            ("root_domain", document.metadata.root_domain.as_str()),
        ];
        self.execute(input, &vars, &[]).await
    }
}

#[async_trait]
impl SecretHunter for ExternalCommand {
    /// The token only reaches the child through its `GITHUB_TOKEN` environment variable.
    async fn hunt(&self, token: &str, org: &str) -> anyhow::Result<Vec<Value>> {
        let output = self
            .execute(Vec::new(), &[("org", org)], &[("GITHUB_TOKEN", token)])
            .await?;

        match output {
            Value::Array(findings) => Ok(findings),
            Value::Object(mut object) => match object.remove("findings") {
                Some(Value::Array(findings)) => Ok(findings),
                _ => bail!("{} printed an object without a findings array", self.program),
            },
            _ => bail!("{} printed neither a findings array nor an object", self.program),
        }
    }
}

fn substitute(arg: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(arg.to_string(), |acc, (name, value)| {
        acc.replace(&format!("{{{name}}}"), value)
    })
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    let tail = lines[start..].join(" | ");
    if tail.is_empty() { "no stderr output".to_string() } else { tail }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
