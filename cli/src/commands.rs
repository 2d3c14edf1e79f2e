pub mod run;
pub mod show;

use std::path::{Path, PathBuf};

use clap::{ArgAction, Args, Parser, Subcommand};
use reconr_common::config::{Config, ScanModule};
use reconr_common::target::Target;
use tracing::debug;

/// Picked up from the working directory when `--config` is not given.
const DEFAULT_CONFIG: &str = "reconr.toml";

#[derive(Parser)]
#[command(name = "reconr", version)]
#[command(about = "A resumable reconnaissance pipeline for domains.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Less output (-q hides progress, -qq errors only)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub quiet: u8,

    /// More output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the recon pipeline against a domain
    #[command(alias = "r")]
    Run(RunArgs),
    /// Show what is stored for a domain
    #[command(alias = "s")]
    Show {
        target: Target,
        #[command(flatten)]
        config: ConfigArgs,
    },
}

#[derive(Args)]
pub struct ConfigArgs {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory holding the recon documents
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Args)]
pub struct RunArgs {
    /// Root domain (example.com) or a single subdomain (www.example.com)
    pub target: Target,

    #[command(flatten)]
    pub config: ConfigArgs,

    /// Comma separated modules: domain_discovery, port_scan, http_probe, vuln_scan, add_mitre, github
    #[arg(short, long, value_delimiter = ',')]
    pub modules: Option<Vec<ScanModule>>,

    /// Route discovery through an anonymising proxy when supported
    #[arg(long)]
    pub anonymous: bool,

    /// Extended subdomain brute forcing (root domains only)
    #[arg(long)]
    pub bruteforce: bool,

    /// GitHub organization searched for leaked secrets
    #[arg(long)]
    pub github_org: Option<String>,

    /// GitHub token, defaults to $GITHUB_TOKEN
    #[arg(long)]
    pub github_token: Option<String>,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn verbosity(&self) -> i8 {
        self.verbose.min(4) as i8 - self.quiet.min(4) as i8
    }
}

impl ConfigArgs {
    /// File values first, command line values on top.
    pub fn load(&self) -> anyhow::Result<Config> {
        let mut cfg = match &self.config {
            Some(path) => Config::load(path)?,
            None if Path::new(DEFAULT_CONFIG).is_file() => {
                debug!("using {DEFAULT_CONFIG}");
                Config::load(Path::new(DEFAULT_CONFIG))?
            }
            None => Config::default(),
        };

        if let Some(dir) = &self.output_dir {
            cfg.scan.output_dir = dir.clone();
        }
        Ok(cfg)
    }
}

impl RunArgs {
    pub fn load_config(&self) -> anyhow::Result<Config> {
        let mut cfg = self.config.load()?;

        if let Some(modules) = &self.modules {
            cfg.scan.modules = modules.iter().copied().collect();
        }
        cfg.scan.anonymous |= self.anonymous;
        cfg.scan.bruteforce |= self.bruteforce;

        if let Some(org) = &self.github_org {
            cfg.github.org = Some(org.clone());
        }
        cfg.github.token = self
            .github_token
            .clone()
            .or(cfg.github.token)
            .or_else(|| std::env::var("GITHUB_TOKEN").ok());

        Ok(cfg)
    }
}
