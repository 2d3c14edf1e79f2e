use std::sync::Arc;
use std::time::Instant;

use colored::*;
use reconr_common::config::{Config, ScanModule};
use reconr_common::phase::Phase;
use reconr_common::ports::HostResolver;
use reconr_common::target::TargetClassifier;
use reconr_core::modules::{
    ExternalCommand, SystemResolver, TcpConnectScanner, WhoisClient, WordlistDiscovery,
};
use reconr_core::pipeline::{PhaseEvent, PipelineConfig, PipelineController, RunReport};
use reconr_core::secrets::run_secret_hunt;
use reconr_core::store::JsonFileStore;
use tracing::{debug, error, info, warn};

use crate::commands::RunArgs;
use crate::terminal::{print, report, spinner};

pub async fn run(args: RunArgs) -> anyhow::Result<()> {
    let cfg = args.load_config()?;
    let info = TargetClassifier::new().classify(args.target.as_str());

    print::banner();
    report::mode(&info, &cfg.scan_type(), cfg.scan.anonymous, cfg.scan.bruteforce);

    let store = JsonFileStore::new(&cfg.scan.output_dir);
    let document_path = store.path_for(&info.target);
    let controller = build_controller(&cfg, store);
    let start_time = Instant::now();

    let outcome = if controller.config().enabled.is_empty() {
        info!("no pipeline modules enabled");
        None
    } else {
        print::header("pipeline");
        spinner::start(format!("Preparing {}...", info.target));
        let result = controller.run(&info).await;
        spinner::finish();
        Some(result?)
    };

    let github_findings = hunt_secrets(&cfg).await;

    match &outcome {
        Some(RunReport { document, .. }) => report::document(document, &document_path, github_findings),
        None => {
            if let Some(findings) = github_findings {
                print::aligned_line("GitHub findings", findings.to_string());
            }
        }
    }

    print_summary(outcome.as_ref(), start_time);
    Ok(())
}

fn build_controller(cfg: &Config, store: JsonFileStore) -> PipelineController {
    let resolver: Arc<dyn HostResolver> = Arc::new(SystemResolver);

    let mut controller = PipelineController::new(PipelineConfig::from_config(cfg), Box::new(store))
        .with_whois(Box::new(WhoisClient::new(&cfg.whois)))
        .with_resolver(Box::new(SystemResolver))
        .with_discovery(Box::new(WordlistDiscovery::new(resolver, &cfg.discovery)))
        .with_phase(Phase::PortScan, Box::new(TcpConnectScanner::new(&cfg.port_scan)))
        .on_event(show_progress);

    let commands = [
        (Phase::HttpProbe, &cfg.phases.http_probe),
        (Phase::VulnScan, &cfg.phases.vuln_scan),
        (Phase::MitreEnrich, &cfg.phases.add_mitre),
    ];
    for (phase, command) in commands {
        if let Some(command) = command {
            controller = controller.with_phase(phase, Box::new(ExternalCommand::new(phase.as_str(), command)));
        }
    }

    controller
}

fn show_progress(event: &PhaseEvent) {
    match event {
        PhaseEvent::Started(phase) => {
            spinner::report(format!("Running {}...", phase.as_str().bold()));
        }
        PhaseEvent::Completed(phase) => {
            spinner::report(format!("{} done, saving...", phase.as_str().green()));
        }
        PhaseEvent::Degraded(phase, _) => {
            spinner::report(format!("{} failed, continuing...", phase.as_str().yellow()));
        }
        PhaseEvent::Skipped(phase) => debug!("skipping {phase}"),
    }
}

/// Failures are logged and never fail the run; the recon document is not touched.
async fn hunt_secrets(cfg: &Config) -> Option<usize> {
    if !cfg.is_enabled(ScanModule::Github) {
        return None;
    }

    let Some(org) = cfg.github.org.as_deref() else {
        warn!("github module enabled but no organization set (--github-org)");
        return None;
    };
    let Some(command) = &cfg.github.command else {
        warn!("github module enabled but no [github.command] configured");
        return None;
    };

    print::header("github secrets");
    let hunter = ExternalCommand::new("github", command);
    match run_secret_hunt(&hunter, cfg.github.token.as_deref(), org, &cfg.scan.output_dir).await {
        Ok(findings) => Some(findings.len()),
        Err(e) => {
            error!("secret hunt failed: {e:#}");
            None
        }
    }
}

fn print_summary(outcome: Option<&RunReport>, start_time: Instant) {
    let total_time: ColoredString = format!("{:.2}s", start_time.elapsed().as_secs_f64())
        .bold()
        .yellow();

    let status = match outcome {
        Some(run) if run.resumed => format!(
            "Resumed run complete: {} phases in {total_time}",
            run.executed.len().to_string().green().bold()
        ),
        Some(run) => format!(
            "Recon complete: {} phases in {total_time}",
            run.executed.len().to_string().green().bold()
        ),
        None => format!("Done in {total_time}"),
    };

    print::fat_separator();
    print::centerln(&status);
}
