//! # Pipeline Controller
//!
//! Drives one target through the fixed phase order declared in
//! [`REGISTRY`]:
//!
//! `WHOIS → DISCOVERY → PORT_SCAN → HTTP_PROBE → VULN_SCAN → MITRE_ENRICH`
//!
//! For every phase the controller decides run or skip, awaits the
//! collaborator, merges its result, records the phase in
//! `modules_executed` and saves the document once. A failure is either
//! folded into the document or aborts the run, as the registry declares.
//! Nothing is written after a fatal failure, so the store always holds the
//! snapshot of the last completed phase.

use std::collections::{BTreeSet, HashMap};

use reconr_common::config::Config;
use reconr_common::document::{DiscoveryResult, HostDns, ReconDocument};
use reconr_common::error::PipelineError;
use reconr_common::phase::{FailurePolicy, Phase, PhaseSpec, REGISTRY, Slot};
use reconr_common::ports::{
    DiscoveryRequest, DocumentPhase, DocumentStore, HostResolver, SubdomainDiscovery, WhoisLookup,
};
use reconr_common::success;
use reconr_common::target::TargetInfo;
use serde_json::{Value, json};
use tracing::{Instrument, error, info, info_span, warn};

/// Controller settings for one invocation.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub enabled: BTreeSet<Phase>,
    pub anonymous: bool,
    pub bruteforce: bool,
    pub scan_type: String,
}

impl PipelineConfig {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            enabled: cfg.enabled_phases(),
            anonymous: cfg.scan.anonymous,
            bruteforce: cfg.scan.bruteforce,
            scan_type: cfg.scan_type(),
        }
    }

    /// WHOIS and DISCOVERY run together; with discovery off the run is a resume.
    pub fn discovery_enabled(&self) -> bool {
        self.enabled.contains(&Phase::Discovery)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PhaseEvent {
    Started(Phase),
    Completed(Phase),
    /// A recoverable phase failed; the error is stored in the document.
    Degraded(Phase, String),
    Skipped(Phase),
}

/// Outcome of one invocation.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub document: ReconDocument,
    pub resumed: bool,
    pub executed: Vec<Phase>,
    pub skipped: Vec<Phase>,
}

enum PhaseResult {
    Whois(Value),
    Discovery(DiscoveryResult),
    SingleHost(HostDns),
    Section(Value),
}

enum PhaseOutcome {
    Completed,
    Degraded(String),
}

type EventHook = Box<dyn Fn(&PhaseEvent) + Send + Sync>;

pub struct PipelineController {
    config: PipelineConfig,
    store: Box<dyn DocumentStore>,
    whois: Option<Box<dyn WhoisLookup>>,
    discovery: Option<Box<dyn SubdomainDiscovery>>,
    resolver: Option<Box<dyn HostResolver>>,
    phases: HashMap<Phase, Box<dyn DocumentPhase>>,
    on_event: Option<EventHook>,
}

impl PipelineController {
    pub fn new(config: PipelineConfig, store: Box<dyn DocumentStore>) -> Self {
        Self {
            config,
            store,
            whois: None,
            discovery: None,
            resolver: None,
            phases: HashMap::new(),
            on_event: None,
        }
    }

    pub fn with_whois(mut self, whois: Box<dyn WhoisLookup>) -> Self {
        self.whois = Some(whois);
        self
    }

    pub fn with_discovery(mut self, discovery: Box<dyn SubdomainDiscovery>) -> Self {
        self.discovery = Some(discovery);
        self
    }

    pub fn with_resolver(mut self, resolver: Box<dyn HostResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Registers the collaborator of a document phase (PORT_SCAN and later).
    pub fn with_phase(mut self, phase: Phase, collaborator: Box<dyn DocumentPhase>) -> Self {
        self.phases.insert(phase, collaborator);
        self
    }

    pub fn on_event(mut self, hook: impl Fn(&PhaseEvent) + Send + Sync + 'static) -> Self {
        self.on_event = Some(Box::new(hook));
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs every pending phase for `target`, in registry order.
    pub async fn run(&self, target: &TargetInfo) -> Result<RunReport, PipelineError> {
        self.check_collaborators(target)?;
        let (mut document, resumed) = self.initial_document(target)?;

        let subdomain_mode = document.is_subdomain_mode();
        let mut executed = Vec::new();
        let mut skipped = Vec::new();

        for spec in REGISTRY {
            if !self.should_run(spec, &document) {
                self.emit(PhaseEvent::Skipped(spec.phase));
                skipped.push(spec.phase);
                continue;
            }

            self.emit(PhaseEvent::Started(spec.phase));
            let span = info_span!("phase", phase = %spec.phase);
            let result = self.invoke(spec.phase, &document).instrument(span).await;

            let outcome = match (result, spec.policy) {
                (Ok(result), _) => {
                    merge(&mut document, spec, result);
                    PhaseOutcome::Completed
                }
                (Err(e), FailurePolicy::Recoverable) => {
                    let message = format!("{e:#}");
                    warn!("{} failed, continuing: {message}", spec.phase);
                    merge_failure(&mut document, spec, &message);
                    PhaseOutcome::Degraded(message)
                }
                (Err(e), FailurePolicy::Fatal) => {
                    error!("{} failed, aborting run: {e:#}", spec.phase);
                    return Err(PipelineError::Phase {
                        phase: spec.phase,
                        source: e,
                    });
                }
            };

            for module in spec.records_for(subdomain_mode) {
                document.append_executed(module.clone());
            }
            self.store.save(&document)?;

            match outcome {
                PhaseOutcome::Completed => {
                    success!("{} complete", spec.phase);
                    self.emit(PhaseEvent::Completed(spec.phase));
                }
                PhaseOutcome::Degraded(message) => {
                    self.emit(PhaseEvent::Degraded(spec.phase, message));
                }
            }
            executed.push(spec.phase);
        }

        Ok(RunReport {
            document,
            resumed,
            executed,
            skipped,
        })
    }

    fn initial_document(&self, target: &TargetInfo) -> Result<(ReconDocument, bool), PipelineError> {
        if self.config.discovery_enabled() {
            let document = ReconDocument::new(
                target,
                self.config.scan_type.clone(),
                self.config.anonymous,
                self.config.bruteforce,
            );
            return Ok((document, false));
        }

        let document = self
            .store
            .load(&target.target)?
            .ok_or_else(|| PipelineError::MissingDocument {
                target: target.target.clone(),
            })?;

        if document.target() != target.target {
            return Err(PipelineError::IdentityMismatch {
                expected: target.target.clone(),
                found: document.target().to_string(),
            });
        }

        info!(
            "resuming {} (already executed: {})",
            target.target,
            document
                .modules_executed()
                .iter()
                .map(|m| m.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok((document, true))
    }

    fn should_run(&self, spec: &PhaseSpec, document: &ReconDocument) -> bool {
        if spec.is_identity() {
            return self.config.discovery_enabled();
        }

        self.config.enabled.contains(&spec.phase)
            && !spec
                .records_for(document.is_subdomain_mode())
                .iter()
                .all(|module| document.has_executed(module))
    }

    /// Every phase that may run must have a collaborator before anything is executed.
    fn check_collaborators(&self, target: &TargetInfo) -> Result<(), PipelineError> {
        if self.config.discovery_enabled() {
            if self.whois.is_none() {
                return Err(PipelineError::MissingCollaborator(Phase::Whois));
            }
            let has_discovery = if target.is_subdomain {
                self.resolver.is_some()
            } else {
                self.discovery.is_some()
            };
            if !has_discovery {
                return Err(PipelineError::MissingCollaborator(Phase::Discovery));
            }
        }

        match REGISTRY
            .iter()
            .filter(|spec| !spec.is_identity() && self.config.enabled.contains(&spec.phase))
            .find(|spec| !self.phases.contains_key(&spec.phase))
        {
            Some(spec) => Err(PipelineError::MissingCollaborator(spec.phase)),
            None => Ok(()),
        }
    }

    async fn invoke(&self, phase: Phase, document: &ReconDocument) -> anyhow::Result<PhaseResult> {
        match phase {
            Phase::Whois => {
                let whois = self.whois.as_ref().ok_or_else(|| missing(phase))?;
                let root_domain = &document.metadata.root_domain;
                info!("performing WHOIS on root domain {root_domain}");
                Ok(PhaseResult::Whois(whois.lookup(root_domain).await?))
            }
            Phase::Discovery if document.is_subdomain_mode() => {
                let resolver = self.resolver.as_ref().ok_or_else(|| missing(phase))?;
                info!("resolving DNS for {}", document.target());
                Ok(PhaseResult::SingleHost(resolver.resolve(document.target()).await?))
            }
            Phase::Discovery => {
                let discovery = self.discovery.as_ref().ok_or_else(|| missing(phase))?;
                let request = DiscoveryRequest {
                    domain: document.target().to_string(),
                    anonymous: document.metadata.anonymous_mode,
                    bruteforce: document.metadata.bruteforce_mode,
                    resolve: true,
                };
                info!("enumerating subdomains of {}", request.domain);
                Ok(PhaseResult::Discovery(discovery.discover(&request).await?))
            }
            _ => {
                let collaborator = self.phases.get(&phase).ok_or_else(|| missing(phase))?;
                let section = collaborator.run(document).await?;
                if !section.is_object() {
                    anyhow::bail!("returned {} where a JSON object was expected", kind_of(&section));
                }
                Ok(PhaseResult::Section(section))
            }
        }
    }

    fn emit(&self, event: PhaseEvent) {
        if let Some(hook) = &self.on_event {
            hook(&event);
        }
    }
}

fn merge(document: &mut ReconDocument, spec: &PhaseSpec, result: PhaseResult) {
    match result {
        PhaseResult::Whois(data) => document.merge_whois(Ok(data)),
        PhaseResult::Discovery(found) => {
            info!("{} subdomains discovered", found.subdomain_count);
            document.merge_discovery_full(found.subdomains, found.subdomain_count, found.dns);
        }
        PhaseResult::SingleHost(record) => {
            if record.ips.is_empty() {
                warn!("{}: no DNS records found", document.target());
            } else {
                let ips: Vec<&str> = record.ips.all().map(String::as_str).collect();
                info!("{} -> {}", document.target(), ips.join(", "));
            }
            let target = document.target().to_string();
            document.merge_discovery_single(&target, record);
        }
        PhaseResult::Section(section) => document.merge_phase(spec.slot, section),
    }
}

fn merge_failure(document: &mut ReconDocument, spec: &PhaseSpec, message: &str) {
    match spec.slot {
        Slot::Builtin if spec.phase == Phase::Whois => document.merge_whois(Err(message.to_string())),
        slot => document.merge_phase(slot, json!({ "error": message })),
    }
}

fn missing(phase: Phase) -> anyhow::Error {
    anyhow::anyhow!("no collaborator registered for {phase}")
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
