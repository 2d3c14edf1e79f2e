//! Fake collaborators and a recording store for driving the controller
//! without touching the network.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use async_trait::async_trait;
use reconr_common::document::{DiscoveryResult, HostDns, ReconDocument, ResolvedIps};
use reconr_common::error::StoreError;
use reconr_common::phase::{Module, Phase};
use reconr_common::ports::{
    DiscoveryRequest, DocumentPhase, DocumentStore, HostResolver, SubdomainDiscovery, WhoisLookup,
};
use reconr_common::target::{TargetClassifier, TargetInfo};
use reconr_core::pipeline::{PhaseEvent, PipelineConfig, PipelineController};
use reconr_core::store::JsonFileStore;
use serde_json::{Map, Value, json};
use tempfile::TempDir;

pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn classify(target: &str) -> TargetInfo {
    TargetClassifier::new().classify(target)
}

pub fn config(enabled: &[Phase]) -> PipelineConfig {
    PipelineConfig {
        enabled: enabled.iter().copied().collect(),
        anonymous: false,
        bruteforce: false,
        scan_type: "test".to_string(),
    }
}

pub const FULL_DISCOVERY: &[Phase] = &[Phase::Whois, Phase::Discovery];

fn host(ip: &str) -> HostDns {
    HostDns {
        ips: ResolvedIps {
            ipv4: vec![ip.to_string()],
            ipv6: Vec::new(),
        },
        records: Map::new(),
    }
}

pub struct FakeWhois {
    log: CallLog,
    error: Option<String>,
}

#[async_trait]
impl WhoisLookup for FakeWhois {
    async fn lookup(&self, root_domain: &str) -> anyhow::Result<Value> {
        self.log.lock().unwrap().push(format!("whois:{root_domain}"));
        match &self.error {
            Some(message) => Err(anyhow!("{message}")),
            None => Ok(json!({ "registrar": "Example Registrar", "domain_name": root_domain })),
        }
    }
}

pub struct FakeDiscovery {
    log: CallLog,
    fail: bool,
}

#[async_trait]
impl SubdomainDiscovery for FakeDiscovery {
    async fn discover(&self, request: &DiscoveryRequest) -> anyhow::Result<DiscoveryResult> {
        self.log.lock().unwrap().push(format!("discover:{}", request.domain));
        if self.fail {
            return Err(anyhow!("resolver unreachable"));
        }

        let subdomains = vec![
            format!("api.{}", request.domain),
            format!("www.{}", request.domain),
        ];
        let mut found = Map::new();
        for (name, ip) in subdomains.iter().zip(["192.0.2.20", "192.0.2.30"]) {
            found.insert(name.clone(), json!(host(ip)));
        }

        Ok(DiscoveryResult {
            subdomain_count: subdomains.len(),
            subdomains,
            dns: json!({ "domain": host("192.0.2.10"), "subdomains": found }),
        })
    }
}

pub struct FakeResolver {
    log: CallLog,
}

#[async_trait]
impl HostResolver for FakeResolver {
    async fn resolve(&self, name: &str) -> anyhow::Result<HostDns> {
        self.log.lock().unwrap().push(format!("resolve:{name}"));
        Ok(host("192.0.2.40"))
    }
}

pub enum PhaseBehavior {
    Section(Value),
    Fail(String),
}

pub struct FakePhase {
    phase: Phase,
    log: CallLog,
    behavior: PhaseBehavior,
}

#[async_trait]
impl DocumentPhase for FakePhase {
    async fn run(&self, document: &ReconDocument) -> anyhow::Result<Value> {
        self.log.lock().unwrap().push(self.phase.as_str().to_string());
        match &self.behavior {
            PhaseBehavior::Section(section) => {
                let mut section = section.clone();
                if let Some(object) = section.as_object_mut() {
                    object.insert("target".to_string(), json!(document.target()));
                }
                Ok(section)
            }
            PhaseBehavior::Fail(message) => Err(anyhow!("{message}")),
        }
    }
}

fn default_section(phase: Phase) -> Value {
    match phase {
        Phase::PortScan => json!({ "summary": { "total_open_ports": 4, "hosts_with_open_ports": 2 } }),
        Phase::HttpProbe => json!({ "summary": { "live_urls": 3, "technology_count": 5 } }),
        Phase::VulnScan => json!({ "summary": { "total_findings": 2, "critical": 1, "high": 1 } }),
        Phase::MitreEnrich => json!({ "total_cves_enriched": 1, "total_cves_processed": 2 }),
        Phase::Whois | Phase::Discovery => json!({}),
    }
}

/// Wraps the file store, counting saves and keeping the modules of every snapshot.
pub struct RecordingStore {
    inner: JsonFileStore,
    saves: Arc<AtomicUsize>,
    snapshots: Arc<Mutex<Vec<Vec<Module>>>>,
}

impl DocumentStore for RecordingStore {
    fn key(&self, target: &str) -> String {
        self.inner.key(target)
    }

    fn save(&self, document: &ReconDocument) -> Result<(), StoreError> {
        self.inner.save(document)?;
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.snapshots
            .lock()
            .unwrap()
            .push(document.modules_executed().to_vec());
        Ok(())
    }

    fn load(&self, target: &str) -> Result<Option<ReconDocument>, StoreError> {
        self.inner.load(target)
    }
}

/// One temporary output directory plus the shared call log of every fake.
pub struct Harness {
    dir: TempDir,
    pub log: CallLog,
    pub saves: Arc<AtomicUsize>,
    pub snapshots: Arc<Mutex<Vec<Vec<Module>>>>,
    pub events: Arc<Mutex<Vec<PhaseEvent>>>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            log: CallLog::default(),
            saves: Arc::default(),
            snapshots: Arc::default(),
            events: Arc::default(),
        }
    }

    pub fn store(&self) -> JsonFileStore {
        JsonFileStore::new(self.dir.path())
    }

    /// A controller with only the recording store and event capture.
    pub fn bare_controller(&self, cfg: PipelineConfig) -> PipelineController {
        let store = RecordingStore {
            inner: self.store(),
            saves: self.saves.clone(),
            snapshots: self.snapshots.clone(),
        };
        let events = self.events.clone();
        PipelineController::new(cfg, Box::new(store))
            .on_event(move |event| events.lock().unwrap().push(event.clone()))
    }

    /// A controller where every collaborator succeeds.
    pub fn controller(&self, enabled: &[Phase]) -> PipelineController {
        self.controller_with(config(enabled))
    }

    pub fn controller_with(&self, cfg: PipelineConfig) -> PipelineController {
        let mut controller = self
            .bare_controller(cfg)
            .with_whois(Box::new(FakeWhois {
                log: self.log.clone(),
                error: None,
            }))
            .with_discovery(Box::new(FakeDiscovery {
                log: self.log.clone(),
                fail: false,
            }))
            .with_resolver(Box::new(FakeResolver {
                log: self.log.clone(),
            }));

        for phase in [Phase::PortScan, Phase::HttpProbe, Phase::VulnScan, Phase::MitreEnrich] {
            controller = controller.with_phase(phase, self.phase(phase, PhaseBehavior::Section(default_section(phase))));
        }
        controller
    }

    pub fn phase(&self, phase: Phase, behavior: PhaseBehavior) -> Box<FakePhase> {
        Box::new(FakePhase {
            phase,
            log: self.log.clone(),
            behavior,
        })
    }

    pub fn failing_whois(&self, message: &str) -> Box<FakeWhois> {
        Box::new(FakeWhois {
            log: self.log.clone(),
            error: Some(message.to_string()),
        })
    }

    pub fn failing_discovery(&self) -> Box<FakeDiscovery> {
        Box::new(FakeDiscovery {
            log: self.log.clone(),
            fail: true,
        })
    }

    /// Persists a document without going through the recording store.
    pub fn seed(&self, document: &ReconDocument) {
        self.store().save(document).unwrap();
    }

    pub fn stored(&self, target: &str) -> Option<ReconDocument> {
        self.store().load(target).unwrap()
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.log.lock().unwrap().clear();
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> Vec<PhaseEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn files(&self) -> Vec<String> {
        match std::fs::read_dir(self.dir.path()) {
            Ok(entries) => entries
                .filter_map(Result::ok)
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

/// A document as a finished earlier run of `modules` would have left it.
pub fn persisted(target: &str, modules: &[Module]) -> ReconDocument {
    let info = classify(target);
    let mut document = ReconDocument::new(&info, "domain_discovery_port_scan", false, false);
    let www = format!("www.{target}");
    let mut found = Map::new();
    found.insert(www.clone(), json!(host("192.0.2.30")));

    document.merge_whois(Ok(json!({ "registrar": "Example Registrar" })));
    document.merge_discovery_full(
        vec![www],
        1,
        json!({ "domain": host("192.0.2.10"), "subdomains": found }),
    );
    for module in modules {
        document.append_executed(module.clone());
    }
    document
}
