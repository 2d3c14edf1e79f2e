//! JSON file persistence of recon documents.
//!
//! One file per target: `<output_dir>/recon_<key>.json`. Every save writes its
//! own sibling temp file, syncs it and renames it over the previous snapshot.
//! Readers only ever see a complete document; with concurrent writers the last
//! rename wins.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use reconr_common::document::ReconDocument;
use reconr_common::error::StoreError;
use reconr_common::ports::DocumentStore;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, target: &str) -> PathBuf {
        self.dir.join(format!("recon_{}.json", self.key(target)))
    }

    /// Unique per write so concurrent saves never share a temp file.
    fn temp_path_for(&self, target: &str) -> PathBuf {
        static SEQ: AtomicU64 = AtomicU64::new(0);
        self.dir.join(format!(
            "recon_{}.json.{}-{}.tmp",
            self.key(target),
            std::process::id(),
            SEQ.fetch_add(1, Ordering::Relaxed)
        ))
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

impl DocumentStore for JsonFileStore {
    /// Characters outside `[A-Za-z0-9._-]` become `_`, keeping every key inside the directory.
    fn key(&self, target: &str) -> String {
        target
            .chars()
            .map(|c| match c {
                'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => c,
                _ => '_',
            })
            .collect()
    }

    fn save(&self, document: &ReconDocument) -> Result<(), StoreError> {
        let path = self.path_for(document.target());
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| StoreError::Io { path, source }
        };

        fs::create_dir_all(&self.dir).map_err(io_err(&self.dir))?;

        let raw = document.serialize().map_err(|source| StoreError::Json {
            path: path.clone(),
            source,
        })?;

        let tmp = self.temp_path_for(document.target());
        let written = write_synced(&tmp, raw.as_bytes())
            .map_err(io_err(&tmp))
            .and_then(|()| fs::rename(&tmp, &path).map_err(io_err(&path)));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }

        debug!("saved {}", path.display());
        Ok(())
    }

    fn load(&self, target: &str) -> Result<Option<ReconDocument>, StoreError> {
        let path = self.path_for(target);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        ReconDocument::deserialize(&raw)
            .map(Some)
            .map_err(|source| StoreError::Json { path, source })
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
