use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cuff_core::{
    CardBuilder, CodingConfig, FetchError, LocalStore, ResourceFetcher, SessionId, Workspace,
    WorkspaceSettings,
};
use cuff_core::model::{Card, CdsHook, GoalModel};
use cuff_fhir::Bundle;

/// Resource fetcher backed by a directory of bundle files.
///
/// Each logical request maps to `<data_dir>/<name>.json`; a missing file is
/// a legitimately empty result, a malformed file is a retrieval failure.
/// This stands in for the EHR transport, which is out of scope here.
struct FileFetcher {
    data_dir: PathBuf,
}

impl FileFetcher {
    fn load(&self, name: &str) -> Result<Bundle, FetchError> {
        let path = self.data_dir.join(format!("{name}.json"));
        if !path.is_file() {
            return Ok(Bundle::empty());
        }
        let text = std::fs::read_to_string(&path)
            .map_err(|e| FetchError::Other(format!("failed to read {}: {e}", path.display())))?;
        Bundle::parse(&text)
            .map_err(|e| FetchError::Other(format!("failed to parse {}: {e}", path.display())))
    }
}

impl ResourceFetcher for FileFetcher {
    fn patient(&self) -> Result<Bundle, FetchError> {
        self.load("patient")
    }
    fn encounters(&self) -> Result<Bundle, FetchError> {
        self.load("encounters")
    }
    fn blood_pressure_observations(&self) -> Result<Bundle, FetchError> {
        self.load("blood-pressure-observations")
    }
    fn goals(&self) -> Result<Bundle, FetchError> {
        self.load("goals")
    }
    fn medication_statements(&self) -> Result<Bundle, FetchError> {
        self.load("medication-statements")
    }
    fn medication_requests(&self) -> Result<Bundle, FetchError> {
        self.load("medication-requests")
    }
    fn adverse_events(&self) -> Result<Bundle, FetchError> {
        self.load("adverse-events")
    }
}

/// Card builder backed by the same directory: `hooks.json` lists the hooks,
/// `cards-<hook-id>.json` holds each hook's cards.
struct FileCards {
    data_dir: PathBuf,
}

impl FileCards {
    fn load_json<T: serde::de::DeserializeOwned>(&self, name: &str) -> Result<Option<T>, FetchError> {
        let path = self.data_dir.join(name);
        if !path.is_file() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path)
            .map_err(|e| FetchError::Other(format!("failed to read {}: {e}", path.display())))?;
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| FetchError::Other(format!("failed to parse {}: {e}", path.display())))
    }
}

impl CardBuilder for FileCards {
    fn hooks(&self) -> Result<Vec<CdsHook>, FetchError> {
        Ok(self.load_json("hooks.json")?.unwrap_or_default())
    }

    fn cards(&self, hook_id: &str) -> Result<Vec<Card>, FetchError> {
        Ok(self
            .load_json::<Vec<Card>>(&format!("cards-{hook_id}.json"))?
            .unwrap_or_default())
    }
}

/// Stand-in for the relational store; the demo has no local entities.
struct MemoryStore;

impl LocalStore for MemoryStore {
    fn internal_patient_id(&self, _pat_id_hash: &str) -> Result<i64, FetchError> {
        Ok(1)
    }
    fn local_goals(&self) -> Result<Vec<GoalModel>, FetchError> {
        Ok(Vec::new())
    }
    fn responded_goal_ids(&self) -> Result<Vec<String>, FetchError> {
        Ok(Vec::new())
    }
}

/// Main entry point for the CUFF demonstration runner.
///
/// Builds one session workspace over a directory of bundle files, populates
/// it the way a login would, and reports the derived collections.
///
/// # Environment Variables
/// - `CUFF_DATA_DIR`: directory of bundle JSON files (default: "demo-data")
/// - `CUFF_PATIENT_ID`: upstream patient id (default: "demo-patient")
/// - `CUFF_SALT`: salt for the patient id digest (default: "local-dev-salt")
/// - `CUFF_CODING_CONFIG`: optional YAML file overriding the coding defaults
fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("cuff=info".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let data_dir = PathBuf::from(std::env::var("CUFF_DATA_DIR").unwrap_or_else(|_| "demo-data".into()));
    let patient_id = std::env::var("CUFF_PATIENT_ID").unwrap_or_else(|_| "demo-patient".into());
    let salt = std::env::var("CUFF_SALT").unwrap_or_else(|_| "local-dev-salt".into());

    let config = match std::env::var("CUFF_CODING_CONFIG") {
        Ok(path) => CodingConfig::from_yaml_file(Path::new(&path))?,
        Err(_) => CodingConfig::default(),
    };

    tracing::info!("++ Starting CUFF demo over {}", data_dir.display());

    let workspace = Workspace::new(WorkspaceSettings {
        session: SessionId::new("demo-session")?,
        patient_id,
        salt,
        config,
        fetcher: Arc::new(FileFetcher {
            data_dir: data_dir.clone(),
        }),
        cards: Arc::new(FileCards { data_dir }),
        store: Arc::new(MemoryStore),
        ttl: None,
    })?;

    workspace.populate_all(false)?;

    match workspace.patient() {
        Ok(patient) => tracing::info!(
            patient = %patient.id,
            name = patient.name.as_deref().unwrap_or("<unnamed>"),
            "patient"
        ),
        Err(e) => tracing::warn!("no patient available: {e}"),
    }

    let readings = workspace.blood_pressures()?;
    tracing::info!(count = readings.len(), "blood pressure readings");
    for reading in readings.iter() {
        tracing::info!(
            systolic = %reading.systolic,
            diastolic = %reading.diastolic,
            timestamp = %reading.timestamp,
            encounter = reading.encounter_id.as_deref().unwrap_or("<none>"),
            protocol = ?reading.followed_protocol,
            "reading"
        );
    }

    tracing::info!(count = workspace.goals()?.len(), "goals");
    tracing::info!(count = workspace.medications()?.len(), "medications");
    tracing::info!(count = workspace.adverse_events()?.len(), "adverse events");
    for (hook, cards) in workspace.all_cards()? {
        tracing::info!(hook = %hook.id, cards = cards.len(), "recommendation cards");
    }

    workspace.shutdown();
    Ok(())
}
