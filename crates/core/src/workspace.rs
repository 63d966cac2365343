//! Per-session workspace.
//!
//! A `Workspace` is constructed at login, owned by exactly one session, and
//! torn down at logout; cache and worker pool live and die with it. There is
//! no process-wide registry; whoever needs the workspace is handed a
//! reference. It owns every caching and orchestration concern, and delegates
//! all data construction to the collaborator traits in [`crate::fetch`].

use crate::builders;
use crate::cache::{CardCache, TtlSlot, DEFAULT_TTL};
use crate::config::CodingConfig;
use crate::fetch::{CardBuilder, LocalStore, ResourceFetcher};
use crate::model::{
    AdverseEventModel, BloodPressureReading, Card, CdsHook, GoalModel, MedicationModel,
    PatientModel, SUGGESTION_KIND_GOAL,
};
use crate::transform::{correlate_blood_pressures, EncounterIndex};
use crate::worker::{TaskHandle, WorkerPool};
use crate::{CoreError, CoreResult};
use cuff_fhir::{Encounter, Reference};
use cuff_types::{NonEmptyText, SessionId};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

/// The opaque key the local store uses for this patient: lowercase hex
/// SHA-256 of the upstream patient id concatenated with a deployment salt.
/// The raw id never reaches the local store.
pub fn pat_id_hash(patient_id: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(patient_id.as_bytes());
    hasher.update(salt.as_bytes());
    hex::encode(hasher.finalize())
}

/// The derived collections a workspace caches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CollectionKey {
    Patient,
    Encounters,
    BloodPressures,
    Goals,
    AdverseEvents,
    Medications,
}

/// Everything a workspace needs at construction time.
pub struct WorkspaceSettings {
    pub session: SessionId,
    /// Upstream logical patient id, as issued by the EHR.
    pub patient_id: String,
    /// Deployment-wide salt for the patient id digest.
    pub salt: String,
    pub config: CodingConfig,
    pub fetcher: Arc<dyn ResourceFetcher>,
    pub cards: Arc<dyn CardBuilder>,
    pub store: Arc<dyn LocalStore>,
    /// Cache entry lifetime; defaults to one day.
    pub ttl: Option<Duration>,
}

struct Inner {
    session: SessionId,
    config: CodingConfig,
    fetcher: Arc<dyn ResourceFetcher>,
    cards: Arc<dyn CardBuilder>,
    store: Arc<dyn LocalStore>,
    internal_patient_id: i64,
    patient: TtlSlot<PatientModel>,
    encounters: TtlSlot<EncounterIndex>,
    blood_pressures: TtlSlot<Vec<BloodPressureReading>>,
    goals: TtlSlot<Vec<GoalModel>>,
    adverse_events: TtlSlot<Vec<AdverseEventModel>>,
    medications: TtlSlot<Vec<MedicationModel>>,
    card_cache: CardCache,
}

/// One session's cache of derived collections plus its background workers.
pub struct Workspace {
    inner: Arc<Inner>,
    pool: WorkerPool,
}

impl Workspace {
    /// Validate the wiring and construct the workspace.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Configuration`] when the coding configuration or
    /// identity inputs are invalid, and a retrieval error when the local
    /// store cannot resolve the internal patient id. Either is fatal to
    /// session initialisation.
    pub fn new(settings: WorkspaceSettings) -> CoreResult<Self> {
        settings.config.validate()?;
        let patient_id = NonEmptyText::new(&settings.patient_id)
            .map_err(|_| CoreError::Configuration("patient id must not be empty".to_string()))?;
        let salt = NonEmptyText::new(&settings.salt)
            .map_err(|_| CoreError::Configuration("salt must not be empty".to_string()))?;

        let digest = pat_id_hash(patient_id.as_str(), salt.as_str());
        let internal_patient_id = settings
            .store
            .internal_patient_id(&digest)
            .map_err(|source| CoreError::retrieval("internal patient id", source))?;

        let ttl = settings.ttl.unwrap_or(DEFAULT_TTL);
        let session = settings.session;
        let pool = WorkerPool::new(format!("cuff-{session}"))?;

        tracing::info!(%session, internal_patient_id, "workspace initialised");

        Ok(Self {
            inner: Arc::new(Inner {
                session,
                config: settings.config,
                fetcher: settings.fetcher,
                cards: settings.cards,
                store: settings.store,
                internal_patient_id,
                patient: TtlSlot::new("patient", ttl),
                encounters: TtlSlot::new("encounters", ttl),
                blood_pressures: TtlSlot::new("blood-pressures", ttl),
                goals: TtlSlot::new("goals", ttl),
                adverse_events: TtlSlot::new("adverse-events", ttl),
                medications: TtlSlot::new("medications", ttl),
                card_cache: CardCache::new(ttl),
            }),
            pool,
        })
    }

    pub fn session(&self) -> &SessionId {
        &self.inner.session
    }

    pub fn config(&self) -> &CodingConfig {
        &self.inner.config
    }

    /// The local store's id for this patient, resolved at construction.
    pub fn internal_patient_id(&self) -> i64 {
        self.inner.internal_patient_id
    }

    // ------------------------------------------------------------------
    // Derived collection accessors (synchronous; cold entries compute on
    // the caller's thread)
    // ------------------------------------------------------------------

    pub fn patient(&self) -> CoreResult<Arc<PatientModel>> {
        self.inner.patient()
    }

    /// The encounter lookup index; shared by blood-pressure correlation.
    pub fn encounter_index(&self) -> CoreResult<Arc<EncounterIndex>> {
        self.inner.encounter_index()
    }

    /// The session's known visits, in upstream order.
    pub fn encounters(&self) -> CoreResult<Vec<Encounter>> {
        Ok(self.inner.encounter_index()?.iter().cloned().collect())
    }

    /// Resolve a reference against the cached visits. An unmatched reference
    /// is `Ok(None)`, not an error.
    pub fn encounter(&self, reference: &Reference) -> CoreResult<Option<Encounter>> {
        Ok(self.inner.encounter_index()?.resolve(reference).cloned())
    }

    pub fn blood_pressures(&self) -> CoreResult<Arc<Vec<BloodPressureReading>>> {
        self.inner.blood_pressures()
    }

    pub fn goals(&self) -> CoreResult<Arc<Vec<GoalModel>>> {
        self.inner.goals()
    }

    pub fn adverse_events(&self) -> CoreResult<Arc<Vec<AdverseEventModel>>> {
        self.inner.adverse_events()
    }

    pub fn medications(&self) -> CoreResult<Arc<Vec<MedicationModel>>> {
        self.inner.medications()
    }

    /// Medications matching the configured antihypertensive concept set.
    pub fn antihypertensive_medications(&self) -> CoreResult<Vec<MedicationModel>> {
        let medications = self.inner.medications()?;
        Ok(medications
            .iter()
            .filter(|m| m.matches_any(&self.inner.config.antihypertensive))
            .cloned()
            .collect())
    }

    /// The complement of [`Workspace::antihypertensive_medications`].
    pub fn other_medications(&self) -> CoreResult<Vec<MedicationModel>> {
        let medications = self.inner.medications()?;
        Ok(medications
            .iter()
            .filter(|m| !m.matches_any(&self.inner.config.antihypertensive))
            .cloned()
            .collect())
    }

    /// The cards for one recommendation hook.
    pub fn cards(&self, hook_id: &str) -> CoreResult<Arc<Vec<Card>>> {
        self.inner.hook_cards(hook_id)
    }

    /// Every hook's cards, in hook-discovery order.
    pub fn all_cards(&self) -> CoreResult<Vec<(CdsHook, Arc<Vec<Card>>)>> {
        self.inner.all_cards()
    }

    // ------------------------------------------------------------------
    // Population and invalidation
    // ------------------------------------------------------------------

    /// Compute every derived collection.
    ///
    /// With `background` set the caller is not blocked: the work is queued on
    /// the session's pool and the returned handle reports completion (tests
    /// wait on it; production callers drop it). Individual collection
    /// failures are logged and do not stop the rest of the batch.
    pub fn populate_all(&self, background: bool) -> CoreResult<Option<TaskHandle>> {
        if background {
            let inner = Arc::clone(&self.inner);
            let handle = self.pool.submit("populate", move || inner.populate())?;
            Ok(Some(handle))
        } else {
            self.inner.populate()?;
            Ok(None)
        }
    }

    /// Drop all cached cards and recompute every hook in the background.
    pub fn refresh_recommendations(&self) -> CoreResult<TaskHandle> {
        let inner = Arc::clone(&self.inner);
        self.pool.submit("refresh-recommendations", move || {
            inner.card_cache.invalidate_all();
            inner.all_cards().map(drop)
        })
    }

    /// Clear exactly one derived collection; everything else is untouched.
    pub fn invalidate(&self, key: CollectionKey) {
        match key {
            CollectionKey::Patient => self.inner.patient.invalidate(),
            CollectionKey::Encounters => self.inner.encounters.invalidate(),
            CollectionKey::BloodPressures => self.inner.blood_pressures.invalidate(),
            CollectionKey::Goals => self.inner.goals.invalidate(),
            CollectionKey::AdverseEvents => self.inner.adverse_events.invalidate(),
            CollectionKey::Medications => self.inner.medications.invalidate(),
        }
    }

    /// Clear one hook's cached cards.
    pub fn invalidate_cards(&self, hook_id: &str) {
        self.inner.card_cache.invalidate(hook_id);
    }

    /// Clear everything: all derived collections and all cached cards.
    pub fn invalidate_all(&self) {
        self.inner.patient.invalidate();
        self.inner.encounters.invalidate();
        self.inner.blood_pressures.invalidate();
        self.inner.goals.invalidate();
        self.inner.adverse_events.invalidate();
        self.inner.medications.invalidate();
        self.inner.card_cache.invalidate_all();
    }

    /// Remove, from every cached card collection, any suggestion whose id is
    /// exactly `id`. Affected entries are swapped whole, so concurrent
    /// readers never observe a partially filtered list. Returns whether
    /// anything was removed.
    pub fn remove_suggestion_by_id(&self, id: &str) -> bool {
        let removed = self.inner.card_cache.remove_suggestion(id);
        if removed {
            tracing::debug!(session = %self.inner.session, suggestion = id, "suggestion removed from card cache");
        }
        removed
    }

    /// Tear the session down: caches are cleared and background work is
    /// abandoned (queued tasks are skipped, an in-flight task finishes into
    /// the released cache and is discarded with it).
    pub fn shutdown(self) {
        tracing::info!(session = %self.inner.session, "workspace shutting down");
        self.invalidate_all();
        // Dropping self closes the pool's queue and detaches its workers.
    }
}

impl Inner {
    fn patient(&self) -> CoreResult<Arc<PatientModel>> {
        self.patient.get_or_populate(|| {
            let bundle = self
                .fetcher
                .patient()
                .map_err(|source| CoreError::retrieval("patient", source))?;
            builders::build_patient(&bundle)
        })
    }

    fn encounter_index(&self) -> CoreResult<Arc<EncounterIndex>> {
        self.encounters.get_or_populate(|| {
            let bundle = self
                .fetcher
                .encounters()
                .map_err(|source| CoreError::retrieval("encounters", source))?;
            Ok(EncounterIndex::from_encounters(bundle.encounters()))
        })
    }

    fn blood_pressures(&self) -> CoreResult<Arc<Vec<BloodPressureReading>>> {
        self.blood_pressures.get_or_populate(|| {
            // The index populates first (its own slot, its own lock); a new
            // bundle may still introduce visits the index has never seen.
            let index = self.encounter_index()?;
            let bundle = self
                .fetcher
                .blood_pressure_observations()
                .map_err(|source| CoreError::retrieval("blood pressure observations", source))?;
            Ok(correlate_blood_pressures(&bundle, &index, &self.config))
        })
    }

    fn goals(&self) -> CoreResult<Arc<Vec<GoalModel>>> {
        self.goals.get_or_populate(|| {
            let bundle = self
                .fetcher
                .goals()
                .map_err(|source| CoreError::retrieval("goals", source))?;
            let local = self
                .store
                .local_goals()
                .map_err(|source| CoreError::retrieval("local goals", source))?;
            Ok(builders::build_goals(&bundle, local, &self.config))
        })
    }

    fn adverse_events(&self) -> CoreResult<Arc<Vec<AdverseEventModel>>> {
        self.adverse_events.get_or_populate(|| {
            let bundle = self
                .fetcher
                .adverse_events()
                .map_err(|source| CoreError::retrieval("adverse events", source))?;
            Ok(builders::build_adverse_events(&bundle))
        })
    }

    fn medications(&self) -> CoreResult<Arc<Vec<MedicationModel>>> {
        self.medications.get_or_populate(|| {
            let statements = self
                .fetcher
                .medication_statements()
                .map_err(|source| CoreError::retrieval("medication statements", source))?;
            let requests = self
                .fetcher
                .medication_requests()
                .map_err(|source| CoreError::retrieval("medication requests", source))?;
            Ok(builders::build_medications(&statements, &requests))
        })
    }

    fn hook_cards(&self, hook_id: &str) -> CoreResult<Arc<Vec<Card>>> {
        self.card_cache.get_or_populate(hook_id, || {
            let cards = self
                .cards
                .cards(hook_id)
                .map_err(|source| CoreError::retrieval("recommendation cards", source))?;
            let responded = self
                .store
                .responded_goal_ids()
                .map_err(|source| CoreError::retrieval("responded goal ids", source))?;
            Ok(drop_responded_goal_suggestions(cards, &responded))
        })
    }

    fn all_cards(&self) -> CoreResult<Vec<(CdsHook, Arc<Vec<Card>>)>> {
        let hooks = self
            .cards
            .hooks()
            .map_err(|source| CoreError::retrieval("recommendation hooks", source))?;
        let mut all = Vec::with_capacity(hooks.len());
        for hook in hooks {
            let cards = self.hook_cards(&hook.id)?;
            all.push((hook, cards));
        }
        Ok(all)
    }

    /// Compute every collection once. A collection that fails is logged and
    /// skipped and the rest of the batch continues; its cache entry stays
    /// empty and the next access retries.
    fn populate(&self) -> CoreResult<()> {
        tracing::info!(session = %self.session, "begin populating workspace");
        let outcomes: [(&str, CoreResult<()>); 7] = [
            ("patient", self.patient().map(drop)),
            ("goals", self.goals().map(drop)),
            ("encounters", self.encounter_index().map(drop)),
            ("blood pressures", self.blood_pressures().map(drop)),
            ("adverse events", self.adverse_events().map(drop)),
            ("medications", self.medications().map(drop)),
            ("cards", self.all_cards().map(drop)),
        ];
        let mut failed = 0usize;
        for (collection, outcome) in outcomes {
            if let Err(err) = outcome {
                failed += 1;
                tracing::warn!(session = %self.session, collection, %err, "population failed for collection");
            }
        }
        tracing::info!(session = %self.session, failed, "done populating workspace");
        Ok(())
    }
}

/// Drop goal suggestions the user has already responded to. Other suggestion
/// kinds (and goal suggestions without ids) pass through untouched.
fn drop_responded_goal_suggestions(cards: Vec<Card>, responded: &[String]) -> Vec<Card> {
    if responded.is_empty() {
        return cards;
    }
    cards
        .into_iter()
        .map(|mut card| {
            card.suggestions.retain(|suggestion| {
                let is_goal = suggestion.kind.as_deref() == Some(SUGGESTION_KIND_GOAL);
                let already_responded = suggestion
                    .id
                    .as_ref()
                    .is_some_and(|id| responded.contains(id));
                !(is_goal && already_responded)
            });
            card
        })
        .collect()
}
