use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use co2_journey::data::error::SelectionError;
use co2_journey::data::loader::TableCache;
use co2_journey::data::model::{Field, FieldValue};
use co2_journey::data::resolve::ResolvedRecord;
use co2_journey::estimate::{EstimationResult, TripDistance};
use co2_journey::profile::DatasetProfile;
use co2_journey::session::{SelectionPhase, Session};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Loaded tables, shared between profile switches.
    pub cache: TableCache,

    /// File the current session reads from.
    pub source: Option<PathBuf>,

    /// Selectable dataset profiles (presets plus an optional custom one).
    pub profiles: Vec<DatasetProfile>,

    /// Index into `profiles`.
    pub profile_index: usize,

    /// Selection state over the loaded table (None until a file is loaded).
    pub session: Option<Session>,

    /// Trip distance as typed by the user; clamped before use.
    pub distance_km: f64,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(DatasetProfile::presets())
    }
}

impl AppState {
    pub fn new(profiles: Vec<DatasetProfile>) -> Self {
        let profiles = if profiles.is_empty() {
            DatasetProfile::presets()
        } else {
            profiles
        };
        let distance_km = profiles[0].default_distance_km;
        Self {
            cache: TableCache::new(),
            source: None,
            profiles,
            profile_index: 0,
            session: None,
            distance_km,
            status_message: None,
        }
    }

    pub fn profile(&self) -> &DatasetProfile {
        &self.profiles[self.profile_index]
    }

    /// Load (or reuse) the table at `path` under the active profile and start
    /// a fresh session on it.
    pub fn open(&mut self, path: &Path) -> Result<()> {
        let session = self.load_session(path, self.profile().clone())?;
        self.session = Some(session);
        self.source = Some(path.to_path_buf());
        self.status_message = None;
        Ok(())
    }

    fn load_session(&self, path: &Path, profile: DatasetProfile) -> Result<Session> {
        let options = profile.load_options()?;
        let table = self
            .cache
            .get_or_load(path, &options)
            .with_context(|| format!("loading {}", path.display()))?;
        if table.is_empty() {
            log::warn!("{} has no usable vehicle rows", path.display());
        }
        Ok(Session::new(table, profile))
    }

    /// Switch profile and reload the current source with its options.
    /// On failure the previous profile and session stay active.
    pub fn set_profile(&mut self, index: usize) {
        if index == self.profile_index || index >= self.profiles.len() {
            return;
        }
        let profile = self.profiles[index].clone();
        if let Some(path) = self.source.clone() {
            match self.load_session(&path, profile.clone()) {
                Ok(session) => {
                    self.session = Some(session);
                    self.status_message = None;
                }
                Err(e) => {
                    self.show_error(&e.context(format!("switching to '{}'", profile.name)));
                    return;
                }
            }
        }
        self.profile_index = index;
        self.distance_km = profile.default_distance_km;
    }

    /// Run a fallible action, logging and surfacing any error.
    pub fn report(&mut self, action: impl FnOnce(&mut Self) -> Result<()>) {
        if let Err(e) = action(self) {
            self.show_error(&e);
        }
    }

    fn show_error(&mut self, e: &anyhow::Error) {
        log::error!("{e:#}");
        self.status_message = Some(format!("Error: {e:#}"));
    }

    pub fn select(&mut self, field: Field, value: FieldValue) {
        self.report(|state| {
            if let Some(session) = state.session.as_mut() {
                session.select(field, value)?;
            }
            Ok(())
        });
    }

    pub fn reset_selection(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.reset();
        }
    }

    pub fn distance(&self) -> TripDistance {
        TripDistance::clamped(self.distance_km)
    }

    pub fn phase(&self) -> Option<SelectionPhase> {
        let session = self.session.as_ref()?;
        Some(session.phase(Some(self.distance())))
    }

    /// Resolved record and trip figures, once the selection is complete.
    pub fn outcome(&self) -> Option<Result<(ResolvedRecord, EstimationResult), SelectionError>> {
        let session = self.session.as_ref()?;
        if !session.view().is_complete() {
            return None;
        }
        Some(session.estimate(self.distance()))
    }
}
