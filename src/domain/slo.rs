// SLO record and its report loading state machine
use super::entity::{EntityType, SloEntity};
use super::report::SloReport;
use super::traffic_light::TrafficLightStatus;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoadingState {
    NotLoaded,
    Loading,
    Loaded,
    Failed,
}

impl LoadingState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Loaded | Self::Failed)
    }

    /// Still waiting on a report
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::NotLoaded | Self::Loading)
    }
}

/// Result of a transition into a terminal state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    Failed,
}

impl LoadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Loaded)
    }
}

/// SLO list item as delivered by the transport
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSlo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub entity: Option<SloEntity>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Slo {
    id: String,
    name: String,
    entity: Option<SloEntity>,
    loading_state: LoadingState,
    report: Option<SloReport>,
    status: Option<TrafficLightStatus>,
}

impl Slo {
    pub fn new(id: impl Into<String>, name: impl Into<String>, entity: Option<SloEntity>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            entity,
            loading_state: LoadingState::NotLoaded,
            report: None,
            status: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entity(&self) -> Option<&SloEntity> {
        self.entity.as_ref()
    }

    /// Resolved entity type, `Unknown` when there is no entity
    pub fn entity_type(&self) -> EntityType {
        self.entity
            .as_ref()
            .map(SloEntity::entity_type)
            .unwrap_or(EntityType::Unknown)
    }

    pub fn loading_state(&self) -> LoadingState {
        self.loading_state
    }

    /// Only meaningful once loaded
    pub fn report(&self) -> Option<&SloReport> {
        self.report
            .as_ref()
            .filter(|_| self.loading_state == LoadingState::Loaded)
    }

    /// `None` reads as "unknown": not loaded, failed, or unclassifiable
    pub fn status(&self) -> Option<TrafficLightStatus> {
        self.status
            .filter(|_| self.loading_state == LoadingState::Loaded)
    }

    pub fn status_label(&self) -> &'static str {
        self.status().map(|s| s.as_str()).unwrap_or("UNKNOWN")
    }

    /// Move to `state`. Returns the outcome only when this call actually
    /// entered a terminal state; re-setting the current state is a no-op.
    /// A terminal record only accepts a reset to `NotLoaded`.
    pub fn set_loading_state(&mut self, state: LoadingState) -> Option<LoadOutcome> {
        if self.loading_state == state {
            return None;
        }
        if self.loading_state.is_terminal() && state != LoadingState::NotLoaded {
            return None;
        }
        if state == LoadingState::NotLoaded {
            self.report = None;
            self.status = None;
        }
        self.loading_state = state;

        match state {
            LoadingState::Loaded => Some(LoadOutcome::Loaded),
            LoadingState::Failed => Some(LoadOutcome::Failed),
            LoadingState::NotLoaded | LoadingState::Loading => None,
        }
    }

    /// Claim a `NotLoaded` record for fetching. Returns false when the record
    /// is already loading or finished, so it is fetched at most once per cycle.
    pub fn begin_loading(&mut self) -> bool {
        if self.loading_state != LoadingState::NotLoaded {
            return false;
        }
        self.set_loading_state(LoadingState::Loading);
        true
    }

    pub fn complete_loaded(
        &mut self,
        report: SloReport,
        status: Option<TrafficLightStatus>,
    ) -> Option<LoadOutcome> {
        if self.loading_state.is_terminal() {
            return None;
        }
        self.report = Some(report);
        self.status = status;
        self.set_loading_state(LoadingState::Loaded)
    }

    pub fn complete_failed(&mut self) -> Option<LoadOutcome> {
        if self.loading_state.is_terminal() {
            return None;
        }
        self.report = None;
        self.status = None;
        self.set_loading_state(LoadingState::Failed)
    }
}

impl From<RawSlo> for Slo {
    fn from(raw: RawSlo) -> Self {
        let name = raw.name.unwrap_or_else(|| raw.id.clone());
        Slo::new(raw.id, name, raw.entity)
    }
}
