// Filter engine - Derives the visible SLO list from records and filters
use crate::application::orchestrator::{LoadCompletion, SloHandle};
use crate::domain::entity::EntityType;
use crate::domain::slo::{LoadingState, Slo};
use crate::domain::traffic_light::TrafficLightStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    pub status_filter: Option<TrafficLightStatus>,
    pub entity_type_filter: Option<String>,
    /// Empty selection shows nothing, it is not "show all"
    pub selected_ids: HashSet<String>,
}

/// Point-in-time copy of the visible records
#[derive(Debug, Clone, Serialize)]
pub struct VisibleSnapshot {
    pub epoch: u64,
    pub slos: Vec<Slo>,
    /// Whether any *visible* record is still waiting on its report
    pub is_loading: bool,
    pub computed_at: DateTime<Utc>,
}

impl VisibleSnapshot {
    pub fn empty(epoch: u64) -> Self {
        Self {
            epoch,
            slos: Vec::new(),
            is_loading: false,
            computed_at: Utc::now(),
        }
    }
}

/// The filter pipeline, applied in fixed order: selection, status, entity type.
/// Returns the visible records and the post-filter loading flag.
pub fn apply_filters(records: &[Slo], filters: &FilterState) -> (Vec<Slo>, bool) {
    if filters.selected_ids.is_empty() {
        return (Vec::new(), false);
    }

    let entity_filter = filters
        .entity_type_filter
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty());

    let visible: Vec<Slo> = records
        .iter()
        .filter(|slo| filters.selected_ids.contains(slo.id()))
        .filter(|slo| match filters.status_filter {
            Some(status) => slo.status() == Some(status),
            None => true,
        })
        .filter(|slo| match entity_filter {
            Some(wanted) => matches_entity_type(slo, wanted),
            None => true,
        })
        .cloned()
        .collect();

    let is_loading = visible.iter().any(|slo| slo.loading_state().is_pending());
    (visible, is_loading)
}

fn matches_entity_type(slo: &Slo, wanted: &str) -> bool {
    match slo.entity_type() {
        EntityType::Unknown => false,
        resolved => resolved.as_str().eq_ignore_ascii_case(wanted),
    }
}

pub struct FilterEngine {
    records: Vec<SloHandle>,
    epoch: u64,
    filters: FilterState,
    snapshot_tx: watch::Sender<Arc<VisibleSnapshot>>,
}

impl FilterEngine {
    pub fn new(selected_ids: HashSet<String>) -> Self {
        let (snapshot_tx, _) = watch::channel(Arc::new(VisibleSnapshot::empty(0)));
        Self {
            records: Vec::new(),
            epoch: 0,
            filters: FilterState {
                selected_ids,
                ..FilterState::default()
            },
            snapshot_tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<VisibleSnapshot>> {
        self.snapshot_tx.subscribe()
    }

    /// Most recently emitted snapshot
    pub fn snapshot(&self) -> Arc<VisibleSnapshot> {
        self.snapshot_tx.borrow().clone()
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn replace_records(&mut self, records: Vec<SloHandle>, epoch: u64) -> Arc<VisibleSnapshot> {
        self.records = records;
        self.epoch = epoch;
        self.recompute()
    }

    pub fn set_status_filter(&mut self, status: Option<TrafficLightStatus>) -> Arc<VisibleSnapshot> {
        self.filters.status_filter = status;
        self.recompute()
    }

    pub fn set_entity_type_filter(&mut self, entity_type: Option<String>) -> Arc<VisibleSnapshot> {
        self.filters.entity_type_filter = entity_type
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        self.recompute()
    }

    pub fn set_selected_ids(&mut self, selected_ids: HashSet<String>) -> Arc<VisibleSnapshot> {
        self.filters.selected_ids = selected_ids;
        self.recompute()
    }

    /// Reset status and entity type filters; the selection is kept
    pub fn clear_filters(&mut self) -> Arc<VisibleSnapshot> {
        self.filters.status_filter = None;
        self.filters.entity_type_filter = None;
        self.recompute()
    }

    /// Re-derive after a record finished loading. Completions from a
    /// superseded fetch cycle are dropped.
    pub fn on_record_changed(&mut self, completion: &LoadCompletion) -> Option<Arc<VisibleSnapshot>> {
        if completion.epoch != self.epoch {
            tracing::debug!(
                slo_id = completion.slo.id(),
                completion_epoch = completion.epoch,
                current_epoch = self.epoch,
                "Ignoring completion from superseded cycle"
            );
            return None;
        }
        Some(self.recompute())
    }

    /// Read every record once, filter, and publish a fresh snapshot
    pub fn recompute(&self) -> Arc<VisibleSnapshot> {
        let records = self.all_records();
        let (slos, is_loading) = apply_filters(&records, &self.filters);

        let snapshot = Arc::new(VisibleSnapshot {
            epoch: self.epoch,
            slos,
            is_loading,
            computed_at: Utc::now(),
        });
        self.snapshot_tx.send_replace(snapshot.clone());
        snapshot
    }

    /// Copies of every record in the current cycle, unfiltered
    pub fn all_records(&self) -> Vec<Slo> {
        self.records.iter().map(|handle| handle.read().clone()).collect()
    }

    /// Selected records whose report has not been requested yet
    pub fn pending_selected(&self) -> Vec<SloHandle> {
        self.records
            .iter()
            .filter(|handle| {
                let slo = handle.read();
                slo.loading_state() == LoadingState::NotLoaded
                    && self.filters.selected_ids.contains(slo.id())
            })
            .cloned()
            .collect()
    }

    pub fn count_by_status(&self, status: TrafficLightStatus) -> usize {
        self.records
            .iter()
            .filter(|handle| handle.read().status() == Some(status))
            .count()
    }

    pub fn count_by_entity_type(&self, entity_type: &str) -> usize {
        self.records
            .iter()
            .filter(|handle| matches_entity_type(&handle.read(), entity_type.trim()))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::orchestrator::into_handles;
    use crate::domain::entity::SloEntity;
    use crate::domain::report::SloReport;

    fn selected(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    fn loaded(id: &str, entity: Option<SloEntity>, status: TrafficLightStatus) -> Slo {
        let mut slo = Slo::new(id, id, entity);
        slo.begin_loading();
        slo.complete_loaded(SloReport::default(), Some(status));
        slo
    }

    fn fixture() -> Vec<Slo> {
        vec![
            loaded("a", Some(SloEntity::with_type("application")), TrafficLightStatus::Red),
            loaded("b", Some(SloEntity::with_type("Website")), TrafficLightStatus::Green),
            loaded("c", None, TrafficLightStatus::Green),
            Slo::new("d", "d", Some(SloEntity::with_type("website"))),
        ]
    }

    fn ids(slos: &[Slo]) -> Vec<&str> {
        slos.iter().map(Slo::id).collect()
    }

    #[test]
    fn test_empty_selection_shows_nothing() {
        let (visible, is_loading) = apply_filters(&fixture(), &FilterState::default());
        assert!(visible.is_empty());
        assert!(!is_loading);
    }

    #[test]
    fn test_selection_restricts() {
        let filters = FilterState {
            selected_ids: selected(&["a", "c", "zzz"]),
            ..FilterState::default()
        };
        let (visible, is_loading) = apply_filters(&fixture(), &filters);
        assert_eq!(ids(&visible), vec!["a", "c"]);
        assert!(!is_loading);
    }

    #[test]
    fn test_status_filter_drops_unknown() {
        let filters = FilterState {
            status_filter: Some(TrafficLightStatus::Green),
            selected_ids: selected(&["a", "b", "c", "d"]),
            ..FilterState::default()
        };
        let (visible, _) = apply_filters(&fixture(), &filters);
        assert_eq!(ids(&visible), vec!["b", "c"]);
    }

    #[test]
    fn test_entity_filter_is_case_insensitive() {
        let filters = FilterState {
            entity_type_filter: Some("WEBSITE".to_string()),
            selected_ids: selected(&["a", "b", "c", "d"]),
            ..FilterState::default()
        };
        let (visible, is_loading) = apply_filters(&fixture(), &filters);
        assert_eq!(ids(&visible), vec!["b", "d"]);
        // "d" has not loaded yet
        assert!(is_loading);
    }

    #[test]
    fn test_unknown_entity_never_matches() {
        let records = vec![Slo::new("x", "x", Some(SloEntity::with_type("kubernetes")))];
        let filters = FilterState {
            entity_type_filter: Some("unknown".to_string()),
            selected_ids: selected(&["x"]),
            ..FilterState::default()
        };
        assert!(apply_filters(&records, &filters).0.is_empty());
    }

    #[test]
    fn test_loading_flag_ignores_filtered_out_records() {
        let filters = FilterState {
            status_filter: Some(TrafficLightStatus::Red),
            selected_ids: selected(&["a", "d"]),
            ..FilterState::default()
        };
        let (visible, is_loading) = apply_filters(&fixture(), &filters);
        assert_eq!(ids(&visible), vec!["a"]);
        assert!(!is_loading);
    }

    #[test]
    fn test_engine_emits_snapshot_per_change() {
        let mut engine = FilterEngine::new(selected(&["a", "b"]));
        let rx = engine.subscribe();

        engine.replace_records(into_handles(fixture()), 1);
        assert_eq!(ids(&rx.borrow().slos), vec!["a", "b"]);
        assert_eq!(rx.borrow().epoch, 1);

        engine.set_status_filter(Some(TrafficLightStatus::Red));
        assert_eq!(ids(&engine.snapshot().slos), vec!["a"]);

        engine.set_entity_type_filter(Some("website".to_string()));
        assert!(engine.snapshot().slos.is_empty());

        engine.clear_filters();
        assert_eq!(engine.snapshot().slos.len(), 2);
        assert_eq!(engine.filters().selected_ids.len(), 2);

        engine.set_selected_ids(HashSet::new());
        assert!(engine.snapshot().slos.is_empty());
    }

    #[test]
    fn test_blank_entity_filter_is_cleared() {
        let mut engine = FilterEngine::new(selected(&["a"]));
        engine.set_entity_type_filter(Some("  ".to_string()));
        assert_eq!(engine.filters().entity_type_filter, None);
    }

    #[test]
    fn test_failed_record_stays_visible_as_unknown() {
        let handles = into_handles(vec![Slo::new("a", "a", None)]);
        let mut engine = FilterEngine::new(selected(&["a"]));
        engine.replace_records(handles.clone(), 3);

        handles[0].write().begin_loading();
        let snapshot = engine.recompute();
        assert_eq!(snapshot.slos.len(), 1);
        assert!(snapshot.is_loading);

        let outcome = handles[0].write().complete_failed();
        assert!(outcome.is_some());
        let completion = LoadCompletion {
            epoch: 3,
            slo: handles[0].read().clone(),
            success: false,
        };
        let snapshot = engine.on_record_changed(&completion).unwrap();
        assert_eq!(snapshot.slos.len(), 1);
        assert_eq!(snapshot.slos[0].loading_state(), LoadingState::Failed);
        assert_eq!(snapshot.slos[0].status_label(), "UNKNOWN");
        assert!(!snapshot.is_loading);
    }

    #[test]
    fn test_stale_completion_ignored() {
        let mut engine = FilterEngine::new(selected(&["a"]));
        engine.replace_records(into_handles(vec![Slo::new("a", "a", None)]), 2);

        let stale = LoadCompletion {
            epoch: 1,
            slo: Slo::new("a", "a", None),
            success: true,
        };
        assert!(engine.on_record_changed(&stale).is_none());
    }

    #[test]
    fn test_snapshot_does_not_alias_records() {
        let handles = into_handles(vec![Slo::new("a", "a", None)]);
        let mut engine = FilterEngine::new(selected(&["a"]));
        let before = engine.replace_records(handles.clone(), 1);

        handles[0].write().begin_loading();
        assert_eq!(before.slos[0].loading_state(), LoadingState::NotLoaded);
    }

    #[test]
    fn test_pending_selected() {
        let mut engine = FilterEngine::new(selected(&["a", "d"]));
        engine.replace_records(into_handles(fixture()), 1);

        let pending = engine.pending_selected();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].read().id(), "d");
    }

    #[test]
    fn test_counts_ignore_filters() {
        let mut engine = FilterEngine::new(HashSet::new());
        engine.replace_records(into_handles(fixture()), 1);

        assert_eq!(engine.count_by_status(TrafficLightStatus::Green), 2);
        assert_eq!(engine.count_by_status(TrafficLightStatus::Yellow), 0);
        assert_eq!(engine.count_by_entity_type("website"), 2);
        assert_eq!(engine.count_by_entity_type("Application"), 1);
        assert!(engine.snapshot().slos.is_empty());
    }
}
