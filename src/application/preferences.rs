// Read-only view of user preferences
use std::collections::HashSet;

pub trait PreferenceStore: Send + Sync {
    /// SLO ids the user chose to display; empty means show nothing
    fn selected_ids(&self) -> HashSet<String>;

    /// Remaining error budget percentage (0-100) at or below which an SLO turns yellow
    fn yellow_threshold(&self) -> f64;

    fn is_configured(&self) -> bool;
}
