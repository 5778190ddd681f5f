//! Dataset search filter.

use crate::dataset::Dataset;
use crate::lifecycle::StateType;

/// Criteria for `searchDatasets`. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetFilter {
    /// Case-insensitive substring of the EPN
    pub epn: Option<String>,
    /// Case-insensitive exact beamline name
    pub beamline: Option<String>,
    /// Case-insensitive substring of the PI's first or last names
    pub pi_name: Option<String>,
    pub pi_email: Option<String>,
    /// Case-insensitive substring of the organisation's short or long name
    pub pi_org: Option<String>,
    /// Exact current lifecycle state
    pub status: Option<StateType>,
    /// Case-insensitive substring of the experiment type's short or long name
    pub visit_type: Option<String>,
    pub excluded: Option<bool>,
}

impl DatasetFilter {
    pub fn matches(&self, dataset: &Dataset) -> bool {
        let visit = dataset.visit();
        let pi = &visit.pi;

        check(&self.epn, |needle| contains(dataset.epn(), needle))
            && check(&self.beamline, |b| visit.beamline.eq_ignore_ascii_case(b))
            && check(&self.pi_name, |needle| {
                contains(&pi.first_names, needle) || contains(&pi.last_name, needle)
            })
            && check(&self.pi_email, |needle| contains(&pi.email, needle))
            && check(&self.pi_org, |needle| {
                contains(&pi.org.name_short, needle) || contains(&pi.org.name_long, needle)
            })
            && check(&self.visit_type, |needle| {
                contains(&visit.visit_type.name_short, needle)
                    || contains(&visit.visit_type.name_long, needle)
            })
            && self
                .status
                .map_or(true, |s| dataset.current_state().state == s)
            && self.excluded.map_or(true, |e| dataset.is_excluded() == e)
    }
}

fn check(criterion: &Option<String>, pred: impl FnOnce(&str) -> bool) -> bool {
    criterion.as_deref().map_or(true, pred)
}

fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
