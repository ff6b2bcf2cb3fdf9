use serde::{Deserialize, Serialize};

/// Values written to one destination row: six dimensions and the measure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationTuple {
    pub company: String,
    pub project: String,
    pub cohort: String,
    pub user: String,
    pub stage: String,
    pub version_tag: String,
    pub value: f64,
}

impl DestinationTuple {
    /// The uniqueness key of the tuple, in column order.
    pub fn key(&self) -> [&str; 6] {
        [
            &self.company,
            &self.project,
            &self.cohort,
            &self.user,
            &self.stage,
            &self.version_tag,
        ]
    }
}
