use std::sync::Arc;

use tracing::debug;

use crate::endpoint::Endpoint;
use crate::inbox::Inbox;

/// Options for [`pair_with_config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairConfig {
    /// Diagnostic labels for the first and second endpoint.
    pub labels: (String, String),
}

impl Default for PairConfig {
    fn default() -> Self {
        Self {
            labels: ("a".to_string(), "b".to_string()),
        }
    }
}

impl PairConfig {
    /// Set the diagnostic labels used in log events.
    pub fn with_labels(mut self, first: impl Into<String>, second: impl Into<String>) -> Self {
        self.labels = (first.into(), second.into());
        self
    }
}

/// Create two linked endpoints with default labels.
pub fn pair() -> (Endpoint, Endpoint) {
    pair_with_config(&PairConfig::default())
}

/// Create two linked endpoints.
///
/// Each endpoint's counterpart is fixed here and never changes. The caller
/// owns both handles; neither endpoint keeps the other alive.
pub fn pair_with_config(config: &PairConfig) -> (Endpoint, Endpoint) {
    let first_inbox = Arc::new(Inbox::new());
    let second_inbox = Arc::new(Inbox::new());

    let (first_label, second_label) = config.labels.clone();
    debug!(first = %first_label, second = %second_label, "created duplex pair");

    let first = Endpoint::new(
        first_label,
        Arc::clone(&first_inbox),
        Arc::clone(&second_inbox),
    );
    let second = Endpoint::new(second_label, second_inbox, first_inbox);
    (first, second)
}
