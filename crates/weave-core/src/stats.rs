use std::collections::BTreeMap;
use std::sync::Mutex;

/// The last failure kind recorded for a mixin, for host diagnostics. Has no
/// bearing on whether the mixin runs again next time — there is no circuit
/// breaker here, unlike the provider registry this is modeled on: a mixin
/// that failed once is still tried on the next class that matches it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LastFailure {
    MixinError(String),
    Panic(String),
}

#[derive(Debug, Clone, Default)]
pub struct MixinStats {
    pub calls_total: u64,
    pub failures_total: u64,
    pub last_failure: Option<LastFailure>,
}

/// Per-mixin call ledger, keyed by [`crate::mixin::MixinId`]'s display form.
/// Exists for host diagnostics only; correctness of the transform does not
/// depend on it.
#[derive(Default)]
pub struct EngineStats {
    mixins: Mutex<BTreeMap<String, MixinStats>>,
}

impl EngineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, mixin_id: &str) {
        let mut mixins = self.mixins.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let entry = mixins.entry(mixin_id.to_string()).or_default();
        entry.calls_total = entry.calls_total.saturating_add(1);
    }

    pub fn record_failure(&self, mixin_id: &str, failure: LastFailure) {
        let mut mixins = self.mixins.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let entry = mixins.entry(mixin_id.to_string()).or_default();
        entry.calls_total = entry.calls_total.saturating_add(1);
        entry.failures_total = entry.failures_total.saturating_add(1);
        entry.last_failure = Some(failure);
    }

    pub fn snapshot(&self) -> BTreeMap<String, MixinStats> {
        self.mixins.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }
}
