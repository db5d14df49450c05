//! Sorter Builder
//!
//! Turns a `SorterConfig` into a `Sorter` with concrete adapters: the
//! whitelist skip policy, the admission strategy and the system clock.
//! Any of them can be overridden before `build`.

use crate::adapters::{AdmitAll, RandomDiscard, WhitelistSkipPolicy};
use crate::config::SorterConfig;
use crate::domain::errors::SorterError;
use crate::domain::sorter::Sorter;
use crate::ports::outbound::{CommitAdmission, SkipPolicy, SystemTimeSource, TimeSource};
use std::sync::Arc;
use tracing::warn;

/// Wires a `Sorter` from configuration.
pub struct SorterBuilder {
    config: SorterConfig,
    skip_policy: Option<Arc<dyn SkipPolicy>>,
    admission: Option<Box<dyn CommitAdmission>>,
    time_source: Option<Arc<dyn TimeSource>>,
}

impl SorterBuilder {
    pub fn new(config: SorterConfig) -> Self {
        Self {
            config,
            skip_policy: None,
            admission: None,
            time_source: None,
        }
    }

    /// Replaces the whitelist built from `skip_whitelist`.
    pub fn skip_policy(mut self, skip_policy: Arc<dyn SkipPolicy>) -> Self {
        self.skip_policy = Some(skip_policy);
        self
    }

    /// Replaces the admission strategy chosen by `random_discard_commit`.
    pub fn admission(mut self, admission: Box<dyn CommitAdmission>) -> Self {
        self.admission = Some(admission);
        self
    }

    pub fn time_source(mut self, time_source: Arc<dyn TimeSource>) -> Self {
        self.time_source = Some(time_source);
        self
    }

    pub fn config(&self) -> &SorterConfig {
        &self.config
    }

    /// Validates the config, then builds.
    pub fn try_build(self) -> Result<Sorter, SorterError> {
        self.config.validate()?;
        Ok(self.build())
    }

    /// Builds without validating the config.
    pub fn build(self) -> Sorter {
        let config = self.config;

        let skip_policy = self.skip_policy.unwrap_or_else(|| {
            Arc::new(WhitelistSkipPolicy::new(config.skip_whitelist.iter().cloned()))
        });
        let admission = self.admission.unwrap_or_else(|| admission_for(&config));
        let time_source = self
            .time_source
            .unwrap_or_else(|| Arc::new(SystemTimeSource::new()));

        Sorter::new(config.limits(), skip_policy, admission, time_source)
    }
}

impl Default for SorterBuilder {
    fn default() -> Self {
        Self::new(SorterConfig::default())
    }
}

/// Random commit discard is only wired in when the config asks for it.
fn admission_for(config: &SorterConfig) -> Box<dyn CommitAdmission> {
    if config.random_discard_commit {
        warn!(
            percent = config.discard_commit_percent,
            "Random commit discard enabled, commits will be dropped on purpose"
        );
        Box::new(RandomDiscard::new(config.discard_commit_percent))
    } else {
        Box::new(AdmitAll)
    }
}
