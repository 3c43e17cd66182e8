//! Goal requests handed to the [`ReleaseManager`](super::ReleaseManager).

use crate::descriptor::ReleaseDescriptorBuilder;
use crate::listener::ReleaseListener;
use crate::phase::ReleaseEnvironment;
use crate::workspace::ReleaseProject;
use std::collections::BTreeMap;

/// Inputs shared by every goal
pub struct ReleaseRequest<'a> {
    /// Caller configuration, before persisted state is merged
    pub builder: ReleaseDescriptorBuilder,
    /// User-supplied override properties (`release.<key>`, `tag`, ...)
    pub overrides: BTreeMap<String, String>,
    /// Reactor projects
    pub projects: &'a [ReleaseProject],
    /// Machine settings
    pub environment: ReleaseEnvironment,
    /// Progress observer; a [`LoggingListener`](crate::listener::LoggingListener) is used when unset
    pub listener: Option<&'a mut dyn ReleaseListener>,
}

impl<'a> ReleaseRequest<'a> {
    /// Request with no overrides, default environment and no listener
    pub fn new(builder: ReleaseDescriptorBuilder, projects: &'a [ReleaseProject]) -> Self {
        Self {
            builder,
            overrides: BTreeMap::new(),
            projects,
            environment: ReleaseEnvironment::default(),
            listener: None,
        }
    }

    /// Set the override properties
    pub fn with_overrides(mut self, overrides: BTreeMap<String, String>) -> Self {
        self.overrides = overrides;
        self
    }

    /// Set the machine settings
    pub fn with_environment(mut self, environment: ReleaseEnvironment) -> Self {
        self.environment = environment;
        self
    }

    /// Attach a progress observer
    pub fn with_listener(mut self, listener: &'a mut dyn ReleaseListener) -> Self {
        self.listener = Some(listener);
        self
    }
}

/// Request for the prepare goal
pub struct PrepareRequest<'a> {
    /// Shared inputs
    pub base: ReleaseRequest<'a>,
    /// Simulate every phase instead of executing it
    pub dry_run: bool,
    /// Resume from persisted state; `None` means yes
    pub resume: Option<bool>,
}

impl<'a> PrepareRequest<'a> {
    /// Resuming, non-simulated prepare
    pub fn new(base: ReleaseRequest<'a>) -> Self {
        Self {
            base,
            dry_run: false,
            resume: None,
        }
    }
}

/// Request for the perform goal
pub struct PerformRequest<'a> {
    /// Shared inputs
    pub base: ReleaseRequest<'a>,
    /// Simulate every phase instead of executing it
    pub dry_run: bool,
    /// Clean up after a successful run; `None` means yes
    pub clean: Option<bool>,
    /// Profiles to activate for this run only
    pub profiles: Vec<String>,
}

impl<'a> PerformRequest<'a> {
    /// Cleaning, non-simulated perform
    pub fn new(base: ReleaseRequest<'a>) -> Self {
        Self {
            base,
            dry_run: false,
            clean: None,
            profiles: Vec::new(),
        }
    }
}

/// Request for the branch goal
pub struct BranchRequest<'a> {
    /// Shared inputs
    pub base: ReleaseRequest<'a>,
    /// Simulate every phase instead of executing it
    pub dry_run: bool,
}

impl<'a> BranchRequest<'a> {
    /// Non-simulated branch
    pub fn new(base: ReleaseRequest<'a>) -> Self {
        Self { base, dry_run: false }
    }
}
