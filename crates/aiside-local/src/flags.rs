use aiside_core::{CourseKey, FeatureFlags, FlagConfig};

/// Feature flags fixed at startup from `[flags]` in the config file.
#[derive(Debug, Clone, Default)]
pub struct StaticFlags {
    config: FlagConfig,
}

impl StaticFlags {
    pub fn new(config: FlagConfig) -> Self {
        Self { config }
    }
}

impl FeatureFlags for StaticFlags {
    fn summary_staff_only(&self, course: &CourseKey) -> bool {
        self.config.staff_only.is_enabled(course)
    }

    fn summaries_configuration_enabled(&self, course: &CourseKey) -> bool {
        self.config.summaries_configuration.is_enabled(course)
    }
}
