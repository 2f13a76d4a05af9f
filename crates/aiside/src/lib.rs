//! Public facade crate for `aiside`.
//!
//! Hosts embedding the summary hook implement the traits re-exported here (`BlockStore`,
//! `FeatureFlags`, `SettingsStore`, `UserService`, `CreditService`) against their own
//! runtime. No store or host-specific logic lives in this crate.

pub use aiside_core::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facade_exposes_keys_and_config() {
        let unit = UsageKey::parse("block-v1:edX+A+B+type@vertical+block@u").unwrap();
        assert_eq!(unit.course_key().unwrap().as_str(), "course-v1:edX+A+B");
        assert_eq!(SummaryConfig::default().min_size, config::DEFAULT_MIN_SIZE);
    }
}
