//! Foreground-app detection strategy
//!
//! Two device queries can report the focused app. Which one works depends on
//! the Android build, so the session learns it:
//!
//! ```text
//! TryBoth / BothFailed --windows ok--> OnlyWindows
//!                      --activities ok--> OnlyActivities
//!                      --both fail--> BothFailed
//! OnlyWindows / OnlyActivities --fail--> BothFailed
//! ```

use tvbridge_daemon::probes::{RESUMED_ACTIVITY_QUERY, WINDOWS_FOCUS_QUERY};

/// A single foreground-app query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppQuery {
    /// Window-manager focus
    Windows,
    /// Activity-manager resumed activity
    Activities,
}

impl AppQuery {
    pub fn command(&self) -> &'static str {
        match self {
            AppQuery::Windows => WINDOWS_FOCUS_QUERY,
            AppQuery::Activities => RESUMED_ACTIVITY_QUERY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppDetectionStrategy {
    #[default]
    TryBoth,
    OnlyWindows,
    OnlyActivities,
    /// Neither query worked last cycle; both are retried
    BothFailed,
}

impl AppDetectionStrategy {
    /// Queries to attempt this cycle, in order. The first success wins.
    pub fn queries(&self) -> &'static [AppQuery] {
        match self {
            Self::TryBoth | Self::BothFailed => &[AppQuery::Windows, AppQuery::Activities],
            Self::OnlyWindows => &[AppQuery::Windows],
            Self::OnlyActivities => &[AppQuery::Activities],
        }
    }

    /// Next state after `query` answered successfully
    pub fn on_success(self, query: AppQuery) -> Self {
        match query {
            AppQuery::Windows => Self::OnlyWindows,
            AppQuery::Activities => Self::OnlyActivities,
        }
    }

    /// Next state after every query of this cycle failed
    pub fn on_exhausted(self) -> Self {
        Self::BothFailed
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::BothFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_both_orders_windows_first() {
        assert_eq!(
            AppDetectionStrategy::TryBoth.queries(),
            &[AppQuery::Windows, AppQuery::Activities]
        );
    }

    #[test]
    fn test_windows_success_locks_in() {
        let next = AppDetectionStrategy::TryBoth.on_success(AppQuery::Windows);
        assert_eq!(next, AppDetectionStrategy::OnlyWindows);
        assert_eq!(next.queries(), &[AppQuery::Windows]);
    }

    #[test]
    fn test_fallback_to_activities() {
        let next = AppDetectionStrategy::TryBoth.on_success(AppQuery::Activities);
        assert_eq!(next, AppDetectionStrategy::OnlyActivities);
        assert_eq!(next.queries(), &[AppQuery::Activities]);
    }

    #[test]
    fn test_single_strategy_failure_retries_both() {
        let next = AppDetectionStrategy::OnlyActivities.on_exhausted();
        assert!(next.is_failed());
        assert_eq!(next.queries().len(), 2);
    }
}
