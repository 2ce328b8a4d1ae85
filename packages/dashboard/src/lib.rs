// ABOUTME: Dashboard aggregation over change-management state
// ABOUTME: Organization-scoped counters and the recent activity feed, computed on demand

pub mod aggregator;
pub mod types;

pub use aggregator::{month_window, DashboardAggregator};
pub use types::{ActivityEntry, DashboardMetrics};
