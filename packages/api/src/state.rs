// ABOUTME: Shared application state handed to every handler
// ABOUTME: Wires the workflow engine, approvals, and read models onto one SQLite pool

use sqlx::SqlitePool;
use std::sync::Arc;

use ecflow_approvals::ApprovalCoordinator;
use ecflow_comments::CommentStorage;
use ecflow_core::{DEFAULT_ACTIVITY_LIMIT, MAX_ACTIVITY_LIMIT};
use ecflow_dashboard::DashboardAggregator;
use ecflow_notifications::{NotificationSink, NotificationStorage};
use ecflow_organizations::OrganizationStorage;
use ecflow_workflow::WorkflowEngine;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub workflow: Arc<WorkflowEngine>,
    pub approvals: Arc<ApprovalCoordinator>,
    pub comments: Arc<CommentStorage>,
    pub notifications: Arc<NotificationStorage>,
    pub organizations: Arc<OrganizationStorage>,
    pub dashboard: Arc<DashboardAggregator>,
    /// Activity entries returned when the caller gives no limit
    pub activity_limit: i64,
}

impl AppState {
    /// Create state from a migrated pool. Notifications are persisted in the
    /// same database and double as the delivery sink.
    pub fn new(pool: SqlitePool) -> Self {
        let notifications = Arc::new(NotificationStorage::new(pool.clone()));
        let sink: Arc<dyn NotificationSink> = notifications.clone();

        Self {
            workflow: Arc::new(WorkflowEngine::new(pool.clone(), sink.clone())),
            approvals: Arc::new(ApprovalCoordinator::new(pool.clone(), sink)),
            comments: Arc::new(CommentStorage::new(pool.clone())),
            organizations: Arc::new(OrganizationStorage::new(pool.clone())),
            dashboard: Arc::new(DashboardAggregator::new(pool.clone())),
            notifications,
            activity_limit: DEFAULT_ACTIVITY_LIMIT,
            pool,
        }
    }

    pub fn with_activity_limit(mut self, limit: i64) -> Self {
        self.activity_limit = limit.clamp(1, MAX_ACTIVITY_LIMIT);
        self
    }
}
