pub mod store;
pub mod worker;

pub use store::{AlertStore, DashboardView, InstanceStatus};
pub use worker::{refresh_view, CycleSummary, PullWorker};
