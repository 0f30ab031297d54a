pub mod cache;
pub mod handlers;
pub mod server;

pub use cache::{CacheStats, ResponseCache};
pub use handlers::{AlertsRequest, AlertsResponse, ApiError, AppState};
pub use server::{build_registry, build_router, run_server};
