#![forbid(unsafe_code)]

pub mod server;

pub use server::config::AppConfig;
pub use server::errors::{init_tracing, AppError};
pub use server::router::{build_router, build_router_with_db_bootstrap};
pub use server::state::AppState;
