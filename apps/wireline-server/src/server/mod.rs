pub(crate) mod auth;
pub(crate) mod config;
pub(crate) mod connection;
pub(crate) mod db;
pub(crate) mod errors;
pub(crate) mod handlers;
pub(crate) mod messaging;
pub(crate) mod realtime;
pub(crate) mod router;
pub(crate) mod social;
pub(crate) mod state;
#[cfg(test)]
mod tests;
pub(crate) mod types;

pub use config::AppConfig;
pub use errors::init_tracing;
pub use router::{build_router, build_router_with_db_bootstrap};
