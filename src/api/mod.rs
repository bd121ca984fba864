//! 对外 API 层：线上协议类型与 HTTP 路由

pub mod routes;
pub mod types;

pub use routes::{build_router, AppState};
