pub mod auth;
pub mod response;

pub use auth::{Caller, RequestGuard};
pub use response::{ApiResponse, ApiResult};
