pub mod auth;
pub mod response;

pub use auth::{jwt_auth_middleware, session_auth_middleware, SESSION_COOKIE};
pub use response::{ApiResponse, ApiResult};
