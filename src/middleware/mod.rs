pub mod access;
pub mod auth;
pub mod response;

pub use access::{enforce_access, AccessGuard, CLIENT_ID_HEADER};
pub use auth::identity_middleware;
pub use response::{ApiResponse, ApiResult};
