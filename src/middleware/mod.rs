pub mod guard;
pub mod response;
pub mod session;

pub use guard::require_access;
pub use response::{ApiResponse, ApiResult};
pub use session::{session_middleware, SessionToken};
