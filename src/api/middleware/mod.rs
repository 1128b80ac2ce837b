pub mod auth;
pub mod csrf;
pub mod request_id;
pub mod timing;

pub use auth::{AdminUser, AuthContext, AuthMethod, CurrentUser, UserAuth};
pub use csrf::CsrfGuard;
pub use request_id::{RequestId, RequestIdMiddleware};
pub use timing::TimingMiddleware;
