pub mod cleanup;
pub mod credentials;
pub mod middleware;
pub mod session;

pub use cleanup::run_cleanup_worker;
pub use credentials::{hash_password, validate_password_strength, validate_username, verify_password};
pub use middleware::{session_token, MaybeUser, RequireUser};
pub use session::{generate_session_token, session_expiry};
