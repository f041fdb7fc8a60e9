//! Session and identity management for a client holding a bearer credential.
//! Keep the public surface thin and split implementation across sub-modules.

mod authorizer;
mod cache;
mod claims;
mod provider;
mod record;
mod session;
mod token;

pub use authorizer::{access_for, require_role, Access};
pub use cache::{IdentityCache, IDENTITY_KEY};
pub use claims::{decode_claims, ClaimSet, Subject};
pub use provider::{AuthApi, HttpAuthApi, LoginRequest, LoginResponse, LOGIN_PATH, LOGOUT_PATH};
pub use record::{IdentityRecord, StaffProfile};
pub use session::{SessionCore, SessionManager, SessionSnapshot, SessionState};
pub use token::{TokenService, REFRESH_TOKEN_KEY, TOKEN_KEY};
