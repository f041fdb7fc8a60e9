pub mod config;
pub mod dispatch;
pub mod error;
pub mod identity;
pub mod runtime;
pub mod storage;
pub mod surface;

pub use config::ClientConfig;
pub use error::{AuthError, AuthResult};
pub use runtime::AuthRuntime;
