use super::session::{SessionCore, SessionState};

/// Outcome of gating a surface on the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    /// Bootstrap has not settled yet; render nothing.
    Pending,
    NeedsLogin,
    Forbidden,
}

/// Pure decision, no navigation. `None` means any authenticated user.
pub fn access_for(state: &SessionState, required_role: Option<&str>) -> Access {
    match state {
        SessionState::Initializing => Access::Pending,
        SessionState::Unauthenticated => Access::NeedsLogin,
        SessionState::Authenticated(identity) => match required_role {
            Some(role) if !identity.has_role(role) => Access::Forbidden,
            _ => Access::Granted,
        },
    }
}

/// Gate a protected surface: sends the user agent to the login or unauthorized
/// surface when access is refused.
pub fn require_role(core: &SessionCore, required_role: Option<&str>) -> Access {
    let access = access_for(&core.state(), required_role);
    let target = match access {
        Access::NeedsLogin => Some(core.login_path()),
        Access::Forbidden => Some(core.unauthorized_path()),
        Access::Granted | Access::Pending => None,
    };
    if let Some(path) = target {
        if core.navigator().current_path() != path {
            core.navigator().navigate(path);
        }
    }
    access
}
