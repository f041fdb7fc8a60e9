//! Boundary with the user-facing shell: where the user agent currently is, and
//! how short notices reach the user. The session core only talks to these traits.

use parking_lot::Mutex;
use tracing::info;

/// Location of the user agent.
pub trait Navigator: Send + Sync {
    fn current_path(&self) -> String;
    fn navigate(&self, path: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, kind: NoticeKind, message: &str);

    fn success(&self, message: &str) { self.notify(NoticeKind::Success, message) }
    fn error(&self, message: &str) { self.notify(NoticeKind::Error, message) }
}

/// In-process navigator. Keeps the full navigation history for inspection.
pub struct MemoryNavigator {
    inner: Mutex<NavState>,
}

struct NavState {
    current: String,
    history: Vec<String>,
}

impl MemoryNavigator {
    pub fn new(start: &str) -> Self {
        Self { inner: Mutex::new(NavState { current: start.to_string(), history: Vec::new() }) }
    }

    /// Paths navigated to, oldest first (the start path is not included).
    pub fn history(&self) -> Vec<String> { self.inner.lock().history.clone() }

    pub fn navigations_to(&self, path: &str) -> usize {
        self.inner.lock().history.iter().filter(|p| p.as_str() == path).count()
    }
}

impl Default for MemoryNavigator {
    fn default() -> Self { Self::new("/") }
}

impl Navigator for MemoryNavigator {
    fn current_path(&self) -> String { self.inner.lock().current.clone() }

    fn navigate(&self, path: &str) {
        let mut st = self.inner.lock();
        st.current = path.to_string();
        st.history.push(path.to_string());
        info!(target: "authkeep::surface", "navigate -> {}", path);
    }
}

/// Sends notices to the log.
#[derive(Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, kind: NoticeKind, message: &str) {
        match kind {
            NoticeKind::Error => tracing::warn!(target: "authkeep::notice", "{}", message),
            _ => info!(target: "authkeep::notice", "{}", message),
        }
    }
}

/// Keeps every notice; handy for embedding shells that render them later.
#[derive(Default)]
pub struct NoticeLog {
    notices: Mutex<Vec<Notice>>,
}

impl NoticeLog {
    pub fn new() -> Self { Self::default() }

    pub fn notices(&self) -> Vec<Notice> { self.notices.lock().clone() }

    pub fn messages(&self, kind: NoticeKind) -> Vec<String> {
        self.notices.lock().iter().filter(|n| n.kind == kind).map(|n| n.message.clone()).collect()
    }
}

impl Notifier for NoticeLog {
    fn notify(&self, kind: NoticeKind, message: &str) {
        self.notices.lock().push(Notice { kind, message: message.to_string() });
    }
}
