use std::io::Write;

use tracing::info;

use crate::models::session::Notice;

/// Delivers user-visible failure notices. Calls are synchronous and complete
/// before the failing operation returns.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &Notice);
}

/// Prints notices to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: &Notice) {
        info!(target: "app::session", kind = ?notice.kind, "showing notice");
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "! {}", notice.message);
    }
}
