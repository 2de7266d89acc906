//! Port scanner port (interface).

use crate::domain::Listener;
use crate::error::Result;

/// Port for querying listening sockets.
///
/// Each call is an independent point-in-time snapshot of external process
/// state. Implementations handle platform-specific details (lsof, ss, ...).
pub trait Scanner: Send + Sync {
    /// List every listening socket, one listener per port.
    fn list_listeners(&self) -> impl std::future::Future<Output = Result<Vec<Listener>>> + Send;

    /// Look up a single port with its connections and resource stats.
    ///
    /// `Ok(None)` means the port is not in use; that is not an error.
    fn get_port(
        &self,
        port: u16,
    ) -> impl std::future::Future<Output = Result<Option<Listener>>> + Send;

    /// List listeners matching a pattern (see [`Listener::matches_pattern`]).
    fn find_by_pattern(
        &self,
        pattern: &str,
    ) -> impl std::future::Future<Output = Result<Vec<Listener>>> + Send {
        async move {
            let listeners = self.list_listeners().await?;
            Ok(listeners
                .into_iter()
                .filter(|l| l.matches_pattern(pattern))
                .collect())
        }
    }
}
