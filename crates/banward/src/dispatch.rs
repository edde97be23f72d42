//! Broadcasting one command to every server in the directory.

use banward_core::{
    check_argument, BanAction, BanwardError, DispatchResult, RconCommand, RconResponse,
    RconTransport, Result, ServerEndpoint,
};
use futures_util::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::directory::ServerDirectory;

/// Sends commands to servers concurrently and collects per-server outcomes.
///
/// A failing server never stops delivery to the others, and a dispatch
/// never fails as a whole: every failure is folded into its
/// [`DispatchResult`].
#[derive(Clone)]
pub struct FanoutDispatcher {
    directory: Arc<ServerDirectory>,
    transport: Arc<dyn RconTransport>,
}

impl FanoutDispatcher {
    /// Create a dispatcher over `directory`
    #[must_use]
    pub fn new(directory: Arc<ServerDirectory>, transport: Arc<dyn RconTransport>) -> Self {
        Self {
            directory,
            transport,
        }
    }

    /// The servers commands are sent to
    #[must_use]
    pub fn directory(&self) -> &ServerDirectory {
        &self.directory
    }

    /// Apply `action` for `subject` on every server.
    ///
    /// Returns one result per server, in directory order.
    pub async fn dispatch(&self, action: BanAction, subject: &str) -> Vec<DispatchResult> {
        if let Err(e) = check_argument("subject", subject) {
            let servers = self.directory.iter().map(|endpoint| endpoint.name.clone());
            return refuse(action, &e, servers);
        }
        let command = action.command(subject);
        let results = self.broadcast(&command, self.directory.iter()).await;
        log_summary(action, subject, &results);
        results
    }

    /// Apply `action` for `subject` on the named servers only.
    ///
    /// Names missing from the directory come back as
    /// [`BanwardError::UnknownServer`] failures.
    pub async fn dispatch_to(
        &self,
        action: BanAction,
        subject: &str,
        servers: &[String],
    ) -> Vec<DispatchResult> {
        if let Err(e) = check_argument("subject", subject) {
            return refuse(action, &e, servers.iter().cloned());
        }
        let command = action.command(subject);
        let (known, unknown): (Vec<_>, Vec<_>) = servers
            .iter()
            .partition(|name| self.directory.get(name).is_some());

        let mut results = self
            .broadcast(
                &command,
                self.directory
                    .iter()
                    .filter(|endpoint| known.contains(&&endpoint.name)),
            )
            .await;
        results.extend(unknown.into_iter().map(|name| {
            DispatchResult::failed(name.clone(), &BanwardError::UnknownServer(name.clone()))
        }));

        log_summary(action, subject, &results);
        results
    }

    /// Send a single command to one named server
    pub async fn send_to(&self, server: &str, command: &RconCommand) -> Result<RconResponse> {
        let endpoint = self
            .directory
            .get(server)
            .ok_or_else(|| BanwardError::UnknownServer(server.to_string()))?;

        debug!(server, %command, "sending command");
        self.transport.send(endpoint, command).await
    }

    async fn broadcast<'a>(
        &self,
        command: &RconCommand,
        endpoints: impl Iterator<Item = &'a ServerEndpoint>,
    ) -> Vec<DispatchResult> {
        join_all(endpoints.map(|endpoint| self.deliver(endpoint, command))).await
    }

    async fn deliver(&self, endpoint: &ServerEndpoint, command: &RconCommand) -> DispatchResult {
        match self.transport.send(endpoint, command).await {
            Ok(response) => {
                debug!(server = %endpoint.name, %command, %response, "command delivered");
                DispatchResult::delivered(endpoint.name.clone(), response)
            }
            Err(e) => {
                warn!(
                    server = %endpoint.name,
                    %command,
                    kind = %e.kind(),
                    error = %e,
                    "command failed"
                );
                DispatchResult::failed(endpoint.name.clone(), &e)
            }
        }
    }
}

impl std::fmt::Debug for FanoutDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanoutDispatcher")
            .field("servers", &self.directory.len())
            .finish_non_exhaustive()
    }
}

/// Names of the servers whose exchange failed
#[must_use]
pub fn failed_servers(results: &[DispatchResult]) -> Vec<String> {
    results
        .iter()
        .filter(|result| !result.is_success())
        .map(|result| result.server.clone())
        .collect()
}

// Nothing is sent for a subject that would corrupt the command line.
fn refuse(
    action: BanAction,
    error: &BanwardError,
    servers: impl Iterator<Item = String>,
) -> Vec<DispatchResult> {
    warn!(%action, error = %error, "refusing to dispatch");
    servers
        .map(|server| DispatchResult::failed(server, error))
        .collect()
}

fn log_summary(action: BanAction, subject: &str, results: &[DispatchResult]) {
    let failed = failed_servers(results);
    if failed.is_empty() {
        info!(%action, subject, servers = results.len(), "dispatched to all servers");
    } else {
        warn!(
            %action,
            subject,
            servers = results.len(),
            failed = ?failed,
            "dispatch incomplete"
        );
    }
}
