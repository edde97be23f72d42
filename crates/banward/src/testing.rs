//! In-memory fakes for the store and the remote console.

use async_trait::async_trait;
use banward_core::{
    BanLedger, BanwardError, ConcurrencyToken, ErrorKind, LedgerSnapshot, LedgerStore,
    RconCommand, RconResponse, RconTransport, Result, ServerEndpoint,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::directory::ServerDirectory;

/// A directory of servers named `names`, on consecutive local ports
pub fn fleet(names: &[&str]) -> Arc<ServerDirectory> {
    let servers = names.iter().zip(9100u16..).map(|(name, port)| {
        ServerEndpoint::new(*name, "127.0.0.1", port, "secret")
    });
    Arc::new(ServerDirectory::new(servers).unwrap())
}

type Edit = Box<dyn FnOnce(&mut BanLedger) + Send>;

#[derive(Default)]
struct StoreState {
    ledger: BanLedger,
    // 0 means the document doesn't exist
    version: u64,
    descriptions: Vec<String>,
    read_failures: u32,
    interference: VecDeque<Edit>,
}

impl StoreState {
    fn token(&self) -> ConcurrencyToken {
        if self.version == 0 {
            ConcurrencyToken::absent()
        } else {
            ConcurrencyToken::new(format!("v{}", self.version))
        }
    }
}

/// Ledger store with version-checked writes
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    /// A store whose document doesn't exist yet
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding `ledger`
    pub fn with_ledger(ledger: BanLedger) -> Self {
        Self {
            state: Mutex::new(StoreState {
                ledger,
                version: 1,
                ..StoreState::default()
            }),
        }
    }

    /// Current document contents
    pub fn ledger(&self) -> BanLedger {
        self.state.lock().unwrap().ledger.clone()
    }

    /// Descriptions of every accepted write, oldest first
    pub fn descriptions(&self) -> Vec<String> {
        self.state.lock().unwrap().descriptions.clone()
    }

    /// Fail the next `count` reads with a transport error
    pub fn fail_reads(&self, count: u32) {
        self.state.lock().unwrap().read_failures = count;
    }

    /// Let another writer apply `edit` just before the next write arrives
    pub fn interfere(&self, edit: impl FnOnce(&mut BanLedger) + Send + 'static) {
        self.state
            .lock()
            .unwrap()
            .interference
            .push_back(Box::new(edit));
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn read(&self) -> Result<LedgerSnapshot> {
        let mut state = self.state.lock().unwrap();
        if state.read_failures > 0 {
            state.read_failures -= 1;
            return Err(BanwardError::Transport("store unreachable".into()));
        }
        Ok(LedgerSnapshot::new(state.ledger.clone(), state.token()))
    }

    async fn write(
        &self,
        ledger: &BanLedger,
        token: &ConcurrencyToken,
        description: &str,
    ) -> Result<ConcurrencyToken> {
        let mut state = self.state.lock().unwrap();
        if let Some(edit) = state.interference.pop_front() {
            edit(&mut state.ledger);
            state.version += 1;
            state.descriptions.push("concurrent edit".into());
        }

        if *token != state.token() {
            return Err(BanwardError::Conflict(format!(
                "expected {}, document is at {}",
                token,
                state.token()
            )));
        }

        state.ledger = ledger.clone();
        state.version += 1;
        state.descriptions.push(description.to_string());
        Ok(state.token())
    }
}

/// Remote console that records commands and fails on request
#[derive(Default)]
pub struct ScriptedTransport {
    calls: Mutex<Vec<(String, String)>>,
    failures: Mutex<HashMap<String, ErrorKind>>,
    replies: Mutex<HashMap<String, RconResponse>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every exchange with `server` fail with `kind`
    pub fn fail(&self, server: &str, kind: ErrorKind) {
        self.failures
            .lock()
            .unwrap()
            .insert(server.to_string(), kind);
    }

    /// Answer `command` with `response` instead of "ok"
    pub fn reply(&self, command: &str, response: RconResponse) {
        self.replies
            .lock()
            .unwrap()
            .insert(command.to_string(), response);
    }

    /// Every `(server, command)` sent so far, in arrival order
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    /// How many times `command` was sent, across all servers
    pub fn count(&self, command: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, sent)| sent == command)
            .count()
    }
}

#[async_trait]
impl RconTransport for ScriptedTransport {
    async fn send(&self, endpoint: &ServerEndpoint, command: &RconCommand) -> Result<RconResponse> {
        let text = command.to_string();
        self.calls
            .lock()
            .unwrap()
            .push((endpoint.name.clone(), text.clone()));

        let failure = self.failures.lock().unwrap().get(&endpoint.name).copied();
        if let Some(kind) = failure {
            let server = endpoint.name.clone();
            return Err(match kind {
                ErrorKind::Timeout => BanwardError::Timeout {
                    server,
                    timeout: Duration::from_secs(5),
                },
                ErrorKind::Connect => BanwardError::Connect {
                    server,
                    reason: "connection refused".into(),
                },
                ErrorKind::Auth => BanwardError::Auth { server },
                _ => BanwardError::Protocol {
                    server,
                    reason: "scripted failure".into(),
                },
            });
        }

        Ok(self
            .replies
            .lock()
            .unwrap()
            .get(&text)
            .cloned()
            .unwrap_or_else(|| RconResponse::Text("ok".into())))
    }
}
