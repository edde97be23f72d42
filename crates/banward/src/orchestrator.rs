//! The sync engine.
//!
//! Two operations change the ledger: the periodic expiry cycle, which lifts
//! bans whose date has passed, and ad hoc ban submissions. Both hold the
//! same lock from the first read until the write lands (or is given up), so
//! they never interleave inside one process. Writers in other processes are
//! caught by the store's concurrency token and handled by re-reading.

use banward_core::{
    BanAction, BanEntry, BanLedger, BanwardError, ConcurrencyToken, DispatchResult, ErrorKind,
    LedgerSnapshot, LedgerStore, Result, CANONICAL_DATE_FORMAT,
};
use banward_rcon::{RconClient, SessionConfig};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::directory::ServerDirectory;
use crate::dispatch::{failed_servers, FanoutDispatcher};
use crate::request::{BanReceipt, BanRequest};
use crate::scanner;

/// Engine behaviour knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Interval between expiry cycles
    pub sync_interval: Duration,
    /// Fresh re-reads allowed after a stale write within one operation
    pub max_conflict_retries: u32,
    /// Retry an unban once on the servers that missed it
    pub unban_redispatch: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            sync_interval: Duration::from_secs(60),
            max_conflict_retries: 1,
            unban_redispatch: true,
        }
    }
}

/// Where the engine is inside an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CycleState {
    /// Waiting for the next tick or submission
    #[default]
    Idle,
    /// Fetching the ledger
    Reading,
    /// Looking for expired entries
    Scanning,
    /// Broadcasting to servers
    Dispatching,
    /// Writing the ledger back
    Committing,
}

impl CycleState {
    /// Stable lowercase name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Reading => "reading",
            Self::Scanning => "scanning",
            Self::Dispatching => "dispatching",
            Self::Committing => "committing",
        }
    }
}

impl std::fmt::Display for CycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an expiry cycle ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing had expired; the ledger was not written
    NothingExpired,
    /// Expired entries were removed at this version
    Committed(ConcurrencyToken),
    /// Every write was stale; the next cycle picks the entries up again
    ConflictDeferred,
    /// The cycle stopped on an error
    Aborted {
        /// Step that failed
        stage: CycleState,
        /// Failure classification
        kind: ErrorKind,
        /// Human-readable reason
        reason: String,
    },
}

impl CycleOutcome {
    fn aborted(stage: CycleState, error: &BanwardError) -> Self {
        Self::Aborted {
            stage,
            kind: error.kind(),
            reason: error.to_string(),
        }
    }
}

/// Everything one expiry cycle did
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// How the cycle ended
    pub outcome: CycleOutcome,
    /// Subjects removed from the ledger by the committed write
    pub unbanned: Vec<String>,
    /// Unban broadcasts made this cycle, per subject, after any retry
    pub dispatches: BTreeMap<String, Vec<DispatchResult>>,
    /// Subjects whose ban was renewed elsewhere after this cycle lifted it,
    /// with the outcome of re-applying it
    pub rebanned: BTreeMap<String, Vec<DispatchResult>>,
    /// Stale writes encountered
    pub conflicts: u32,
}

impl CycleReport {
    const fn new() -> Self {
        Self {
            outcome: CycleOutcome::NothingExpired,
            unbanned: Vec::new(),
            dispatches: BTreeMap::new(),
            rebanned: BTreeMap::new(),
            conflicts: 0,
        }
    }

    /// Returns true if the ledger was written
    #[must_use]
    pub const fn is_committed(&self) -> bool {
        matches!(self.outcome, CycleOutcome::Committed(_))
    }

    /// Servers still enforcing a ban the ledger no longer holds
    #[must_use]
    pub fn stale_servers(&self) -> BTreeMap<&str, Vec<&str>> {
        self.unbanned
            .iter()
            .filter_map(|subject| {
                let servers: Vec<&str> = self
                    .dispatches
                    .get(subject)?
                    .iter()
                    .filter(|result| !result.is_success())
                    .map(|result| result.server.as_str())
                    .collect();
                (!servers.is_empty()).then_some((subject.as_str(), servers))
            })
            .collect()
    }
}

/// Keeps the ledger and the server fleet in agreement
pub struct SyncEngine {
    store: Arc<dyn LedgerStore>,
    dispatcher: FanoutDispatcher,
    settings: EngineSettings,
    last: Mutex<Option<LedgerSnapshot>>,
    state: watch::Sender<CycleState>,
}

impl SyncEngine {
    /// Create an engine from its parts
    #[must_use]
    pub fn new(
        store: Arc<dyn LedgerStore>,
        dispatcher: FanoutDispatcher,
        settings: EngineSettings,
    ) -> Self {
        let (state, _) = watch::channel(CycleState::Idle);
        Self {
            store,
            dispatcher,
            settings,
            last: Mutex::new(None),
            state,
        }
    }

    /// Build the production engine: servers file, ledger store client and
    /// remote console client, all from `config`
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let directory = ServerDirectory::load(&config.servers_file)?;
        let store = config.store.client()?;
        let transport = RconClient::with_config(SessionConfig {
            timeout: config.rcon_timeout(),
            ..SessionConfig::default()
        });

        info!(
            servers = directory.len(),
            ledger = %store.contents_url(),
            "engine configured"
        );

        Ok(Self::new(
            Arc::new(store),
            FanoutDispatcher::new(Arc::new(directory), Arc::new(transport)),
            config.settings(),
        ))
    }

    /// The servers bans are broadcast to
    #[must_use]
    pub fn directory(&self) -> &ServerDirectory {
        self.dispatcher.directory()
    }

    /// The dispatcher, for one-off commands
    #[must_use]
    pub const fn dispatcher(&self) -> &FanoutDispatcher {
        &self.dispatcher
    }

    /// Behaviour knobs
    #[must_use]
    pub const fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Current step
    #[must_use]
    pub fn state(&self) -> CycleState {
        *self.state.borrow()
    }

    /// Watch step changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CycleState> {
        self.state.subscribe()
    }

    /// The ledger as last read or written by this engine
    pub async fn last_snapshot(&self) -> Option<LedgerSnapshot> {
        self.last.lock().await.clone()
    }

    /// Fetch the current entry for `subject`, if banned
    pub async fn lookup(&self, subject: &str) -> Result<Option<BanEntry>> {
        let snapshot = self.store.read().await?;
        Ok(snapshot.ledger.get(subject).cloned())
    }

    /// Run one expiry cycle against the local date
    pub async fn run_cycle(&self) -> CycleReport {
        self.run_cycle_at(scanner::today()).await
    }

    /// Run one expiry cycle as of `today`.
    ///
    /// Never fails as a whole: the outcome, including any error, is in the
    /// report.
    pub async fn run_cycle_at(&self, today: NaiveDate) -> CycleReport {
        let mut last = self.last.lock().await;
        let report = self.expire(&mut last, today).await;
        self.set_state(CycleState::Idle);

        match &report.outcome {
            CycleOutcome::NothingExpired => debug!(%today, "no expired bans"),
            CycleOutcome::Committed(token) => {
                let stale = report.stale_servers();
                info!(
                    unbanned = ?report.unbanned,
                    conflicts = report.conflicts,
                    version = %token,
                    "expired bans lifted"
                );
                if !stale.is_empty() {
                    warn!(
                        stale = ?stale,
                        "some servers may still enforce lifted bans"
                    );
                }
            }
            CycleOutcome::ConflictDeferred => warn!(
                conflicts = report.conflicts,
                "ledger kept changing; expired bans deferred to the next cycle"
            ),
            CycleOutcome::Aborted { stage, kind, .. } => {
                debug!(%stage, %kind, "cycle aborted");
            }
        }

        report
    }

    /// Record a ban in the ledger and apply it on every server.
    ///
    /// The ban is broadcast once; stale writes re-read the ledger and
    /// re-insert the entry without broadcasting again.
    pub async fn submit_ban(&self, request: BanRequest) -> Result<BanReceipt> {
        let mut last = self.last.lock().await;
        let result = self.apply_ban(&mut last, request).await;
        self.set_state(CycleState::Idle);
        result
    }

    /// Run expiry cycles on the configured interval until `shutdown`
    /// turns true or its sender is dropped.
    ///
    /// The first cycle starts immediately. A cycle in flight when shutdown
    /// is requested runs to completion; slow cycles push the next tick back
    /// rather than bunching ticks up.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let period = self.settings.sync_interval.max(Duration::from_secs(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_secs = period.as_secs(),
            servers = self.directory().len(),
            "ban sync started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("ban sync stopped");
    }

    async fn expire(&self, last: &mut Option<LedgerSnapshot>, today: NaiveDate) -> CycleReport {
        let mut report = CycleReport::new();

        loop {
            self.set_state(CycleState::Reading);
            let snapshot = match self.store.read().await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    error!(kind = %e.kind(), error = %e, "failed to read ban ledger");
                    report.outcome = CycleOutcome::aborted(CycleState::Reading, &e);
                    break;
                }
            };
            *last = Some(snapshot.clone());

            self.set_state(CycleState::Scanning);
            let expired = scanner::scan(&snapshot.ledger, today);

            self.restore_renewed(&snapshot.ledger, &expired, &mut report).await;

            if expired.is_empty() {
                break;
            }

            self.set_state(CycleState::Dispatching);
            for subject in &expired {
                if !report.dispatches.contains_key(subject) {
                    let results = self.unban_everywhere(subject).await;
                    report.dispatches.insert(subject.clone(), results);
                }
            }

            self.set_state(CycleState::Committing);
            let LedgerSnapshot { mut ledger, token } = snapshot;
            for subject in &expired {
                ledger.remove(subject);
            }
            let subjects: Vec<String> = expired.into_iter().collect();
            let description = format!(
                "Users unbanned as their ban time expired: {}",
                subjects.join(", ")
            );

            match self.store.write(&ledger, &token, &description).await {
                Ok(token) => {
                    *last = Some(LedgerSnapshot::new(ledger, token.clone()));
                    report.unbanned = subjects;
                    report.outcome = CycleOutcome::Committed(token);
                    break;
                }
                Err(e) if e.is_conflict() => {
                    report.conflicts += 1;
                    if report.conflicts > self.settings.max_conflict_retries {
                        self.reconcile_deferred(last, today, &mut report).await;
                        report.outcome = CycleOutcome::ConflictDeferred;
                        break;
                    }
                    warn!(
                        attempt = report.conflicts,
                        error = %e,
                        "ledger changed during cycle, re-reading"
                    );
                }
                Err(e) => {
                    error!(
                        kind = %e.kind(),
                        error = %e,
                        subjects = ?subjects,
                        "failed to write ban ledger; expired bans stay until the next cycle"
                    );
                    report.outcome = CycleOutcome::aborted(CycleState::Committing, &e);
                    break;
                }
            }
        }

        report
    }

    /// Ban again on servers any subject that was lifted earlier this cycle
    /// but is still listed and not expired in `ledger`.
    async fn restore_renewed(
        &self,
        ledger: &BanLedger,
        expired: &BTreeSet<String>,
        report: &mut CycleReport,
    ) {
        let renewed: Vec<String> = report
            .dispatches
            .keys()
            .filter(|subject| !expired.contains(*subject) && ledger.contains(subject))
            .cloned()
            .collect();

        for subject in renewed {
            warn!(subject = %subject, "ban renewed concurrently, restoring it on servers");
            self.set_state(CycleState::Dispatching);
            let results = self.dispatcher.dispatch(BanAction::Ban, &subject).await;
            report.dispatches.remove(&subject);
            report.rebanned.insert(subject, results);
        }
    }

    /// Last read of a cycle that gave up on committing. Only restores
    /// renewed bans; the ledger is not written.
    async fn reconcile_deferred(
        &self,
        last: &mut Option<LedgerSnapshot>,
        today: NaiveDate,
        report: &mut CycleReport,
    ) {
        self.set_state(CycleState::Reading);
        match self.store.read().await {
            Ok(snapshot) => {
                let expired = scanner::scan(&snapshot.ledger, today);
                self.restore_renewed(&snapshot.ledger, &expired, report).await;
                *last = Some(snapshot);
            }
            Err(e) => {
                error!(
                    kind = %e.kind(),
                    error = %e,
                    subjects = ?report.dispatches.keys().collect::<Vec<_>>(),
                    "failed to re-read ban ledger; renewed bans may not be enforced"
                );
            }
        }
    }

    async fn unban_everywhere(&self, subject: &str) -> Vec<DispatchResult> {
        let mut results = self.dispatcher.dispatch(BanAction::Unban, subject).await;

        let missed = failed_servers(&results);
        if self.settings.unban_redispatch && !missed.is_empty() {
            info!(subject, servers = ?missed, "retrying unban on servers that missed it");
            for retry in self
                .dispatcher
                .dispatch_to(BanAction::Unban, subject, &missed)
                .await
            {
                if let Some(slot) = results.iter_mut().find(|r| r.server == retry.server) {
                    *slot = retry;
                }
            }
        }

        let stale = failed_servers(&results);
        if !stale.is_empty() {
            warn!(
                subject,
                servers = ?stale,
                "unban not applied everywhere; removing from ledger anyway"
            );
        }

        results
    }

    async fn apply_ban(
        &self,
        last: &mut Option<LedgerSnapshot>,
        request: BanRequest,
    ) -> Result<BanReceipt> {
        let description = format!(
            "User {} banned until {} for reason: {}",
            request.subject,
            request.expiry.format(CANONICAL_DATE_FORMAT),
            request.reason
        );
        let mut broadcast: Option<Vec<DispatchResult>> = None;
        let mut conflicts = 0;

        loop {
            self.set_state(CycleState::Reading);
            let snapshot = match self.store.read().await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    error!(
                        subject = %request.subject,
                        kind = %e.kind(),
                        error = %e,
                        "failed to read ban ledger"
                    );
                    return Err(e);
                }
            };
            *last = Some(snapshot.clone());

            let LedgerSnapshot { mut ledger, token } = snapshot;
            let replaced = ledger.insert(request.subject.clone(), request.entry());

            let dispatches = match broadcast.take() {
                Some(dispatches) => dispatches,
                None => {
                    self.set_state(CycleState::Dispatching);
                    self.dispatcher
                        .dispatch(BanAction::Ban, &request.subject)
                        .await
                }
            };

            self.set_state(CycleState::Committing);
            match self.store.write(&ledger, &token, &description).await {
                Ok(token) => {
                    info!(
                        subject = %request.subject,
                        until = %request.expiry,
                        conflicts,
                        "ban recorded"
                    );
                    *last = Some(LedgerSnapshot::new(ledger, token.clone()));
                    return Ok(BanReceipt {
                        request,
                        dispatches,
                        replaced,
                        token,
                        conflicts,
                    });
                }
                Err(e) if e.is_conflict() && conflicts < self.settings.max_conflict_retries => {
                    conflicts += 1;
                    warn!(
                        subject = %request.subject,
                        attempt = conflicts,
                        "ledger changed during submission, re-reading"
                    );
                    broadcast = Some(dispatches);
                }
                Err(e) => {
                    error!(
                        subject = %request.subject,
                        kind = %e.kind(),
                        error = %e,
                        "ban applied on servers but not recorded in the ledger"
                    );
                    return Err(e);
                }
            }
        }
    }

    fn set_state(&self, state: CycleState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!(from = %previous, to = %state, "engine state");
        }
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("dispatcher", &self.dispatcher)
            .field("settings", &self.settings)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
