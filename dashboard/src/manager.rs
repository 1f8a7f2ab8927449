//! Dashboard Manager - Composition Layer
//!
//! Owns the contract binding, countdown, event watcher, toast queue, draft
//! store and diagnostics, and exposes one method per dashboard action.

use std::sync::{Arc, RwLock};

use ajo_piggybank::{
    timelock, Address, BindingOptions, Boundary, BookmarkStore, ChainClient, Clock, Config,
    ContractState, ContractStats, Countdown, Diagnostics, DiagnosticsReport, EventPoller,
    EventWatcher, Guarded, LastTransactionLog, ObservedTransaction, PiggyBankContract,
    PiggyBankError, RecentTransactions, SavedDraft, Storage, Submission, TimelockStatus, Toast,
    ToastQueue, TransactionTracker, TxRecord,
};
use ajo_piggybank::validation::validate_address;

use crate::api::types::{
    BalancePanel, DashboardSnapshot, NetworkInfo, SaveDraftRequest, SessionInfo, TimelockPanel,
};
use crate::error::DashboardError;

pub struct DashboardManager<C: ChainClient> {
    pub config: Config,
    clock: Arc<dyn Clock>,
    session: RwLock<Option<Address>>,
    contract: Option<Arc<PiggyBankContract<C>>>,
    // Why the binding is absent, when it is.
    contract_error: Option<PiggyBankError>,
    tracker: TransactionTracker,
    recent: RecentTransactions,
    bookmarks: BookmarkStore,
    diagnostics: Diagnostics<C>,
    countdown: Option<Countdown>,
    _event_watcher: Option<EventWatcher>,
}

impl<C: ChainClient> DashboardManager<C> {
    // ============================================================================
    // Constructor
    // ============================================================================

    /// Wire every component. Spawns the countdown and event watcher, so
    /// this must run inside a tokio runtime.
    pub fn new(config: Config, client: Arc<C>, clock: Arc<dyn Clock>) -> Self {
        let storage = Storage::new_with_base_dir(config.data_dir.clone());
        let last_transaction = LastTransactionLog::new(storage.clone());
        let tracker = TransactionTracker::new(ToastQueue::new(config.explorer_url.clone()));
        let recent = RecentTransactions::new();

        let (contract, contract_error) = match config.contract_address() {
            Ok(address) => {
                let binding = PiggyBankContract::new(
                    client.clone(),
                    address,
                    tracker.clone(),
                    clock.clone(),
                    BindingOptions {
                        deposit_limits: config.deposit_limits.clone(),
                        refetch_debounce: config.refetch_debounce,
                        receipt_poll_interval: config.receipt_poll_interval,
                        last_transaction: Some(last_transaction.clone()),
                    },
                );
                log::info!("📄 PiggyBank contract: {}", address);
                (Some(Arc::new(binding)), None)
            }
            Err(e) => {
                log::warn!("⚠️  Contract binding disabled: {}", e);
                (None, Some(e))
            }
        };

        let countdown = contract
            .as_ref()
            .map(|c| Countdown::spawn(c.unlock_time_watch(), clock.clone()));

        let event_watcher = contract.as_ref().map(|c| {
            EventWatcher::spawn(
                EventPoller::new(client.clone(), c.address()),
                Arc::downgrade(c),
                recent.clone(),
                config.event_poll_interval,
            )
        });

        let diagnostics = Diagnostics::new(client, config.clone(), last_transaction);

        let manager = Self {
            clock,
            session: RwLock::new(None),
            contract,
            contract_error,
            tracker,
            recent,
            bookmarks: BookmarkStore::new(storage),
            diagnostics,
            countdown,
            _event_watcher: event_watcher,
            config,
        };

        if let Some(address) = manager.config.wallet_address {
            manager.set_session(Some(address));
        }
        manager
    }

    fn contract(&self) -> Result<&Arc<PiggyBankContract<C>>, DashboardError> {
        match (&self.contract, &self.contract_error) {
            (Some(contract), _) => Ok(contract),
            (None, Some(e)) => Err(e.clone().into()),
            (None, None) => Err(DashboardError::NotConfigured(
                "Contract address not configured".to_string(),
            )),
        }
    }

    fn set_session(&self, address: Option<Address>) {
        *self.session.write().unwrap_or_else(|e| e.into_inner()) = address;
        if let Some(contract) = &self.contract {
            match address {
                Some(address) => contract.connect(address),
                None => contract.disconnect(),
            }
        }
    }

    pub fn session(&self) -> Option<Address> {
        *self.session.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn tracker(&self) -> &TransactionTracker {
        &self.tracker
    }

    // ============================================================================
    // Session
    // ============================================================================

    /// Connect `address` and load its state. A failed first read still
    /// leaves the session connected.
    pub async fn connect(&self, address: &str) -> Result<SessionInfo, DashboardError> {
        let address = validate_address(address).map_err(PiggyBankError::from)?;
        self.set_session(Some(address));

        if let Some(contract) = &self.contract {
            if let Err(e) = contract.refresh().await {
                log::warn!("Initial read for {} failed: {}", address, e);
            }
        }
        Ok(self.session_info())
    }

    pub fn disconnect(&self) -> SessionInfo {
        self.set_session(None);
        self.session_info()
    }

    pub fn session_info(&self) -> SessionInfo {
        SessionInfo {
            address: self.session(),
            is_owner: self.contract.as_ref().map(|c| c.is_owner()).unwrap_or(false),
        }
    }

    // ============================================================================
    // Contract state
    // ============================================================================

    pub async fn refresh(&self) -> Result<ContractState, DashboardError> {
        Ok(self.contract()?.refresh().await?)
    }

    pub fn timelock(&self) -> Result<TimelockStatus, DashboardError> {
        match &self.countdown {
            Some(countdown) => Ok(countdown.current()),
            None => {
                let contract = self.contract()?;
                Ok(timelock::derive(contract.unlock_time(), self.clock.now()))
            }
        }
    }

    pub async fn admin_stats(&self) -> Result<ContractStats, DashboardError> {
        let contract = self.contract()?;
        if contract.owner().is_none() {
            contract.refresh().await?;
        }
        if let Some(stats) = contract.admin_stats()? {
            return Ok(stats);
        }
        contract.refresh().await?;
        contract
            .admin_stats()?
            .ok_or_else(|| DashboardError::Network("Contract stats unavailable".to_string()))
    }

    /// Compose every panel. Each panel runs inside its own component
    /// boundary so one failing read does not blank the page.
    pub async fn snapshot(&self) -> DashboardSnapshot {
        let balance = match self.contract() {
            Ok(contract) => {
                let contract = contract.clone();
                Boundary::component("balance")
                    .guard(async move {
                        let state = if contract.state().refreshed_at.is_none() {
                            contract.refresh().await?
                        } else {
                            contract.state()
                        };
                        Ok::<_, PiggyBankError>(BalancePanel::from_state(&state))
                    })
                    .await
            }
            Err(e) => Boundary::component("balance").reject(e.to_string()),
        };

        let timelock = match self.timelock() {
            Ok(status) => Guarded::Ready {
                value: TimelockPanel::from_status(status),
            },
            Err(e) => Boundary::component("countdown").reject(e.to_string()),
        };

        let admin = match &self.contract {
            Some(contract) if contract.is_owner() => {
                let contract = contract.clone();
                Some(
                    Boundary::component("admin")
                        .guard(async move {
                            contract
                                .admin_stats()?
                                .ok_or_else(|| PiggyBankError::network("Contract stats unavailable"))
                        })
                        .await,
                )
            }
            _ => None,
        };

        let bookmarks = match self.bookmarks.list() {
            Ok(drafts) => Guarded::Ready { value: drafts },
            Err(e) => Boundary::component("bookmarks").reject(e.to_string()),
        };

        DashboardSnapshot {
            session: self.session_info(),
            network: NetworkInfo {
                chain_id: self.config.chain_id,
                network_type: self.config.network_type().to_string(),
                contract_address: self.config.contract_address.clone(),
            },
            balance,
            timelock,
            admin,
            bookmarks,
            recent_transactions: self.recent.list(),
            transactions: self.tracker.records_snapshot(),
            toasts: self.tracker.toasts().list(),
        }
    }

    // ============================================================================
    // Writes
    // ============================================================================

    pub async fn deposit(&self, amount: &str) -> Result<Submission, DashboardError> {
        Ok(self.contract()?.deposit(amount).await?)
    }

    pub async fn withdraw(&self) -> Result<Submission, DashboardError> {
        Ok(self.contract()?.withdraw().await?)
    }

    pub async fn withdraw_all(&self) -> Result<Submission, DashboardError> {
        Ok(self.contract()?.withdraw_all().await?)
    }

    // ============================================================================
    // Transactions & toasts
    // ============================================================================

    pub fn recent_transactions(&self) -> Vec<ObservedTransaction> {
        self.recent.list()
    }

    pub fn submissions(&self) -> Vec<TxRecord> {
        self.tracker.records_snapshot()
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.tracker.toasts().list()
    }

    pub fn dismiss_toast(&self, id: &str) -> Result<(), DashboardError> {
        if self.tracker.toasts().dismiss(id) {
            Ok(())
        } else {
            Err(DashboardError::NotFound(format!("toast {}", id)))
        }
    }

    // ============================================================================
    // Saved drafts
    // ============================================================================

    pub fn list_drafts(&self) -> Result<Vec<SavedDraft>, DashboardError> {
        Ok(self.bookmarks.list()?)
    }

    pub fn save_draft(&self, request: SaveDraftRequest) -> Result<SavedDraft, DashboardError> {
        Ok(self
            .bookmarks
            .save(&request.name, &request.amount, request.unlock_time)?)
    }

    pub fn delete_draft(&self, id: &str) -> Result<(), DashboardError> {
        if self.bookmarks.delete(id)? {
            Ok(())
        } else {
            Err(DashboardError::NotFound(format!("draft {}", id)))
        }
    }

    // ============================================================================
    // Diagnostics
    // ============================================================================

    pub async fn diagnostics(&self) -> DiagnosticsReport {
        self.diagnostics.gather().await
    }

    pub fn clear_diagnostics(&self) -> Result<(), DashboardError> {
        Ok(self.diagnostics.clear()?)
    }
}
