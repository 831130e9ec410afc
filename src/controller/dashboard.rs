//! Dashboard controller.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use tokio::sync::{watch, Mutex};

use super::state::{DashboardState, TransactionBanner, TransactionStatus};
use crate::config::DaoConfig;
use crate::contract::ContractProvider;
use crate::errors::DaoError;
use crate::registry::{self, AgentRecord, AgentStatus, LoadOutcome, NewAgent};
use crate::views;
use crate::wallet::{decrypt_with_signature, DecryptionSession, Wallet};

/// Owns the dashboard state and executes registry commands.
///
/// Cloning is cheap; clones share the same state.
#[derive(Clone)]
pub struct DaoController {
    inner: Arc<Inner>,
}

struct Inner {
    provider: Arc<dyn ContractProvider>,
    config: DaoConfig,
    wallet: RwLock<Option<Arc<dyn Wallet>>>,
    session: RwLock<Option<DecryptionSession>>,
    state: watch::Sender<Arc<DashboardState>>,
    /// Held for the duration of every registry command.
    in_flight: Mutex<()>,
    /// Bumped whenever a banner is shown; a scheduled dismissal only clears
    /// the banner whose generation it captured.
    banner_generation: AtomicU64,
}

fn update_state(state: &watch::Sender<Arc<DashboardState>>, f: impl FnOnce(&mut DashboardState)) {
    state.send_modify(|current| f(Arc::make_mut(current)));
}

/// Applies `reset` to the published state when dropped, whether the command
/// that set the flag finished or was dropped mid-flight.
struct ResetOnDrop {
    inner: Arc<Inner>,
    reset: fn(&mut DashboardState),
}

impl Drop for ResetOnDrop {
    fn drop(&mut self) {
        update_state(&self.inner.state, self.reset);
    }
}

/// Clears a mutation's pending banner if the mutation is dropped before it
/// settles. A settled mutation has already shown a newer banner, so the
/// generation no longer matches and dropping is a no-op.
struct PendingBanner<'a> {
    inner: Arc<Inner>,
    generation: u64,
    operation: &'a str,
}

impl Drop for PendingBanner<'_> {
    fn drop(&mut self) {
        let inner = &self.inner;
        let generation = self.generation;
        let cleared = inner.state.send_if_modified(|current| {
            if inner.banner_generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            Arc::make_mut(current).transaction = None;
            true
        });
        if cleared {
            log::warn!("{} abandoned before completion", self.operation);
        }
    }
}

impl DaoController {
    pub fn new(provider: Arc<dyn ContractProvider>, config: DaoConfig) -> Self {
        let (state, _) = watch::channel(Arc::new(DashboardState::default()));
        Self {
            inner: Arc::new(Inner {
                provider,
                config,
                wallet: RwLock::new(None),
                session: RwLock::new(None),
                state,
                in_flight: Mutex::new(()),
                banner_generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &DaoConfig {
        &self.inner.config
    }

    /// Current state.
    pub fn snapshot(&self) -> Arc<DashboardState> {
        self.inner.state.borrow().clone()
    }

    /// Receive every published state.
    pub fn subscribe(&self) -> watch::Receiver<Arc<DashboardState>> {
        self.inner.state.subscribe()
    }

    // -----------------------------------------------------------------------
    // Wallet
    // -----------------------------------------------------------------------

    pub fn connect_wallet(&self, wallet: Arc<dyn Wallet>) {
        let address = wallet.address();
        log::info!("wallet connected: {}", address);
        *self.inner.wallet.write() = Some(wallet);
        // The session embeds the chain id, so it is rebuilt on next use.
        *self.inner.session.write() = None;
        self.update(|s| s.wallet_address = Some(address));
    }

    pub fn disconnect_wallet(&self) {
        *self.inner.wallet.write() = None;
        *self.inner.session.write() = None;
        self.update(|s| s.wallet_address = None);
    }

    pub fn wallet(&self) -> Option<Arc<dyn Wallet>> {
        self.inner.wallet.read().clone()
    }

    /// Whether the connected wallet owns an agent with this owner address.
    pub fn is_owner(&self, owner: &str) -> bool {
        views::is_owner(self.snapshot().wallet_address.as_deref(), owner)
    }

    fn require_wallet(&self) -> Result<Arc<dyn Wallet>, DaoError> {
        self.wallet().ok_or(DaoError::WalletNotConnected)
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    /// Build the decryption session and perform the first load.
    pub async fn initialize(&self) {
        self.refresh_session().await;
        if let Err(e) = self.load().await {
            log::error!("initial load failed: {}", e);
        }
    }

    async fn refresh_session(&self) -> DecryptionSession {
        let wallet = self.wallet();
        let session = DecryptionSession::initialize(
            self.inner.provider.as_ref(),
            wallet.as_deref(),
            Utc::now(),
            self.inner.config.session_duration_days,
        )
        .await;
        *self.inner.session.write() = Some(session.clone());
        session
    }

    /// Re-read the whole registry from the contract.
    ///
    /// An unavailable contract leaves the current agents untouched.
    pub async fn load(&self) -> Result<LoadOutcome, DaoError> {
        let _guard = self.inner.in_flight.lock().await;
        self.load_locked().await
    }

    async fn load_locked(&self) -> Result<LoadOutcome, DaoError> {
        self.update(|s| s.refreshing = true);
        let _refreshing = self.reset_on_drop(|s| {
            s.refreshing = false;
            s.loading = false;
        });
        let result = registry::load_agents(self.inner.provider.as_ref()).await;
        match &result {
            Ok(LoadOutcome::Loaded(snapshot)) => {
                let snapshot = snapshot.clone();
                self.update(move |s| {
                    s.agents = snapshot.agents;
                    s.fund_value = snapshot.fund.total_votes;
                    s.active_agents = snapshot.fund.active_agents;
                    s.skipped = snapshot.skipped;
                });
            }
            Ok(LoadOutcome::Unavailable) => {}
            Err(e) => log::error!("error loading agents: {}", e),
        }
        result
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    pub async fn create_agent(&self, new: NewAgent) -> Result<AgentRecord, DaoError> {
        new.validate()?;
        let owner = self.require_wallet()?.address();

        self.update(|s| s.creating = true);
        let _creating = self.reset_on_drop(|s| s.creating = false);
        self.run_mutation(
            "Creation",
            "Encoding agent strategy and vote...",
            "Agent created",
            registry::create_agent(self.inner.provider.as_ref(), &owner, &new, Utc::now()),
        )
        .await
    }

    /// Replace an agent's vote. Non-positive votes are refused before any
    /// banner is shown.
    pub async fn update_vote(&self, id: &str, new_vote: f64) -> Result<AgentRecord, DaoError> {
        registry::validate_vote(new_vote)?;
        let caller = self.require_wallet()?.address();
        self.run_mutation(
            "Update",
            "Processing vote update...",
            "Vote update completed",
            registry::update_agent_vote(self.inner.provider.as_ref(), &caller, id, new_vote),
        )
        .await
    }

    pub async fn toggle_status(&self, id: &str) -> Result<AgentStatus, DaoError> {
        let caller = self.require_wallet()?.address();
        let record = self
            .run_mutation(
                "Status change",
                "Updating agent status...",
                "Agent status updated",
                registry::toggle_agent_status(self.inner.provider.as_ref(), &caller, id),
            )
            .await?;
        Ok(record.status)
    }

    /// Drop index entries whose agent blob is missing.
    pub async fn prune_index(&self) -> Result<Vec<String>, DaoError> {
        self.require_wallet()?;
        self.run_mutation(
            "Prune",
            "Pruning registry index...",
            "Registry index pruned",
            registry::prune_dangling_keys(self.inner.provider.as_ref()),
        )
        .await
    }

    /// Index entries whose agent blob is missing, without rewriting anything.
    pub async fn dangling_index_entries(&self) -> Result<Vec<String>, DaoError> {
        let contract = self.inner.provider.read_only().await.ok_or_else(|| {
            DaoError::ContractUnavailable("Failed to get contract".to_string())
        })?;
        registry::find_dangling_keys(contract.as_ref()).await
    }

    async fn run_mutation<T, F>(
        &self,
        operation: &str,
        pending: &str,
        success: &str,
        command: F,
    ) -> Result<T, DaoError>
    where
        F: Future<Output = Result<T, DaoError>>,
    {
        let _guard = self.inner.in_flight.lock().await;
        let _pending = PendingBanner {
            inner: Arc::clone(&self.inner),
            generation: self.show_banner(TransactionStatus::Pending, pending),
            operation,
        };

        match command.await {
            Ok(value) => {
                let generation = self.show_banner(TransactionStatus::Success, success);
                self.schedule_dismiss(generation, self.inner.config.success_dismiss());
                if let Err(e) = self.load_locked().await {
                    log::error!("reload after {} failed: {}", operation, e);
                }
                Ok(value)
            }
            Err(e) => {
                log::warn!("{} failed: {}", operation, e);
                let generation =
                    self.show_banner(TransactionStatus::Error, e.banner_message(operation));
                self.schedule_dismiss(generation, self.inner.config.error_dismiss());
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Decryption
    // -----------------------------------------------------------------------

    /// Reveal an encoded value after the wallet signs the session message.
    pub async fn try_decrypt(&self, encrypted: &str) -> Result<f64, DaoError> {
        let wallet = self.require_wallet()?;
        let existing = self.inner.session.read().clone();
        let session = match existing {
            Some(session) => session,
            None => self.refresh_session().await,
        };

        self.update(|s| s.decrypting = true);
        let _decrypting = self.reset_on_drop(|s| s.decrypting = false);
        decrypt_with_signature(
            Some(wallet.as_ref()),
            &session,
            encrypted,
            self.inner.config.decrypt_delay(),
        )
        .await
    }

    /// Like [`try_decrypt`](Self::try_decrypt), with `None` standing for any
    /// failure, including a declined signature.
    pub async fn decrypt(&self, encrypted: &str) -> Option<f64> {
        match self.try_decrypt(encrypted).await {
            Ok(value) => Some(value),
            Err(e) => {
                log::error!("Decryption failed: {}", e);
                None
            }
        }
    }

    /// Reveal the vote of a loaded agent.
    pub async fn decrypt_agent_vote(&self, id: &str) -> Result<f64, DaoError> {
        let encrypted = self
            .snapshot()
            .agent(id)
            .map(|a| a.encrypted_vote.clone())
            .ok_or_else(|| DaoError::AgentNotFound {
                agent_id: id.to_string(),
            })?;
        self.try_decrypt(&encrypted).await
    }

    // -----------------------------------------------------------------------
    // State plumbing
    // -----------------------------------------------------------------------

    fn update(&self, f: impl FnOnce(&mut DashboardState)) {
        update_state(&self.inner.state, f);
    }

    fn reset_on_drop(&self, reset: fn(&mut DashboardState)) -> ResetOnDrop {
        ResetOnDrop {
            inner: Arc::clone(&self.inner),
            reset,
        }
    }

    fn show_banner(&self, status: TransactionStatus, message: impl Into<String>) -> u64 {
        let generation = self.inner.banner_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let banner = TransactionBanner::new(status, message);
        self.update(|s| s.transaction = Some(banner));
        generation
    }

    fn schedule_dismiss(&self, generation: u64, delay: Duration) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            inner.state.send_if_modified(|current| {
                if inner.banner_generation.load(Ordering::SeqCst) != generation {
                    return false;
                }
                Arc::make_mut(current).transaction = None;
                true
            });
        });
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::contract::{
        ContractError, ContractReader, ContractWriter, LocalProvider, MemoryContract,
        PendingTransaction,
    };
    use crate::fhe;
    use crate::wallet::LocalWallet;

    /// Contract whose writes never confirm within a test's lifetime.
    struct StallingContract {
        inner: MemoryContract,
    }

    #[async_trait]
    impl ContractReader for StallingContract {
        async fn is_available(&self) -> Result<bool, ContractError> {
            self.inner.is_available().await
        }

        async fn address(&self) -> Result<String, ContractError> {
            self.inner.address().await
        }

        async fn get_data(&self, key: &str) -> Result<Vec<u8>, ContractError> {
            self.inner.get_data(key).await
        }
    }

    #[async_trait]
    impl ContractWriter for StallingContract {
        async fn set_data(
            &self,
            key: &str,
            value: &[u8],
        ) -> Result<PendingTransaction, ContractError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            self.inner.set_data(key, value).await
        }
    }

    fn fast_config() -> DaoConfig {
        DaoConfig {
            decrypt_delay_ms: 0,
            success_dismiss_ms: 20,
            error_dismiss_ms: 20,
            ..Default::default()
        }
    }

    fn controller_with(config: DaoConfig) -> (Arc<MemoryContract>, DaoController) {
        let contract = Arc::new(MemoryContract::new());
        let provider = Arc::new(LocalProvider::new(contract.clone()));
        (contract, DaoController::new(provider, config))
    }

    fn connected(config: DaoConfig) -> (Arc<MemoryContract>, DaoController, Arc<LocalWallet>) {
        let (contract, controller) = controller_with(config);
        let wallet = Arc::new(LocalWallet::random(31337));
        controller.connect_wallet(wallet.clone());
        (contract, controller, wallet)
    }

    fn new_agent(vote: f64) -> NewAgent {
        NewAgent {
            strategy: 1.5,
            initial_vote: vote,
        }
    }

    #[tokio::test]
    async fn test_initialize_clears_loading() {
        let (_contract, controller) = controller_with(fast_config());
        assert!(controller.snapshot().loading);
        controller.initialize().await;
        let state = controller.snapshot();
        assert!(!state.loading);
        assert!(!state.refreshing);
        assert!(state.agents.is_empty());
    }

    #[tokio::test]
    async fn test_mutation_requires_wallet() {
        let (contract, controller) = controller_with(fast_config());
        let err = controller.create_agent(new_agent(10.0)).await.unwrap_err();
        assert!(matches!(err, DaoError::WalletNotConnected));
        assert!(controller.snapshot().transaction.is_none());
        assert!(contract.is_empty());

        assert!(matches!(
            controller.toggle_status("x").await,
            Err(DaoError::WalletNotConnected)
        ));
    }

    #[tokio::test]
    async fn test_create_reloads_and_banner_dismisses() {
        let (_contract, controller, wallet) = connected(fast_config());
        let record = controller.create_agent(new_agent(40.0)).await.unwrap();

        let state = controller.snapshot();
        assert_eq!(state.agents, vec![record.clone()]);
        assert_eq!(state.fund_value, 40.0);
        assert_eq!(state.active_agents, 1);
        assert!(!state.creating);
        assert_eq!(
            state.transaction,
            Some(TransactionBanner::new(TransactionStatus::Success, "Agent created"))
        );
        assert!(controller.is_owner(&wallet.address()));
        assert!(controller.is_owner(&record.owner));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(controller.snapshot().transaction.is_none());
    }

    #[tokio::test]
    async fn test_toggle_updates_fund() {
        let (_contract, controller, _wallet) = connected(fast_config());
        let a = controller.create_agent(new_agent(10.0)).await.unwrap();
        controller.create_agent(new_agent(5.0)).await.unwrap();
        assert_eq!(controller.snapshot().fund_value, 15.0);

        let status = controller.toggle_status(&a.id).await.unwrap();
        assert_eq!(status, AgentStatus::Inactive);
        let state = controller.snapshot();
        assert_eq!(state.fund_value, 5.0);
        assert_eq!(state.active_agents, 1);
        assert_eq!(state.agents.len(), 2);
    }

    #[tokio::test]
    async fn test_update_vote_reflected_after_reload() {
        let (_contract, controller, _wallet) = connected(fast_config());
        let a = controller.create_agent(new_agent(10.0)).await.unwrap();
        controller.update_vote(&a.id, 72.5).await.unwrap();
        assert_eq!(controller.snapshot().fund_value, 72.5);
    }

    #[tokio::test]
    async fn test_error_banner_for_non_owner() {
        let (_contract, controller, _wallet) = connected(fast_config());
        let a = controller.create_agent(new_agent(10.0)).await.unwrap();

        controller.connect_wallet(Arc::new(LocalWallet::random(31337)));
        let err = controller.toggle_status(&a.id).await.unwrap_err();
        assert!(matches!(err, DaoError::NotOwner { .. }));

        let banner = controller.snapshot().transaction.clone().unwrap();
        assert_eq!(banner.status, TransactionStatus::Error);
        assert!(banner.message.starts_with("Status change failed: Only the owner"));
    }

    #[tokio::test]
    async fn test_rejected_transaction_banner() {
        let (contract, controller, _wallet) = connected(fast_config());
        contract.fail_next_write(ContractError::Rejected("declined in wallet".to_string()));
        assert!(controller.create_agent(new_agent(1.0)).await.is_err());

        let banner = controller.snapshot().transaction.clone().unwrap();
        assert_eq!(
            banner,
            TransactionBanner::new(TransactionStatus::Error, "Transaction rejected by user")
        );
    }

    #[tokio::test]
    async fn test_stale_dismiss_keeps_newer_banner() {
        let config = DaoConfig {
            success_dismiss_ms: 10_000,
            error_dismiss_ms: 20,
            decrypt_delay_ms: 0,
            ..Default::default()
        };
        let (_contract, controller, _wallet) = connected(config);

        // Error banner scheduled to clear after 20ms...
        assert!(controller.update_vote("missing", 1.0).await.is_err());
        // ...replaced by a success banner that should outlive it.
        controller.create_agent(new_agent(3.0)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        let banner = controller.snapshot().transaction.clone().unwrap();
        assert_eq!(banner.status, TransactionStatus::Success);
    }

    #[tokio::test]
    async fn test_concurrent_creates_both_indexed() {
        let (_contract, controller, _wallet) = connected(fast_config());
        let (a, b) = tokio::join!(
            controller.create_agent(new_agent(1.0)),
            controller.create_agent(new_agent(2.0))
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        controller.load().await.unwrap();
        let state = controller.snapshot();
        assert_eq!(state.agents.len(), 2);
        assert!(state.agent(&a.id).is_some());
        assert!(state.agent(&b.id).is_some());
        assert_eq!(state.fund_value, 3.0);
    }

    #[tokio::test]
    async fn test_decrypt_with_and_without_wallet() {
        let (_contract, controller) = controller_with(fast_config());
        assert_eq!(controller.decrypt(&fhe::encode(9.0)).await, None);

        controller.connect_wallet(Arc::new(LocalWallet::random(5)));
        assert_eq!(controller.decrypt(&fhe::encode(9.0)).await, Some(9.0));
        assert!(!controller.snapshot().decrypting);
    }

    #[tokio::test]
    async fn test_decrypt_agent_vote() {
        let (_contract, controller, _wallet) = connected(fast_config());
        let a = controller.create_agent(new_agent(12.0)).await.unwrap();
        assert_eq!(controller.decrypt_agent_vote(&a.id).await.unwrap(), 12.0);
        assert!(matches!(
            controller.decrypt_agent_vote("unknown").await,
            Err(DaoError::AgentNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_unavailable_contract_keeps_agents() {
        let (contract, controller, _wallet) = connected(fast_config());
        controller.create_agent(new_agent(4.0)).await.unwrap();

        contract.set_available(false);
        let outcome = controller.load().await.unwrap();
        assert_eq!(outcome, LoadOutcome::Unavailable);
        assert_eq!(controller.snapshot().agents.len(), 1);
    }

    #[tokio::test]
    async fn test_subscribers_see_updates() {
        let (_contract, controller, _wallet) = connected(fast_config());
        let mut rx = controller.subscribe();
        assert!(!rx.has_changed().unwrap());

        controller.create_agent(new_agent(2.0)).await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().agents.len(), 1);
    }

    #[tokio::test]
    async fn test_aborted_mutation_releases_state() {
        let contract = Arc::new(StallingContract {
            inner: MemoryContract::new(),
        });
        let controller = DaoController::new(Arc::new(LocalProvider::new(contract)), fast_config());
        controller.connect_wallet(Arc::new(LocalWallet::random(31337)));

        let task = tokio::spawn({
            let controller = controller.clone();
            async move { controller.create_agent(new_agent(5.0)).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        let state = controller.snapshot();
        assert!(state.creating);
        assert_eq!(
            state.transaction.as_ref().map(|b| b.status),
            Some(TransactionStatus::Pending)
        );

        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());

        let state = controller.snapshot();
        assert!(!state.creating);
        assert!(state.transaction.is_none());

        // The in-flight guard went with the aborted command.
        let outcome = tokio::time::timeout(Duration::from_secs(1), controller.load())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(outcome, LoadOutcome::Loaded(_)));
        assert!(!controller.snapshot().refreshing);
    }

    #[tokio::test]
    async fn test_invalid_vote_rejected_without_banner() {
        let (_contract, controller, _wallet) = connected(fast_config());
        let a = controller.create_agent(new_agent(10.0)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(controller.snapshot().transaction.is_none());

        for vote in [0.0, -3.0, f64::NAN] {
            let err = controller.update_vote(&a.id, vote).await.unwrap_err();
            assert!(matches!(err, DaoError::InvalidInput(_)));
        }
        let state = controller.snapshot();
        assert!(state.transaction.is_none());
        assert_eq!(state.fund_value, 10.0);
    }

    #[tokio::test]
    async fn test_dangling_entries_listed_without_rewrite() {
        let (contract, controller) = controller_with(fast_config());
        contract.seed(
            registry::AGENT_KEYS_KEY,
            serde_json::to_vec(&["ghost"]).unwrap(),
        );
        let height = contract.block_height();

        let dangling = controller.dangling_index_entries().await.unwrap();
        assert_eq!(dangling, vec!["ghost"]);
        assert_eq!(contract.block_height(), height);
        assert!(controller.snapshot().transaction.is_none());
    }

    #[tokio::test]
    async fn test_prune_index() {
        let (contract, controller, _wallet) = connected(fast_config());
        contract.seed(
            registry::AGENT_KEYS_KEY,
            serde_json::to_vec(&["ghost"]).unwrap(),
        );
        let removed = controller.prune_index().await.unwrap();
        assert_eq!(removed, vec!["ghost"]);
    }
}
