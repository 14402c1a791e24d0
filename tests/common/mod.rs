//! Shared test fixtures
//!
//! - `MockQueryClient`: in-memory node with call counters
//! - `RecordingWallet`: wallet that records every payload it is asked to sign
//! - piggybank fixtures matching contract 81 on testnet

#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use piggybank::{
    CcdAmount, ClientError, ContractAddress, ContractMetadata, ContractName, ContractQueryClient,
    InstanceInfo, InvokeResult, ReceiveName, UpdateContractPayload, WalletConnection, WalletError,
};
use tokio::sync::Notify;

pub const PIGGYBANK_INDEX: u64 = 81;
pub const OWNER: &str = "4f9AxqoLJvQ1wWMbXKRrYDvTJ4jS2GUdpvNRcgC9gCkbLyZkrN";
pub const NON_OWNER: &str = "3kBx2h5Y2veb4hZgAJWPrr8RyQESKm5TjzF3ti1QQ4VSYLwK1G";

/// Initialize logging for tests (only once, subsequent calls are no-ops)
pub fn init_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}

pub fn tx_hash() -> String {
    "ab".repeat(32)
}

pub fn piggybank_methods(name: &str) -> Vec<String> {
    ["insert", "smash", "view"]
        .iter()
        .map(|entrypoint| format!("{}.{}", name, entrypoint))
        .collect()
}

/// Instance info as the node reports it for contract 81
pub fn piggybank_instance(balance: u64) -> InstanceInfo {
    InstanceInfo {
        version: 1,
        name: "init_PiggyBank".to_string(),
        owner: OWNER.to_string(),
        amount: CcdAmount::from_micro_ccd(balance),
        methods: piggybank_methods("PiggyBank"),
    }
}

/// Resolved metadata for contract 81
pub fn piggybank_metadata(balance: u64) -> ContractMetadata {
    ContractMetadata {
        version: 1,
        index: PIGGYBANK_INDEX,
        name: ContractName::from_init_name("init_PiggyBank").expect("valid init name"),
        balance: CcdAmount::from_micro_ccd(balance),
        owner: OWNER.to_string(),
        methods: piggybank_methods("PiggyBank").into_iter().collect::<BTreeSet<_>>(),
    }
}

pub fn view_success(bytes: &[u8]) -> InvokeResult {
    InvokeResult::Success {
        return_value: Some(bytes.to_vec()),
        used_energy: 340,
    }
}

/// In-memory node
#[derive(Default)]
pub struct MockQueryClient {
    instances: Mutex<HashMap<u64, InstanceInfo>>,
    views: Mutex<HashMap<u64, InvokeResult>>,
    unreachable: AtomicBool,
    pub info_calls: AtomicUsize,
    pub invoke_calls: AtomicUsize,
    pub invoked_methods: Mutex<Vec<(ContractAddress, String)>>,
}

impl MockQueryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Node holding an intact piggybank at index 81
    pub fn with_piggybank() -> Self {
        let client = Self::new();
        client.insert(PIGGYBANK_INDEX, piggybank_instance(0), view_success(&[0]));
        client
    }

    pub fn insert(&self, index: u64, info: InstanceInfo, view: InvokeResult) {
        self.instances.lock().unwrap().insert(index, info);
        self.views.lock().unwrap().insert(index, view);
    }

    pub fn set_view(&self, index: u64, view: InvokeResult) {
        self.views.lock().unwrap().insert(index, view);
    }

    pub fn set_balance(&self, index: u64, balance: u64) {
        if let Some(info) = self.instances.lock().unwrap().get_mut(&index) {
            info.amount = CcdAmount::from_micro_ccd(balance);
        }
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub fn info_calls(&self) -> usize {
        self.info_calls.load(Ordering::SeqCst)
    }

    pub fn invoke_calls(&self) -> usize {
        self.invoke_calls.load(Ordering::SeqCst)
    }

    fn check_reachable(&self) -> Result<(), ClientError> {
        if self.unreachable.load(Ordering::SeqCst) {
            Err(ClientError::connection_failed("connection refused"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ContractQueryClient for MockQueryClient {
    async fn get_instance_info(
        &self,
        address: ContractAddress,
    ) -> Result<Option<InstanceInfo>, ClientError> {
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;
        if address.subindex != 0 {
            return Ok(None);
        }
        Ok(self.instances.lock().unwrap().get(&address.index).cloned())
    }

    async fn invoke_contract(
        &self,
        address: ContractAddress,
        method: &ReceiveName,
    ) -> Result<InvokeResult, ClientError> {
        self.invoke_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;
        self.invoked_methods
            .lock()
            .unwrap()
            .push((address, method.to_string()));
        self.views
            .lock()
            .unwrap()
            .get(&address.index)
            .cloned()
            .ok_or_else(|| ClientError::Rpc {
                code: -32000,
                message: format!("no instance at {}", address),
            })
    }
}

/// Wallet double that records what it is asked to sign
pub struct RecordingWallet {
    account: Mutex<Option<String>>,
    response: Mutex<Result<String, WalletError>>,
    ping_response: Mutex<Result<(), WalletError>>,
    hold: AtomicBool,
    pub entered: Notify,
    pub release: Notify,
    hold_pings: AtomicBool,
    pub ping_entered: Notify,
    pub ping_release: Notify,
    pub sent: Mutex<Vec<(String, UpdateContractPayload)>>,
    pub pings: AtomicUsize,
}

impl RecordingWallet {
    pub fn connected(account: &str) -> Self {
        Self {
            account: Mutex::new(Some(account.to_string())),
            response: Mutex::new(Ok(tx_hash())),
            ping_response: Mutex::new(Ok(())),
            hold: AtomicBool::new(false),
            entered: Notify::new(),
            release: Notify::new(),
            hold_pings: AtomicBool::new(false),
            ping_entered: Notify::new(),
            ping_release: Notify::new(),
            sent: Mutex::new(Vec::new()),
            pings: AtomicUsize::new(0),
        }
    }

    pub fn disconnected() -> Self {
        let wallet = Self::connected("unused");
        wallet.disconnect();
        wallet
    }

    pub fn disconnect(&self) {
        *self.account.lock().unwrap() = None;
    }

    pub fn respond_with(&self, response: Result<String, WalletError>) {
        *self.response.lock().unwrap() = response;
    }

    pub fn fail_pings(&self, error: Option<WalletError>) {
        *self.ping_response.lock().unwrap() = match error {
            Some(e) => Err(e),
            None => Ok(()),
        };
    }

    /// Make `sign_and_send_transaction` wait for `release` after notifying `entered`
    pub fn hold_submissions(&self) {
        self.hold.store(true, Ordering::SeqCst);
    }

    /// Make `ping` wait for `ping_release` after notifying `ping_entered`
    pub fn hold_pings(&self) {
        self.hold_pings.store(true, Ordering::SeqCst);
    }

    /// Let the held ping finish and answer later pings immediately
    pub fn release_pings(&self) {
        self.hold_pings.store(false, Ordering::SeqCst);
        self.ping_release.notify_one();
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn ping_count(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletConnection for RecordingWallet {
    fn name(&self) -> &str {
        "recording wallet"
    }

    fn account(&self) -> Option<String> {
        self.account.lock().unwrap().clone()
    }

    async fn connect(&self) -> Result<String, WalletError> {
        self.account().ok_or(WalletError::NotConnected)
    }

    async fn sign_and_send_transaction(
        &self,
        account: &str,
        payload: &UpdateContractPayload,
    ) -> Result<String, WalletError> {
        self.sent
            .lock()
            .unwrap()
            .push((account.to_string(), payload.clone()));
        if self.hold.load(Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.response.lock().unwrap().clone()
    }

    async fn ping(&self) -> Result<(), WalletError> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        if self.hold_pings.load(Ordering::SeqCst) {
            self.ping_entered.notify_one();
            self.ping_release.notified().await;
        }
        self.ping_response.lock().unwrap().clone()
    }
}
