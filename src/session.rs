//! Selected contract and its displayed state
//!
//! [`PiggybankSession`] is the single owner of the current selection and the
//! latest [`PiggybankState`]. Views borrow from it instead of fetching on their
//! own.
//!
//! Refreshes run in three steps so the network part can be spawned:
//! [`begin_refresh`](PiggybankSession::begin_refresh) hands out a ticket,
//! [`fetch`] does the queries, and [`apply`](PiggybankSession::apply) installs
//! the outcome only if it still belongs to the current selection and is newer
//! than what is already shown.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::amount::CcdAmount;
use crate::client::ContractQueryClient;
use crate::contract::{parse_contract_index, resolve_index, ContractMetadata};
use crate::error::{DecodeError, ResolutionError, SubmissionError};
use crate::state::{refresh_piggybank_state, PiggybankState};
use crate::transaction::{
    can_deposit, can_smash, SubmissionGate, SubmissionTracker, TransactionHash, TransactionKind,
};
use crate::wallet::WalletConnection;

/// Correlates an in-flight refresh with the selection it was started for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefreshTicket {
    pub index: u64,
    pub sequence: u64,
}

/// Result of [`fetch`], waiting to be applied
#[derive(Clone, Debug)]
pub struct RefreshOutcome {
    pub ticket: RefreshTicket,
    pub contract: Result<ContractMetadata, ResolutionError>,
    /// `None` when resolution failed and no view call was made
    pub state: Option<Result<PiggybankState, DecodeError>>,
}

/// Resolve the ticket's contract and read its state, without touching the session
pub async fn fetch<C>(client: &C, ticket: RefreshTicket, query_time: DateTime<Utc>) -> RefreshOutcome
where
    C: ContractQueryClient + ?Sized,
{
    let contract = resolve_index(client, ticket.index).await;
    let state = match &contract {
        Ok(contract) => Some(refresh_piggybank_state(client, contract, query_time).await),
        Err(_) => None,
    };
    RefreshOutcome {
        ticket,
        contract,
        state,
    }
}

pub struct PiggybankSession<C: ?Sized> {
    client: Arc<C>,
    gate: SubmissionGate,
    tracker: SubmissionTracker,
    selected: Option<u64>,
    next_sequence: u64,
    selection_floor: u64,
    applied_sequence: Option<u64>,
    contract: Option<Result<ContractMetadata, ResolutionError>>,
    state: Option<Result<PiggybankState, DecodeError>>,
}

impl<C> PiggybankSession<C>
where
    C: ContractQueryClient + ?Sized,
{
    pub fn new(client: Arc<C>, gate: SubmissionGate) -> Self {
        Self {
            client,
            gate,
            tracker: SubmissionTracker::new(),
            selected: None,
            next_sequence: 0,
            selection_floor: 0,
            applied_sequence: None,
            contract: None,
            state: None,
        }
    }

    pub fn client(&self) -> Arc<C> {
        Arc::clone(&self.client)
    }

    pub fn selected_index(&self) -> Option<u64> {
        self.selected
    }

    /// Resolved contract, if the last applied refresh succeeded
    pub fn contract(&self) -> Option<&ContractMetadata> {
        self.contract.as_ref().and_then(|c| c.as_ref().ok())
    }

    pub fn resolution_error(&self) -> Option<&ResolutionError> {
        self.contract.as_ref().and_then(|c| c.as_ref().err())
    }

    /// Displayed state; `None` until a refresh for the current selection was applied
    pub fn state(&self) -> Option<&Result<PiggybankState, DecodeError>> {
        self.state.as_ref()
    }

    /// Select the contract typed by the user
    ///
    /// Invalid input clears the selection and what was displayed for it.
    pub fn select(&mut self, input: &str) -> Result<RefreshTicket, ResolutionError> {
        match parse_contract_index(input) {
            Ok(index) => Ok(self.select_index(index)),
            Err(e) => {
                self.selected = None;
                self.clear_displayed();
                self.contract = Some(Err(e.clone()));
                Err(e)
            }
        }
    }

    pub fn select_index(&mut self, index: u64) -> RefreshTicket {
        if self.selected != Some(index) {
            log::debug!("Selecting contract {}", index);
            self.selected = Some(index);
            self.selection_floor = self.next_sequence;
            self.clear_displayed();
        }
        self.issue_ticket(index)
    }

    /// Ticket for re-reading the current selection
    pub fn begin_refresh(&mut self) -> Option<RefreshTicket> {
        self.selected.map(|index| self.issue_ticket(index))
    }

    /// Install `outcome` unless it is stale; returns whether it was applied
    pub fn apply(&mut self, outcome: RefreshOutcome) -> bool {
        let RefreshOutcome {
            ticket,
            contract,
            state,
        } = outcome;

        if self.selected != Some(ticket.index) || ticket.sequence < self.selection_floor {
            log::debug!(
                "Dropping refresh for contract {}: selection is now {:?}",
                ticket.index,
                self.selected
            );
            return false;
        }
        if self
            .applied_sequence
            .is_some_and(|applied| applied >= ticket.sequence)
        {
            log::debug!(
                "Dropping refresh #{} for contract {}: #{} already applied",
                ticket.sequence,
                ticket.index,
                self.applied_sequence.unwrap_or_default()
            );
            return false;
        }

        self.applied_sequence = Some(ticket.sequence);
        self.contract = Some(contract);
        self.state = state;
        true
    }

    /// Select `input` and load it before returning
    pub async fn select_and_refresh(
        &mut self,
        input: &str,
        query_time: DateTime<Utc>,
    ) -> Result<bool, ResolutionError> {
        let ticket = self.select(input)?;
        let outcome = fetch(self.client.as_ref(), ticket, query_time).await;
        Ok(self.apply(outcome))
    }

    /// Re-read the current selection; `false` when nothing is selected
    pub async fn refresh(&mut self, query_time: DateTime<Utc>) -> bool {
        match self.begin_refresh() {
            Some(ticket) => {
                let outcome = fetch(self.client.as_ref(), ticket, query_time).await;
                self.apply(outcome)
            }
            None => false,
        }
    }

    pub fn can_deposit(&self, account: Option<&str>) -> bool {
        can_deposit(account) && self.contract().is_some()
    }

    pub fn can_smash(&self, account: Option<&str>) -> bool {
        can_smash(account, self.contract())
    }

    pub fn is_submission_pending(&self) -> bool {
        self.tracker.is_pending()
    }

    /// Submit against the selected contract, refusing while another submission is pending
    pub async fn submit(
        &self,
        connection: Option<&dyn WalletConnection>,
        account: Option<&str>,
        kind: TransactionKind,
        amount: Option<CcdAmount>,
    ) -> Result<TransactionHash, SubmissionError> {
        let _pending = self.tracker.try_begin().ok_or_else(|| {
            log::warn!("⚠️  Ignoring {}: previous submission still pending", kind);
            SubmissionError::AlreadyPending
        })?;
        self.gate
            .submit(connection, account, self.contract(), kind, amount)
            .await
    }

    fn issue_ticket(&mut self, index: u64) -> RefreshTicket {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        RefreshTicket { index, sequence }
    }

    fn clear_displayed(&mut self) {
        self.contract = None;
        self.state = None;
        self.applied_sequence = None;
    }
}
