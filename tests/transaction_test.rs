//! Transaction submission gate tests
//!
//! Run with: cargo test --test transaction_test -- --nocapture

mod common;

use common::*;
use piggybank::{
    can_deposit, can_smash, CcdAmount, ContractMetadata, Energy, SubmissionError, SubmissionGate,
    TransactionHash, TransactionHashError, TransactionKind, UpdateContractPayload,
    WalletConnection, WalletError,
};
use rand::distributions::Alphanumeric;
use rand::Rng;

fn gate() -> SubmissionGate {
    SubmissionGate::new(Energy::new(30_000)).with_explorer_url("https://testnet.ccdscan.io")
}

fn one_ccd() -> CcdAmount {
    CcdAmount::from_micro_ccd(1_000_000)
}

fn random_account() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(50)
        .map(char::from)
        .collect()
}

#[tokio::test]
async fn test_missing_inputs_never_reach_wallet() {
    init_logging();
    let wallet = RecordingWallet::connected(OWNER);
    let contract = piggybank_metadata(0);
    let gate = gate();

    for mask in 0u8..7 {
        let connection = (mask & 1 != 0).then_some(&wallet as &dyn WalletConnection);
        let account = (mask & 2 != 0).then_some(OWNER);
        let contract = (mask & 4 != 0).then_some(&contract);

        for kind in [TransactionKind::Deposit, TransactionKind::Smash] {
            let result = gate
                .submit(connection, account, contract, kind, Some(one_ccd()))
                .await;
            let err = result.expect_err("incomplete request must be rejected");
            let expected = if connection.is_none() {
                SubmissionError::NotConnected
            } else if account.is_none() {
                SubmissionError::NoAccount
            } else {
                SubmissionError::NoContract
            };
            assert_eq!(err, expected, "mask {:03b} kind {}", mask, kind);
        }
    }

    assert_eq!(wallet.sent_count(), 0);
}

#[tokio::test]
async fn test_disconnected_wallet_is_not_connected() {
    init_logging();
    let wallet = RecordingWallet::disconnected();
    let contract = piggybank_metadata(0);

    let result = gate()
        .submit_deposit(Some(&wallet), Some(OWNER), Some(&contract), one_ccd())
        .await;

    assert_eq!(result, Err(SubmissionError::NotConnected));
    assert_eq!(wallet.sent_count(), 0);
}

#[tokio::test]
async fn test_deposit_sends_insert_payload() {
    init_logging();
    let wallet = RecordingWallet::connected(NON_OWNER);
    let contract = piggybank_metadata(0);

    let hash = gate()
        .submit_deposit(Some(&wallet), Some(NON_OWNER), Some(&contract), one_ccd())
        .await
        .expect("deposit succeeds");

    assert_eq!(hash.to_string(), tx_hash());
    let sent = wallet.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    let (account, payload) = &sent[0];
    assert_eq!(account, NON_OWNER);
    assert_eq!(payload.amount, one_ccd());
    assert_eq!(payload.address.index, 81);
    assert_eq!(payload.address.subindex, 0);
    assert_eq!(payload.receive_name.as_str(), "PiggyBank.insert");
    assert_eq!(payload.max_contract_execution_energy, Energy::new(30_000));
}

#[tokio::test]
async fn test_deposit_requires_positive_amount() {
    init_logging();
    let wallet = RecordingWallet::connected(OWNER);
    let contract = piggybank_metadata(0);
    let gate = gate();

    for amount in [None, Some(CcdAmount::ZERO)] {
        let result = gate
            .submit(
                Some(&wallet),
                Some(OWNER),
                Some(&contract),
                TransactionKind::Deposit,
                amount,
            )
            .await;
        assert!(
            matches!(result, Err(SubmissionError::InvalidAmount(_))),
            "amount {:?} gave {:?}",
            amount,
            result
        );
    }
    assert_eq!(wallet.sent_count(), 0);
}

#[tokio::test]
async fn test_smash_by_owner_sends_smash_payload() {
    init_logging();
    let wallet = RecordingWallet::connected(OWNER);
    let contract = piggybank_metadata(3_000_000);

    gate()
        .submit_smash(Some(&wallet), Some(OWNER), Some(&contract))
        .await
        .expect("owner may smash");

    let sent = wallet.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1.amount, CcdAmount::ZERO);
    assert_eq!(sent[0].1.receive_name.as_str(), "PiggyBank.smash");
}

#[tokio::test]
async fn test_smash_by_non_owner_is_rejected() {
    init_logging();
    let gate = gate();

    for _ in 0..32 {
        let account = random_account();
        let mut contract = piggybank_metadata(0);
        contract.owner = random_account();
        if account == contract.owner {
            continue;
        }
        let wallet = RecordingWallet::connected(&account);

        let result = gate
            .submit_smash(Some(&wallet), Some(account.as_str()), Some(&contract))
            .await;

        assert_eq!(
            result,
            Err(SubmissionError::NotOwner {
                account: account.clone(),
                owner: contract.owner.clone(),
            })
        );
        assert!(!can_smash(Some(account.as_str()), Some(&contract)));
        assert_eq!(wallet.sent_count(), 0);
    }
}

#[tokio::test]
async fn test_user_rejection_is_normalized() {
    init_logging();
    let contract = piggybank_metadata(0);
    let gate = gate();

    let mut rejections = vec![WalletError::UserRejected];
    rejections.extend([4001, 5000, 5001, 5002, 5003].map(|code| WalletError::Rejected {
        code,
        message: "user declined".to_string(),
    }));

    for rejection in rejections {
        let wallet = RecordingWallet::connected(OWNER);
        wallet.respond_with(Err(rejection.clone()));

        let result = gate
            .submit_deposit(Some(&wallet), Some(OWNER), Some(&contract), one_ccd())
            .await;

        assert_eq!(result, Err(SubmissionError::UserRejected), "{:?}", rejection);
        assert_eq!(wallet.sent_count(), 1);
    }
}

#[tokio::test]
async fn test_other_wallet_failures_are_transport_errors() {
    init_logging();
    let contract = piggybank_metadata(0);
    let gate = gate();

    let failures = [
        WalletError::Rejected {
            code: -32000,
            message: "insufficient funds".to_string(),
        },
        WalletError::Transport("relay closed".to_string()),
    ];

    for failure in failures {
        let wallet = RecordingWallet::connected(OWNER);
        wallet.respond_with(Err(failure.clone()));

        let result = gate
            .submit_smash(Some(&wallet), Some(OWNER), Some(&contract))
            .await;

        match result {
            Err(SubmissionError::TransportError { message }) => {
                assert_eq!(message, failure.to_string());
            }
            other => panic!("expected TransportError, got {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_wallet_disconnecting_mid_request() {
    init_logging();
    let wallet = RecordingWallet::connected(OWNER);
    wallet.respond_with(Err(WalletError::NotConnected));

    let result = gate()
        .submit_smash(Some(&wallet), Some(OWNER), Some(&piggybank_metadata(0)))
        .await;

    assert_eq!(result, Err(SubmissionError::NotConnected));
}

#[tokio::test]
async fn test_malformed_hash_is_transport_error() {
    init_logging();
    let contract = piggybank_metadata(0);

    for hash in ["", "not-hex", "abcd"] {
        let wallet = RecordingWallet::connected(OWNER);
        wallet.respond_with(Ok(hash.to_string()));

        let result = gate()
            .submit_deposit(Some(&wallet), Some(OWNER), Some(&contract), one_ccd())
            .await;

        assert!(
            matches!(result, Err(SubmissionError::TransportError { .. })),
            "hash {:?} gave {:?}",
            hash,
            result
        );
    }
}

#[test]
fn test_validate_collects_every_violation() {
    let gate = gate();
    let violations = match gate.validate(None, None, None, TransactionKind::Deposit, None) {
        Err(violations) => violations,
        Ok(_) => panic!("empty request validated"),
    };
    assert_eq!(violations.first(), &SubmissionError::NotConnected);
    let violations = violations.into_vec();

    assert_eq!(violations.len(), 4);
    assert_eq!(violations[0], SubmissionError::NotConnected);
    assert_eq!(violations[1], SubmissionError::NoAccount);
    assert_eq!(violations[2], SubmissionError::NoContract);
    assert!(matches!(violations[3], SubmissionError::InvalidAmount(_)));
    assert!(violations.iter().all(SubmissionError::is_validation));
}

#[test]
fn test_validate_smash_reports_connection_and_ownership() {
    let wallet = RecordingWallet::disconnected();
    let contract = piggybank_metadata(0);

    let violations = match gate().validate(
        Some(&wallet),
        Some(NON_OWNER),
        Some(&contract),
        TransactionKind::Smash,
        None,
    ) {
        Err(violations) => violations.into_vec(),
        Ok(_) => panic!("disconnected wallet validated"),
    };

    assert_eq!(
        violations,
        vec![
            SubmissionError::NotConnected,
            SubmissionError::NotOwner {
                account: NON_OWNER.to_string(),
                owner: OWNER.to_string(),
            },
        ]
    );
}

#[test]
fn test_validate_complete_request_reports_only_ownership() {
    let wallet = RecordingWallet::connected(NON_OWNER);
    let contract = piggybank_metadata(0);

    let violations = match gate().validate(
        Some(&wallet),
        Some(NON_OWNER),
        Some(&contract),
        TransactionKind::Smash,
        None,
    ) {
        Err(violations) => violations,
        Ok(_) => panic!("non-owner smash validated"),
    };

    assert_eq!(violations.iter().count(), 1);
    assert_eq!(
        violations.into_first(),
        SubmissionError::NotOwner {
            account: NON_OWNER.to_string(),
            owner: OWNER.to_string(),
        }
    );
}

#[test]
fn test_validate_accepts_complete_deposit() {
    let wallet = RecordingWallet::connected(NON_OWNER);
    let contract = piggybank_metadata(0);

    let validated = gate()
        .validate(
            Some(&wallet),
            Some(NON_OWNER),
            Some(&contract),
            TransactionKind::Deposit,
            Some(one_ccd()),
        )
        .unwrap_or_else(|violations| panic!("rejected: {:?}", violations));

    assert_eq!(validated.account, NON_OWNER);
    assert_eq!(validated.payload.amount, one_ccd());
    assert_eq!(validated.payload.receive_name.as_str(), "PiggyBank.insert");
}

#[test]
fn test_payload_json_shape() {
    let payload = UpdateContractPayload::new(
        CcdAmount::from_micro_ccd(2_500_000),
        &piggybank_metadata(0),
        TransactionKind::Deposit,
        Energy::new(30_000),
    );

    let json: serde_json::Value = serde_json::from_str(&payload.to_json().unwrap()).unwrap();

    assert_eq!(
        json,
        serde_json::json!({
            "amount": 2_500_000,
            "address": { "index": 81, "subindex": 0 },
            "receiveName": "PiggyBank.insert",
            "maxContractExecutionEnergy": 30_000
        })
    );
}

#[test]
fn test_action_availability() {
    let contract: ContractMetadata = piggybank_metadata(0);

    assert!(can_deposit(Some(NON_OWNER)));
    assert!(!can_deposit(None));
    assert!(can_smash(Some(OWNER), Some(&contract)));
    assert!(!can_smash(Some(NON_OWNER), Some(&contract)));
    assert!(!can_smash(None, Some(&contract)));
    assert!(!can_smash(Some(OWNER), None));
}

#[test]
fn test_transaction_hash_parsing() {
    let hash: TransactionHash = tx_hash().parse().unwrap();
    assert_eq!(hash.as_bytes(), &[0xab; 32]);
    assert_eq!(hash.to_string(), tx_hash());

    assert_eq!(
        "ab".repeat(31).parse::<TransactionHash>(),
        Err(TransactionHashError::InvalidLength(31))
    );
    assert!(matches!(
        "zz".repeat(32).parse::<TransactionHash>(),
        Err(TransactionHashError::InvalidHex(_))
    ));
    assert_eq!(
        TransactionHashError::InvalidLength(2).to_string(),
        "expected 32 bytes, got 2"
    );
}
