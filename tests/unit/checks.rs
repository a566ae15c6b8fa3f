use node_conformance::adapter::ScriptedAdapter;
use node_conformance::harness::{checks, run_procedure, Procedure, TestHandler};
use node_conformance::types::{Block, BlockHeader, TestOutcome};
use num_bigint::BigInt;

use crate::common::{
    conforming_adapter, fast_settings, fixture_block, fixture_header, load_bitcoin_fixture,
    BLOCK_HASH, BLOCK_HEIGHT, COIN,
};

fn outcome_with(adapter: &ScriptedAdapter, procedure: Procedure) -> TestOutcome {
    let dataset = load_bitcoin_fixture();
    let settings = fast_settings();
    let handler = TestHandler {
        chain: adapter,
        test_data: &dataset,
        settings: &settings,
    };
    run_procedure(procedure, &handler)
}

fn failure_messages(outcome: TestOutcome) -> Vec<String> {
    match outcome {
        TestOutcome::Failed(messages) => messages,
        other => panic!("expected failure, got {}", other),
    }
}

#[test]
fn test_conforming_node_passes_every_check() {
    let adapter = conforming_adapter(&load_bitcoin_fixture());
    let procedures: [Procedure; 9] = [
        checks::get_block_hash,
        checks::get_block,
        checks::get_transaction,
        checks::get_transaction_for_mempool,
        checks::estimate_smart_fee,
        checks::estimate_fee,
        checks::get_best_block_hash,
        checks::get_best_block_height,
        checks::get_block_header,
    ];

    for procedure in procedures {
        assert_eq!(outcome_with(&adapter, procedure), TestOutcome::Passed);
    }
}

#[test]
fn test_wrong_block_hash() {
    let adapter = ScriptedAdapter::new().with_block_hash(BLOCK_HEIGHT, "deadbeef");
    let messages = failure_messages(outcome_with(&adapter, checks::get_block_hash));
    assert!(messages[0].contains("deadbeef"));
}

#[test]
fn test_block_with_missing_transaction() {
    let dataset = load_bitcoin_fixture();
    let mut block = fixture_block(&dataset);
    block.txs.truncate(1);
    let adapter = ScriptedAdapter::new().with_block(block);

    let messages = failure_messages(outcome_with(&adapter, checks::get_block));
    assert_eq!(messages, vec!["GetBlock() number of transactions: got 1, want 2"]);
}

#[test]
fn test_unknown_block_is_fatal() {
    let adapter = ScriptedAdapter::new();
    assert!(outcome_with(&adapter, checks::get_block).is_failed());
    assert!(outcome_with(&adapter, checks::get_block_header).is_failed());
}

#[test]
fn test_transaction_without_confirmations() {
    let dataset = load_bitcoin_fixture();
    let mut adapter = ScriptedAdapter::new();
    for tx in dataset.tx_details().values() {
        let mut tx = crate::common::confirmed(tx);
        tx.confirmations = 0;
        adapter = adapter.with_transaction(tx);
    }

    let messages = failure_messages(outcome_with(&adapter, checks::get_transaction));
    assert_eq!(messages.len(), 2);
    assert!(messages[0].contains("invalid Confirmations"));
}

#[test]
fn test_transaction_field_mismatch() {
    let dataset = load_bitcoin_fixture();
    let mut adapter = ScriptedAdapter::new();
    for tx in dataset.tx_details().values() {
        let mut tx = crate::common::confirmed(tx);
        tx.vout[0].value_sat += BigInt::from(1);
        adapter = adapter.with_transaction(tx);
    }

    assert!(outcome_with(&adapter, checks::get_transaction).is_failed());
    assert!(outcome_with(&adapter, checks::get_transaction_for_mempool).is_failed());
}

#[test]
fn test_volatile_fields_ignored() {
    let dataset = load_bitcoin_fixture();
    let mut adapter = ScriptedAdapter::new();
    for tx in dataset.tx_details().values() {
        let mut tx = crate::common::confirmed(tx);
        tx.confirmations = 99_999;
        tx.blocktime = 1;
        tx.time = 2;
        adapter = adapter.with_transaction(tx);
    }

    assert!(outcome_with(&adapter, checks::get_transaction).is_passed());
}

#[test]
fn test_fee_sentinel() {
    let mut adapter = ScriptedAdapter::new();
    for blocks in checks::FEE_TARGETS {
        adapter = adapter.with_smart_fee(blocks, BigInt::from(-COIN));
    }
    assert!(outcome_with(&adapter, checks::estimate_smart_fee).is_passed());

    let mut adapter = ScriptedAdapter::new();
    for blocks in checks::FEE_TARGETS {
        adapter = adapter.with_fee(blocks, BigInt::from(-1));
    }
    let messages = failure_messages(outcome_with(&adapter, checks::estimate_fee));
    assert_eq!(messages.len(), checks::FEE_TARGETS.len());
    assert!(messages[0].contains("-0.00000001"));
}

#[test]
fn test_fee_errors_are_collected() {
    let adapter = ScriptedAdapter::new().with_smart_fee(1, BigInt::from(1_000));
    let messages = failure_messages(outcome_with(&adapter, checks::estimate_smart_fee));
    assert_eq!(messages.len(), 4);
}

#[test]
fn test_best_height_with_successor_fails() {
    let dataset = load_bitcoin_fixture();
    let successor = Block {
        header: BlockHeader {
            hash: "next".to_string(),
            height: BLOCK_HEIGHT + 1,
            ..Default::default()
        },
        txs: Vec::new(),
    };
    let adapter = ScriptedAdapter::new()
        .with_block(fixture_block(&dataset))
        .with_block(successor)
        .with_best_block(BLOCK_HASH, BLOCK_HEIGHT);

    let messages = failure_messages(outcome_with(&adapter, checks::get_best_block_height));
    assert_eq!(messages, vec!["GetBestBlockHeight() didn't get the best height"]);
    assert_eq!(adapter.call_count("get_best_block_height"), 3);
}

#[test]
fn test_best_hash_mismatch_retries_then_fails() {
    let adapter = ScriptedAdapter::new()
        .with_block_hash(BLOCK_HEIGHT, BLOCK_HASH)
        .with_best_block("stale", BLOCK_HEIGHT);

    let messages = failure_messages(outcome_with(&adapter, checks::get_best_block_hash));
    assert_eq!(messages, vec!["GetBestBlockHash() didn't get the best hash"]);
    assert_eq!(adapter.call_count("get_best_block_hash"), 3);
    assert_eq!(adapter.call_count("get_block"), 0);
}

#[test]
fn test_header_without_confirmations_is_fatal() {
    let adapter = ScriptedAdapter::new().with_header(fixture_header(0));
    let messages = failure_messages(outcome_with(&adapter, checks::get_block_header));
    assert_eq!(
        messages,
        vec!["GetBlockHeader() got struct with invalid Confirmations field"]
    );
}

#[test]
fn test_header_mismatch() {
    let mut header = fixture_header(4);
    header.time += 1;
    let adapter = ScriptedAdapter::new().with_header(header);
    assert!(outcome_with(&adapter, checks::get_block_header).is_failed());
}
