use anyhow::Result;
use node_conformance::adapter::BitcoinParser;
use node_conformance::errors::FixtureError;
use node_conformance::fixture::{fixture_path, load_test_data, parse_test_data};
use num_bigint::BigInt;
use std::fs;
use tempfile::TempDir;

use crate::common::{
    fixtures_dir, load_bitcoin_fixture, LossyParser, BLOCK_HASH, BLOCK_HEIGHT, BLOCK_TIME,
    TX1, TX1_ADDRESSES, TX2, TX2_ADDRESS,
};

#[test]
fn test_loads_block_fields() {
    let dataset = load_bitcoin_fixture();

    assert_eq!(dataset.block_height(), BLOCK_HEIGHT);
    assert_eq!(dataset.block_hash(), BLOCK_HASH);
    assert_eq!(dataset.block_time(), BLOCK_TIME);
    assert_eq!(dataset.block_txs(), &[TX1.to_string(), TX2.to_string()]);
    assert_eq!(dataset.tx_details().len(), 2);
}

#[test]
fn test_amounts_become_integers() {
    let dataset = load_bitcoin_fixture();

    let tx1 = dataset.tx(TX1).unwrap();
    let amounts: Vec<BigInt> = tx1.vout.iter().map(|v| v.value_sat.clone()).collect();
    assert_eq!(
        amounts,
        vec![
            BigInt::from(50_000_000),
            BigInt::from(12_345),
            BigInt::from(0)
        ]
    );
    assert_eq!(dataset.tx(TX2).unwrap().vout[0].value_sat, BigInt::from(49_990_000));

    for tx in dataset.tx_details().values() {
        assert!(tx.vout.iter().all(|v| v.json_value.is_none()));
    }
}

#[test]
fn test_addresses_come_from_round_trip() {
    let dataset = load_bitcoin_fixture();

    // The document carries a stale address for output 0 and none for output 1
    let tx1 = dataset.tx(TX1).unwrap();
    assert_eq!(tx1.vout[0].script_pub_key.addresses, vec![TX1_ADDRESSES[0]]);
    assert_eq!(tx1.vout[1].script_pub_key.addresses, vec![TX1_ADDRESSES[1]]);
    assert_eq!(
        tx1.vout[2].script_pub_key.addresses,
        vec!["OP_RETURN (68656c6c6f)"]
    );
    assert_eq!(
        dataset.tx(TX2).unwrap().vout[0].script_pub_key.addresses,
        vec![TX2_ADDRESS]
    );
}

#[test]
fn test_other_fields_untouched() {
    let dataset = load_bitcoin_fixture();
    let tx2 = dataset.tx(TX2).unwrap();

    assert_eq!(tx2.vin.len(), 1);
    assert_eq!(tx2.vin[0].txid, TX1);
    assert_eq!(tx2.vin[0].script_sig.hex, "0152");
    assert_eq!(tx2.vin[0].sequence, 0xffff_fffe);
    assert_eq!(tx2.confirmations, 12);
    assert_eq!(tx2.vout[0].script_pub_key.hex, "76a91468d405b56bab77c5d1b06726629c160c683c386488ac");
}

#[test]
fn test_loading_is_idempotent() -> Result<()> {
    let first = load_bitcoin_fixture();
    let second = load_bitcoin_fixture();

    assert_eq!(first, second);
    assert_eq!(serde_json::to_vec(&first)?, serde_json::to_vec(&second)?);
    Ok(())
}

#[test]
fn test_missing_fixture_is_not_found() {
    let dir = TempDir::new().unwrap();
    let err = load_test_data(dir.path(), "bitcoin", &BitcoinParser::default()).unwrap_err();

    match err {
        FixtureError::NotFound { path, .. } => assert_eq!(path, fixture_path(dir.path(), "bitcoin")),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_load_from_other_directory() -> Result<()> {
    let dir = TempDir::new()?;
    fs::copy(
        fixture_path(&fixtures_dir(), "bitcoin"),
        fixture_path(dir.path(), "regtest"),
    )?;

    let dataset = load_test_data(dir.path(), "regtest", &BitcoinParser::default())?;
    assert_eq!(dataset, load_bitcoin_fixture());
    Ok(())
}

#[test]
fn test_output_count_mismatch_fails() -> Result<()> {
    let document = fs::read(fixture_path(&fixtures_dir(), "bitcoin"))?;
    let err = parse_test_data("bitcoin", &document, &LossyParser(BitcoinParser::default()))
        .unwrap_err();

    assert!(matches!(err, FixtureError::AddressDerivation { .. }));
    Ok(())
}

#[test]
fn test_record_without_hex_cannot_derive_addresses() {
    let document = r#"{
        "blockHeight": 1, "blockHash": "h", "blockTime": 0, "blockTxs": ["t"],
        "txDetails": {"t": {"txid": "t", "vout": [{"value": 1, "n": 0, "scriptPubKey": {"hex": "51"}}]}}
    }"#;
    let err = parse_test_data("bitcoin", document.as_bytes(), &BitcoinParser::default())
        .unwrap_err();

    assert!(matches!(err, FixtureError::AddressDerivation { ref txid, .. } if txid == "t"));
}

#[test]
fn test_unparseable_amount_fails() {
    let document = r#"{
        "blockHeight": 1, "blockHash": "h", "blockTime": 0, "blockTxs": [],
        "txDetails": {"t": {"txid": "t", "vout": [{"value": 0.000000001, "n": 0, "scriptPubKey": {"hex": "51"}}]}}
    }"#;
    let err = parse_test_data("bitcoin", document.as_bytes(), &BitcoinParser::default())
        .unwrap_err();

    assert!(matches!(err, FixtureError::AmountDecode { vout: 0, .. }));
}

#[test]
fn test_serialized_dataset_is_normalized() -> Result<()> {
    let value = serde_json::to_value(load_bitcoin_fixture())?;
    let vout = &value["txDetails"][TX1]["vout"][1];

    assert_eq!(vout["valueSat"], "12345");
    assert!(vout.get("value").is_none());
    assert_eq!(vout["scriptPubKey"]["addresses"][0], TX1_ADDRESSES[1]);
    Ok(())
}
