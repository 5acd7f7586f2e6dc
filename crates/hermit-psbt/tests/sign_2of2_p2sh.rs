//! End-to-end exercise of the signer pipeline against a synthetic 2-of-2
//! P2SH testnet transaction: build → describe → sign → re-describe.

use bitcoin::absolute::LockTime;
use bitcoin::bip32::{ChildNumber, DerivationPath, Xpriv, Xpub};
use bitcoin::blockdata::script::Builder;
use bitcoin::hashes::Hash;
use bitcoin::opcodes::all::{OP_CHECKMULTISIG, OP_PUSHNUM_2};
use bitcoin::psbt::Input as PsbtInput;
use bitcoin::secp256k1::Secp256k1;
use bitcoin::transaction::Version;
use bitcoin::{Address, Amount, Network, OutPoint, Psbt, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness};
use std::collections::BTreeMap;
use std::str::FromStr;

fn account_xpriv(master: &Xpriv, secp: &Secp256k1<impl bitcoin::secp256k1::Signing>) -> (Xpriv, DerivationPath) {
    let account_path = DerivationPath::from(vec![
        ChildNumber::from_hardened_idx(45).unwrap(),
        ChildNumber::from_hardened_idx(0).unwrap(),
    ]);
    (master.derive_priv(secp, &account_path).unwrap(), account_path)
}

#[test]
fn builds_describes_and_signs_a_2of2_p2sh_testnet_transaction() {
    let secp = Secp256k1::new();

    let seed_a = [0x11u8; 64];
    let seed_b = [0x22u8; 64];
    let master_a = Xpriv::new_master(Network::Testnet, &seed_a).unwrap();
    let master_b = Xpriv::new_master(Network::Testnet, &seed_b).unwrap();
    let fp_a = master_a.fingerprint(&secp);
    let fp_b = master_b.fingerprint(&secp);

    let (account_a, account_path_a) = account_xpriv(&master_a, &secp);
    let (account_b, account_path_b) = account_xpriv(&master_b, &secp);
    let account_xpub_a = Xpub::from_priv(&secp, &account_a);
    let account_xpub_b = Xpub::from_priv(&secp, &account_b);

    let leaf = DerivationPath::from_str("m/0/0").unwrap();
    let full_path_a: DerivationPath = account_path_a.extend(leaf.clone());
    let full_path_b: DerivationPath = account_path_b.extend(leaf);

    let pubkey_a = master_a.derive_priv(&secp, &full_path_a).unwrap().to_priv().public_key(&secp).inner;
    let pubkey_b = master_b.derive_priv(&secp, &full_path_b).unwrap().to_priv().public_key(&secp).inner;
    let mut ordered = [pubkey_a, pubkey_b];
    ordered.sort_by_key(|k| k.serialize());

    let redeem_script = Builder::new()
        .push_opcode(OP_PUSHNUM_2)
        .push_slice(ordered[0].serialize())
        .push_slice(ordered[1].serialize())
        .push_opcode(OP_PUSHNUM_2)
        .push_opcode(OP_CHECKMULTISIG)
        .into_script();
    let p2sh_address = Address::p2sh(&redeem_script, Network::Testnet).unwrap();

    // A fabricated previous transaction paying into the multisig address.
    let prev_tx = Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: vec![],
        output: vec![TxOut { value: Amount::from_sat(100_000), script_pubkey: p2sh_address.script_pubkey() }],
    };
    let prev_txid = prev_tx.compute_txid();

    let dest_address =
        Address::from_str("mzBc4XEFSdzCDcTxAgf6EZXgsZWpztRhef").unwrap().require_network(Network::Testnet).unwrap();
    let unsigned_tx = Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint { txid: prev_txid, vout: 0 },
            script_sig: ScriptBuf::new(),
            sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
            witness: Witness::new(),
        }],
        output: vec![TxOut { value: Amount::from_sat(95_000), script_pubkey: dest_address.script_pubkey() }],
    };
    let mut psbt = Psbt::from_unsigned_tx(unsigned_tx).unwrap();

    let mut input = PsbtInput::default();
    input.redeem_script = Some(redeem_script.clone());
    input.non_witness_utxo = Some(prev_tx);
    input.bip32_derivation.insert(pubkey_a, (fp_a, full_path_a.clone()));
    input.bip32_derivation.insert(pubkey_b, (fp_b, full_path_b.clone()));
    psbt.inputs = vec![input];

    let mut hdpubkey_map = BTreeMap::new();
    hdpubkey_map.insert(fp_a, account_xpub_a);
    hdpubkey_map.insert(fp_b, account_xpub_b);

    let summary = hermit_psbt::describe_psbt(&psbt, &hdpubkey_map, Network::Testnet).unwrap();
    assert_eq!(summary.inputs_quorum, (2, 2));
    assert_eq!(summary.total_input_sat, 100_000);
    assert_eq!(summary.fee_sat, 5_000);
    assert_eq!(summary.spend_sat, 95_000);

    let (signed, added) = hermit_psbt::sign_psbt(psbt, &master_a).unwrap();
    assert_eq!(added, 1);
    assert_eq!(signed.inputs[0].partial_sigs.len(), 1);
    let signer_key = signed.inputs[0].partial_sigs.keys().next().unwrap();
    assert_eq!(signer_key.inner, pubkey_a);

    // Re-describing the partially signed PSBT still succeeds.
    let resummary = hermit_psbt::describe_psbt(&signed, &hdpubkey_map, Network::Testnet).unwrap();
    assert_eq!(resummary.inputs_quorum, (2, 2));
}

#[test]
fn rejects_a_psbt_whose_outputs_exceed_its_inputs() {
    let secp = Secp256k1::new();

    let seed_a = [0x11u8; 64];
    let seed_b = [0x22u8; 64];
    let master_a = Xpriv::new_master(Network::Testnet, &seed_a).unwrap();
    let master_b = Xpriv::new_master(Network::Testnet, &seed_b).unwrap();
    let fp_a = master_a.fingerprint(&secp);
    let fp_b = master_b.fingerprint(&secp);

    let (account_a, account_path_a) = account_xpriv(&master_a, &secp);
    let (account_b, account_path_b) = account_xpriv(&master_b, &secp);
    let account_xpub_a = Xpub::from_priv(&secp, &account_a);
    let account_xpub_b = Xpub::from_priv(&secp, &account_b);

    let leaf = DerivationPath::from_str("m/0/0").unwrap();
    let full_path_a: DerivationPath = account_path_a.extend(leaf.clone());
    let full_path_b: DerivationPath = account_path_b.extend(leaf);

    let pubkey_a = master_a.derive_priv(&secp, &full_path_a).unwrap().to_priv().public_key(&secp).inner;
    let pubkey_b = master_b.derive_priv(&secp, &full_path_b).unwrap().to_priv().public_key(&secp).inner;
    let mut ordered = [pubkey_a, pubkey_b];
    ordered.sort_by_key(|k| k.serialize());

    let redeem_script = Builder::new()
        .push_opcode(OP_PUSHNUM_2)
        .push_slice(ordered[0].serialize())
        .push_slice(ordered[1].serialize())
        .push_opcode(OP_PUSHNUM_2)
        .push_opcode(OP_CHECKMULTISIG)
        .into_script();
    let p2sh_address = Address::p2sh(&redeem_script, Network::Testnet).unwrap();

    // Prev output pays only 50,000 sats into the multisig.
    let prev_tx = Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: vec![],
        output: vec![TxOut { value: Amount::from_sat(50_000), script_pubkey: p2sh_address.script_pubkey() }],
    };
    let prev_txid = prev_tx.compute_txid();

    let dest_address =
        Address::from_str("mzBc4XEFSdzCDcTxAgf6EZXgsZWpztRhef").unwrap().require_network(Network::Testnet).unwrap();
    // Spend claims 95,000 sats against a 50,000 sat input: negative fee.
    let unsigned_tx = Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint { txid: prev_txid, vout: 0 },
            script_sig: ScriptBuf::new(),
            sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
            witness: Witness::new(),
        }],
        output: vec![TxOut { value: Amount::from_sat(95_000), script_pubkey: dest_address.script_pubkey() }],
    };
    let mut psbt = Psbt::from_unsigned_tx(unsigned_tx).unwrap();

    let mut input = PsbtInput::default();
    input.redeem_script = Some(redeem_script);
    input.non_witness_utxo = Some(prev_tx);
    input.bip32_derivation.insert(pubkey_a, (fp_a, full_path_a));
    input.bip32_derivation.insert(pubkey_b, (fp_b, full_path_b));
    psbt.inputs = vec![input];

    let mut hdpubkey_map = BTreeMap::new();
    hdpubkey_map.insert(fp_a, account_xpub_a);
    hdpubkey_map.insert(fp_b, account_xpub_b);

    let err = hermit_psbt::describe_psbt(&psbt, &hdpubkey_map, Network::Testnet).unwrap_err();
    assert!(matches!(err, hermit_psbt::PsbtError::InvalidPsbt(_)));
}
