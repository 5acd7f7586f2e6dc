//! Human-readable transaction summaries for operator approval.
//!
//! Mirrors `describe_basic_inputs` / `describe_basic_outputs` /
//! `describe_basic_p2sh_multisig_tx` from `psbt.py`: every input must carry
//! the same quorum (m-of-n), every input's named pubkeys must trace back to
//! a supplied xpub along the path it claims, and at most one output may be
//! change.

use crate::PsbtError;
use bitcoin::bip32::{ChildNumber, DerivationPath, Fingerprint, Xpub};
use bitcoin::blockdata::opcodes::all::OP_CHECKMULTISIG;
use bitcoin::script::{Instruction, Script};
use bitcoin::secp256k1::{PublicKey, Secp256k1};
use bitcoin::{Address, Network, Psbt};
use std::collections::{BTreeMap, BTreeSet};

/// A single signer's BIP-32 derivation info for one input or change output,
/// matching the shape `bitcoin-core`'s `decodepsbt` returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bip32Deriv {
    pub pubkey: String,
    pub master_fingerprint: String,
    pub path: String,
    pub xpub: String,
}

#[derive(Debug, Clone)]
pub struct InputDescription {
    pub quorum_m: u8,
    pub quorum_n: u8,
    pub prev_txid: String,
    pub prev_vout: u32,
    pub sequence: u32,
    pub value_sat: u64,
    pub address: String,
    pub script: String,
    pub bip32_derivs: Vec<Bip32Deriv>,
}

#[derive(Debug, Clone)]
pub struct OutputDescription {
    pub value_sat: u64,
    pub address: String,
    pub is_change: bool,
    pub bip32_derivs: Vec<Bip32Deriv>,
}

#[derive(Debug, Clone)]
pub struct TransactionSummary {
    pub txid: String,
    pub locktime: u32,
    pub version: i32,
    pub network: Network,
    pub fee_sat: u64,
    pub total_input_sat: u64,
    pub total_output_sat: u64,
    pub spend_sat: u64,
    pub change_sat: u64,
    pub spend_addr: String,
    pub change_addr: String,
    pub is_batch_tx: bool,
    pub inputs_quorum: (u8, u8),
    pub inputs: Vec<InputDescription>,
    pub outputs: Vec<OutputDescription>,
    /// For every fingerprint this wallet recognizes, the root-to-leaf paths
    /// its key must sign at.
    pub root_paths_for_signing: BTreeMap<Fingerprint, BTreeSet<DerivationPath>>,
    pub summary_text: String,
}

fn decode_smallint(op: bitcoin::blockdata::opcodes::Opcode) -> Option<u8> {
    let v = op.to_u8();
    if (0x51..=0x60).contains(&v) {
        Some(v - 0x50)
    } else {
        None
    }
}

/// Parse a `OP_m <pubkey>... OP_n OP_CHECKMULTISIG` script, returning the
/// threshold, total signer count, and participant pubkeys in script order.
fn parse_multisig_quorum(script: &Script) -> Result<(u8, u8, Vec<PublicKey>), PsbtError> {
    let instructions: Vec<Instruction> = script
        .instructions()
        .collect::<Result<_, _>>()
        .map_err(|e| PsbtError::InvalidSignatureRequest(format!("malformed script: {e}")))?;

    if instructions.len() < 4 {
        return Err(PsbtError::InvalidSignatureRequest("script too short to be multisig".into()));
    }

    let m = match instructions[0] {
        Instruction::Op(op) => decode_smallint(op)
            .ok_or_else(|| PsbtError::InvalidSignatureRequest("script does not open with OP_m".into()))?,
        _ => return Err(PsbtError::InvalidSignatureRequest("script does not open with OP_m".into())),
    };

    match instructions.last() {
        Some(Instruction::Op(op)) if *op == OP_CHECKMULTISIG => {}
        _ => return Err(PsbtError::InvalidSignatureRequest("script does not end in OP_CHECKMULTISIG".into())),
    }

    let n = match instructions[instructions.len() - 2] {
        Instruction::Op(op) => decode_smallint(op)
            .ok_or_else(|| PsbtError::InvalidSignatureRequest("script has no OP_n before OP_CHECKMULTISIG".into()))?,
        _ => return Err(PsbtError::InvalidSignatureRequest("script has no OP_n before OP_CHECKMULTISIG".into())),
    };

    let pubkey_instrs = &instructions[1..instructions.len() - 2];
    if pubkey_instrs.len() != n as usize {
        return Err(PsbtError::InvalidSignatureRequest(format!(
            "script claims {n} keys but contains {}",
            pubkey_instrs.len()
        )));
    }

    let mut pubkeys = Vec::with_capacity(pubkey_instrs.len());
    for instr in pubkey_instrs {
        match instr {
            Instruction::PushBytes(bytes) => {
                let pk = PublicKey::from_slice(bytes.as_bytes())
                    .map_err(|e| PsbtError::InvalidSignatureRequest(format!("invalid pubkey in script: {e}")))?;
                pubkeys.push(pk);
            }
            _ => return Err(PsbtError::InvalidSignatureRequest("non-pubkey push in multisig script".into())),
        }
    }

    Ok((m, n, pubkeys))
}

/// Drop the leading `depth` components of `path` — the portion already
/// accounted for by an xpub that was itself derived to that depth.
fn ltrim_path(path: &DerivationPath, depth: u8) -> DerivationPath {
    let children: Vec<ChildNumber> = path.into_iter().copied().collect();
    let skip = (depth as usize).min(children.len());
    DerivationPath::from(children[skip..].to_vec())
}

/// Confirm `named_pub` is reachable from `xpub` along the (possibly
/// account-relative) `root_path`, and return the trimmed, xpub-relative path.
fn verify_named_pub(
    xpub: &Xpub,
    root_path: &DerivationPath,
    named_pub: &PublicKey,
) -> Result<DerivationPath, PsbtError> {
    let secp = Secp256k1::verification_only();
    let trimmed = ltrim_path(root_path, xpub.depth);
    let derived = xpub
        .derive_pub(&secp, trimmed.clone())
        .map_err(|e| PsbtError::InvalidSignatureRequest(format!("cannot derive along {trimmed}: {e}")))?;
    if derived.public_key != *named_pub {
        return Err(PsbtError::InvalidSignatureRequest(format!(
            "xpub with path {root_path} does not match the pubkey it claims"
        )));
    }
    Ok(trimmed)
}

fn describe_inputs(
    psbt: &Psbt,
    hdpubkey_map: &BTreeMap<Fingerprint, Xpub>,
    network: Network,
) -> Result<(Vec<InputDescription>, u8, u8, u64, BTreeMap<Fingerprint, BTreeSet<DerivationPath>>), PsbtError> {
    let mut quorum_m = None;
    let mut quorum_n = None;
    let mut inputs_desc = Vec::with_capacity(psbt.inputs.len());
    let mut total_input_sat = 0u64;
    let mut root_paths_for_signing: BTreeMap<Fingerprint, BTreeSet<DerivationPath>> = BTreeMap::new();

    for (index, psbt_in) in psbt.inputs.iter().enumerate() {
        let is_segwit = psbt_in.witness_script.is_some();
        let script = psbt_in
            .witness_script
            .as_ref()
            .or(psbt_in.redeem_script.as_ref())
            .ok_or_else(|| {
                PsbtError::InvalidSignatureRequest(format!("input #{index} has no redeem or witness script"))
            })?;
        let (m, n, _) = parse_multisig_quorum(script)?;

        match quorum_m {
            None => quorum_m = Some(m),
            Some(existing) if existing != m => {
                return Err(PsbtError::InvalidSignatureRequest(format!(
                    "previous input(s) set a quorum threshold of {existing}, but input #{index} is {m}"
                )))
            }
            _ => {}
        }
        match quorum_n {
            None => quorum_n = Some(n),
            Some(existing) if existing != n => {
                return Err(PsbtError::InvalidSignatureRequest(format!(
                    "previous input(s) set {existing} cosigners, but input #{index} is {n}"
                )))
            }
            _ => {}
        }

        let tx_in = &psbt.unsigned_tx.input[index];
        let value_sat = if let Some(utxo) = psbt_in.witness_utxo.as_ref() {
            utxo.value.to_sat()
        } else {
            let prev_tx = psbt_in.non_witness_utxo.as_ref().ok_or_else(|| {
                PsbtError::InvalidSignatureRequest(format!("input #{index} is missing a witness or non-witness UTXO"))
            })?;
            let vout = tx_in.previous_output.vout as usize;
            prev_tx
                .output
                .get(vout)
                .ok_or_else(|| PsbtError::InvalidSignatureRequest(format!("input #{index}'s previous output index is out of range")))?
                .value
                .to_sat()
        };
        let address = if is_segwit {
            Address::p2wsh(script, network)
        } else {
            Address::p2sh(script, network)
                .map_err(|e| PsbtError::InvalidSignatureRequest(format!("redeem script too large for P2SH: {e}")))?
        };

        let mut bip32_derivs = Vec::new();
        for (named_pub, (fingerprint, root_path)) in psbt_in.bip32_derivation.iter() {
            let hdpub = hdpubkey_map.get(fingerprint).ok_or_else(|| {
                PsbtError::InvalidSignatureRequest(format!(
                    "root fingerprint {fingerprint:x} for input #{index} is not among the supplied xpubs"
                ))
            })?;
            verify_named_pub(hdpub, root_path, named_pub)?;
            root_paths_for_signing.entry(*fingerprint).or_default().insert(root_path.clone());
            bip32_derivs.push(Bip32Deriv {
                pubkey: hex::encode(named_pub.serialize()),
                master_fingerprint: format!("{fingerprint:x}"),
                path: root_path.to_string(),
                xpub: hdpub.to_string(),
            });
        }
        bip32_derivs.sort_by(|a, b| a.pubkey.cmp(&b.pubkey));

        total_input_sat += value_sat;

        inputs_desc.push(InputDescription {
            quorum_m: m,
            quorum_n: n,
            prev_txid: tx_in.previous_output.txid.to_string(),
            prev_vout: tx_in.previous_output.vout,
            sequence: tx_in.sequence.0,
            value_sat,
            address: address.to_string(),
            script: script.to_string(),
            bip32_derivs,
        });
    }

    Ok((
        inputs_desc,
        quorum_m.unwrap_or(0),
        quorum_n.unwrap_or(0),
        total_input_sat,
        root_paths_for_signing,
    ))
}

fn describe_outputs(
    psbt: &Psbt,
    expected_m: u8,
    expected_n: u8,
    hdpubkey_map: &BTreeMap<Fingerprint, Xpub>,
    network: Network,
) -> Result<(Vec<OutputDescription>, String, u64, String, u64, bool), PsbtError> {
    let mut outputs_desc = Vec::with_capacity(psbt.outputs.len());
    let mut spend_addr = String::new();
    let mut spend_sat = 0u64;
    let mut change_addr = String::new();
    let mut change_sat = 0u64;
    let mut spends_count = 0u32;

    for (index, psbt_out) in psbt.outputs.iter().enumerate() {
        let tx_out = &psbt.unsigned_tx.output[index];
        let addr = Address::from_script(&tx_out.script_pubkey, network)
            .map_err(|e| PsbtError::InvalidSignatureRequest(format!("output #{index} has an unrecognized script: {e}")))?;

        if !psbt_out.bip32_derivation.is_empty() {
            let script = psbt_out
                .witness_script
                .as_ref()
                .or(psbt_out.redeem_script.as_ref())
                .ok_or_else(|| {
                    PsbtError::InvalidSignatureRequest(format!("change output #{index} has no redeem or witness script"))
                })?;
            let (m, n, _) = parse_multisig_quorum(script)?;
            if m != expected_m || n != expected_n {
                return Err(PsbtError::InvalidSignatureRequest(format!(
                    "change output #{index} quorum {m}-of-{n} does not match the inputs' {expected_m}-of-{expected_n}"
                )));
            }
            if psbt_out.bip32_derivation.len() != n as usize {
                return Err(PsbtError::InvalidSignatureRequest(format!(
                    "change output #{index} has {} named pubkeys, expected {n}",
                    psbt_out.bip32_derivation.len()
                )));
            }
            for (named_pub, (fingerprint, root_path)) in psbt_out.bip32_derivation.iter() {
                let hdpub = hdpubkey_map.get(fingerprint).ok_or_else(|| {
                    PsbtError::InvalidSignatureRequest(format!(
                        "root fingerprint {fingerprint:x} for output #{index} is not among the supplied xpubs"
                    ))
                })?;
                verify_named_pub(hdpub, root_path, named_pub)?;
            }

            if change_sat != 0 || !change_addr.is_empty() {
                return Err(PsbtError::InvalidSignatureRequest("cannot have more than one change output".into()));
            }
            change_addr = addr.to_string();
            change_sat = tx_out.value.to_sat();

            outputs_desc.push(OutputDescription {
                value_sat: tx_out.value.to_sat(),
                address: addr.to_string(),
                is_change: true,
                bip32_derivs: Vec::new(),
            });
        } else {
            spends_count += 1;
            spend_sat += tx_out.value.to_sat();
            spend_addr = if spends_count > 1 { String::new() } else { addr.to_string() };

            outputs_desc.push(OutputDescription {
                value_sat: tx_out.value.to_sat(),
                address: addr.to_string(),
                is_change: false,
                bip32_derivs: Vec::new(),
            });
        }
    }

    Ok((outputs_desc, change_addr, change_sat, spend_addr, spend_sat, spends_count > 1))
}

/// Validate and describe a multisig PSBT for operator approval, per
/// `describe_basic_p2sh_multisig_tx`.
pub fn describe_psbt(psbt: &Psbt, hdpubkey_map: &BTreeMap<Fingerprint, Xpub>, network: Network) -> Result<TransactionSummary, PsbtError> {
    if psbt.inputs.is_empty() {
        return Err(PsbtError::InvalidSignatureRequest("PSBT has no inputs".into()));
    }
    if hdpubkey_map.is_empty() {
        return Err(PsbtError::InvalidSignatureRequest("cannot describe a PSBT without any supplied xpubs".into()));
    }

    let (inputs_desc, quorum_m, quorum_n, total_input_sat, root_paths_for_signing) =
        describe_inputs(psbt, hdpubkey_map, network)?;
    let (outputs_desc, change_addr, change_sat, spend_addr, spend_sat, is_batch_tx) =
        describe_outputs(psbt, quorum_m, quorum_n, hdpubkey_map, network)?;

    let total_output_sat: u64 = outputs_desc.iter().map(|o| o.value_sat).sum();
    let fee_sat = total_input_sat.checked_sub(total_output_sat).ok_or_else(|| {
        PsbtError::InvalidPsbt(format!(
            "outputs total {total_output_sat} sats exceeds inputs total {total_input_sat} sats (negative fee)"
        ))
    })?;
    let fee_pct = if total_input_sat > 0 { (fee_sat as f64 / total_input_sat as f64) * 100.0 } else { 0.0 };

    let summary_text = if is_batch_tx {
        let breakdown: Vec<String> = outputs_desc
            .iter()
            .filter(|o| !o.is_change)
            .map(|o| format!("{}: {} sats", o.address, o.value_sat))
            .collect();
        format!(
            "Batch PSBT sends {spend_sat} sats with a fee of {fee_sat} sats ({fee_pct:.2}% of spend). Batch spend breakdown:\n{}",
            breakdown.join("\n")
        )
    } else {
        format!("PSBT sends {spend_sat} sats to {spend_addr} with a fee of {fee_sat} sats ({fee_pct:.2}% of spend)")
    };

    Ok(TransactionSummary {
        txid: psbt.unsigned_tx.compute_txid().to_string(),
        locktime: psbt.unsigned_tx.lock_time.to_consensus_u32(),
        version: psbt.unsigned_tx.version.0,
        network,
        fee_sat,
        total_input_sat,
        total_output_sat,
        spend_sat,
        change_sat,
        spend_addr,
        change_addr,
        is_batch_tx,
        inputs_quorum: (quorum_m, quorum_n),
        inputs: inputs_desc,
        outputs: outputs_desc,
        root_paths_for_signing,
        summary_text,
    })
}
