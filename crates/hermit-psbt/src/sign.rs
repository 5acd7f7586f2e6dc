//! Co-signing a multisig PSBT with this wallet's keys.
//!
//! Grounded in `HotSigner::sign_psbt`/`sign_p2wsh`: for every input, every
//! `bip32_derivation` entry whose fingerprint matches the wallet's own is
//! signed, after checking the pubkey the input claims actually matches what
//! deriving along that path produces. Supports both P2WSH (segwit v0) and
//! legacy P2SH multisig, since Hermit signs both.

use crate::PsbtError;
use bitcoin::bip32::Xpriv;
use bitcoin::ecdsa;
use bitcoin::hashes::Hash;
use bitcoin::secp256k1::{Message, Secp256k1, Signing};
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::Psbt;

fn xpriv_at(root: &Xpriv, path: &bitcoin::bip32::DerivationPath, secp: &Secp256k1<impl Signing>) -> Result<Xpriv, PsbtError> {
    root.derive_priv(secp, path)
        .map_err(|e| PsbtError::InvalidSignatureRequest(format!("cannot derive signing key along {path}: {e}")))
}

/// Sign every input of `psbt` whose `bip32_derivation` entries reference
/// this wallet's own master fingerprint. Returns the signed PSBT and the
/// number of signatures added.
pub fn sign_psbt(mut psbt: Psbt, root: &Xpriv) -> Result<(Psbt, usize), PsbtError> {
    let secp = Secp256k1::new();
    let wallet_fingerprint = root.fingerprint(&secp);
    let sig_type = EcdsaSighashType::All;
    let mut added = 0usize;

    for index in 0..psbt.inputs.len() {
        let is_segwit = psbt.inputs[index].witness_script.is_some();

        let message = if is_segwit {
            let witness_script = psbt.inputs[index]
                .witness_script
                .clone()
                .ok_or_else(|| PsbtError::InvalidSignatureRequest(format!("input #{index} has no witness script")))?;
            let value = psbt.inputs[index]
                .witness_utxo
                .as_ref()
                .ok_or_else(|| PsbtError::InvalidSignatureRequest(format!("input #{index} has no witness UTXO")))?
                .value;
            let mut cache = SighashCache::new(&psbt.unsigned_tx);
            let sighash = cache
                .p2wsh_signature_hash(index, &witness_script, value, sig_type)
                .map_err(|e| PsbtError::InvalidPsbt(format!("cannot compute sighash for input #{index}: {e}")))?;
            Message::from_digest_slice(sighash.as_byte_array()).expect("sighash is always 32 bytes")
        } else {
            let redeem_script = psbt.inputs[index]
                .redeem_script
                .clone()
                .ok_or_else(|| PsbtError::InvalidSignatureRequest(format!("input #{index} has no redeem script")))?;
            let mut cache = SighashCache::new(&psbt.unsigned_tx);
            let sighash = cache
                .legacy_signature_hash(index, &redeem_script, sig_type.to_u32())
                .map_err(|e| PsbtError::InvalidPsbt(format!("cannot compute sighash for input #{index}: {e}")))?;
            Message::from_digest_slice(sighash.as_byte_array()).expect("sighash is always 32 bytes")
        };

        let derivations: Vec<_> = psbt.inputs[index]
            .bip32_derivation
            .iter()
            .filter(|(_, (fp, _))| *fp == wallet_fingerprint)
            .map(|(pk, (_, path))| (*pk, path.clone()))
            .collect();

        for (claimed_pubkey, path) in derivations {
            let derived = xpriv_at(root, &path, &secp)?;
            let private_key = derived.to_priv();
            let public_key = private_key.public_key(&secp);
            if public_key.inner != claimed_pubkey {
                return Err(PsbtError::InvalidSignatureRequest(format!(
                    "input #{index}: key at {path} does not match the pubkey the PSBT claims for it"
                )));
            }
            let sig = secp.sign_ecdsa_low_r(&message, &private_key.inner);
            psbt.inputs[index]
                .partial_sigs
                .insert(public_key, ecdsa::Signature { sig, hash_ty: sig_type });
            added += 1;
        }
    }

    if added == 0 {
        return Err(PsbtError::InvalidSignatureRequest(
            "no inputs referenced this wallet's fingerprint; nothing to sign".into(),
        ));
    }

    Ok((psbt, added))
}
