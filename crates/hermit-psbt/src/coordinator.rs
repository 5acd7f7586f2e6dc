//! Coordinator-signature verification.
//!
//! Grounded in `coordinator.py`: an external coordinator may attach a
//! signature over the *unsigned* PSBT at a well-known key in the global
//! unknown-field map. To verify, delete that entry from a copy, re-serialize
//! to base64, and check the signature over those bytes using the configured
//! public key. Two algorithms are supported, selected by configuration:
//! RSA-PKCS1v15-SHA256 and ECDSA-secp256k1 over a SHA256 message hash.

use crate::PsbtError;
use bitcoin::psbt::raw;
use bitcoin::Psbt;
use rsa::pkcs1v15::{Signature as RsaSignature, SigningKey, VerifyingKey};
use rsa::pkcs8::DecodePublicKey;
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use secp256k1::ecdsa::Signature as Secp256k1Signature;
use secp256k1::{Message, PublicKey as Secp256k1PublicKey, Secp256k1};
use sha2::{Digest, Sha256};
use std::str::FromStr;

/// The global unknown-field key under which a coordinator signature, if
/// any, is stored. `0x70` is not an assigned BIP-174 global key type.
const COORDINATOR_SIG_KEY_TYPE: u8 = 0x70;

fn coordinator_sig_key() -> raw::Key {
    raw::Key { type_value: COORDINATOR_SIG_KEY_TYPE, key: b"coordinator_sig".to_vec() }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorAlgorithm {
    RsaPkcs1v15Sha256,
    Secp256k1Sha256,
}

/// Coordinator-signature policy, mirroring `HermitConfig.coordinator`.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub signature_required: bool,
    pub algorithm: CoordinatorAlgorithm,
    /// RSA: a PKCS#8 PEM public key. secp256k1: a hex-encoded compressed
    /// public key.
    pub public_key: Option<String>,
}

/// Split a PSBT's coordinator-signature entry into the message bytes that
/// were signed (the base64 serialization with the entry removed) and the
/// signature bytes themselves.
fn extract_signature_params(psbt: &Psbt) -> Result<(Vec<u8>, Vec<u8>), PsbtError> {
    let key = coordinator_sig_key();
    let sig_bytes = psbt
        .unknown
        .get(&key)
        .ok_or_else(|| PsbtError::InvalidCoordinatorSignature("coordinator signature is missing".into()))?
        .clone();

    let mut unsigned = psbt.clone();
    unsigned.unknown.remove(&key);
    let message = unsigned.to_string().into_bytes();

    Ok((message, sig_bytes))
}

fn validate_rsa_signature(message: &[u8], signature: &[u8], public_key_pem: &str) -> Result<(), PsbtError> {
    let public_key = RsaPublicKey::from_public_key_pem(public_key_pem)
        .map_err(|e| PsbtError::InvalidCoordinatorSignature(format!("coordinator public key is invalid: {e}")))?;
    let verifying_key = VerifyingKey::<Sha256>::new(public_key);
    let signature = RsaSignature::try_from(signature)
        .map_err(|e| PsbtError::InvalidCoordinatorSignature(format!("malformed RSA signature: {e}")))?;
    verifying_key
        .verify(message, &signature)
        .map_err(|_| PsbtError::InvalidCoordinatorSignature("coordinator signature is invalid".into()))
}

fn validate_secp256k1_signature(message: &[u8], signature: &[u8], public_key_hex: &str) -> Result<(), PsbtError> {
    let public_key_bytes = hex::decode(public_key_hex)
        .map_err(|e| PsbtError::InvalidCoordinatorSignature(format!("coordinator public key is invalid hex: {e}")))?;
    let public_key = Secp256k1PublicKey::from_slice(&public_key_bytes)
        .map_err(|e| PsbtError::InvalidCoordinatorSignature(format!("coordinator public key is invalid: {e}")))?;
    let sig = Secp256k1Signature::from_der(signature)
        .map_err(|e| PsbtError::InvalidCoordinatorSignature(format!("malformed secp256k1 signature: {e}")))?;
    let digest: [u8; 32] = Sha256::digest(message).into();
    let msg = Message::from_digest(digest);
    let secp = Secp256k1::verification_only();
    secp.verify_ecdsa(&msg, &sig, &public_key)
        .map_err(|_| PsbtError::InvalidCoordinatorSignature("coordinator signature is invalid".into()))
}

/// Validate `psbt`'s coordinator signature per `config`, if one is present
/// or required. Passes through untouched if no signature is present and
/// none is required.
pub fn validate_coordinator_signature(psbt: &Psbt, config: &CoordinatorConfig) -> Result<(), PsbtError> {
    if !psbt.unknown.contains_key(&coordinator_sig_key()) {
        return if config.signature_required {
            Err(PsbtError::InvalidCoordinatorSignature("coordinator signature is missing".into()))
        } else {
            Ok(())
        };
    }

    let (message, signature) = extract_signature_params(psbt)?;
    let public_key = config
        .public_key
        .as_deref()
        .ok_or_else(|| PsbtError::InvalidCoordinatorSignature("coordinator signature is present but no public key is configured".into()))?;

    match config.algorithm {
        CoordinatorAlgorithm::RsaPkcs1v15Sha256 => validate_rsa_signature(&message, &signature, public_key),
        CoordinatorAlgorithm::Secp256k1Sha256 => validate_secp256k1_signature(&message, &signature, public_key),
    }
}

/// Attach an RSA-PKCS1v15-SHA256 coordinator signature to `psbt`. Not used
/// in ordinary Hermit operation; useful for building test fixtures.
pub fn add_rsa_signature(mut psbt: Psbt, private_key_pem: &str) -> Result<Psbt, PsbtError> {
    let private_key = rsa::pkcs8::DecodePrivateKey::from_pkcs8_pem(private_key_pem)
        .map_err(|e: rsa::pkcs8::Error| PsbtError::InvalidCoordinatorSignature(format!("invalid RSA private key: {e}")))?;
    let private_key: RsaPrivateKey = private_key;
    let signing_key = SigningKey::<Sha256>::new(private_key);
    let message = psbt.to_string().into_bytes();
    let signature = signing_key.sign(&message);
    psbt.unknown.insert(coordinator_sig_key(), signature.to_bytes().to_vec());
    Ok(psbt)
}

/// Attach a secp256k1-over-SHA256 coordinator signature to `psbt`. Not used
/// in ordinary Hermit operation; useful for building test fixtures.
pub fn add_secp256k1_signature(mut psbt: Psbt, private_key_hex: &str) -> Result<Psbt, PsbtError> {
    let secret_bytes = hex::decode(private_key_hex)
        .map_err(|e| PsbtError::InvalidCoordinatorSignature(format!("invalid secp256k1 private key hex: {e}")))?;
    let secret_key = secp256k1::SecretKey::from_slice(&secret_bytes)
        .map_err(|e| PsbtError::InvalidCoordinatorSignature(format!("invalid secp256k1 private key: {e}")))?;
    let message = psbt.to_string().into_bytes();
    let digest: [u8; 32] = Sha256::digest(&message).into();
    let msg = Message::from_digest(digest);
    let secp = Secp256k1::signing_only();
    let sig = secp.sign_ecdsa(&msg, &secret_key);
    psbt.unknown.insert(coordinator_sig_key(), sig.serialize_der().to_vec());
    Ok(psbt)
}

impl FromStr for CoordinatorAlgorithm {
    type Err = PsbtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rsa-pkcs1v15-sha256" => Ok(Self::RsaPkcs1v15Sha256),
            "secp256k1-sha256" => Ok(Self::Secp256k1Sha256),
            other => Err(PsbtError::InvalidSignatureRequest(format!("unknown coordinator signature algorithm: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::absolute::LockTime;
    use bitcoin::transaction::Version;
    use bitcoin::Transaction;
    use rand::rngs::OsRng;
    use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey};

    fn empty_psbt() -> Psbt {
        let tx = Transaction { version: Version::TWO, lock_time: LockTime::ZERO, input: vec![], output: vec![] };
        Psbt::from_unsigned_tx(tx).unwrap()
    }

    #[test]
    fn missing_signature_passes_when_not_required() {
        let psbt = empty_psbt();
        let config = CoordinatorConfig { signature_required: false, algorithm: CoordinatorAlgorithm::RsaPkcs1v15Sha256, public_key: None };
        assert!(validate_coordinator_signature(&psbt, &config).is_ok());
    }

    #[test]
    fn missing_signature_fails_when_required() {
        let psbt = empty_psbt();
        let config = CoordinatorConfig { signature_required: true, algorithm: CoordinatorAlgorithm::RsaPkcs1v15Sha256, public_key: None };
        assert!(validate_coordinator_signature(&psbt, &config).is_err());
    }

    #[test]
    fn rsa_round_trip_and_tamper_detection() {
        let mut rng = OsRng;
        let private_key = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let public_key = RsaPublicKey::from(&private_key);
        let private_pem = private_key.to_pkcs8_pem(Default::default()).unwrap().to_string();
        let public_pem = public_key.to_public_key_pem(Default::default()).unwrap();

        let signed = add_rsa_signature(empty_psbt(), &private_pem).unwrap();
        let config = CoordinatorConfig {
            signature_required: true,
            algorithm: CoordinatorAlgorithm::RsaPkcs1v15Sha256,
            public_key: Some(public_pem),
        };
        assert!(validate_coordinator_signature(&signed, &config).is_ok());

        let mut tampered = signed;
        let key = coordinator_sig_key();
        let mut sig = tampered.unknown.get(&key).unwrap().clone();
        let last = sig.len() - 1;
        sig[last] ^= 0xFF;
        tampered.unknown.insert(key, sig);
        assert!(validate_coordinator_signature(&tampered, &config).is_err());
    }

    #[test]
    fn secp256k1_round_trip_and_tamper_detection() {
        let secret_key = secp256k1::SecretKey::from_slice(&[0x7Au8; 32]).unwrap();
        let secp = Secp256k1::new();
        let public_key = Secp256k1PublicKey::from_secret_key(&secp, &secret_key);

        let signed = add_secp256k1_signature(empty_psbt(), &hex::encode(secret_key.secret_bytes())).unwrap();
        let config = CoordinatorConfig {
            signature_required: true,
            algorithm: CoordinatorAlgorithm::Secp256k1Sha256,
            public_key: Some(hex::encode(public_key.serialize())),
        };
        assert!(validate_coordinator_signature(&signed, &config).is_ok());

        let mut tampered = signed;
        let key = coordinator_sig_key();
        let mut sig = tampered.unknown.get(&key).unwrap().clone();
        let last = sig.len() - 1;
        sig[last] ^= 0xFF;
        tampered.unknown.insert(key, sig);
        assert!(validate_coordinator_signature(&tampered, &config).is_err());
    }
}
