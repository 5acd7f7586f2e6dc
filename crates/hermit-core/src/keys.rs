//! BIP-32 key derivation over arbitrary paths, with SLIP-132 xpub export.

use bitcoin::bip32::{DerivationPath, Xpriv, Xpub};
use bitcoin::secp256k1::Secp256k1;
use bitcoin::Network;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KeyError {
    #[error("derivation failed: {0}")]
    DerivationFailed(String),
    #[error("invalid path: {0}")]
    InvalidPath(String),
}

/// SLIP-132 version bytes for a P2WSH (multisig, native segwit) extended
/// public key — `Zpub`/`Vpub` instead of the standard `xpub`/`tpub`.
const SLIP132_P2WSH_MAINNET: [u8; 4] = [0x02, 0xaa, 0x7e, 0xd3];
const SLIP132_P2WSH_TESTNET: [u8; 4] = [0x02, 0x57, 0x54, 0x83];

fn parse_path(path: &str) -> Result<DerivationPath, KeyError> {
    path.parse().map_err(|e: bitcoin::bip32::Error| KeyError::InvalidPath(e.to_string()))
}

/// Derive the master extended private key from a 64-byte BIP-39 seed.
pub fn master_xprv(seed: &[u8], network: Network) -> Result<Xpriv, KeyError> {
    Xpriv::new_master(network, seed).map_err(|e| KeyError::DerivationFailed(e.to_string()))
}

/// Derive the private key at an arbitrary BIP-32 path from a root xprv.
pub fn derive_private_key(root: &Xpriv, path: &str) -> Result<Xpriv, KeyError> {
    let path = parse_path(path)?;
    let secp = Secp256k1::new();
    root.derive_priv(&secp, &path).map_err(|e| KeyError::DerivationFailed(e.to_string()))
}

/// Derive the extended public key at a path, encoded with either the
/// standard BIP-32 version bytes or SLIP-132's P2WSH version bytes.
pub fn derive_xpub(root: &Xpriv, path: &str, use_slip132: bool) -> Result<String, KeyError> {
    let secp = Secp256k1::new();
    let derived = derive_private_key(root, path)?;
    let xpub = Xpub::from_priv(&secp, &derived);

    if !use_slip132 {
        return Ok(xpub.to_string());
    }

    let version = match derived.network {
        Network::Bitcoin => SLIP132_P2WSH_MAINNET,
        _ => SLIP132_P2WSH_TESTNET,
    };

    let mut bytes = xpub.encode();
    bytes[0..4].copy_from_slice(&version);
    Ok(bitcoin::base58::encode_check(&bytes))
}
