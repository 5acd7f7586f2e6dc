//! `hermit wallet` REPL: unlock, lock, sign, and xpub display.

use crate::app::App;
use crate::optical_io;
use anyhow::{anyhow, bail, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bitcoin::bip32::{Fingerprint, Xpub};
use bitcoin::secp256k1::Secp256k1;
use bitcoin::Psbt;
use hermit_core::seed::mnemonic_from_entropy;
use hermit_psbt::{describe_psbt, sign_psbt, validate_coordinator_signature, CoordinatorConfig};
use hermit_shard::shard::ShardSelector;
use std::collections::BTreeMap;
use std::io::Write;

/// Returns `false` when the operator asked to quit.
pub fn dispatch(app: &mut App, line: &str) -> Result<bool> {
    let mut parts = line.split_whitespace();
    let Some(cmd) = parts.next() else { return Ok(true) };
    let args: Vec<&str> = parts.collect();

    match cmd {
        "quit" | "exit" => return Ok(false),
        "help" | "?" => print_help(),
        "unlock" => unlock(app)?,
        "lock" => {
            app.wallet.lock();
            println!("wallet locked");
        }
        "sign" => sign(app, args.first().copied())?,
        "display-xpub" => {
            let path = args.first().ok_or_else(|| anyhow!("usage: display-xpub PATH"))?;
            let xpub = app.wallet.xpub(path, true)?;
            println!("{xpub}");
        }
        other => println!("unrecognized command: {other} (try 'help')"),
    }
    Ok(true)
}

fn print_help() {
    println!(
        "commands: unlock | lock | sign [BASE64_PSBT] | display-xpub PATH | quit\n\
         unlock interactively assembles a shard quorum from the shard store and \
         reconstructs the wallet's seed."
    );
}

fn prompt_line(prompt: &str) -> Result<String> {
    print!("{prompt}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// The interactive quorum-assembly loop of §4.1: offer shard names one at a
/// time, track group/family consistency via `ShardSelector`, reconstruct
/// once satisfied.
fn unlock(app: &mut App) -> Result<()> {
    app.selector = ShardSelector::new();
    let mut selected = std::collections::BTreeSet::new();

    loop {
        if app.selector.is_complete().unwrap_or(false) {
            break;
        }
        let available: Vec<&str> = app.shard_store.names().filter(|n| !selected.contains(*n)).collect();
        if available.is_empty() {
            bail!("no more shards available in the store; quorum not satisfied");
        }
        println!("available shards: {}", available.join(", "));
        if let Ok(progress) = app.selector.group_progress() {
            if !progress.is_empty() {
                println!("group progress: {progress:?}");
            }
        }
        let choice = prompt_line("shard name (blank to stop, 'abort' to cancel): ")?;
        if choice.is_empty() {
            break;
        }
        if choice == "abort" {
            app.selector = ShardSelector::new();
            println!("unlock aborted");
            return Ok(());
        }
        let Some(shard) = app.shard_store.get(&choice).cloned() else {
            println!("no such shard: {choice}");
            continue;
        };
        app.selector.add_shard(shard)?;
        selected.insert(choice);
    }

    if !app.selector.is_complete().unwrap_or(false) {
        bail!("insufficient shards selected");
    }

    let slip39_passphrase = prompt_line("SLIP-39 passphrase (blank for none): ")?;
    let slip39_passphrase = if slip39_passphrase.is_empty() { None } else { Some(slip39_passphrase.as_str()) };
    let entropy = app.selector.reconstruct(slip39_passphrase)?;
    let mnemonic = mnemonic_from_entropy(&entropy)?;

    let bip39_passphrase = prompt_line("BIP-39 passphrase (blank for none): ")?;
    app.wallet.unlock(&mnemonic.to_string(), &bip39_passphrase, app.testnet)?;
    app.selector = ShardSelector::new();
    println!("wallet unlocked");
    Ok(())
}

/// The fingerprint → xpub map `describe_psbt` needs to verify named-pubkey
/// claims: cosigners' xpubs come from the PSBT's own global `hd_pubs` map
/// (BIP-174 `xpub` field); this wallet's own xpub is derived locally.
fn hdpubkey_map(app: &App, psbt: &Psbt) -> Result<BTreeMap<Fingerprint, Xpub>> {
    let mut map = BTreeMap::new();
    for (xpub, (fingerprint, _path)) in psbt.xpub.iter() {
        map.insert(*fingerprint, *xpub);
    }

    let root = app.wallet.private_key("m")?;
    let secp = Secp256k1::new();
    map.insert(root.fingerprint(&secp), Xpub::from_priv(&secp, &root));
    Ok(map)
}

fn sign(app: &mut App, inline_psbt: Option<&str>) -> Result<()> {
    if !app.wallet.unlocked() {
        bail!("wallet is locked; run 'unlock' first");
    }

    let base64_psbt = match inline_psbt {
        Some(p) => p.to_string(),
        None => {
            let bytes = optical_io::receive(&app.config)?;
            String::from_utf8(bytes).map_err(|e| anyhow!("optical payload is not valid UTF-8: {e}"))?
        }
    };
    let bytes = BASE64.decode(base64_psbt.trim()).map_err(|e| anyhow!("invalid base64 PSBT: {e}"))?;
    let psbt = Psbt::deserialize(&bytes).map_err(|e| anyhow!("invalid PSBT: {e}"))?;

    let coordinator_config = CoordinatorConfig {
        signature_required: app.config.coordinator.signature_required,
        algorithm: app.config.coordinator_algorithm()?,
        public_key: app.config.coordinator.public_key.clone(),
    };
    validate_coordinator_signature(&psbt, &coordinator_config)?;

    let hdpubkeys = hdpubkey_map(app, &psbt)?;
    let network = if app.testnet { bitcoin::Network::Testnet } else { bitcoin::Network::Bitcoin };
    let summary = describe_psbt(&psbt, &hdpubkeys, network)?;
    println!("{}", summary.summary_text);

    let approve = prompt_line("approve and sign? [y/N] ")?;
    if !approve.eq_ignore_ascii_case("y") {
        println!("sign aborted by operator");
        return Ok(());
    }

    let root = app.wallet.private_key("m")?;
    let (signed, added) = sign_psbt(psbt, &root)?;
    println!("added {added} signature(s)");

    optical_io::emit(&app.config, signed.to_string().as_bytes())?;
    Ok(())
}
