//! `hermit shards` REPL: build, import/export, and manage the shard store.

use crate::app::App;
use crate::optical_io;
use anyhow::{anyhow, bail, Context, Result};
use hermit_core::entropy::EntropyCollector;
use hermit_core::seed::parse_mnemonic;
use hermit_shard::mnemonic::decode_mnemonic;
use hermit_shard::shard::{Shard, ShardSelector};
use hermit_shard::split::{generate_mnemonics, GroupSpec};
use rand::rngs::OsRng;
use std::io::Write;
use std::path::Path;

pub fn dispatch(app: &mut App, line: &str) -> Result<bool> {
    let mut parts = line.split_whitespace();
    let Some(cmd) = parts.next() else { return Ok(true) };
    let args: Vec<&str> = parts.collect();

    match cmd {
        "quit" | "exit" => return Ok(false),
        "help" | "?" => print_help(),
        "build-family-from-phrase" => build_family_from_phrase(app, &args)?,
        "build-family-from-random" => build_family_from_random(app, &args)?,
        "build-family-from-family" => build_family_from_family(app, &args)?,
        "import-shard-from-phrase" => import_shard_from_phrase(app, arg(&args, 0)?)?,
        "import-shard-from-qr" => import_shard_from_qr(app, arg(&args, 0)?)?,
        "export-shard-as-phrase" => export_shard_as_phrase(app, arg(&args, 0)?)?,
        "export-shard-as-qr" => export_shard_as_qr(app, arg(&args, 0)?)?,
        "copy-shard" => copy_shard(app, arg(&args, 0)?, arg(&args, 1)?)?,
        "rename-shard" => rename_shard(app, arg(&args, 0)?, arg(&args, 1)?)?,
        "delete-shard" => delete_shard(app, arg(&args, 0)?)?,
        "write" => {
            app.persist_shard_store()?;
            println!("wrote {} shard(s) to {}", app.shard_store.len(), app.config.paths.shards_file.display());
        }
        "persist" => run_template(&app.config.commands.persist_shards, &app.config.paths.shards_file)?,
        "backup" => run_template(&app.config.commands.backup_shards, &app.config.paths.shards_file)?,
        "restore" => {
            run_template(&app.config.commands.restore_backup, &app.config.paths.shards_file)?;
            app.reload_shard_store()?;
            println!("restored and reloaded {} shard(s)", app.shard_store.len());
        }
        "reload" => {
            app.reload_shard_store()?;
            println!("reloaded {} shard(s)", app.shard_store.len());
        }
        "list" => {
            for name in app.shard_store.names() {
                println!("{name}");
            }
        }
        other => println!("unrecognized command: {other} (try 'help')"),
    }
    Ok(true)
}

fn print_help() {
    println!(
        "commands:\n\
         build-family-from-phrase GROUP_THRESHOLD M:N...\n\
         build-family-from-random GROUP_THRESHOLD M:N...\n\
         build-family-from-family GROUP_THRESHOLD M:N...\n\
         import-shard-from-phrase|qr NAME\n\
         export-shard-as-phrase|qr NAME\n\
         copy-shard OLD NEW | rename-shard OLD NEW | delete-shard NAME\n\
         write | persist | backup | restore | reload | list | quit"
    );
}

fn arg<'a>(args: &[&'a str], index: usize) -> Result<&'a str> {
    args.get(index).copied().ok_or_else(|| anyhow!("missing argument #{}", index + 1))
}

fn prompt_line(prompt: &str) -> Result<String> {
    print!("{prompt}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Parse `GROUP_THRESHOLD M1:N1 M2:N2 ...` into `(group_threshold, groups)`.
fn parse_group_args(args: &[&str]) -> Result<(u8, Vec<GroupSpec>)> {
    let group_threshold: u8 = arg(args, 0)?.parse().context("GROUP_THRESHOLD must be a small integer")?;
    let mut groups = Vec::new();
    for spec in &args[1..] {
        let (m, n) = spec.split_once(':').ok_or_else(|| anyhow!("group spec must look like M:N, got {spec}"))?;
        groups.push(GroupSpec {
            member_threshold: m.parse().context("member threshold must be a small integer")?,
            member_count: n.parse().context("member count must be a small integer")?,
        });
    }
    if groups.is_empty() {
        bail!("at least one group spec (M:N) is required");
    }
    Ok((group_threshold, groups))
}

/// Split `secret` per the requested group layout and install the resulting
/// shards into the store under operator-chosen names.
fn distribute_shares(app: &mut App, group_threshold: u8, groups: &[GroupSpec], secret: &[u8]) -> Result<()> {
    let passphrase = prompt_line("SLIP-39 passphrase for this family (blank for none): ")?;
    let passphrase = if passphrase.is_empty() { None } else { Some(passphrase.as_str()) };

    let mut rng = OsRng;
    let sets = generate_mnemonics(group_threshold, groups, secret, passphrase, 0, false, &mut rng)?;

    for (group_index, phrases) in sets.iter().enumerate() {
        for (member_index, phrase) in phrases.iter().enumerate() {
            let default_name = format!("g{group_index}m{member_index}");
            let name = prompt_line(&format!("name for group {group_index} member {member_index} [{default_name}]: "))?;
            let name = if name.is_empty() { default_name } else { name };
            app.shard_store.insert(Shard::new(name, phrase.clone()));
        }
    }
    println!("installed {} shard(s); run 'write' to persist", sets.iter().map(|g| g.len()).sum::<usize>());
    Ok(())
}

fn build_family_from_phrase(app: &mut App, args: &[&str]) -> Result<()> {
    let (group_threshold, groups) = parse_group_args(args)?;
    let phrase = prompt_line("BIP-39 phrase to reshard: ")?;
    let mnemonic = parse_mnemonic(&phrase)?;
    distribute_shares(app, group_threshold, &groups, &mnemonic.to_entropy())
}

fn build_family_from_random(app: &mut App, args: &[&str]) -> Result<()> {
    let (group_threshold, groups) = parse_group_args(args)?;
    println!("type random characters (several lines); stop once prompted");
    let mut collector = EntropyCollector::new();
    while !collector.is_ready(256.0) {
        let line = prompt_line("random input: ")?;
        collector.add(line.as_bytes());
    }
    let pool = collector.pool();
    distribute_shares(app, group_threshold, &groups, &pool)
}

/// Re-share an existing family under new group parameters: reconstruct the
/// secret from a quorum of already-stored shards, then split it again.
fn build_family_from_family(app: &mut App, args: &[&str]) -> Result<()> {
    let (group_threshold, groups) = parse_group_args(args)?;

    println!("select a quorum of existing shards to reconstruct the current family");
    let mut selector = ShardSelector::new();
    let mut selected = std::collections::BTreeSet::new();
    loop {
        if selector.is_complete().unwrap_or(false) {
            break;
        }
        let available: Vec<&str> = app.shard_store.names().filter(|n| !selected.contains(*n)).collect();
        if available.is_empty() {
            bail!("no more shards available; quorum not satisfied");
        }
        println!("available shards: {}", available.join(", "));
        let choice = prompt_line("shard name (blank to stop): ")?;
        if choice.is_empty() {
            break;
        }
        let Some(shard) = app.shard_store.get(&choice).cloned() else {
            println!("no such shard: {choice}");
            continue;
        };
        selector.add_shard(shard)?;
        selected.insert(choice);
    }
    if !selector.is_complete().unwrap_or(false) {
        bail!("insufficient shards selected");
    }

    let passphrase = prompt_line("existing family's SLIP-39 passphrase (blank for none): ")?;
    let passphrase = if passphrase.is_empty() { None } else { Some(passphrase.as_str()) };
    let secret = selector.reconstruct(passphrase)?;

    distribute_shares(app, group_threshold, &groups, &secret)
}

fn import_shard_from_phrase(app: &mut App, name: &str) -> Result<()> {
    let phrase = prompt_line("shard mnemonic phrase: ")?;
    decode_mnemonic(&phrase)?;
    app.shard_store.insert(Shard::new(name, phrase));
    println!("imported shard '{name}'");
    Ok(())
}

fn import_shard_from_qr(app: &mut App, name: &str) -> Result<()> {
    let bytes = optical_io::receive(&app.config)?;
    let phrase = String::from_utf8(bytes).map_err(|e| anyhow!("optical payload is not valid UTF-8: {e}"))?;
    decode_mnemonic(&phrase)?;
    app.shard_store.insert(Shard::new(name, phrase));
    println!("imported shard '{name}'");
    Ok(())
}

fn get_shard<'a>(app: &'a App, name: &str) -> Result<&'a Shard> {
    app.shard_store.get(name).ok_or_else(|| anyhow!("no such shard: {name}"))
}

fn export_shard_as_phrase(app: &App, name: &str) -> Result<()> {
    let shard = get_shard(app, name)?;
    println!("{}", shard.mnemonic);
    Ok(())
}

fn export_shard_as_qr(app: &App, name: &str) -> Result<()> {
    let shard = get_shard(app, name)?;
    optical_io::emit(&app.config, shard.mnemonic.as_bytes())
}

/// Copying re-decodes the source mnemonic before installing the copy, since
/// a wrong-password shard is structurally valid and carries no direct error
/// otherwise (§4.1).
fn copy_shard(app: &mut App, old: &str, new: &str) -> Result<()> {
    let shard = get_shard(app, old)?.clone();
    decode_mnemonic(&shard.mnemonic)?;
    app.shard_store.insert(Shard::new(new, shard.mnemonic));
    println!("copied '{old}' to '{new}'");
    Ok(())
}

fn rename_shard(app: &mut App, old: &str, new: &str) -> Result<()> {
    let shard = app.shard_store.remove(old).ok_or_else(|| anyhow!("no such shard: {old}"))?;
    app.shard_store.insert(Shard::new(new, shard.mnemonic));
    println!("renamed '{old}' to '{new}'");
    Ok(())
}

fn delete_shard(app: &mut App, name: &str) -> Result<()> {
    app.shard_store.remove(name).ok_or_else(|| anyhow!("no such shard: {name}"))?;
    println!("deleted '{name}'");
    Ok(())
}

fn run_template(template: &str, shards_file: &Path) -> Result<()> {
    let command = template.replace("{0}", &shards_file.display().to_string());
    let status = std::process::Command::new("sh").arg("-c").arg(&command).status()?;
    if !status.success() {
        bail!("command failed: {command}");
    }
    Ok(())
}
