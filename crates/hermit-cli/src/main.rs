//! Hermit — air-gapped HD wallet operator console.
//!
//! # Usage
//!
//! ```bash
//! hermit wallet --config /etc/hermit.yaml
//! hermit shards --config /etc/hermit.yaml
//! ```

mod app;
mod config;
mod optical_io;
mod shards_repl;
mod wallet_repl;

use anyhow::{bail, Context, Result};
use app::App;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Wallet,
    Shards,
}

fn main() -> Result<()> {
    hermit_core::memory::disable_core_dumps();

    let args: Vec<String> = std::env::args().collect();

    let Some(mode_arg) = args.get(1) else {
        print_help();
        std::process::exit(2);
    };

    let mode = match mode_arg.as_str() {
        "wallet" => Mode::Wallet,
        "shards" => Mode::Shards,
        "--help" | "-h" => {
            print_help();
            return Ok(());
        }
        "--version" | "-V" => {
            println!("hermit {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        other => bail!("unknown mode '{other}'; expected 'wallet' or 'shards'"),
    };

    let mut config_path = std::env::var("HERMIT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/etc/hermit.yaml"));

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                i += 1;
                if i < args.len() {
                    config_path = PathBuf::from(&args[i]);
                } else {
                    bail!("--config requires a path argument");
                }
            }
            other => bail!("unknown argument: {other}"),
        }
        i += 1;
    }

    let debug = std::env::var("DEBUG").map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
    let testnet = std::env::var("TESTNET").map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);

    let mut cfg = config::Config::from_file(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    cfg.apply_env_overrides();
    cfg.validate().context("configuration validation failed")?;

    std::env::set_var("RUST_LOG", if debug { "debug" } else { "info" });
    env_logger::init();

    let mut app = App::new(cfg, testnet)?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build the Tokio runtime")?;

    let result = rt.block_on(async { tokio::select! {
        result = run_repl(&mut app, mode) => result,
        _ = tokio::signal::ctrl_c() => {
            println!("\ninterrupted");
            Ok(())
        }
    }});

    if let Err(e) = result {
        if debug {
            eprintln!("error: {e:#}");
        } else {
            eprintln!("error: {e}");
        }
        std::process::exit(1);
    }

    Ok(())
}

fn print_help() {
    println!(
        r#"hermit — air-gapped HD wallet operator console

USAGE:
    hermit <wallet|shards> [--config PATH]

ENVIRONMENT VARIABLES:
    HERMIT_CONFIG         Config file path (default: /etc/hermit.yaml)
    DEBUG                 1/true prints backtraces on error
    TESTNET               1/true derives and signs against testnet
    HERMIT_LOAD_ALL_IO    1/true preloads every configured I/O adapter
"#
    );
}

/// One foreground task (the REPL) plus a 500 ms idle tick, interleaved by
/// `select!` within the same task rather than across spawned tasks — the
/// wallet's seed is never shared behind a lock or channel (§5, §9).
async fn run_repl(app: &mut App, mode: Mode) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(Duration::from_millis(500));
    let ticks_to_lock = ((app.config.coordinator.relock_timeout * 1000) / 500).max(1) as u32;
    let mut idle_ticks: u32 = 0;

    loop {
        print_prompt(mode, app);
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    None => break,
                    Some(text) => {
                        idle_ticks = 0;
                        let keep_going = match mode {
                            Mode::Wallet => wallet_repl::dispatch(app, &text),
                            Mode::Shards => shards_repl::dispatch(app, &text),
                        };
                        match keep_going {
                            Ok(false) => break,
                            Ok(true) => {}
                            Err(e) => println!("error: {e}"),
                        }
                    }
                }
            }
            _ = ticker.tick() => {
                if app.wallet.unlocked() {
                    idle_ticks += 1;
                    if idle_ticks >= ticks_to_lock {
                        app.wallet.lock();
                        idle_ticks = 0;
                        println!("\n(wallet auto-locked after {}s idle)", app.config.coordinator.relock_timeout);
                    }
                }
            }
        }
    }
    Ok(())
}

fn print_prompt(mode: Mode, app: &App) {
    use std::io::Write;
    let name = match mode {
        Mode::Wallet => "wallet",
        Mode::Shards => "shards",
    };
    let state = if mode == Mode::Wallet { if app.wallet.unlocked() { "unlocked" } else { "locked" } } else { "" };
    print!("hermit {name}{}{state}> ", if state.is_empty() { "" } else { " " });
    let _ = std::io::stdout().flush();
}
