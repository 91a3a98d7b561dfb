//! Entry point for the read-aloud client.
//!
//! Responsibilities here are intentionally minimal:
//! - Parse command-line arguments.
//! - Load user configuration from `conf/config.toml`.
//! - Wire the playback controller to the HTTP synthesizer, the audio device
//!   and the terminal, then feed it key presses until asked to quit.

mod console;
mod player;
mod session;

use crate::console::{ConsoleAction, ConsolePresenter, action_for_input, key_help};
use crate::player::RodioPlayer;
use crate::session::BookmarkedDocument;
use anyhow::{Context, Result, anyhow};
use readaloud_core::cache::{load_last_page, save_last_page};
use readaloud_core::config::{AppConfig, load_config, serialize_config};
use readaloud_core::controller::{Command, ControllerHandle, PlaybackController};
use readaloud_core::document::{PageSource, PagedDocument};
use readaloud_core::engines::catalog;
use readaloud_core::synthesis::{HttpTransport, SynthesisClient};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

const DEFAULT_CONFIG_PATH: &str = "conf/config.toml";
const USAGE: &str = "Usage: readaloud <text-file> [--config <path>] [--page <n>] [--engine <name>] \
[--voice <id>] [--auto-continue] [--auto-delete] [--list-voices] [--list-engines] [--print-config]";

#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    path: Option<PathBuf>,
    config: Option<PathBuf>,
    page: Option<usize>,
    engine: Option<String>,
    voice: Option<String>,
    auto_continue: bool,
    auto_delete: bool,
    list_voices: bool,
    list_engines: bool,
    print_config: bool,
}

fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle) {
        error!("{err:?}");
        std::process::exit(1);
    }
}

fn run(reload_handle: &ReloadHandle) -> Result<()> {
    let args = parse_args(env::args().skip(1))?;
    if args.list_engines {
        print_engines();
        return Ok(());
    }
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let mut config = load_config(&config_path);
    apply_overrides(&mut config, &args);
    if args.print_config {
        print!("{}", serialize_config(&config)?);
        return Ok(());
    }
    if env::var_os("RUST_LOG").is_none() {
        set_log_level(reload_handle, config.log_level.as_filter_str());
    }
    info!(
        base_url = %config.base_url,
        engine = %config.engine,
        voice = %config.voice,
        level = %config.log_level,
        "Starting read-aloud client"
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let outcome = runtime.block_on(async {
        if args.list_voices {
            list_voices(&config).await
        } else {
            let path = args.path.clone().ok_or_else(|| anyhow!(USAGE))?;
            listen(config, path, args.page).await
        }
    });
    // Stdin reads run on a blocking thread that cannot be interrupted.
    runtime.shutdown_timeout(Duration::from_millis(100));
    outcome
}

fn synthesis_client(config: &AppConfig) -> Result<SynthesisClient> {
    let transport = HttpTransport::new(&config.base_url, config.request_timeout())?;
    Ok(SynthesisClient::new(
        Arc::new(transport),
        config.credentials(),
        config.poll_interval(),
    ))
}

fn print_engines() {
    for engine in catalog() {
        let key = if engine.requires_api_key {
            " (api key)"
        } else {
            ""
        };
        println!(
            "{}\t{}{key}\t{}",
            engine.name, engine.display_name, engine.description
        );
    }
}

async fn list_voices(config: &AppConfig) -> Result<()> {
    let client = synthesis_client(config)?;
    let voices = client
        .list_voices(&config.engine)
        .await
        .with_context(|| format!("listing voices for engine `{}`", config.engine))?;
    if voices.is_empty() {
        println!("No voices reported for engine `{}`.", config.engine);
    }
    for voice in voices {
        println!("{}\t{}", voice.id, voice.name);
    }
    Ok(())
}

async fn listen(config: AppConfig, path: PathBuf, page: Option<usize>) -> Result<()> {
    if !path.exists() {
        return Err(anyhow!("File not found: {}", path.display()));
    }
    let cache_root = config.cache_root();
    let mut document = PagedDocument::load(&path, config.chars_per_page)?;
    if config.auto_delete_consumed {
        document = document.with_backing_file(&path);
    }
    let start_page = page
        .map(|p| p.saturating_sub(1))
        .or_else(|| load_last_page(&cache_root, &path));
    if let Some(start_page) = start_page {
        document.set_page(start_page);
        info!(page = document.page_index() + 1, "Resuming from page");
    }

    let synthesizer = synthesis_client(&config)?;
    let output = RodioPlayer::new(config.request_timeout())?;
    let (controller, handle) = PlaybackController::new(
        config.playback_settings(),
        config.voice_selection(),
        Arc::new(synthesizer),
        Box::new(output),
        Box::new(ConsolePresenter::stdout()),
        Box::new(BookmarkedDocument::new(document, cache_root.clone(), path.clone())),
    );

    install_ctrlc(handle.clone())?;
    let controller_task = tokio::spawn(controller.run());
    println!("{}", key_help(&config));
    handle.send(Command::Start)?;

    let input = tokio::spawn(read_commands(config.clone(), handle.clone()));
    controller_task
        .await
        .context("playback controller task failed")?;
    input.abort();

    save_last_page(&cache_root, &path, handle.snapshot().page);
    info!("Exiting");
    Ok(())
}

async fn read_commands(config: AppConfig, handle: ControllerHandle) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!("Input closed; playback continues until interrupted");
                return;
            }
            Err(err) => {
                warn!("Failed to read input: {err}");
                return;
            }
        };
        let action = match action_for_input(&config, &line) {
            Some(action) => action,
            None => continue,
        };
        let command = match action {
            ConsoleAction::Command(command) => command,
            ConsoleAction::Quit => Command::Shutdown,
        };
        if handle.send(command).is_err() {
            return;
        }
    }
}

fn install_ctrlc(handle: ControllerHandle) -> Result<()> {
    ctrlc::set_handler(move || {
        info!("Interrupt received; stopping playback");
        let _ = handle.send(Command::Shutdown);
    })
    .context("failed to install Ctrl-C handler")
}

fn apply_overrides(config: &mut AppConfig, args: &CliArgs) {
    if let Some(engine) = &args.engine {
        config.engine = engine.clone();
    }
    if let Some(voice) = &args.voice {
        config.voice = voice.clone();
    }
    if args.auto_continue {
        config.auto_continue = true;
    }
    if args.auto_delete {
        config.auto_delete_consumed = true;
    }
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<CliArgs> {
    let mut parsed = CliArgs::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => parsed.config = Some(PathBuf::from(value_for(&mut args, &arg)?)),
            "--page" => {
                let raw = value_for(&mut args, &arg)?;
                let page = raw
                    .parse::<usize>()
                    .with_context(|| format!("invalid page number `{raw}`"))?;
                parsed.page = Some(page.max(1));
            }
            "--engine" => parsed.engine = Some(value_for(&mut args, &arg)?),
            "--voice" => parsed.voice = Some(value_for(&mut args, &arg)?),
            "--auto-continue" => parsed.auto_continue = true,
            "--auto-delete" => parsed.auto_delete = true,
            "--list-voices" => parsed.list_voices = true,
            "--list-engines" => parsed.list_engines = true,
            "--print-config" => parsed.print_config = true,
            "-h" | "--help" => return Err(anyhow!(USAGE)),
            flag if flag.starts_with("--") => {
                return Err(anyhow!("Unknown option `{flag}`\n{USAGE}"));
            }
            _ if parsed.path.is_none() => parsed.path = Some(PathBuf::from(arg)),
            _ => return Err(anyhow!("Unexpected argument `{arg}`\n{USAGE}")),
        }
    }
    let needs_path = !(parsed.list_voices || parsed.list_engines || parsed.print_config);
    if parsed.path.is_none() && needs_path {
        return Err(anyhow!(USAGE));
    }
    Ok(parsed)
}

fn value_for(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    args.next()
        .ok_or_else(|| anyhow!("Missing value for `{flag}`\n{USAGE}"))
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(filter_layer),
        )
        .init();
    warn!("Logging initialized; override level with config.log_level or RUST_LOG");
    handle
}

fn set_log_level(handle: &ReloadHandle, level: &str) {
    let parsed = EnvFilter::builder()
        .parse(level)
        .unwrap_or_else(|_| EnvFilter::new("debug"));
    if let Err(err) = handle.modify(|filter| *filter = parsed.clone()) {
        warn!(%level, "Failed to update log level from config: {err}");
    } else {
        info!(%level, "Applied log level from config");
    }
}
