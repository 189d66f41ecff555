mod arbitration;
mod basenode;
mod canbus;
mod category;
mod command;
mod config;
mod daemonize;
mod decode;
mod encode;
mod error;
mod fanout;
mod field;
mod heartbeat;
mod ingestion;
mod pgns;
mod playback;
mod reconciler;
mod status;

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, RwLock};

use tracing_subscriber::EnvFilter;

use basenode::{InboundListener, MessageType, Transport, UdpTransport};
use canbus::CanBus;
use command::CommandDispatcher;
use config::NodeConfig;
use fanout::SubscriberRegistry;
use heartbeat::HeartbeatScheduler;
use ingestion::IngestionLoop;
use playback::PlaybackEngine;
use reconciler::ConfigReconciler;

struct Cli {
    config_path: String,
    daemon: bool,
}

fn parse_cli() -> Cli {
    let mut config_path = "config.json".to_string();
    let mut daemon = false;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                if let Some(path) = args.next() {
                    config_path = path;
                }
            }
            "--daemon" => daemon = true,
            other => eprintln!("ignoring unrecognized argument: {other}"),
        }
    }

    Cli { config_path, daemon }
}

fn init_logging(config: &config::LogConfig) -> tracing_appender::non_blocking::WorkerGuard {
    std::fs::create_dir_all(&config.directory).ok();
    let file_appender = tracing_appender::rolling::daily(&config.directory, &config.file_prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();

    guard
}

fn main() {
    let cli = parse_cli();

    let config = NodeConfig::from_file(&cli.config_path).unwrap_or_else(|e| {
        eprintln!("failed to load config at {}: {e}; using defaults", cli.config_path);
        NodeConfig::default()
    });

    let _log_guard = init_logging(&config.logging);

    if cli.daemon {
        if let Err(e) = daemonize::daemonize() {
            tracing::error!(error = %e, "daemonize failed");
            std::process::exit(1);
        }
    }

    tracing::info!(config_path = %cli.config_path, "starting can_controller_node");

    let node_name = config.transport.node_name.clone();
    let listen_addr = config.transport.listen_addr;

    let bus = Arc::new(CanBus::new());
    let registry = Arc::new(SubscriberRegistry::new());
    let running = Arc::new(AtomicBool::new(true));
    let data_ttl_days = Arc::new(AtomicI64::new(config.data_ttl_days));
    let config = Arc::new(RwLock::new(config));

    let transport: Arc<dyn Transport> = match UdpTransport::new(
        config.read().unwrap().transport.master_core_addr,
        config.read().unwrap().transport.peer_addresses.clone(),
    ) {
        Ok(t) => Arc::new(t),
        Err(e) => {
            tracing::error!(error = %e, "failed to initialize transport; exiting");
            std::process::exit(1);
        }
    };

    let reconciler = Arc::new(ConfigReconciler::new(bus.clone(), config.clone(), data_ttl_days.clone()));
    if let Err(e) = reconciler.start(None) {
        tracing::error!(error = %e, "config reconciler startup failed");
    }

    let ingestion_running = running.clone();
    let ingestion = Arc::new(IngestionLoop::new(
        bus.clone(),
        registry.clone(),
        transport.clone(),
        node_name.clone(),
        data_ttl_days,
        ingestion_running,
    ));

    let playback = Arc::new(PlaybackEngine::new());
    let dispatcher = Arc::new(CommandDispatcher::new(
        bus.clone(),
        registry.clone(),
        transport.clone(),
        playback,
        config.clone(),
        ingestion.clone(),
        reconciler.clone(),
    ));

    let ingestion_handle = {
        let ingestion = ingestion.clone();
        std::thread::spawn(move || ingestion.run())
    };

    let heartbeat_running = running.clone();
    let heartbeat_handle = {
        let transport = transport.clone();
        let node_name = node_name.clone();
        std::thread::spawn(move || HeartbeatScheduler::new(transport, node_name, heartbeat_running).run())
    };

    install_signal_handlers(running.clone());

    let listener = match InboundListener::bind(listen_addr) {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(error = %e, %listen_addr, "failed to bind inbound listener; exiting");
            std::process::exit(1);
        }
    };

    tracing::info!(%listen_addr, "listening for inbound BaseNode messages");

    while running.load(Ordering::SeqCst) {
        match listener.recv() {
            Ok(Some((message, addr))) => {
                if message.message_type != MessageType::Command {
                    continue;
                }
                let command = message.payload.get("command").and_then(|v| v.as_str()).unwrap_or("");
                let response = dispatcher.dispatch(command, &message.payload, &message.source);
                tracing::debug!(%addr, command, "dispatched inbound command");
                let _ = response;
            }
            Ok(None) => continue,
            Err(e) => tracing::warn!(error = %e, "inbound receive error"),
        }
    }

    ingestion_handle.join().ok();
    heartbeat_handle.join().ok();
    tracing::info!("can_controller_node shut down");
}

fn install_signal_handlers(running: Arc<AtomicBool>) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{self, SigHandler, Signal};

        static RUNNING: std::sync::OnceLock<Arc<AtomicBool>> = std::sync::OnceLock::new();
        let _ = RUNNING.set(running);

        extern "C" fn handle_signal(_: i32) {
            if let Some(flag) = RUNNING.get() {
                flag.store(false, Ordering::SeqCst);
            }
        }

        unsafe {
            let _ = signal::signal(Signal::SIGINT, SigHandler::Handler(handle_signal));
            let _ = signal::signal(Signal::SIGTERM, SigHandler::Handler(handle_signal));
        }
    }
    #[cfg(not(unix))]
    {
        let _ = running;
    }
}
