use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voicebot::config::ClientConfig;
use voicebot::form::{ConfigDraft, SubmissionWorkflow};
use voicebot::provisioning::OtaClient;
use voicebot::routing::{initial_route, NavigationRouter, Route};
use voicebot::session::{SessionOrchestrator, SimulatedTransport};
use voicebot::settings::{FileSettingsStore, SettingsStore, TransportKind};
use voicebot::state::AbortReason;

#[derive(Parser)]
#[command(name = "voicebot")]
#[command(version)]
#[command(about = "Voice assistant client: provisioning, activation and chat session")]
struct Cli {
    /// Client configuration file (TOML)
    #[arg(long, env = "VOICEBOT_CONFIG")]
    config: Option<PathBuf>,

    /// Settings file (defaults to the user configuration directory)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Live endpoint URL
    #[arg(long)]
    endpoint: Option<String>,

    /// Provisioning (OTA) URL
    #[arg(long)]
    ota: Option<String>,

    /// Transport for the live connection
    #[arg(long, value_enum)]
    transport: Option<TransportArg>,

    /// Always show the configuration step on the next launch
    #[arg(long)]
    no_skip: bool,

    /// Ignore saved settings and run the configuration step now
    #[arg(long)]
    reconfigure: bool,

    /// How long the simulated assistant speaks each reply, in milliseconds
    #[arg(long)]
    reply_ms: Option<u64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum TransportArg {
    Mqtt,
    Websockets,
}

impl From<TransportArg> for TransportKind {
    fn from(arg: TransportArg) -> Self {
        match arg {
            TransportArg::Mqtt => TransportKind::Mqtt,
            TransportArg::Websockets => TransportKind::WebSockets,
        }
    }
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voicebot=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    info!("Starting voicebot client");

    let mut config = match &cli.config {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    };
    if let Some(path) = &cli.settings {
        config = config.with_settings_path(path);
    }
    if let Some(reply_ms) = cli.reply_ms {
        config = config.with_simulated_reply_ms(reply_ms);
    }

    let settings: Arc<dyn SettingsStore> = Arc::new(match &config.settings_path {
        Some(path) => FileSettingsStore::open(path)?,
        None => FileSettingsStore::open_default()?,
    });

    let router = NavigationRouter::new();
    let routes = router
        .take_receiver()
        .context("route receiver already taken")?;

    let start = if cli.reconfigure {
        Route::Form
    } else {
        initial_route(settings.as_ref())
    };
    router.publisher().publish(start)?;

    let identity = config.resolve_identity(settings.as_ref())?;
    info!("Device id {}", identity.device_id);

    let runtime = tokio::runtime::Runtime::new()?;
    let workflow = SubmissionWorkflow::new(
        Arc::clone(&settings),
        Arc::new(OtaClient::new(&config, &identity)?),
        router.publisher(),
    );

    while let Some(route) = routes.try_recv() {
        info!("Navigating to {}", route);
        match route {
            Route::Form => {
                let draft = draft_from_cli(&cli, settings.as_ref());
                println!(
                    "Connecting to {} via {} ...",
                    draft.provisioning_url, draft.transport_kind
                );
                if let Err(e) = runtime.block_on(workflow.submit(&draft)) {
                    if let voicebot::VoicebotError::Validation(errors) = &e {
                        for (field, message) in errors.iter() {
                            eprintln!("  {}: {}", field, message);
                        }
                    }
                    eprintln!("{}", e.user_message());
                    return Err(e.into());
                }
            }
            Route::Activation => {
                match workflow.activation().get() {
                    Some(activation) => {
                        println!("Use this code to bind the device: {}", activation.code);
                        if let Some(message) = activation.message {
                            println!("{}", message);
                        }
                    }
                    None => warn!("Activation route without an activation code"),
                }
                println!("Run voicebot again once the device is bound.");
            }
            Route::Chat => run_chat(&config, settings.as_ref(), &runtime)?,
        }
    }

    Ok(())
}

fn draft_from_cli(cli: &Cli, settings: &dyn SettingsStore) -> ConfigDraft {
    let mut draft = ConfigDraft::from_settings(settings);
    if let Some(endpoint) = &cli.endpoint {
        draft.endpoint_url = endpoint.clone();
    }
    if let Some(ota) = &cli.ota {
        draft.provisioning_url = ota.clone();
    }
    if let Some(transport) = cli.transport {
        draft.transport_kind = transport.into();
    }
    if cli.no_skip {
        draft.skip_config_after_connect = false;
    }
    draft
}

fn run_chat(
    config: &ClientConfig,
    settings: &dyn SettingsStore,
    runtime: &tokio::runtime::Runtime,
) -> Result<()> {
    let session_config = settings.snapshot();
    info!(
        "Opening {} session to {} (simulated)",
        session_config.transport_kind, session_config.endpoint_url
    );

    let (orchestrator, handle) = SessionOrchestrator::new(config);
    let transport = SimulatedTransport::new(
        handle.transport_sink(),
        Duration::from_millis(config.simulated_reply_ms),
    );
    transport.connect()?;
    let session = orchestrator.start(Box::new(transport))?;

    let mut state_rx = handle.device_state().subscribe();
    runtime.spawn(async move {
        loop {
            let state = *state_rx.borrow_and_update();
            if state.is_listening() {
                println!("[{}] s = stop", state);
            } else if state.is_speaking() {
                println!("[{}] a = interrupt", state);
            } else {
                println!("[{}]", state);
            }
            if state_rx.changed().await.is_err() {
                break;
            }
        }
    });

    let mut transcript = handle.transcript().subscribe();
    let emotion = handle.emotion();
    runtime.spawn(async move {
        loop {
            for message in transcript.next_batch().await {
                if message.sender.is_user() {
                    println!("{:>9}: {}", message.sender, message.text);
                } else {
                    println!("{:>9}: {} ({})", message.sender, message.text, emotion.get());
                }
            }
        }
    });

    println!("Commands: l = listen, s = stop, a = abort reply, q = quit");
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        match line?.trim() {
            "l" | "listen" => handle.start_listening()?,
            "s" | "stop" => handle.stop_listening()?,
            "a" | "abort" => handle.abort_speaking(AbortReason::None)?,
            "q" | "quit" => break,
            "" => {}
            other => println!("Unknown command {:?}", other),
        }
        io::stdout().flush()?;
    }

    handle.shutdown()?;
    if session.join().is_err() {
        warn!("Session thread panicked");
    }
    Ok(())
}
