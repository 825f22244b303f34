use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use second_thought::analysis::{AnalysisClient, AnalysisResult, OpenRouterClient};
use second_thought::host::{ConsoleSurface, forward_events};
use second_thought::logging::{self, LogLevel};
use second_thought::settings::{self, JsonFileSettings, SettingsStore};
use second_thought::{
    Config, ContextMessage, ContextWindow, Pipeline, Platform, Runtime, Sender, config, is_trivial,
};
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// `second-thought`: a pause before you press send
#[derive(Parser, Debug)]
#[command(
    name = "second-thought",
    version,
    about = "Analyze chat drafts before they are sent"
)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, env = "SECOND_THOUGHT_CONFIG")]
    config: Option<PathBuf>,

    /// Path to the JSON settings file holding the API key and model
    #[arg(long, env = "SECOND_THOUGHT_SETTINGS", default_value = "second-thought.json")]
    settings: PathBuf,

    /// Logging verbosity level
    #[arg(long, default_value = "info")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Drive the pipeline from host events on stdin
    Watch {
        /// Chat platform of the host page
        #[arg(long, value_enum)]
        platform: Option<Platform>,
        /// Host name used to detect the platform when none is given
        #[arg(long)]
        host: Option<String>,
    },
    /// Analyze a single draft and print the result
    Check {
        draft: String,
        /// Conversation history, oldest first, as `me:text`, `them:text` or `text`
        #[arg(long = "message")]
        messages: Vec<String>,
    },
    /// Show or update the stored API key and model
    Settings {
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        model: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_level);

    let config = match &cli.config {
        Some(path) => config::load(path)
            .await
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    let store = Rc::new(JsonFileSettings::new(&cli.settings));
    debug!(settings = %store.path().display(), "using settings file");

    match cli.command {
        Command::Watch { platform, host } => watch(config, store, platform, host).await,
        Command::Check { draft, messages } => check(config, store.as_ref(), &draft, &messages).await,
        Command::Settings { api_key, model } => update_settings(store.as_ref(), api_key, model),
    }
}

async fn watch(
    config: Config,
    store: Rc<JsonFileSettings>,
    platform: Option<Platform>,
    host: Option<String>,
) -> anyhow::Result<()> {
    let platform = match (platform, host.as_deref()) {
        (Some(platform), _) => platform,
        (None, Some(host)) => match Platform::detect(host) {
            Some(platform) => platform,
            None => bail!("unsupported host {host}"),
        },
        (None, None) => bail!("pass --platform or --host"),
    };
    info!(?platform, "watching composer");

    let client = OpenRouterClient::new(config.service.clone())?;
    let pipeline = Pipeline::new(platform.adapter(), store, config);
    let mut runtime = Runtime::new(
        pipeline,
        Rc::new(client),
        ConsoleSurface::new(std::io::stdout()),
    );

    let (tx, rx) = mpsc::channel(64);
    let reader = forward_events(BufReader::new(tokio::io::stdin()), tx);
    let (read, ()) = tokio::join!(reader, runtime.run(rx));
    read
}

fn parse_message(raw: &str) -> ContextMessage {
    match raw.split_once(':') {
        Some((who, text)) if who.eq_ignore_ascii_case("me") => {
            ContextMessage::new(Sender::Me, text.trim())
        }
        Some((who, text)) if who.eq_ignore_ascii_case("them") => {
            ContextMessage::new(Sender::Them, text.trim())
        }
        _ => ContextMessage::new(Sender::Unknown, raw.trim()),
    }
}

async fn check(
    config: Config,
    store: &JsonFileSettings,
    draft: &str,
    messages: &[String],
) -> anyhow::Result<()> {
    let result = if is_trivial(draft) {
        info!("draft is trivial, not sending");
        AnalysisResult::trivial(draft)
    } else {
        let context = ContextWindow::from_messages(
            messages.len(),
            messages.iter().map(|m| parse_message(m)),
        );
        let model = store.model_or(&config.service.default_model);
        let client = OpenRouterClient::new(config.service)?;
        client
            .analyze(draft, &context, store.credential().as_deref(), &model)
            .await?
    };
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn update_settings(
    store: &JsonFileSettings,
    api_key: Option<String>,
    model: Option<String>,
) -> anyhow::Result<()> {
    if let Some(key) = api_key {
        store.set(settings::API_KEY, key.trim())?;
        info!("API key saved");
    }
    if let Some(model) = model {
        store.set(settings::MODEL, model.trim())?;
        info!(%model, "model saved");
    }
    let key = store
        .credential()
        .map(|k| settings::mask(&k))
        .unwrap_or_else(|| "(not set)".into());
    let model = store.get(settings::MODEL).unwrap_or_else(|| "(default)".into());
    println!("{}: {key}", settings::API_KEY);
    println!("{}: {model}", settings::MODEL);
    Ok(())
}
