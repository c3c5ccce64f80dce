use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use oxy_lib::settings::{default_settings_path, load_settings, save_settings};
use oxy_lib::{
    AppSettings, DiscordConnector, Field, PresenceFields, ProfileStore, SessionManager,
    SessionStatus, SharedFields, Theme,
};

#[derive(Parser)]
#[command(name = "oxy", version, about = "Discord Rich Presence from saved profiles")]
struct Cli {
    /// Settings file (defaults to the per-user data directory)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Directory holding profile files
    #[arg(long, global = true)]
    profiles_dir: Option<PathBuf>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List saved profiles
    List,
    /// Print a saved profile
    Show { name: String },
    /// List known themes
    Themes,
    /// Save a profile, optionally starting from another one
    Save {
        name: String,
        /// Profile to copy values from before applying field flags
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        theme: Option<Theme>,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Broadcast presence until interrupted.
    ///
    /// While running, `<field>=<value>` lines on stdin edit the live fields,
    /// `start` reconnects.
    Run {
        /// Profile to load (defaults to the first saved profile)
        name: Option<String>,
        /// Refresh interval in seconds
        #[arg(long)]
        interval: Option<u64>,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Show the stored settings, updating any that are given.
    ///
    /// `--profiles-dir` is remembered as the default profile directory.
    Config {
        #[command(flatten)]
        settings: SettingsArgs,
    },
}

#[derive(Args)]
struct SettingsArgs {
    /// Refresh interval in seconds
    #[arg(long)]
    refresh_interval: Option<u64>,
    /// Timeout for each call to Discord, in seconds
    #[arg(long)]
    call_timeout: Option<u64>,
    /// Theme for new profiles
    #[arg(long)]
    theme: Option<Theme>,
}

impl SettingsArgs {
    /// Apply the given values; returns whether anything changed
    fn apply(self, settings: &mut AppSettings, profiles_dir: Option<PathBuf>) -> bool {
        let before = settings.clone();

        if let Some(dir) = profiles_dir {
            settings.profiles_dir = Some(dir);
        }
        if let Some(secs) = self.refresh_interval {
            settings.refresh_interval_secs = secs;
        }
        if let Some(secs) = self.call_timeout {
            settings.call_timeout_secs = secs;
        }
        if let Some(theme) = self.theme {
            settings.theme = theme;
        }

        *settings != before
    }
}

#[derive(Args)]
struct FieldArgs {
    #[arg(long)]
    client_id: Option<String>,
    #[arg(long)]
    details: Option<String>,
    #[arg(long)]
    state: Option<String>,
    #[arg(long)]
    large_image: Option<String>,
    #[arg(long)]
    large_text: Option<String>,
    #[arg(long)]
    small_image: Option<String>,
    #[arg(long)]
    small_text: Option<String>,
}

impl FieldArgs {
    fn apply(self, fields: &mut PresenceFields) {
        let values = [
            (Field::ClientId, self.client_id),
            (Field::Details, self.details),
            (Field::State, self.state),
            (Field::LargeImage, self.large_image),
            (Field::LargeText, self.large_text),
            (Field::SmallImage, self.small_image),
            (Field::SmallText, self.small_text),
        ];

        for (field, value) in values {
            if let Some(value) = value {
                fields.set(field, value);
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = oxy_lib::logging::init_logging(cli.verbose);

    let settings_path = cli.settings.unwrap_or_else(default_settings_path);
    let mut settings = load_settings(&settings_path)?;
    let store = ProfileStore::open(
        cli.profiles_dir
            .clone()
            .unwrap_or_else(|| settings.profiles_dir()),
    )?;

    match cli.command {
        Command::List => {
            for name in store.list()? {
                println!("{}", name);
            }
        }
        Command::Show { name } => {
            let profile = store.load(&name)?;
            print_fields(&profile.fields);
            println!("{:<12}{}", "theme", profile.theme);
        }
        Command::Themes => {
            for theme in Theme::ALL {
                println!("{}", theme);
            }
        }
        Command::Save {
            name,
            from,
            theme,
            fields,
        } => {
            let (mut values, base_theme) = match from {
                Some(from) => {
                    let profile = store.load(&from)?;
                    (profile.fields, profile.theme)
                }
                None => (PresenceFields::default(), settings.theme),
            };
            fields.apply(&mut values);
            store.save(&name, &values, theme.unwrap_or(base_theme))?;
            println!("Profile '{}' saved.", name.trim());
        }
        Command::Run {
            name,
            interval,
            fields,
        } => run(&store, &settings, name, interval, fields).await?,
        Command::Config { settings: args } => {
            if args.apply(&mut settings, cli.profiles_dir) {
                save_settings(&settings_path, &settings)?;
                println!("Settings saved to {}", settings_path.display());
            }
            println!("{:<18}{}", "profiles_dir", settings.profiles_dir().display());
            println!("{:<18}{}", "refresh_interval", settings.refresh_interval_secs);
            println!("{:<18}{}", "call_timeout", settings.call_timeout_secs);
            println!("{:<18}{}", "theme", settings.theme);
        }
    }

    Ok(())
}

fn print_fields(fields: &PresenceFields) {
    for field in Field::ALL {
        println!("{:<12}{}", field.key(), fields.get(field));
    }
}

async fn run(
    store: &ProfileStore,
    settings: &AppSettings,
    name: Option<String>,
    interval: Option<u64>,
    overrides: FieldArgs,
) -> Result<()> {
    let name = match name {
        Some(name) => Some(name),
        None => store.list()?.into_iter().next(),
    };

    let mut values = PresenceFields::default();
    if let Some(name) = &name {
        let profile = store.load(name)?;
        tracing::info!("Loaded profile '{}'", profile.name);
        values = profile.fields;
    }
    overrides.apply(&mut values);

    let mut config = settings.session_config();
    if let Some(secs) = interval {
        config.refresh_interval = Duration::from_secs(secs.max(1));
    }

    let fields = SharedFields::new(values);
    let manager = Arc::new(SessionManager::new(
        Arc::new(DiscordConnector::new()),
        fields.clone(),
        config,
    ));

    let mut status = manager.subscribe_status();
    tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let current = *status.borrow_and_update();
            match current {
                SessionStatus::ConnectFailed | SessionStatus::Lost => {
                    tracing::warn!("Status: {}", current)
                }
                _ => tracing::info!("Status: {}", current),
            }
        }
    });

    manager.start_periodic_refresh().await;

    start_session(&manager).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl-C")?;
                break;
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => handle_input(&manager, &fields, line.trim()).await,
                Ok(None) => stdin_open = false,
                Err(e) => {
                    tracing::warn!("Failed to read stdin: {}", e);
                    stdin_open = false;
                }
            },
        }
    }

    manager.shutdown().await;
    Ok(())
}

/// Connect and push once. Failures are reported and leave the session
/// disconnected so the user can fix the fields and enter `start` again.
async fn start_session(manager: &SessionManager) -> bool {
    match manager.start().await {
        Ok(()) => true,
        Err(e) => {
            eprintln!("Failed to start presence: {}", e);
            tracing::warn!("Failed to start presence: {}", e);
            false
        }
    }
}

async fn handle_input(manager: &SessionManager, fields: &SharedFields, line: &str) {
    if line.is_empty() {
        return;
    }

    if line == "start" {
        start_session(manager).await;
        return;
    }

    let Some((key, value)) = line.split_once('=') else {
        eprintln!("Expected <field>=<value> or 'start'");
        return;
    };

    match key.trim().parse::<Field>() {
        Ok(field) => {
            let value = value.to_string();
            fields.update(|f| f.set(field, value));
            tracing::info!("Set {} (applied on next refresh)", field.key());
        }
        Err(e) => eprintln!("{}", e),
    }
}
