//! Gesture Vault
//!
//! Command-line front end for the gesture vault.
//!
//! ## Usage
//! - `gesture-vault score -t dots 0-5-6-1-8-3-2-7` shows the complexity breakdown
//! - `gesture-vault create -t dots --site example.com 0-5-6-1-8-3-2-7` saves a pattern
//!   and prints the generated password once
//! - `gesture-vault reveal -t dots --site example.com <attempt>...` replays up to
//!   three attempts against the newest matching record
//! - `gesture-vault list` lists saved records
//! - `gesture-vault demo` walks through autofill on an in-memory login page

use clap::{Parser, Subcommand};
use secrecy::ExposeSecret;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::FmtSubscriber;

use gesture_vault::complexity::assess;
use gesture_vault::config::{load_config, AppConfig};
use gesture_vault::detection_state::TabId;
use gesture_vault::error::{GestureVaultError, Result};
use gesture_vault::gesture::{Gesture, PatternType};
use gesture_vault::messaging::{PageAgent, PageConnection, SpawnedAgent};
use gesture_vault::page::{InputKind, InputSpec, MemoryPage, PageDom};
use gesture_vault::record_store::{JsonFilePatternStore, MemoryPatternStore, PatternStore};
use gesture_vault::session::{check_strength, PatternSessionController, VerificationSession};
use gesture_vault::vault::create_pattern_record;

#[derive(Parser, Debug)]
#[command(name = "gesture-vault")]
#[command(about = "Password vault unlocked by drawn gestures", long_about = None)]
#[command(version)]
struct Cli {
    /// Owner the records belong to
    #[arg(long, env = "GESTURE_VAULT_OWNER", default_value = "local", global = true)]
    owner: String,

    /// Increase log verbosity
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Score a gesture without saving anything
    Score {
        #[arg(short = 't', long = "type")]
        pattern_type: PatternType,
        gesture: String,
    },
    /// Save a new pattern and print its generated password once
    Create {
        #[arg(short = 't', long = "type")]
        pattern_type: PatternType,
        #[arg(long)]
        site: String,
        #[arg(short, long, default_value = "")]
        username: String,
        gesture: String,
    },
    /// Unlock the newest record for a site
    Reveal {
        #[arg(short = 't', long = "type")]
        pattern_type: PatternType,
        #[arg(long)]
        site: String,
        /// Attempts, tried in order
        #[arg(required = true, num_args = 1..)]
        gestures: Vec<String>,
    },
    /// List saved records
    List {
        #[arg(long)]
        site: Option<String>,
    },
    /// Autofill walk-through on an in-memory login page
    Demo,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file (optional)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = load_config().unwrap_or_else(|e| {
        eprintln!("Ignoring unreadable config: {}", e);
        AppConfig::default()
    });

    let level = match cli.verbose {
        0 => config.tracing_level(),
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    debug!("Using config: {:?}", config);

    match cli.command {
        Commands::Score {
            pattern_type,
            gesture,
        } => score(pattern_type, &gesture),
        Commands::Create {
            pattern_type,
            site,
            username,
            gesture,
        } => create(&config, &cli.owner, pattern_type, &site, &username, &gesture),
        Commands::Reveal {
            pattern_type,
            site,
            gestures,
        } => reveal(&config, &cli.owner, pattern_type, &site, &gestures),
        Commands::List { site } => list(&config, &cli.owner, site.as_deref()),
        Commands::Demo => demo(&config).await,
    }
}

fn open_store(config: &AppConfig) -> Result<JsonFilePatternStore> {
    JsonFilePatternStore::open(config.store_path()?)
}

fn score(pattern_type: PatternType, text: &str) -> Result<()> {
    let gesture = Gesture::parse(pattern_type, text)?;
    let report = assess(&gesture);
    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| GestureVaultError::ProtocolError(e.to_string()))?;
    println!("{}", json);
    Ok(())
}

fn create(
    config: &AppConfig,
    owner: &str,
    pattern_type: PatternType,
    site: &str,
    username: &str,
    text: &str,
) -> Result<()> {
    let gesture = Gesture::parse(pattern_type, text)?;
    let report = check_strength(&gesture, config.minimum_tier)?;

    let mut store = open_store(config)?;
    let (record, secret) =
        create_pattern_record(owner, pattern_type, username, site, &gesture.canonical_key())?;
    let id = record.id();
    store.insert(record)?;

    info!("Saved record {} to {}", id, store.path().display());
    println!("Saved {} pattern ({:?}, score {}) as {}", pattern_type, report.tier, report.score, id);
    println!("Password (shown once): {}", secret.expose_secret());
    Ok(())
}

fn reveal(
    config: &AppConfig,
    owner: &str,
    pattern_type: PatternType,
    site: &str,
    attempts: &[String],
) -> Result<()> {
    let store = open_store(config)?;
    let record = store
        .query_by_owner_site(owner, site)?
        .into_iter()
        .find(|r| r.pattern_type() == pattern_type)
        .ok_or_else(|| {
            GestureVaultError::StorageError(format!("no {} pattern saved for {}", pattern_type, site))
        })?;

    let mut session = VerificationSession::new(record);
    for text in attempts {
        let gesture = match Gesture::parse(pattern_type, text) {
            Ok(g) => g,
            Err(e) => {
                warn!("Skipping unparsable attempt: {}", e);
                continue;
            }
        };

        match session.attempt(&gesture) {
            Ok(secret) => {
                println!("Password: {}", secret.expose_secret());
                return Ok(());
            }
            Err(GestureVaultError::DecryptionError) => {
                println!(
                    "Pattern did not match ({} attempts left)",
                    session.remaining_attempts()
                );
            }
            Err(e) => return Err(e),
        }
    }

    Err(GestureVaultError::DecryptionError)
}

fn list(config: &AppConfig, owner: &str, site: Option<&str>) -> Result<()> {
    let store = open_store(config)?;
    let records = match site {
        Some(site) => store.query_by_owner_site(owner, site)?,
        None => store.query_by_owner(owner)?,
    };

    if records.is_empty() {
        println!("No saved patterns");
        return Ok(());
    }

    for record in records {
        println!(
            "{}  {:<6} {:<32} {:<20} {}",
            record.id(),
            record.pattern_type().as_str(),
            record.website(),
            record.username(),
            record.created_at().format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

/// Single-page-app style login: the form renders after the agent is in
async fn demo(config: &AppConfig) -> Result<()> {
    let SpawnedAgent {
        requests,
        page,
        mut events,
        task,
    } = PageAgent::spawn(MemoryPage::new(), config);
    let mut connection = PageConnection::new(requests, config);
    let mut controller = PatternSessionController::new(MemoryPatternStore::new(), "demo", config);
    let tab = TabId(1);

    println!("Page loaded with no login form yet");
    page.run_script(|dom: &mut MemoryPage| {
        let form = dom.add_form();
        let (_, mutation) = dom.add_inputs(vec![
            InputSpec::new(InputKind::Email)
                .name("email")
                .value("alice@example.com")
                .in_form(form),
            InputSpec::new(InputKind::Password).name("password").in_form(form),
        ]);
        vec![mutation]
    })
    .await?;

    let report = connection.await_fields().await?;
    println!(
        "Detected {} password and {} username fields",
        report.counts.password_fields, report.counts.username_fields
    );
    if let Ok(Some(event)) = tokio::time::timeout(Duration::from_millis(100), events.recv()).await {
        controller.observe(tab, &event);
    }

    let gesture = Gesture::parse(PatternType::Dots, "0-5-6-1-8-3-2-7")?;
    let created = controller
        .create_pattern(&mut connection, "https://example.com/login", &gesture, None)
        .await;
    println!("Create: {}", created.message);

    let records = controller.records_for_site("https://example.com");
    let Some(record) = records.first() else {
        println!("Nothing was saved");
        return Ok(());
    };
    println!("Saved for user '{}'", record.username());

    let mut session = controller.begin_verification(record.clone());
    let wrong = Gesture::parse(PatternType::Dots, "0-1-2")?;
    let miss = controller
        .fill_with_pattern(&mut connection, &mut session, &wrong)
        .await;
    if miss.can_retry {
        println!("Wrong pattern: {}, trying again", miss.message);
    } else {
        println!("Wrong pattern: {}", miss.message);
        return Ok(());
    }

    let hit = controller
        .fill_with_pattern(&mut connection, &mut session, &gesture)
        .await;
    println!("Right pattern: {} ({} fields)", hit.message, hit.filled);

    controller.navigation_started(tab);
    page.unload().await?;
    drop(connection);

    match task.await {
        Ok(dom) => {
            let filled = dom.inputs().iter().filter(|i| !i.value.is_empty()).count();
            println!("{} fields hold values when the page unloads", filled);
        }
        Err(e) => warn!("Page agent ended abnormally: {}", e),
    }
    Ok(())
}
