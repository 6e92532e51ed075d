// SPDX-License-Identifier: MPL-2.0

mod runtime;

use anyhow::{Context, bail};
use arsound::backend::{Backend, RestBackend, RestConfig};
use arsound::profile::{self, LoadOutcome, ProfileDashboard, StagedAvatar, username::UsernameProbe};
use arsound::render;
use arsound::state::{AppSettings, BackendSettings, Resolution};
use arsound::store::{Db, LocalStore, seed_demo};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "arsound", version, about = "ARSOUND creator dashboard")]
struct Cli {
    /// Log level for arsound targets (overridden by RUST_LOG)
    #[arg(long, env = "ARSOUND_LOG", default_value = "info")]
    log_level: String,

    /// Use the local SQLite backend regardless of settings
    #[arg(long)]
    local: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load and print the profile dashboard
    Dashboard,
    /// Check whether a username can be claimed
    CheckUsername { name: String },
    /// Edit username, bio or avatar
    Edit {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long)]
        avatar: Option<PathBuf>,
    },
    /// Print the plan limits card
    Limits,
    /// Populate the local database with a demo creator and sign in as it
    SeedDemo,
    SignOut,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("arsound={},warn", cli.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut settings = AppSettings::load();
    debug!(target: "arsound::main", backend = ?settings.backend, local = cli.local, "starting");

    runtime::block_on(run(cli, &mut settings))
}

async fn run(cli: Cli, settings: &mut AppSettings) -> anyhow::Result<()> {
    if let Command::SeedDemo = cli.command {
        let db = Db::open_default().context("failed to open local database")?;
        let user_id = seed_demo(&db).context("failed to seed demo data")?;
        settings.local_user = Some(user_id.clone());
        settings.save().context("failed to save settings")?;
        println!("Signed in locally as {user_id}");
        return Ok(());
    }

    let backend = connect(cli.local, settings)?;
    let dashboard = ProfileDashboard::mount(&backend, settings.locale);

    match cli.command {
        Command::Dashboard => {
            require_session(dashboard.load().await)?;
            print!("{}", render::render_dashboard(&dashboard.snapshot()));
        }
        Command::Limits => {
            require_session(dashboard.load().await)?;
            match dashboard.snapshot().limits.ready() {
                Some(card) => print!("{}", render::render_limits(card)),
                None => bail!("no profile found for the signed-in user"),
            }
        }
        Command::CheckUsername { name } => {
            let (self_id, committed) = match dashboard.session().resolve().await {
                Resolution::Authenticated(identity) => {
                    let profile = profile::loader::load_profile(backend.data.as_ref(), &identity.id).await;
                    (identity.id, profile.map(|p| p.username).unwrap_or_default())
                }
                Resolution::Redirect(_) => (String::new(), String::new()),
            };
            let mut probe = UsernameProbe::new(backend.data.clone(), &self_id, &committed)
                .with_debounce(std::time::Duration::ZERO);
            probe.submit(&name);
            let availability = probe.settled().await;
            println!("{}", render::render_availability(&name, availability));
        }
        Command::Edit {
            username,
            bio,
            avatar,
        } => {
            require_session(dashboard.load().await)?;
            let mut editor = dashboard
                .editor()
                .context("no session to edit")?;

            editor.begin();
            if let Some(username) = username {
                editor.set_username(&username);
            }
            if let Some(bio) = bio {
                editor.set_bio(&bio);
            }
            if let Some(path) = avatar {
                let staged = StagedAvatar::from_path(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                editor.stage_avatar(staged);
            }
            editor.settled().await;

            let result = dashboard.save(&mut editor).await;
            if let Some(notice) = editor.notice() {
                println!("{}", render::render_notice(notice));
            }
            result?;
        }
        Command::SignOut => {
            dashboard.session().sign_out().await?;
            settings.access_token = None;
            settings.local_user = None;
            settings.save().context("failed to save settings")?;
            info!(target: "arsound::main", "signed out");
        }
        Command::SeedDemo => unreachable!("handled before connecting"),
    }

    Ok(())
}

fn connect(force_local: bool, settings: &AppSettings) -> anyhow::Result<Backend> {
    match &settings.backend {
        BackendSettings::Remote { url, anon_key } if !force_local => {
            let base_url = Url::parse(url).with_context(|| format!("invalid backend url {url}"))?;
            let rest = RestBackend::new(RestConfig {
                base_url,
                anon_key: anon_key.clone(),
                access_token: settings.access_token.clone(),
            })?;
            Ok(Backend::from_shared(Arc::new(rest)))
        }
        _ => {
            let db = Db::open_default().context("failed to open local database")?;
            let local = LocalStore::new(db);
            if let Some(user_id) = &settings.local_user {
                local
                    .sign_in(user_id)
                    .with_context(|| format!("failed to sign in as {user_id}"))?;
            }
            Ok(Backend::from_shared(Arc::new(local)))
        }
    }
}

fn require_session(outcome: LoadOutcome) -> anyhow::Result<()> {
    match outcome {
        LoadOutcome::Ready => Ok(()),
        LoadOutcome::Redirect(route) => {
            bail!("not signed in ({route:?}); run `arsound seed-demo` or set ARSOUND_ACCESS_TOKEN")
        }
    }
}
