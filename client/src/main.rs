//! `market-client`: drive the marketplace session flow from a terminal.
//!
//! Sessions persist in the configured storage directory, so a login made
//! here is seen by later `status`, `navigate` and `select-role` runs.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use client::config::ClientSettings;
use client::domain::ports::{AuthApi, DurableStore, FixtureIpLookup, IpLookup};
use client::domain::{
    AppRoute, DeviceProfile, LoginStage, OtpCodePolicy, OtpStage, ProfileCompletionGate,
    ProtectedAction, Role, RoleSelectionStage, Router, Session, StageTransition,
    is_profile_complete,
};
use client::outbound::http::{HttpAuthApi, HttpIpLookup};
use client::outbound::storage::FileDurableStore;
use color_eyre::eyre::{Context, Result, bail, eyre};
use ortho_config::OrthoConfig;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::runtime::Builder;
use tracing::{debug, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// `market-client` command arguments.
#[derive(Debug, Parser)]
#[command(
    name = "market-client",
    about = "Log in to the marketplace and inspect the stored session",
    version
)]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Log in by phone, then verify the OTP and pick a role interactively.
    Login {
        /// Ten-digit mobile number. Spaces and punctuation are ignored.
        #[arg(long, value_name = "number")]
        phone: String,
    },
    /// Choose a role for the logged-in user.
    SelectRole {
        /// FARMER, FPO, BUYER or AGROSHOP.
        #[arg(long, value_parser = Role::parse_tag)]
        role: Role,
    },
    /// Show which page a location resolves to for the stored session.
    Navigate {
        /// Location such as `/sell` or `/requirement/42`.
        path: String,
    },
    /// Check whether a write action is allowed for the stored profile.
    Act {
        #[arg(value_enum)]
        action: ActionArg,
    },
    /// End the session, keeping the device id.
    Logout,
    /// Summarise the stored session.
    Status,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ActionArg {
    PostRequirement,
    SellCrop,
}

impl From<ActionArg> for ProtectedAction {
    fn from(value: ActionArg) -> Self {
        match value {
            ActionArg::PostRequirement => Self::PostRequirement,
            ActionArg::SellCrop => Self::SellCrop,
        }
    }
}

/// Wired adapters shared by every command.
struct App {
    session: Session,
    api: Arc<dyn AuthApi>,
    ip_lookup: Arc<dyn IpLookup>,
    device: DeviceProfile,
    otp_policy: OtpCodePolicy,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = CliArgs::parse();
    let settings = ClientSettings::load_from_iter([OsString::from("market-client")])
        .map_err(|error| eyre!("failed to load settings: {error}"))?;
    init_tracing(settings.json_logs);

    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("failed to build Tokio runtime")?;
    runtime.block_on(async move {
        let app = App::from_settings(&settings)?;
        run(&app, args.command).await
    })
}

fn init_tracing(json: bool) {
    let builder = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr);
    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(error) = result {
        warn!(%error, "tracing init failed");
    }
}

impl App {
    fn from_settings(settings: &ClientSettings) -> Result<Self> {
        let root = settings.storage_dir();
        let durable: Arc<dyn DurableStore> = Arc::new(
            FileDurableStore::open(&root)
                .with_context(|| format!("failed to open session directory {}", root.display()))?,
        );
        let session = Session::hydrate(durable, settings.authorization_policy()?);
        let timeout = settings.request_timeout();

        let api = HttpAuthApi::new(settings.api_base_url()?, timeout, session.cache().clone())
            .wrap_err("failed to build auth client")?;
        let device = settings.device_profile()?;
        let ip_lookup: Arc<dyn IpLookup> = match settings.ip_lookup_url()? {
            Some(endpoint) => Arc::new(
                HttpIpLookup::new(endpoint, timeout).wrap_err("failed to build ip lookup")?,
            ),
            None => {
                debug!(ip = %device.fallback_ip, "no ip lookup configured; using fallback");
                Arc::new(FixtureIpLookup::new(device.fallback_ip))
            }
        };

        Ok(Self {
            session,
            api: Arc::new(api),
            ip_lookup,
            device,
            otp_policy: settings.otp_code_policy()?,
        })
    }
}

async fn run(app: &App, command: Command) -> Result<()> {
    match command {
        Command::Login { phone } => login(app, &phone).await,
        Command::SelectRole { role } => select_role(app, role).await,
        Command::Navigate { path } => {
            navigate(app, &path);
            Ok(())
        }
        Command::Act { action } => {
            act(app, action.into()).await;
            Ok(())
        }
        Command::Logout => {
            let transition = app.session.logout(app.api.as_ref()).await?;
            println!("logged_out=true");
            println!("next={}", transition.to);
            Ok(())
        }
        Command::Status => {
            status(app);
            Ok(())
        }
    }
}

type InputLines = Lines<BufReader<Stdin>>;

async fn prompt(lines: &mut InputLines, label: &str) -> Result<String> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(label.as_bytes()).await?;
    stdout.flush().await?;
    lines
        .next_line()
        .await?
        .map(|line| line.trim().to_owned())
        .ok_or_else(|| eyre!("input closed"))
}

async fn login(app: &App, phone: &str) -> Result<()> {
    let mut stage = LoginStage::new(
        app.session.clone(),
        Arc::clone(&app.api),
        Arc::clone(&app.ip_lookup),
        app.device.clone(),
    );
    stage.input_phone(phone);
    let transition = stage.submit().await?;
    drop(stage);

    let phone = transition
        .state
        .phone
        .as_ref()
        .map_or_else(String::new, |phone| phone.as_str().to_owned());
    println!("otp_sent_to={phone}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let verified = verify(app, transition, &mut lines).await?;
    println!("next={}", verified.to);
    if verified.to != AppRoute::SelectRole {
        return Ok(());
    }

    let mut stage = RoleSelectionStage::new(app.session.clone(), Arc::clone(&app.api));
    loop {
        let raw = prompt(&mut lines, "role (FARMER, FPO, BUYER, AGROSHOP): ").await?;
        match Role::parse_tag(&raw) {
            Ok(role) => stage.select(role),
            Err(error) => {
                println!("error={error}");
                continue;
            }
        }
        match stage.submit().await {
            Some(Ok(done)) => {
                println!("next={}", done.to);
                return Ok(());
            }
            Some(Err(error)) => println!("error={error}"),
            None => {}
        }
    }
}

async fn verify(
    app: &App,
    transition: StageTransition,
    lines: &mut InputLines,
) -> Result<StageTransition> {
    let mut stage = OtpStage::mount(
        app.session.clone(),
        Arc::clone(&app.api),
        transition.state,
        app.otp_policy.clone(),
    )
    .map_err(|route| eyre!("nothing to verify; start again at {route}"))?;
    stage.start_countdown();

    loop {
        let input = prompt(lines, "code (or 'resend'): ").await?;
        if input.eq_ignore_ascii_case("resend") {
            match stage.resend().await {
                None => println!("resend_in={}s", stage.countdown().remaining()),
                Some(Ok(())) => println!("otp_resent=true"),
                Some(Err(error)) => println!("error={error}"),
            }
            continue;
        }

        stage.paste(&input);
        match stage.submit().await {
            Ok(done) => return Ok(done),
            Err(error) => {
                if let Some(route) = error.redirect() {
                    bail!("{error}; start again at {route}");
                }
                println!("error={error}");
            }
        }
    }
}

async fn select_role(app: &App, role: Role) -> Result<()> {
    let mut stage = RoleSelectionStage::new(app.session.clone(), Arc::clone(&app.api));
    stage.select(role);
    match stage.submit().await {
        Some(result) => {
            let done = result?;
            println!("role={role}");
            println!("next={}", done.to);
            Ok(())
        }
        None => bail!("no role selected"),
    }
}

fn navigate(app: &App, path: &str) {
    let navigation = Router::new(app.session.clone()).resolve(path);
    for hop in &navigation.redirects {
        println!("redirect={hop}");
    }
    println!("render={}", navigation.route);
}

async fn act(app: &App, action: ProtectedAction) {
    let identity = app.session.identity();
    let mut gate = ProfileCompletionGate::new();
    gate.observe_deferred(identity.as_ref()).await;
    match gate.require(action, identity.as_ref()) {
        Some(route) => println!("allowed={route}"),
        None => {
            println!("allowed=false");
            println!("prompt={:?}", gate.prompt());
        }
    }
}

fn status(app: &App) {
    let snapshot = app.session.snapshot();
    let identity = app.session.identity();
    println!("policy={}", app.session.policy());
    println!("authorized={}", snapshot.authorized);
    println!("role={}", snapshot.role_tag.as_deref().unwrap_or("-"));
    match identity.as_ref() {
        Some(identity) => {
            println!("user_id={}", identity.id());
            println!("mobile={}", identity.mobile().as_str());
        }
        None => println!("user_id=-"),
    }
    println!(
        "profile_complete={}",
        is_profile_complete(identity.as_ref())
    );
    println!("device_id={}", app.session.cache().device_id());
}
