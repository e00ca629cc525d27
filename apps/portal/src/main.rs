use std::{process::ExitCode, sync::Arc};

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use client_core::{
    access::{evaluate, AccessDecision},
    aggregate::{cumulative_balance, monthly_breakdown, TimeRange},
    validation::{validate_email, validate_login_form},
    AuthStore, Clock, MockPensionBackend, PensionStore, Scheduler, SystemClock, TokioScheduler,
};
use shared::{
    domain::{ContributionType, NewContribution, NotificationId, Role, Session, Statement},
    error::{ErrorCode, PortalError},
    events::{Toast, ToastLevel},
    format::{
        calculate_age, format_currency, format_date, format_phone_number, format_short_date,
    },
};
use storage::Storage;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, normalize_database_url};

#[derive(Parser, Debug)]
#[command(name = "portal", about = "Pension member portal")]
struct Cli {
    /// Skip the simulated network latency.
    #[arg(long, global = true)]
    no_delay: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    Whoami {
        #[arg(long)]
        json: bool,
    },
    ResetPassword {
        #[arg(long)]
        email: String,
    },
    Profile,
    Dashboard {
        #[arg(long, default_value_t = TimeRange::SixMonths)]
        range: TimeRange,
        #[arg(long, default_value_t = 5)]
        recent: usize,
    },
    Contribute {
        #[arg(long)]
        amount: f64,
        #[arg(long, value_enum, default_value_t = KindArg::Voluntary)]
        kind: KindArg,
        /// Defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        description: Option<String>,
    },
    Statements,
    GenerateStatement {
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
    },
    Notifications {
        #[arg(long)]
        mark_all: bool,
        #[arg(long, conflicts_with = "mark_all")]
        mark: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    Mandatory,
    Voluntary,
}

impl From<KindArg> for ContributionType {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::Mandatory => ContributionType::Mandatory,
            KindArg::Voluntary => ContributionType::Voluntary,
        }
    }
}

struct Portal {
    auth: Arc<AuthStore>,
    pension: Arc<PensionStore>,
    clock: Arc<dyn Clock>,
    toasts: Vec<broadcast::Receiver<Toast>>,
}

impl Portal {
    async fn open(no_delay: bool) -> Result<Self> {
        let settings = load_settings();
        let database_url = normalize_database_url(&settings.database_url);
        let storage = Storage::new(&database_url).await.map_err(|error| {
            error!(%database_url, %error, "failed to open local storage");
            error
        })?;
        storage.health_check().await?;

        let store_settings = settings.store_settings(no_delay);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let scheduler: Arc<dyn Scheduler> = Arc::new(TokioScheduler);

        let auth = AuthStore::restore(
            Arc::new(storage),
            scheduler.clone(),
            store_settings.latency.clone(),
        )
        .await;
        let pension = PensionStore::new(
            Arc::new(MockPensionBackend::new()),
            clock.clone(),
            scheduler,
            store_settings,
        );
        let toasts = vec![auth.subscribe_toasts(), pension.subscribe_toasts()];

        info!(%database_url, "portal ready");
        Ok(Self {
            auth,
            pension,
            clock,
            toasts,
        })
    }

    async fn require(&self, allowed: &[Role]) -> Result<Session, PortalError> {
        let state = self.auth.snapshot().await;
        match (evaluate(&state, allowed), state.session) {
            (AccessDecision::Granted, Some(session)) => Ok(session),
            (AccessDecision::Forbidden, _) => Err(PortalError::new(
                ErrorCode::Forbidden,
                "You do not have access to this page",
            )),
            (AccessDecision::Pending, _) => {
                Err(PortalError::unavailable("A sign-in is still in progress"))
            }
            _ => Err(PortalError::new(
                ErrorCode::Unauthorized,
                "Please sign in first (portal login --email ... --password ...)",
            )),
        }
    }

    /// Prints every toast raised so far, in emission order per store.
    fn flush_toasts(&mut self) {
        for receiver in &mut self.toasts {
            while let Ok(toast) = receiver.try_recv() {
                let tag = match toast.level {
                    ToastLevel::Info => "info",
                    ToastLevel::Success => "ok",
                    ToastLevel::Warning => "warn",
                    ToastLevel::Error => "error",
                };
                println!("[{tag}] {}", toast.message);
            }
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let code = error
                .downcast_ref::<PortalError>()
                .map_or(ErrorCode::Internal, |portal| portal.code);
            eprintln!("error: {error:#}");
            ExitCode::from(u8::try_from(code.exit_code()).unwrap_or(1))
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut portal = Portal::open(cli.no_delay).await?;
    let outcome = execute(&portal, cli.command).await;
    portal.flush_toasts();
    outcome
}

async fn execute(portal: &Portal, command: Command) -> Result<()> {
    match command {
        Command::Login { email, password } => {
            if let Err(errors) = validate_login_form(&email, &password) {
                let message = errors
                    .first()
                    .map(ToString::to_string)
                    .unwrap_or_default();
                return Err(PortalError::validation(message).into());
            }
            portal.auth.login(&email, &password).await;
            let state = portal.auth.snapshot().await;
            match (state.session, state.error) {
                (Some(session), _) => {
                    println!("Signed in as {} ({})", session.name, session.role.as_str());
                }
                (None, error) => {
                    let message = error.unwrap_or_else(|| "Login failed".into());
                    return Err(PortalError::new(ErrorCode::InvalidCredentials, message).into());
                }
            }
        }
        Command::Logout => {
            portal.auth.logout().await;
        }
        Command::Whoami { json } => match portal.auth.current_session().await {
            Some(session) if json => println!("{}", serde_json::to_string_pretty(&session)?),
            Some(session) => println!(
                "{} <{}> role={}",
                session.name,
                session.email,
                session.role.as_str()
            ),
            None => println!("Not signed in"),
        },
        Command::ResetPassword { email } => {
            validate_email(&email).map_err(PortalError::from)?;
            let message = portal.auth.reset_password(&email).await;
            info!(%message, "reset requested");
        }
        Command::Profile => {
            portal.require(&Role::ALL).await?;
            portal.pension.fetch_profile().await;
            print_profile(portal).await?;
        }
        Command::Dashboard { range, recent } => {
            portal.require(&Role::ALL).await?;
            portal.pension.fetch_all().await;
            print_dashboard(portal, range, recent).await;
        }
        Command::Contribute {
            amount,
            kind,
            date,
            description,
        } => {
            portal.require(&[Role::Member]).await?;
            portal.pension.fetch_contributions().await;
            let date = date.unwrap_or_else(|| portal.clock.today());
            let mut draft = NewContribution::new(date, amount, kind.into());
            if let Some(description) = description {
                draft = draft.with_description(description);
            }
            let added = portal
                .pension
                .add_contribution(draft)
                .await
                .map_err(PortalError::from)?;
            println!(
                "{} {} {} on {}",
                added.id,
                added.kind.label(),
                format_currency(added.amount),
                format_date(added.date)
            );
        }
        Command::Statements => {
            portal.require(&Role::ALL).await?;
            portal.pension.fetch_contributions().await;
            portal.pension.fetch_statements().await;
            for statement in &portal.pension.snapshot().await.statements {
                print_statement_line(statement);
            }
        }
        Command::GenerateStatement { from, to } => {
            portal.require(&Role::ALL).await?;
            portal.pension.fetch_contributions().await;
            portal.pension.fetch_statements().await;
            let statement = portal
                .pension
                .generate_statement(from, to)
                .await
                .map_err(PortalError::from)?;
            print_statement_line(&statement);
            println!(
                "  opening {} + contributions {} + earnings {} - fees {} = closing {}",
                format_currency(statement.opening_balance),
                format_currency(statement.total_contributions),
                format_currency(statement.earnings),
                format_currency(statement.fees),
                format_currency(statement.closing_balance)
            );
        }
        Command::Notifications { mark_all, mark } => {
            portal.require(&Role::ALL).await?;
            portal.pension.fetch_notifications().await;
            if mark_all {
                let changed = portal.pension.mark_all_notifications_as_read().await;
                info!(changed, "marked notifications as read");
            } else if let Some(id) = mark {
                let id = NotificationId::new(id);
                if !portal.pension.mark_notification_as_read(&id).await {
                    println!("{id} was already read or does not exist");
                }
            }
            let state = portal.pension.snapshot().await;
            println!("{} unread", state.unread_count());
            for notification in &state.notifications {
                let marker = if notification.is_read { ' ' } else { '*' };
                println!(
                    "{marker} {} {} {}: {}",
                    notification.id,
                    notification.date.format("%d/%m/%Y"),
                    notification.title,
                    notification.message
                );
            }
        }
    }

    Ok(())
}

async fn print_profile(portal: &Portal) -> Result<()> {
    let state = portal.pension.snapshot().await;
    let Some(profile) = state.profile else {
        let message = state.error.unwrap_or_else(|| "Profile unavailable".into());
        return Err(PortalError::unavailable(message).into());
    };

    println!("{} ({})", profile.full_name(), profile.id);
    println!(
        "  born {} (age {})",
        format_date(profile.date_of_birth),
        calculate_age(profile.date_of_birth, portal.clock.today())
    );
    println!("  {} | {}", profile.email, format_phone_number(&profile.phone));
    println!(
        "  {}, {}, {} {}",
        profile.address, profile.city, profile.state, profile.zip_code
    );
    println!(
        "  employer {} ({}) since {}",
        profile.employer_name,
        profile.employer_id,
        format_date(profile.employment_date)
    );
    println!(
        "  next of kin {} ({}) {}",
        profile.next_of_kin.name,
        profile.next_of_kin.relationship,
        format_phone_number(&profile.next_of_kin.phone)
    );
    Ok(())
}

async fn print_dashboard(portal: &Portal, range: TimeRange, recent: usize) {
    let state = portal.pension.snapshot().await;
    let today = portal.clock.today();
    let mandatory: f64 = state.mandatory_contributions().iter().map(|c| c.amount).sum();
    let voluntary: f64 = state.voluntary_contributions().iter().map(|c| c.amount).sum();

    println!("Total contributions  {}", format_currency(state.total_contributions()));
    println!("  mandatory          {}", format_currency(mandatory));
    println!("  voluntary          {}", format_currency(voluntary));
    println!("Unread notifications {}", state.unread_count());

    let months = monthly_breakdown(&state.contributions, range, today);
    println!("\nMonthly ({range})");
    for month in &months {
        println!(
            "  {:<9} {:>16} {:>16}",
            month.label,
            format_currency(month.mandatory),
            format_currency(month.voluntary)
        );
    }
    if let Some(last) = cumulative_balance(&months).last() {
        println!("Projected balance    {}", format_currency(last.balance));
    }

    println!("\nRecent");
    for contribution in state.recent_contributions(recent) {
        println!(
            "  {} {:<9} {:>16} {:?}",
            format_short_date(contribution.date),
            contribution.kind.label(),
            format_currency(contribution.amount),
            contribution.status
        );
    }
}

fn print_statement_line(statement: &Statement) {
    println!(
        "{} {} to {} closing {} ({} contributions, generated {})",
        statement.id,
        format_short_date(statement.start_date),
        format_short_date(statement.end_date),
        format_currency(statement.closing_balance),
        statement.contributions.len(),
        format_short_date(statement.generated_date)
    );
}
