use std::sync::Arc;

use anyhow::Error;
use chrono::{Datelike, NaiveDate};
use shared::{
    domain::{
        Contribution, ContributionId, ContributionType, MemberProfile, NewContribution,
        Notification, NotificationId, Statement, StatementId,
    },
    events::Toast,
};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    aggregate::{contributions_in_range, total_amount, StatementFigures},
    emit_toast,
    error::{ContributionError, StatementError},
    toast_channel, Clock, PensionBackend, Scheduler, StoreSettings,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Profile,
    Contributions,
    Statements,
    Notifications,
}

impl Resource {
    pub const ALL: [Resource; 4] = [
        Resource::Profile,
        Resource::Contributions,
        Resource::Statements,
        Resource::Notifications,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Resource::Profile => "profile",
            Resource::Contributions => "contributions",
            Resource::Statements => "statements",
            Resource::Notifications => "notifications",
        }
    }

    fn failure_message(self) -> &'static str {
        match self {
            Resource::Profile => "Failed to fetch profile data",
            Resource::Contributions => "Failed to fetch contributions",
            Resource::Statements => "Failed to fetch statements",
            Resource::Notifications => "Failed to fetch notifications",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadingFlags {
    pub profile: bool,
    pub contributions: bool,
    pub statements: bool,
    pub notifications: bool,
}

impl LoadingFlags {
    pub fn get(&self, resource: Resource) -> bool {
        match resource {
            Resource::Profile => self.profile,
            Resource::Contributions => self.contributions,
            Resource::Statements => self.statements,
            Resource::Notifications => self.notifications,
        }
    }

    fn set(&mut self, resource: Resource, loading: bool) {
        match resource {
            Resource::Profile => self.profile = loading,
            Resource::Contributions => self.contributions = loading,
            Resource::Statements => self.statements = loading,
            Resource::Notifications => self.notifications = loading,
        }
    }

    pub fn any(&self) -> bool {
        Resource::ALL.into_iter().any(|resource| self.get(resource))
    }
}

/// Latest fetch issued per resource. Completions carrying an older number
/// are dropped so a slow response cannot overwrite a newer one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct RequestGenerations {
    profile: u64,
    contributions: u64,
    statements: u64,
    notifications: u64,
}

impl RequestGenerations {
    fn get(&self, resource: Resource) -> u64 {
        match resource {
            Resource::Profile => self.profile,
            Resource::Contributions => self.contributions,
            Resource::Statements => self.statements,
            Resource::Notifications => self.notifications,
        }
    }

    fn bump(&mut self, resource: Resource) {
        let slot = match resource {
            Resource::Profile => &mut self.profile,
            Resource::Contributions => &mut self.contributions,
            Resource::Statements => &mut self.statements,
            Resource::Notifications => &mut self.notifications,
        };
        *slot += 1;
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PensionState {
    pub profile: Option<MemberProfile>,
    pub contributions: Vec<Contribution>,
    pub statements: Vec<Statement>,
    pub notifications: Vec<Notification>,
    pub is_loading: LoadingFlags,
    pub error: Option<String>,
    requests: RequestGenerations,
}

impl PensionState {
    pub fn latest_request(&self, resource: Resource) -> u64 {
        self.requests.get(resource)
    }

    fn is_current(&self, resource: Resource, request: u64) -> bool {
        self.requests.get(resource) == request
    }

    /// The first `count` contributions in collection order (newest first
    /// after a fetch).
    pub fn recent_contributions(&self, count: usize) -> &[Contribution] {
        &self.contributions[..count.min(self.contributions.len())]
    }

    pub fn total_contributions(&self) -> f64 {
        total_amount(&self.contributions)
    }

    pub fn contributions_of_type(&self, kind: ContributionType) -> Vec<&Contribution> {
        self.contributions
            .iter()
            .filter(|c| c.kind == kind)
            .collect()
    }

    pub fn mandatory_contributions(&self) -> Vec<&Contribution> {
        self.contributions_of_type(ContributionType::Mandatory)
    }

    pub fn voluntary_contributions(&self) -> Vec<&Contribution> {
        self.contributions_of_type(ContributionType::Voluntary)
    }

    pub fn unread_notifications(&self) -> Vec<&Notification> {
        self.notifications.iter().filter(|n| !n.is_read).collect()
    }

    pub fn unread_count(&self) -> usize {
        self.notifications.iter().filter(|n| !n.is_read).count()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PensionAction {
    FetchStart(Resource),
    ProfileLoaded {
        request: u64,
        profile: MemberProfile,
    },
    ContributionsLoaded {
        request: u64,
        contributions: Vec<Contribution>,
    },
    StatementsLoaded {
        request: u64,
        statements: Vec<Statement>,
    },
    NotificationsLoaded {
        request: u64,
        notifications: Vec<Notification>,
    },
    FetchFailed {
        resource: Resource,
        request: u64,
        message: String,
    },
    ContributionAdded(Contribution),
    StatementGenerated(Statement),
    NotificationRead(NotificationId),
    AllNotificationsRead,
}

pub fn reduce(state: &PensionState, action: PensionAction) -> PensionState {
    let mut next = state.clone();
    match action {
        PensionAction::FetchStart(resource) => {
            next.requests.bump(resource);
            next.is_loading.set(resource, true);
            next.error = None;
        }
        PensionAction::ProfileLoaded { request, profile } => {
            if state.is_current(Resource::Profile, request) {
                next.profile = Some(profile);
                next.is_loading.profile = false;
            }
        }
        PensionAction::ContributionsLoaded {
            request,
            contributions,
        } => {
            if state.is_current(Resource::Contributions, request) {
                next.contributions = contributions;
                next.is_loading.contributions = false;
            }
        }
        PensionAction::StatementsLoaded {
            request,
            statements,
        } => {
            if state.is_current(Resource::Statements, request) {
                next.statements = statements;
                next.is_loading.statements = false;
            }
        }
        PensionAction::NotificationsLoaded {
            request,
            notifications,
        } => {
            if state.is_current(Resource::Notifications, request) {
                next.notifications = notifications;
                next.is_loading.notifications = false;
            }
        }
        PensionAction::FetchFailed {
            resource,
            request,
            message,
        } => {
            if state.is_current(resource, request) {
                next.error = Some(message);
                next.is_loading.set(resource, false);
            }
        }
        PensionAction::ContributionAdded(contribution) => {
            next.contributions.insert(0, contribution);
        }
        PensionAction::StatementGenerated(statement) => {
            next.statements.insert(0, statement);
        }
        PensionAction::NotificationRead(id) => {
            for notification in next.notifications.iter_mut().filter(|n| n.id == id) {
                notification.is_read = true;
            }
        }
        PensionAction::AllNotificationsRead => {
            for notification in &mut next.notifications {
                notification.is_read = true;
            }
        }
    }
    next
}

/// Checks a draft against the held collection, in order: amount, future
/// date, mandatory already present for the month, identical transaction.
pub fn validate_contribution(
    existing: &[Contribution],
    draft: &NewContribution,
    today: NaiveDate,
) -> Result<(), ContributionError> {
    if !draft.amount.is_finite() || draft.amount < 0.0 {
        return Err(ContributionError::InvalidAmount);
    }

    if draft.date > today {
        return Err(ContributionError::FutureDate);
    }

    if draft.kind == ContributionType::Mandatory
        && existing
            .iter()
            .any(|c| c.kind == ContributionType::Mandatory && c.is_in_month_of(draft.date))
    {
        return Err(ContributionError::MandatoryExistsForMonth {
            year: draft.date.year(),
            month: draft.date.month(),
        });
    }

    if existing
        .iter()
        .any(|c| c.date == draft.date && c.amount == draft.amount && c.kind == draft.kind)
    {
        return Err(ContributionError::Duplicate);
    }

    Ok(())
}

pub fn validate_statement_range(
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
) -> Result<(), StatementError> {
    if end > today {
        return Err(StatementError::EndInFuture);
    }
    if start > end {
        return Err(StatementError::StartAfterEnd);
    }
    Ok(())
}

/// Closing balance of the latest statement ending before `start`, or
/// `base` when there is none.
fn opening_balance_for(statements: &[Statement], start: NaiveDate, base: f64) -> f64 {
    statements
        .iter()
        .filter(|s| s.end_date < start)
        .max_by_key(|s| s.end_date)
        .map_or(base, |s| s.closing_balance)
}

pub struct PensionStore {
    state: RwLock<PensionState>,
    backend: Arc<dyn PensionBackend>,
    clock: Arc<dyn Clock>,
    scheduler: Arc<dyn Scheduler>,
    settings: StoreSettings,
    toasts: broadcast::Sender<Toast>,
}

impl PensionStore {
    pub fn new(
        backend: Arc<dyn PensionBackend>,
        clock: Arc<dyn Clock>,
        scheduler: Arc<dyn Scheduler>,
        settings: StoreSettings,
    ) -> Arc<Self> {
        Arc::new(Self {
            state: RwLock::new(PensionState::default()),
            backend,
            clock,
            scheduler,
            settings,
            toasts: toast_channel(),
        })
    }

    pub async fn snapshot(&self) -> PensionState {
        self.state.read().await.clone()
    }

    pub fn subscribe_toasts(&self) -> broadcast::Receiver<Toast> {
        self.toasts.subscribe()
    }

    /// Applies `action` under the write lock and returns the states before
    /// and after.
    async fn dispatch(&self, action: PensionAction) -> (PensionState, PensionState) {
        let mut guard = self.state.write().await;
        debug!(?action, "pension transition");
        let next = reduce(&guard, action);
        let previous = std::mem::replace(&mut *guard, next.clone());
        (previous, next)
    }

    async fn begin_fetch(&self, resource: Resource) -> u64 {
        let (_, next) = self.dispatch(PensionAction::FetchStart(resource)).await;
        next.latest_request(resource)
    }

    async fn fail_fetch(&self, resource: Resource, request: u64, error: Error) {
        warn!(resource = resource.name(), %error, "fetch failed");
        let message = resource.failure_message();
        self.dispatch(PensionAction::FetchFailed {
            resource,
            request,
            message: message.to_string(),
        })
        .await;
        emit_toast(&self.toasts, Toast::error(message));
    }

    pub async fn fetch_profile(&self) {
        let request = self.begin_fetch(Resource::Profile).await;
        self.scheduler.delay(self.settings.latency.fetch).await;
        match self.backend.fetch_profile().await {
            Ok(profile) => {
                self.dispatch(PensionAction::ProfileLoaded { request, profile })
                    .await;
            }
            Err(error) => self.fail_fetch(Resource::Profile, request, error).await,
        }
    }

    pub async fn fetch_contributions(&self) {
        let request = self.begin_fetch(Resource::Contributions).await;
        self.scheduler.delay(self.settings.latency.fetch).await;
        match self.backend.fetch_contributions(self.clock.today()).await {
            Ok(contributions) => {
                self.dispatch(PensionAction::ContributionsLoaded {
                    request,
                    contributions,
                })
                .await;
            }
            Err(error) => {
                self.fail_fetch(Resource::Contributions, request, error)
                    .await
            }
        }
    }

    /// Statements are computed over the contributions held when the
    /// simulated latency elapses.
    pub async fn fetch_statements(&self) {
        let request = self.begin_fetch(Resource::Statements).await;
        self.scheduler.delay(self.settings.latency.fetch).await;
        let contributions = self.state.read().await.contributions.clone();
        match self
            .backend
            .fetch_statements(&contributions, self.clock.today())
            .await
        {
            Ok(statements) => {
                self.dispatch(PensionAction::StatementsLoaded {
                    request,
                    statements,
                })
                .await;
            }
            Err(error) => self.fail_fetch(Resource::Statements, request, error).await,
        }
    }

    pub async fn fetch_notifications(&self) {
        let request = self.begin_fetch(Resource::Notifications).await;
        self.scheduler
            .delay(self.settings.latency.notifications)
            .await;
        match self.backend.fetch_notifications(self.clock.now()).await {
            Ok(notifications) => {
                self.dispatch(PensionAction::NotificationsLoaded {
                    request,
                    notifications,
                })
                .await;
            }
            Err(error) => {
                self.fail_fetch(Resource::Notifications, request, error)
                    .await
            }
        }
    }

    /// Fetches every resource concurrently.
    pub async fn fetch_all(&self) {
        tokio::join!(
            self.fetch_profile(),
            self.fetch_contributions(),
            self.fetch_notifications(),
        );
        // Mock statements are derived from the contributions just loaded.
        self.fetch_statements().await;
    }

    pub async fn add_contribution(
        &self,
        draft: NewContribution,
    ) -> Result<Contribution, ContributionError> {
        let today = self.clock.today();
        let validation = {
            let state = self.state.read().await;
            validate_contribution(&state.contributions, &draft, today)
        };
        if let Err(error) = validation {
            info!(%error, date = %draft.date, "contribution rejected");
            emit_toast(&self.toasts, Toast::error(error.to_string()));
            return Err(error);
        }

        self.scheduler
            .delay(self.settings.latency.contribution)
            .await;
        if let Err(error) = self.backend.submit_contribution(&draft).await {
            warn!(%error, "contribution submission failed");
            emit_toast(&self.toasts, Toast::error("Failed to add contribution"));
            return Err(ContributionError::Backend(error.to_string()));
        }

        let id = ContributionId::new(format!("contrib-{}", Uuid::new_v4()));
        let contribution = self.commit_contribution(id, draft, today).await?;
        info!(id = %contribution.id, amount = contribution.amount, "contribution added");
        emit_toast(
            &self.toasts,
            Toast::success(format!(
                "{} contribution added successfully",
                contribution.kind.label()
            )),
        );
        Ok(contribution)
    }

    /// Re-checks the draft against the collection held at commit time, under
    /// the same write lock that prepends it.
    async fn commit_contribution(
        &self,
        id: ContributionId,
        draft: NewContribution,
        today: NaiveDate,
    ) -> Result<Contribution, ContributionError> {
        let mut guard = self.state.write().await;
        if let Err(error) = validate_contribution(&guard.contributions, &draft, today) {
            drop(guard);
            info!(%error, date = %draft.date, "contribution rejected at commit");
            emit_toast(&self.toasts, Toast::error(error.to_string()));
            return Err(error);
        }

        let contribution = Contribution::from_draft(id, draft);
        let action = PensionAction::ContributionAdded(contribution.clone());
        debug!(?action, "pension transition");
        let next = reduce(&guard, action);
        *guard = next;
        Ok(contribution)
    }

    pub async fn generate_statement(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Statement, StatementError> {
        let today = self.clock.today();
        if let Err(error) = validate_statement_range(start, end, today) {
            emit_toast(&self.toasts, Toast::error(error.to_string()));
            return Err(error);
        }

        self.scheduler.delay(self.settings.latency.statement).await;

        let (matched, opening_balance) = {
            let state = self.state.read().await;
            (
                contributions_in_range(&state.contributions, start, end),
                opening_balance_for(&state.statements, start, self.settings.base_opening_balance),
            )
        };
        if matched.is_empty() {
            let error = StatementError::NoContributions;
            info!(%start, %end, "no contributions in statement range");
            emit_toast(&self.toasts, Toast::error(error.to_string()));
            return Err(error);
        }

        let figures = StatementFigures::compute(opening_balance, &matched);
        let statement = Statement {
            id: StatementId::new(format!("statement-{}", Uuid::new_v4())),
            start_date: start,
            end_date: end,
            contributions: matched,
            opening_balance: figures.opening_balance,
            closing_balance: figures.closing_balance,
            total_contributions: figures.total_contributions,
            earnings: figures.earnings,
            fees: figures.fees,
            generated_date: today,
        };

        self.dispatch(PensionAction::StatementGenerated(statement.clone()))
            .await;
        info!(
            id = %statement.id,
            contributions = statement.contributions.len(),
            total = statement.total_contributions,
            "statement generated"
        );
        emit_toast(&self.toasts, Toast::success("Statement generated successfully"));
        Ok(statement)
    }

    /// Returns whether the notification was unread before the call.
    pub async fn mark_notification_as_read(&self, id: &NotificationId) -> bool {
        let (previous, next) = self
            .dispatch(PensionAction::NotificationRead(id.clone()))
            .await;
        let was_unread = previous.unread_count() != next.unread_count();
        if was_unread {
            emit_toast(&self.toasts, Toast::info("Notification marked as read"));
        }
        was_unread
    }

    /// Returns how many notifications changed state.
    pub async fn mark_all_notifications_as_read(&self) -> usize {
        let (previous, _) = self.dispatch(PensionAction::AllNotificationsRead).await;
        let changed = previous.unread_count();
        if changed > 0 {
            emit_toast(&self.toasts, Toast::info("All notifications marked as read"));
        }
        changed
    }
}

#[cfg(test)]
#[path = "tests/pension_tests.rs"]
mod tests;
