use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Days, Duration, Months, NaiveDate, Utc};
use shared::domain::{
    Contribution, ContributionId, ContributionStatus, ContributionType, MemberId, MemberProfile,
    NewContribution, NextOfKin, Notification, NotificationId, NotificationKind, Statement,
    StatementId,
};
use tokio::sync::Mutex;

use crate::aggregate::{contributions_in_range, StatementFigures};

const MONTHS_OF_HISTORY: u32 = 24;
const QUARTERLY_STATEMENTS: u32 = 8;
const MANDATORY_BASE_AMOUNT: f64 = 50_000.0;
const VOLUNTARY_BASE_AMOUNT: f64 = 20_000.0;
const STATEMENT_BASE_OPENING: f64 = 1_000_000.0;
const STATEMENT_OPENING_STEP: f64 = 200_000.0;

/// Data source behind the pension store. Every call sits behind the store's
/// simulated latency.
#[async_trait]
pub trait PensionBackend: Send + Sync {
    async fn fetch_profile(&self) -> Result<MemberProfile>;
    async fn fetch_contributions(&self, today: NaiveDate) -> Result<Vec<Contribution>>;
    async fn fetch_statements(
        &self,
        contributions: &[Contribution],
        today: NaiveDate,
    ) -> Result<Vec<Statement>>;
    async fn fetch_notifications(&self, now: DateTime<Utc>) -> Result<Vec<Notification>>;
    async fn submit_contribution(&self, contribution: &NewContribution) -> Result<()>;
}

pub struct UnavailablePensionBackend;

#[async_trait]
impl PensionBackend for UnavailablePensionBackend {
    async fn fetch_profile(&self) -> Result<MemberProfile> {
        Err(anyhow!("pension backend is unavailable"))
    }

    async fn fetch_contributions(&self, _today: NaiveDate) -> Result<Vec<Contribution>> {
        Err(anyhow!("pension backend is unavailable"))
    }

    async fn fetch_statements(
        &self,
        _contributions: &[Contribution],
        _today: NaiveDate,
    ) -> Result<Vec<Statement>> {
        Err(anyhow!("pension backend is unavailable"))
    }

    async fn fetch_notifications(&self, _now: DateTime<Utc>) -> Result<Vec<Notification>> {
        Err(anyhow!("pension backend is unavailable"))
    }

    async fn submit_contribution(&self, _contribution: &NewContribution) -> Result<()> {
        Err(anyhow!("pension backend is unavailable"))
    }
}

/// Deterministic in-memory data for the demo member.
#[derive(Default)]
pub struct MockPensionBackend {
    submitted: Mutex<Vec<NewContribution>>,
}

impl MockPensionBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Contributions accepted by `submit_contribution`, oldest first.
    pub async fn submitted(&self) -> Vec<NewContribution> {
        self.submitted.lock().await.clone()
    }
}

#[async_trait]
impl PensionBackend for MockPensionBackend {
    async fn fetch_profile(&self) -> Result<MemberProfile> {
        Ok(MemberProfile {
            id: MemberId::new("12345"),
            passport_photo: "https://i.pravatar.cc/300?u=member".into(),
            first_name: "John".into(),
            last_name: "Doe".into(),
            gender: "Male".into(),
            date_of_birth: ymd(1985, 5, 15)?,
            email: "john.doe@example.com".into(),
            phone: "+2348012345678".into(),
            address: "123 Main Street".into(),
            city: "Lagos".into(),
            state: "Lagos State".into(),
            zip_code: "100001".into(),
            employer_name: "TechCorp Nigeria Ltd".into(),
            employer_id: "EMP-5678".into(),
            employer_address: "456 Business Avenue, Victoria Island, Lagos".into(),
            employment_date: ymd(2015, 3, 10)?,
            next_of_kin: NextOfKin {
                name: "Jane Doe".into(),
                relationship: "Spouse".into(),
                phone: "+2348087654321".into(),
                email: "jane.doe@example.com".into(),
                address: "123 Main Street, Lagos".into(),
            },
        })
    }

    async fn fetch_contributions(&self, today: NaiveDate) -> Result<Vec<Contribution>> {
        let mut contributions = Vec::new();

        for i in 0..MONTHS_OF_HISTORY {
            let date = today
                .checked_sub_months(Months::new(i))
                .with_context(|| format!("date {i} months before {today} is out of range"))?;
            let amount = MANDATORY_BASE_AMOUNT + f64::from((i * 3_797 + 1_213) % 10_000);
            let employer_share = (amount / 2.0).round();

            contributions.push(Contribution {
                id: ContributionId::new(format!("mc-{i}")),
                date,
                amount,
                kind: ContributionType::Mandatory,
                status: ContributionStatus::Processed,
                description: None,
                employer_contribution: Some(employer_share),
                employee_contribution: Some(amount - employer_share),
            });

            // A top-up every third month, a few days before the payroll date.
            if i % 3 == 1 {
                let voluntary_date = date
                    .checked_sub_days(Days::new(u64::from((i * 5) % 15)))
                    .context("voluntary contribution date out of range")?;
                contributions.push(Contribution {
                    id: ContributionId::new(format!("vc-{i}")),
                    date: voluntary_date,
                    amount: VOLUNTARY_BASE_AMOUNT + f64::from((i * 7_919) % 50_000),
                    kind: ContributionType::Voluntary,
                    status: ContributionStatus::Processed,
                    description: Some("Additional voluntary contribution".into()),
                    employer_contribution: None,
                    employee_contribution: None,
                });
            }
        }

        contributions.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(contributions)
    }

    async fn fetch_statements(
        &self,
        contributions: &[Contribution],
        today: NaiveDate,
    ) -> Result<Vec<Statement>> {
        let mut statements = Vec::new();

        for i in 0..QUARTERLY_STATEMENTS {
            let end_date = today
                .checked_sub_months(Months::new(i * 3))
                .context("statement end date out of range")?;
            let start_date = end_date
                .checked_sub_months(Months::new(3))
                .context("statement start date out of range")?;
            let matched = contributions_in_range(contributions, start_date, end_date);
            let opening_balance = STATEMENT_BASE_OPENING
                + f64::from(QUARTERLY_STATEMENTS - 1 - i) * STATEMENT_OPENING_STEP;
            let figures = StatementFigures::compute(opening_balance, &matched);
            let generated_date = end_date
                .checked_add_days(Days::new(1))
                .map_or(today, |next_day| next_day.min(today));

            statements.push(Statement {
                id: StatementId::new(format!("statement-{i}")),
                start_date,
                end_date,
                contributions: matched,
                opening_balance: figures.opening_balance,
                closing_balance: figures.closing_balance,
                total_contributions: figures.total_contributions,
                earnings: figures.earnings,
                fees: figures.fees,
                generated_date,
            });
        }

        Ok(statements)
    }

    async fn fetch_notifications(&self, now: DateTime<Utc>) -> Result<Vec<Notification>> {
        let notification = |id: &str,
                            title: &str,
                            message: &str,
                            days_ago: i64,
                            is_read: bool,
                            kind: NotificationKind| Notification {
            id: NotificationId::new(id),
            title: title.to_string(),
            message: message.to_string(),
            date: now - Duration::days(days_ago),
            is_read,
            kind,
        };

        Ok(vec![
            notification(
                "notif-1",
                "Contribution Processed",
                "Your recent contribution of ₦45,000 has been processed successfully.",
                1,
                false,
                NotificationKind::Success,
            ),
            notification(
                "notif-2",
                "Quarterly Statement Available",
                "Your quarterly pension statement is now available. Click to view.",
                2,
                false,
                NotificationKind::Info,
            ),
            notification(
                "notif-3",
                "Profile Updated",
                "Your profile information has been updated successfully.",
                5,
                true,
                NotificationKind::Info,
            ),
            notification(
                "notif-4",
                "Password Changed",
                "Your account password was changed. If you did not make this change, please contact support.",
                10,
                true,
                NotificationKind::Warning,
            ),
            notification(
                "notif-5",
                "Investment Performance Update",
                "Your pension fund grew by 5.2% in the last quarter, outperforming the market average.",
                30,
                true,
                NotificationKind::Info,
            ),
        ])
    }

    async fn submit_contribution(&self, contribution: &NewContribution) -> Result<()> {
        self.submitted.lock().await.push(contribution.clone());
        Ok(())
    }
}

fn ymd(year: i32, month: u32, day: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
        .with_context(|| format!("invalid date {year}-{month}-{day}"))
}

#[cfg(test)]
#[path = "tests/backend_tests.rs"]
mod tests;
