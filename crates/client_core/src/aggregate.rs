//! Pure aggregation over contribution collections: range filters, monthly
//! chart buckets, cumulative balance and statement figures.

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use shared::domain::{Contribution, ContributionType};

pub const EARNINGS_RATE: f64 = 0.05;
pub const FEES_RATE: f64 = 0.01;
/// Simulated return applied to the running balance each month.
pub const MONTHLY_RETURN: f64 = 0.005;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeRange {
    #[default]
    #[serde(rename = "6months")]
    SixMonths,
    #[serde(rename = "1year")]
    OneYear,
    #[serde(rename = "all")]
    All,
}

impl TimeRange {
    /// Earliest date still inside the range, `None` for no lower bound.
    pub fn cutoff(self, today: NaiveDate) -> Option<NaiveDate> {
        match self {
            TimeRange::SixMonths => today.checked_sub_months(Months::new(6)),
            TimeRange::OneYear => today.checked_sub_months(Months::new(12)),
            TimeRange::All => None,
        }
    }

    pub fn contains(self, date: NaiveDate, today: NaiveDate) -> bool {
        self.cutoff(today).map_or(true, |cutoff| date >= cutoff)
    }
}

impl FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "6months" | "6m" => Ok(TimeRange::SixMonths),
            "1year" | "1y" => Ok(TimeRange::OneYear),
            "all" => Ok(TimeRange::All),
            other => Err(format!(
                "unknown time range '{other}' (expected 6months, 1year or all)"
            )),
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TimeRange::SixMonths => "6months",
            TimeRange::OneYear => "1year",
            TimeRange::All => "all",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// `Mar 2024`
    pub fn label(self) -> String {
        match NaiveDate::from_ymd_opt(self.year, self.month, 1) {
            Some(first) => first.format("%b %Y").to_string(),
            None => format!("{:04}-{:02}", self.year, self.month),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyContribution {
    pub month: MonthKey,
    pub label: String,
    pub mandatory: f64,
    pub voluntary: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalancePoint {
    pub label: String,
    pub contributions: f64,
    pub earnings: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatementFigures {
    pub opening_balance: f64,
    pub total_contributions: f64,
    pub earnings: f64,
    pub fees: f64,
    pub closing_balance: f64,
}

impl StatementFigures {
    pub fn compute(opening_balance: f64, contributions: &[Contribution]) -> Self {
        let total_contributions = total_amount(contributions);
        let earnings = total_contributions * EARNINGS_RATE;
        let fees = total_contributions * FEES_RATE;
        Self {
            opening_balance,
            total_contributions,
            earnings,
            fees,
            closing_balance: opening_balance + total_contributions + earnings - fees,
        }
    }
}

pub fn total_amount<'a>(contributions: impl IntoIterator<Item = &'a Contribution>) -> f64 {
    contributions.into_iter().map(|c| c.amount).sum()
}

/// Contributions dated within `start..=end`, in collection order.
pub fn contributions_in_range(
    contributions: &[Contribution],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<Contribution> {
    contributions
        .iter()
        .filter(|c| c.date >= start && c.date <= end)
        .cloned()
        .collect()
}

pub fn filter_by_time_range(
    contributions: &[Contribution],
    range: TimeRange,
    today: NaiveDate,
) -> Vec<&Contribution> {
    contributions
        .iter()
        .filter(|c| range.contains(c.date, today))
        .collect()
}

/// Chart buckets per calendar month, oldest month first.
pub fn monthly_breakdown(
    contributions: &[Contribution],
    range: TimeRange,
    today: NaiveDate,
) -> Vec<MonthlyContribution> {
    let mut buckets: BTreeMap<MonthKey, (f64, f64)> = BTreeMap::new();
    for contribution in filter_by_time_range(contributions, range, today) {
        let bucket = buckets.entry(MonthKey::of(contribution.date)).or_default();
        match contribution.kind {
            ContributionType::Mandatory => bucket.0 += contribution.amount,
            ContributionType::Voluntary => bucket.1 += contribution.amount,
        }
    }

    buckets
        .into_iter()
        .map(|(month, (mandatory, voluntary))| MonthlyContribution {
            month,
            label: month.label(),
            mandatory,
            voluntary,
            total: mandatory + voluntary,
        })
        .collect()
}

pub fn cumulative_balance(monthly: &[MonthlyContribution]) -> Vec<BalancePoint> {
    let mut running_balance = 0.0;
    monthly
        .iter()
        .map(|month| {
            let earnings = running_balance * MONTHLY_RETURN;
            running_balance += month.total + earnings;
            BalancePoint {
                label: month.label.clone(),
                contributions: month.total,
                earnings: round_cents(earnings),
                balance: round_cents(running_balance),
            }
        })
        .collect()
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
#[path = "tests/aggregate_tests.rs"]
mod tests;
