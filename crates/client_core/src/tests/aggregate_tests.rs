use super::*;
use shared::domain::{ContributionId, NewContribution};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn contribution(id: &str, on: NaiveDate, amount: f64, kind: ContributionType) -> Contribution {
    Contribution::from_draft(ContributionId::new(id), NewContribution::new(on, amount, kind))
}

fn sample() -> Vec<Contribution> {
    vec![
        contribution("c-1", date(2024, 6, 15), 500.0, ContributionType::Mandatory),
        contribution("c-2", date(2024, 6, 3), 120.0, ContributionType::Voluntary),
        contribution("c-3", date(2024, 5, 15), 450.0, ContributionType::Mandatory),
        contribution("c-4", date(2023, 9, 15), 400.0, ContributionType::Mandatory),
        contribution("c-5", date(2022, 1, 10), 300.0, ContributionType::Voluntary),
    ]
}

#[test]
fn time_range_parses_chart_toggle_values() {
    assert_eq!("6months".parse::<TimeRange>(), Ok(TimeRange::SixMonths));
    assert_eq!("1y".parse::<TimeRange>(), Ok(TimeRange::OneYear));
    assert_eq!("all".parse::<TimeRange>(), Ok(TimeRange::All));
    assert!("weekly".parse::<TimeRange>().is_err());
    assert_eq!(TimeRange::OneYear.to_string(), "1year");
}

#[test]
fn cutoffs_are_calendar_months_back() {
    let today = date(2024, 8, 31);
    assert_eq!(TimeRange::SixMonths.cutoff(today), Some(date(2024, 2, 29)));
    assert_eq!(TimeRange::OneYear.cutoff(today), Some(date(2023, 8, 31)));
    assert_eq!(TimeRange::All.cutoff(today), None);
}

#[test]
fn range_filter_is_inclusive_and_keeps_order() {
    let items = sample();
    let matched = contributions_in_range(&items, date(2024, 5, 15), date(2024, 6, 3));
    let ids: Vec<&str> = matched.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["c-2", "c-3"]);
}

#[test]
fn monthly_breakdown_groups_by_calendar_month() {
    let today = date(2024, 6, 30);
    let months = monthly_breakdown(&sample(), TimeRange::OneYear, today);

    let labels: Vec<&str> = months.iter().map(|m| m.label.as_str()).collect();
    assert_eq!(labels, vec!["Sep 2023", "May 2024", "Jun 2024"]);

    let june = &months[2];
    assert_eq!(june.mandatory, 500.0);
    assert_eq!(june.voluntary, 120.0);
    assert_eq!(june.total, 620.0);
}

#[test]
fn six_month_window_drops_older_months() {
    let today = date(2024, 6, 30);
    let months = monthly_breakdown(&sample(), TimeRange::SixMonths, today);
    assert_eq!(months.len(), 2);

    let all = monthly_breakdown(&sample(), TimeRange::All, today);
    assert_eq!(all.len(), 4);
    assert_eq!(all[0].month, MonthKey { year: 2022, month: 1 });
}

#[test]
fn cumulative_balance_compounds_prior_balance() {
    let today = date(2024, 6, 30);
    let months = monthly_breakdown(&sample(), TimeRange::OneYear, today);
    let points = cumulative_balance(&months);

    assert_eq!(points[0].earnings, 0.0);
    assert_eq!(points[0].balance, 400.0);
    assert_eq!(points[1].earnings, 2.0);
    assert_eq!(points[1].balance, 852.0);
    assert_eq!(points[2].earnings, 4.26);
    assert_eq!(points[2].balance, 1476.26);
}

#[test]
fn statement_figures_apply_rates() {
    let items = sample();
    let figures = StatementFigures::compute(1_000.0, &items[..3]);
    assert!((figures.total_contributions - 1070.0).abs() < 1e-9);
    assert!((figures.earnings - 53.5).abs() < 1e-9);
    assert!((figures.fees - 10.7).abs() < 1e-9);
    assert!((figures.closing_balance - (1_000.0 + 1070.0 + 53.5 - 10.7)).abs() < 1e-9);
}

#[test]
fn totals_sum_amounts() {
    assert_eq!(total_amount(&sample()), 1770.0);
    assert_eq!(total_amount(&Vec::<Contribution>::new()), 0.0);
}
