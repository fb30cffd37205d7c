// Arithmetic and input checks behind the progress report: converting
// tracked milliseconds into hours, comparing them with the estimate, and
// validating what the user types at the prompts.

use crate::api::Estimate;
use chrono::{Months, NaiveDate};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Effort arrives from the service in milliseconds.
pub const MS_PER_HOUR: f64 = 3_600_000.0;

pub const DATE_FORMAT_MESSAGE: &str = "Please enter a date in the format YYYY-MM-DD";
pub const HOURS_MESSAGE: &str = "Please enter a positive number of hours";
pub const RATE_MESSAGE: &str = "Please enter an hourly rate as a number, 0 or more";
pub const API_KEY_MESSAGE: &str = "Please enter your API key without spaces";

static DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap_or_else(|e| panic!("date pattern: {e}"))
});

pub fn effort_hours(effort_ms: u64) -> f64 {
    effort_ms as f64 / MS_PER_HOUR
}

/// How far a project has come against its estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub project: String,
    pub elapsed_hours: f64,
    pub estimate_hours: f64,
    pub rate: f64,
    /// Elapsed share of the estimate, in percent. Exceeds 100 when over budget.
    pub percentage: f64,
    /// Elapsed hours times rate, rounded to whole currency units.
    pub cost: f64,
    /// Estimated hours times rate, rounded to whole currency units.
    pub price: f64,
}

impl Report {
    pub fn new(project: impl Into<String>, effort_ms: u64, estimate: Estimate) -> Self {
        let elapsed_hours = effort_hours(effort_ms);
        Report {
            project: project.into(),
            elapsed_hours,
            estimate_hours: estimate.hours,
            rate: estimate.rate,
            percentage: elapsed_hours / estimate.hours * 100.0,
            cost: (elapsed_hours * estimate.rate).round(),
            price: (estimate.hours * estimate.rate).round(),
        }
    }

    /// Fill ratio for the bar, clamped to `[0, 1]`.
    pub fn ratio(&self) -> f64 {
        (self.percentage / 100.0).clamp(0.0, 1.0)
    }

    /// The text after the bar, e.g. `50.0% 1.00 hrs/2 estimated ($100/$200)`.
    pub fn summary(&self) -> String {
        format!(
            "{:.1}% {:.2} hrs/{} estimated (${}/${})",
            self.percentage, self.elapsed_hours, self.estimate_hours, self.cost, self.price
        )
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.project, self.summary())
    }
}

/// Default start date: one year before `today`, zero-padded.
/// Feb 29 maps to Feb 28 of the previous year.
pub fn default_start_date(today: NaiveDate) -> String {
    today
        .checked_sub_months(Months::new(12))
        .unwrap_or(today)
        .format("%Y-%m-%d")
        .to_string()
}

/// Accepts `YYYY-MM-DD` strings naming a real calendar day.
pub fn validate_date(input: &str) -> Result<(), String> {
    if DATE_PATTERN.is_match(input) && NaiveDate::parse_from_str(input, "%Y-%m-%d").is_ok() {
        Ok(())
    } else {
        Err(DATE_FORMAT_MESSAGE.to_string())
    }
}

fn parse_number(input: &str) -> Option<f64> {
    input.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

pub fn validate_hours(input: &str) -> Result<(), String> {
    match parse_number(input) {
        Some(n) if n > 0.0 => Ok(()),
        _ => Err(HOURS_MESSAGE.to_string()),
    }
}

pub fn validate_rate(input: &str) -> Result<(), String> {
    match parse_number(input) {
        Some(n) if n >= 0.0 => Ok(()),
        _ => Err(RATE_MESSAGE.to_string()),
    }
}

pub fn validate_api_key(input: &str) -> Result<(), String> {
    if !input.is_empty() && input.chars().all(|c| c.is_ascii_graphic()) {
        Ok(())
    } else {
        Err(API_KEY_MESSAGE.to_string())
    }
}

/// Parse a value already accepted by `validate_hours` or `validate_rate`.
pub fn parse_validated(input: &str) -> Option<f64> {
    parse_number(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimate(hours: f64, rate: f64) -> Estimate {
        Estimate { hours, rate }
    }

    #[test]
    fn one_hour_of_two_is_fifty_percent() {
        let report = Report::new("Site", 3_600_000, estimate(2.0, 100.0));
        assert_eq!(report.elapsed_hours, 1.0);
        assert_eq!(report.percentage, 50.0);
        assert_eq!(report.ratio(), 0.5);
    }

    #[test]
    fn cost_and_price_are_rounded() {
        let report = Report::new("Site", 7_200_000, estimate(10.0, 100.0));
        assert_eq!(report.cost, 200.0);
        assert_eq!(report.price, 1000.0);

        // 0.5h at 33.3 = 16.65
        let odd = Report::new("Site", 1_800_000, estimate(3.0, 33.3));
        assert_eq!(odd.cost, 17.0);
        assert_eq!(odd.price, 100.0);
    }

    #[test]
    fn over_budget_percentage_exceeds_hundred_but_ratio_clamps() {
        let report = Report::new("Site", 3 * 3_600_000, estimate(2.0, 10.0));
        assert_eq!(report.percentage, 150.0);
        assert_eq!(report.ratio(), 1.0);
    }

    #[test]
    fn summary_text() {
        let report = Report::new("Site", 3_600_000, estimate(2.0, 100.0));
        assert_eq!(report.summary(), "50.0% 1.00 hrs/2 estimated ($100/$200)");
        assert_eq!(
            report.to_string(),
            "Site: 50.0% 1.00 hrs/2 estimated ($100/$200)"
        );
    }

    #[test]
    fn default_start_date_is_one_year_back() {
        let day = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
        assert_eq!(default_start_date(day(2026, 10, 19)), "2025-10-19");
        assert_eq!(default_start_date(day(2026, 1, 5)), "2025-01-05");
        assert_eq!(default_start_date(day(2024, 2, 29)), "2023-02-28");
    }

    #[test]
    fn date_validator_accepts_calendar_dates() {
        for ok in ["2025-10-19", "2024-02-29", "1999-01-01"] {
            assert_eq!(validate_date(ok), Ok(()), "{ok}");
        }
    }

    #[test]
    fn date_validator_rejects_everything_else() {
        for bad in [
            "",
            "2025-1-19",
            "25-10-19",
            "2025/10/19",
            "2025-10-19 ",
            " 2025-10-19",
            "2025-13-01",
            "2023-02-29",
            "yesterday",
        ] {
            assert_eq!(validate_date(bad), Err(DATE_FORMAT_MESSAGE.to_string()), "{bad:?}");
        }
    }

    #[test]
    fn number_validators() {
        assert!(validate_hours("12.5").is_ok());
        assert!(validate_hours(" 40 ").is_ok());
        assert!(validate_hours("0").is_err());
        assert!(validate_hours("-3").is_err());
        assert!(validate_hours("ten").is_err());
        assert!(validate_hours("inf").is_err());

        assert!(validate_rate("0").is_ok());
        assert!(validate_rate("95.50").is_ok());
        assert!(validate_rate("-1").is_err());
        assert!(validate_rate("$95").is_err());

        assert_eq!(parse_validated(" 40 "), Some(40.0));
    }

    #[test]
    fn api_key_validator() {
        assert!(validate_api_key("1971800d4d82861d8f2c1651fea4d212").is_ok());
        assert!(validate_api_key("").is_err());
        assert!(validate_api_key("has space").is_err());
    }
}
