//! Salary text parsing and yearly normalization.

use std::sync::LazyLock;

use jobsift_core::SalaryPeriod;
use regex::Regex;
use tracing::warn;

static AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$?(\d[\d,]*(?:\.\d+)?)").unwrap());

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedSalary {
    pub salary_original: Option<String>,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub salary_period: Option<SalaryPeriod>,
    pub salary_min_yearly: Option<f64>,
    pub salary_max_yearly: Option<f64>,
    pub salary_midpoint_yearly: Option<f64>,
}

/// Parse text such as `"$45,000 - $60,000 a year"` or `"$25.50 an hour"`.
///
/// With no dollar amounts every numeric output and the period stay `None`; the
/// original text is kept either way.
pub fn parse_salary(text: &str) -> ParsedSalary {
    let trimmed = text.trim();
    let mut parsed = ParsedSalary {
        salary_original: (!trimmed.is_empty()).then(|| trimmed.to_string()),
        ..ParsedSalary::default()
    };
    if trimmed.is_empty() {
        return parsed;
    }

    let amounts = extract_amounts(trimmed);
    if amounts.is_empty() {
        warn!(salary = %trimmed, "no dollar amounts in salary text");
        return parsed;
    }

    let period = detect_period(trimmed);
    let min = amounts.iter().copied().fold(f64::INFINITY, f64::min);
    let max = amounts.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    parsed.salary_period = Some(period);
    parsed.salary_min = Some(min);
    parsed.salary_max = Some(max);

    let multiplier = period.yearly_multiplier();
    parsed.salary_min_yearly = parsed.salary_min.map(|v| v * multiplier);
    parsed.salary_max_yearly = parsed.salary_max.map(|v| v * multiplier);
    parsed.salary_midpoint_yearly = match (parsed.salary_min_yearly, parsed.salary_max_yearly) {
        (Some(lo), Some(hi)) => Some((lo + hi) / 2.0),
        _ => None,
    };
    parsed
}

fn extract_amounts(text: &str) -> Vec<f64> {
    AMOUNT
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .filter_map(|m| m.as_str().replace(',', "").parse::<f64>().ok())
        .collect()
}

fn detect_period(text: &str) -> SalaryPeriod {
    let lower = text.to_lowercase();
    if lower.contains("hour") {
        SalaryPeriod::Hourly
    } else if lower.contains("week") {
        SalaryPeriod::Weekly
    } else if lower.contains("month") {
        SalaryPeriod::Monthly
    } else {
        SalaryPeriod::Yearly
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yearly_range() {
        let parsed = parse_salary("$45,000 - $60,000 a year");
        assert_eq!(parsed.salary_period, Some(SalaryPeriod::Yearly));
        assert_eq!(parsed.salary_min, Some(45_000.0));
        assert_eq!(parsed.salary_max, Some(60_000.0));
        assert_eq!(parsed.salary_min_yearly, Some(45_000.0));
        assert_eq!(parsed.salary_max_yearly, Some(60_000.0));
        assert_eq!(parsed.salary_midpoint_yearly, Some(52_500.0));
        assert_eq!(parsed.salary_original.as_deref(), Some("$45,000 - $60,000 a year"));
    }

    #[test]
    fn single_hourly_amount_fills_both_bounds() {
        let parsed = parse_salary("$15 an hour");
        assert_eq!(parsed.salary_period, Some(SalaryPeriod::Hourly));
        assert_eq!(parsed.salary_min, Some(15.0));
        assert_eq!(parsed.salary_max, Some(15.0));
        assert_eq!(parsed.salary_min_yearly, Some(31_200.0));
        assert_eq!(parsed.salary_max_yearly, Some(31_200.0));
        assert_eq!(parsed.salary_midpoint_yearly, Some(31_200.0));
    }

    #[test]
    fn decimals_and_other_periods() {
        let hourly = parse_salary("$25.50 an hour");
        assert_eq!(hourly.salary_min, Some(25.5));
        assert_eq!(hourly.salary_min_yearly, Some(53_040.0));

        let weekly = parse_salary("$900 - $1,100 a week");
        assert_eq!(weekly.salary_period, Some(SalaryPeriod::Weekly));
        assert_eq!(weekly.salary_max_yearly, Some(57_200.0));

        let monthly = parse_salary("From $4,000 a month");
        assert_eq!(monthly.salary_period, Some(SalaryPeriod::Monthly));
        assert_eq!(monthly.salary_min_yearly, Some(48_000.0));
    }

    #[test]
    fn bounds_follow_magnitude_not_position() {
        let parsed = parse_salary("$80,000 - $65,000 a year");
        assert_eq!(parsed.salary_min, Some(65_000.0));
        assert_eq!(parsed.salary_max, Some(80_000.0));
    }

    #[test]
    fn no_amounts_means_no_period() {
        let parsed = parse_salary("Not listed");
        assert_eq!(parsed.salary_original.as_deref(), Some("Not listed"));
        assert_eq!(parsed.salary_period, None);
        assert_eq!(parsed.salary_min, None);
        assert_eq!(parsed.salary_max, None);
        assert_eq!(parsed.salary_min_yearly, None);
        assert_eq!(parsed.salary_midpoint_yearly, None);
    }

    #[test]
    fn two_amount_texts_keep_ordered_bounds() {
        for (a, b, suffix) in [
            (12.0, 18.5, "an hour"),
            (500.0, 750.0, "a week"),
            (3_000.0, 3_000.0, "a month"),
            (70_000.0, 95_000.0, "a year"),
        ] {
            let parsed = parse_salary(&format!("${a} - ${b} {suffix}"));
            assert_eq!(parsed.salary_min, Some(a));
            assert_eq!(parsed.salary_max, Some(b));
            assert!(parsed.salary_min_yearly.unwrap() <= parsed.salary_max_yearly.unwrap());
        }
    }
}
