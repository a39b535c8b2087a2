use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const MICROS_PER_UNIT: i64 = 1_000_000;
const MICROS_PER_CENT: i64 = 10_000;
const BASIS_POINTS: u32 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommissionError {
    #[error("Invalid amount '{0}': expected a number with at most two decimals")]
    InvalidAmount(String),

    #[error("Invalid rate '{0}': expected a fraction between 0 and 1 with at most four decimals")]
    InvalidRate(String),

    #[error("Commission rates must sum to 1 (got {0} basis points)")]
    RatesDoNotSum(u32),

    #[error("Sale {0} has a negative amount")]
    NegativeAmount(u64),

    #[error("Amounts too large to total")]
    Overflow,
}

// -- Money --

/// Exact peso amount held as integer millionths.
///
/// Inputs carry at most cents and rates at most basis points, so every
/// `amount * rate` product lands on a whole micro-unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "AmountInput", into = "String")]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_units(units: i64) -> Option<Self> {
        units.checked_mul(MICROS_PER_UNIT).map(Self)
    }

    pub fn from_cents(cents: i64) -> Option<Self> {
        cents.checked_mul(MICROS_PER_CENT).map(Self)
    }

    pub fn micros(self) -> i64 {
        self.0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// Share of this amount at `rate`. Truncates below one micro-unit,
    /// which never happens for cent-precise amounts.
    pub fn apply_rate(self, rate: Rate) -> Option<Money> {
        let scaled = i128::from(self.0) * i128::from(rate.0) / i128::from(BASIS_POINTS);
        i64::try_from(scaled).ok().map(Self)
    }

    fn from_f64(value: f64) -> Option<Self> {
        let cents = (value * 100.0).round();
        if !cents.is_finite() || (value * 100.0 - cents).abs() > 1e-6 || cents.abs() >= 9.0e14 {
            return None;
        }
        Self::from_cents(cents as i64)
    }
}

impl FromStr for Money {
    type Err = CommissionError;

    /// Plain decimal with an optional sign and at most two decimals.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CommissionError::InvalidAmount(s.to_string());
        let trimmed = s.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));
        if whole.is_empty()
            || frac.len() > 2
            || !whole.bytes().all(|b| b.is_ascii_digit())
            || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let whole: i64 = whole.parse().map_err(|_| invalid())?;
        let frac: i64 = format!("{frac:0<2}").parse().map_err(|_| invalid())?;
        let cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac))
            .ok_or_else(invalid)?;
        let cents = if negative { -cents } else { cents };
        Money::from_cents(cents).ok_or_else(invalid)
    }
}

impl fmt::Display for Money {
    /// Exact decimal form, trailing zeros trimmed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let units = abs / MICROS_PER_UNIT as u64;
        let frac = abs % MICROS_PER_UNIT as u64;
        if frac == 0 {
            write!(f, "{sign}{units}")
        } else {
            let frac = format!("{frac:06}");
            write!(f, "{sign}{units}.{}", frac.trim_end_matches('0'))
        }
    }
}

/// Wire form of an amount: a JSON number or a decimal string.
#[derive(Deserialize)]
#[serde(untagged)]
enum AmountInput {
    Units(i64),
    Decimal(f64),
    Text(String),
}

impl TryFrom<AmountInput> for Money {
    type Error = CommissionError;

    fn try_from(input: AmountInput) -> Result<Self, Self::Error> {
        match input {
            AmountInput::Units(units) => {
                Money::from_units(units).ok_or_else(|| CommissionError::InvalidAmount(units.to_string()))
            }
            AmountInput::Decimal(value) => {
                Money::from_f64(value).ok_or_else(|| CommissionError::InvalidAmount(value.to_string()))
            }
            AmountInput::Text(text) => text.parse(),
        }
    }
}

impl From<Money> for String {
    fn from(amount: Money) -> Self {
        amount.to_string()
    }
}

/// Display form used by the compensation dashboard: peso sign, thousands
/// separators and up to two decimals, rounded half away from zero.
pub fn format_php(amount: Money) -> String {
    let abs = amount.0.unsigned_abs();
    let half = MICROS_PER_CENT as u64 / 2;
    let cents = (abs + half) / MICROS_PER_CENT as u64;
    let units = cents / 100;
    let frac = cents % 100;

    let digits = units.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount.0 < 0 && cents > 0 { "-" } else { "" };
    match frac {
        0 => format!("{sign}₱{grouped}"),
        f if f % 10 == 0 => format!("{sign}₱{grouped}.{}", f / 10),
        f => format!("{sign}₱{grouped}.{f:02}"),
    }
}

// -- Rates --

/// Fraction of a sale in basis points (1/10000).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Rate(u32);

impl Rate {
    pub fn from_basis_points(bp: u32) -> Option<Self> {
        (bp <= BASIS_POINTS).then_some(Self(bp))
    }

    pub fn basis_points(self) -> u32 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.0) / f64::from(BASIS_POINTS)
    }

    fn from_fraction(value: f64) -> Option<Self> {
        let bp = (value * f64::from(BASIS_POINTS)).round();
        if !bp.is_finite() || (value * f64::from(BASIS_POINTS) - bp).abs() > 1e-6 || bp < 0.0 {
            return None;
        }
        Self::from_basis_points(bp as u32)
    }
}

impl TryFrom<f64> for Rate {
    type Error = CommissionError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Rate::from_fraction(value).ok_or_else(|| CommissionError::InvalidRate(value.to_string()))
    }
}

impl From<Rate> for f64 {
    fn from(rate: Rate) -> Self {
        rate.as_f64()
    }
}

/// How each sale is split. The three shares always sum to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRates")]
pub struct CommissionRates {
    pub developer: Rate,
    pub sales: Rate,
    pub company: Rate,
}

#[derive(Deserialize)]
struct RawRates {
    developer: Rate,
    sales: Rate,
    company: Rate,
}

impl TryFrom<RawRates> for CommissionRates {
    type Error = CommissionError;

    fn try_from(raw: RawRates) -> Result<Self, Self::Error> {
        CommissionRates::new(raw.developer, raw.sales, raw.company)
    }
}

impl CommissionRates {
    pub fn new(developer: Rate, sales: Rate, company: Rate) -> Result<Self, CommissionError> {
        let sum = developer.0 + sales.0 + company.0;
        if sum != BASIS_POINTS {
            return Err(CommissionError::RatesDoNotSum(sum));
        }
        Ok(Self {
            developer,
            sales,
            company,
        })
    }

    pub fn for_role(&self, role: Role) -> Rate {
        match role {
            Role::WebDeveloper => self.developer,
            Role::SalesAgent => self.sales,
        }
    }
}

impl Default for CommissionRates {
    /// 40% developer, 30% sales agent, 30% company.
    fn default() -> Self {
        Self {
            developer: Rate(4_000),
            sales: Rate(3_000),
            company: Rate(3_000),
        }
    }
}

// -- Inputs --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "Web Developer")]
    WebDeveloper,
    #[serde(rename = "Sales Agent")]
    SalesAgent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: u64,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub id: u64,
    pub date: NaiveDate,
    pub project_name: String,
    pub amount: Money,
    pub developer_id: u64,
    pub sales_agent_id: u64,
}

// -- Report --

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeEarnings {
    pub id: u64,
    pub name: String,
    pub role: Role,
    pub rate: Rate,
    pub total_earnings: Money,
    pub project_count: u64,
}

/// Revenue split for one week, month or year.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PeriodRollup {
    /// `2024-W05`, `2024-01` or `2024`.
    pub period: String,
    pub revenue: Money,
    pub company_profit: Money,
    pub developer_commissions: Money,
    pub sales_commissions: Money,
    pub projects: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Totals {
    pub revenue: Money,
    pub company_profit: Money,
    pub total_commissions: Money,
    pub project_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Distribution {
    pub company: Money,
    pub developers: Money,
    pub sales: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommissionReport {
    pub rates: CommissionRates,
    pub employees: Vec<EmployeeEarnings>,
    pub weekly: Vec<PeriodRollup>,
    pub monthly: Vec<PeriodRollup>,
    pub yearly: Vec<PeriodRollup>,
    pub totals: Totals,
    pub distribution: Distribution,
}

/// One sale divided by the rates.
struct Split {
    developer: Money,
    sales: Money,
    company: Money,
}

impl Split {
    fn of(sale: &Sale, rates: &CommissionRates) -> Result<Self, CommissionError> {
        if sale.amount.is_negative() {
            return Err(CommissionError::NegativeAmount(sale.id));
        }
        let developer = sale.amount.apply_rate(rates.developer).ok_or(CommissionError::Overflow)?;
        let sales = sale.amount.apply_rate(rates.sales).ok_or(CommissionError::Overflow)?;
        // The company keeps the remainder, so the three shares add up to the sale exactly.
        let company = sale
            .amount
            .checked_sub(developer)
            .and_then(|m| m.checked_sub(sales))
            .ok_or(CommissionError::Overflow)?;
        Ok(Self {
            developer,
            sales,
            company,
        })
    }
}

fn add(total: &mut Money, amount: Money) -> Result<(), CommissionError> {
    *total = total.checked_add(amount).ok_or(CommissionError::Overflow)?;
    Ok(())
}

impl PeriodRollup {
    fn record(&mut self, sale: &Sale, split: &Split) -> Result<(), CommissionError> {
        add(&mut self.revenue, sale.amount)?;
        add(&mut self.company_profit, split.company)?;
        add(&mut self.developer_commissions, split.developer)?;
        add(&mut self.sales_commissions, split.sales)?;
        self.projects += 1;
        Ok(())
    }
}

fn week_key(date: NaiveDate) -> String {
    let week = date.iso_week();
    format!("{}-W{:02}", week.year(), week.week())
}

fn month_key(date: NaiveDate) -> String {
    format!("{}-{:02}", date.year(), date.month())
}

fn year_key(date: NaiveDate) -> String {
    date.year().to_string()
}

impl CommissionReport {
    /// Aggregates sales into per-employee earnings and calendar rollups.
    ///
    /// A developer earns on sales they built and a sales agent on sales they
    /// closed. Sales naming unknown employees still count toward revenue.
    pub fn build(
        employees: &[Employee],
        sales: &[Sale],
        rates: CommissionRates,
    ) -> Result<Self, CommissionError> {
        let splits = sales
            .iter()
            .map(|sale| Split::of(sale, &rates))
            .collect::<Result<Vec<_>, _>>()?;

        let mut earnings = Vec::with_capacity(employees.len());
        for emp in employees {
            let rate = rates.for_role(emp.role);
            let mut total = Money::ZERO;
            let mut project_count = 0;
            for (sale, split) in sales.iter().zip(&splits) {
                let share = match emp.role {
                    Role::WebDeveloper if sale.developer_id == emp.id => split.developer,
                    Role::SalesAgent if sale.sales_agent_id == emp.id => split.sales,
                    _ => continue,
                };
                add(&mut total, share)?;
                project_count += 1;
            }
            earnings.push(EmployeeEarnings {
                id: emp.id,
                name: emp.name.clone(),
                role: emp.role,
                rate,
                total_earnings: total,
                project_count,
            });
        }

        let mut weekly: BTreeMap<String, PeriodRollup> = BTreeMap::new();
        let mut monthly: BTreeMap<String, PeriodRollup> = BTreeMap::new();
        let mut yearly: BTreeMap<String, PeriodRollup> = BTreeMap::new();
        let mut totals = Totals::default();
        let mut distribution = Distribution::default();

        for (sale, split) in sales.iter().zip(&splits) {
            for (buckets, key) in [
                (&mut weekly, week_key(sale.date)),
                (&mut monthly, month_key(sale.date)),
                (&mut yearly, year_key(sale.date)),
            ] {
                buckets
                    .entry(key.clone())
                    .or_insert_with(|| PeriodRollup {
                        period: key,
                        ..PeriodRollup::default()
                    })
                    .record(sale, split)?;
            }

            add(&mut totals.revenue, sale.amount)?;
            add(&mut totals.company_profit, split.company)?;
            add(&mut distribution.developers, split.developer)?;
            add(&mut distribution.sales, split.sales)?;
            totals.project_count += 1;
        }

        distribution.company = totals.company_profit;
        totals.total_commissions = distribution
            .developers
            .checked_add(distribution.sales)
            .ok_or(CommissionError::Overflow)?;

        Ok(Self {
            rates,
            employees: earnings,
            weekly: weekly.into_values().collect(),
            monthly: monthly.into_values().collect(),
            yearly: yearly.into_values().collect(),
            totals,
            distribution,
        })
    }
}
