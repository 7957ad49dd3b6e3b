use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Named rate-limit budget buckets.
///
/// `Anon` and `User` are the global budgets every request passes through;
/// the rest are attached to specific actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Anon,
    User,
    Login,
    Registration,
    Listing,
    ConsultaCreate,
    ProfissionalCreate,
    SensitiveData,
}

impl Scope {
    pub const ALL: [Scope; 8] = [
        Scope::Anon,
        Scope::User,
        Scope::Login,
        Scope::Registration,
        Scope::Listing,
        Scope::ConsultaCreate,
        Scope::ProfissionalCreate,
        Scope::SensitiveData,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Anon => "anon",
            Scope::User => "user",
            Scope::Login => "login",
            Scope::Registration => "registration",
            Scope::Listing => "listing",
            Scope::ConsultaCreate => "consulta_create",
            Scope::ProfissionalCreate => "profissional_create",
            Scope::SensitiveData => "sensitive_data",
        }
    }

    /// Environment variable that overrides this scope's rate, e.g. `THROTTLE_RATE_LOGIN`
    pub fn env_key(&self) -> String {
        format!("THROTTLE_RATE_{}", self.as_str().to_ascii_uppercase())
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Second,
    Minute,
    Hour,
    Day,
}

impl Period {
    pub fn as_duration(&self) -> Duration {
        match self {
            Period::Second => Duration::from_secs(1),
            Period::Minute => Duration::from_secs(60),
            Period::Hour => Duration::from_secs(3600),
            Period::Day => Duration::from_secs(86_400),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Period::Second => "sec",
            Period::Minute => "min",
            Period::Hour => "hour",
            Period::Day => "day",
        }
    }
}

/// Requests allowed per window, written as `N/period` (`5/min`, `100/hour`).
/// Only the first letter of the period is significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rate {
    pub requests: u32,
    pub period: Period,
}

impl Rate {
    pub const fn new(requests: u32, period: Period) -> Self {
        Self { requests, period }
    }

    pub fn window(&self) -> Duration {
        self.period.as_duration()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid rate '{0}', expected N/period (e.g. 5/min)")]
pub struct RateParseError(String);

impl FromStr for Rate {
    type Err = RateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RateParseError(s.to_string());

        let (count, period) = s.trim().split_once('/').ok_or_else(invalid)?;
        let requests = count.trim().parse::<u32>().map_err(|_| invalid())?;

        let period = match period.trim().chars().next() {
            Some('s') => Period::Second,
            Some('m') => Period::Minute,
            Some('h') => Period::Hour,
            Some('d') => Period::Day,
            _ => return Err(invalid()),
        };

        Ok(Rate { requests, period })
    }
}

impl TryFrom<String> for Rate {
    type Error = RateParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rate> for String {
    fn from(rate: Rate) -> Self {
        rate.to_string()
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.requests, self.period.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_rate_strings() {
        assert_eq!("5/min".parse::<Rate>().unwrap(), Rate::new(5, Period::Minute));
        assert_eq!("100/hour".parse::<Rate>().unwrap(), Rate::new(100, Period::Hour));
        assert_eq!("1/s".parse::<Rate>().unwrap(), Rate::new(1, Period::Second));
        assert_eq!("20/day".parse::<Rate>().unwrap(), Rate::new(20, Period::Day));
        assert_eq!(" 3 / m ".parse::<Rate>().unwrap(), Rate::new(3, Period::Minute));
    }

    #[test]
    fn rejects_malformed_rates() {
        assert!("5".parse::<Rate>().is_err());
        assert!("five/min".parse::<Rate>().is_err());
        assert!("5/week".parse::<Rate>().is_err());
        assert!("5/".parse::<Rate>().is_err());
    }

    #[test]
    fn display_round_trips_through_parse() {
        let rate = Rate::new(30, Period::Hour);
        assert_eq!(rate.to_string(), "30/hour");
        assert_eq!(rate.to_string().parse::<Rate>().unwrap(), rate);
    }

    #[test]
    fn scope_env_keys() {
        assert_eq!(Scope::ConsultaCreate.env_key(), "THROTTLE_RATE_CONSULTA_CREATE");
        assert_eq!(Scope::Login.to_string(), "login");
    }
}
