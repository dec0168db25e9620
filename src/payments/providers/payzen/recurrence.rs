//! iCalendar recurrence rules for subscriptions
//!
//! ```
//! use multipay_backend::payments::providers::payzen::{Cycle, Recurrence};
//!
//! let rule = Recurrence::new(Cycle::Monthly).count(12).day_of_month(10).build().unwrap();
//! assert_eq!(rule, "RRULE:COUNT=12;FREQ=MONTHLY;BYMONTHDAY=10");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RecurrenceError;

/// Billing cycle of a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cycle {
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
    Semiannually,
    Yearly,
}

impl Cycle {
    /// `FREQ` and `INTERVAL` parts of the rule
    fn rule_parts(&self) -> &'static [&'static str] {
        match self {
            Cycle::Weekly => &["FREQ=WEEKLY"],
            Cycle::Biweekly => &["FREQ=WEEKLY", "INTERVAL=2"],
            Cycle::Monthly => &["FREQ=MONTHLY"],
            Cycle::Quarterly => &["FREQ=MONTHLY", "INTERVAL=3"],
            Cycle::Semiannually => &["FREQ=MONTHLY", "INTERVAL=6"],
            Cycle::Yearly => &["FREQ=YEARLY"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Cycle::Weekly => "weekly",
            Cycle::Biweekly => "biweekly",
            Cycle::Monthly => "monthly",
            Cycle::Quarterly => "quarterly",
            Cycle::Semiannually => "semiannually",
            Cycle::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Cycle {
    type Err = RecurrenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" => Err(RecurrenceError::CycleRequired),
            "weekly" => Ok(Cycle::Weekly),
            "biweekly" => Ok(Cycle::Biweekly),
            "monthly" => Ok(Cycle::Monthly),
            "quarterly" => Ok(Cycle::Quarterly),
            "semiannually" => Ok(Cycle::Semiannually),
            "yearly" => Ok(Cycle::Yearly),
            other => Err(RecurrenceError::UnknownCycle(other.to_string())),
        }
    }
}

/// Builder for `RRULE:` strings
#[derive(Debug, Clone, Default)]
pub struct Recurrence {
    cycle: Option<Cycle>,
    count: Option<u32>,
    day_of_month: Option<u8>,
    last_day_of_month: bool,
}

impl Recurrence {
    pub fn new(cycle: Cycle) -> Self {
        Self {
            cycle: Some(cycle),
            ..Default::default()
        }
    }

    /// Builder from a textual cycle such as `"monthly"`; an empty name fails on `build`
    pub fn parse(cycle: &str) -> Result<Self, RecurrenceError> {
        match cycle.parse::<Cycle>() {
            Ok(cycle) => Ok(Self::new(cycle)),
            Err(RecurrenceError::CycleRequired) => Ok(Self::default()),
            Err(err) => Err(err),
        }
    }

    /// Total number of charges
    pub fn count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    pub fn day_of_month(mut self, day: u8) -> Self {
        self.day_of_month = Some(day);
        self
    }

    pub fn last_day_of_month(mut self) -> Self {
        self.last_day_of_month = true;
        self
    }

    pub fn build(&self) -> Result<String, RecurrenceError> {
        let cycle = self.cycle.ok_or(RecurrenceError::CycleRequired)?;

        if self.day_of_month.is_some() && self.last_day_of_month {
            return Err(RecurrenceError::ConflictingMonthDay);
        }

        let mut parts: Vec<String> = Vec::new();
        if let Some(count) = self.count.filter(|count| *count > 0) {
            parts.push(format!("COUNT={}", count));
        }
        parts.extend(cycle.rule_parts().iter().map(|part| part.to_string()));

        if let Some(day) = self.day_of_month {
            if !(1..=31).contains(&day) {
                return Err(RecurrenceError::InvalidMonthDay(day));
            }
            parts.push(format!("BYMONTHDAY={}", day));
        } else if self.last_day_of_month {
            parts.push("BYMONTHDAY=28,29,30,31".to_string());
            parts.push("BYSETPOS=-1".to_string());
        }

        Ok(format!("RRULE:{}", parts.join(";")))
    }
}
