use chrono::{Datelike, NaiveDate};

pub const DEFAULT_MASTER_CODE: &str = "alien2025";

const MONTH_TOKENS: [&str; 12] = [
    "JANUARY",
    "FEBRUARY",
    "MARCH",
    "APRIL",
    "MAY",
    "JUNE",
    "JULY",
    "AUGUST",
    "SEPTEMBER",
    "OCTOBER",
    "NOVEMBER",
    "DECEMBER",
];

/// Accepts the master code or the upper-case name of the current month.
/// Hides the UI only; not a security boundary.
#[derive(Debug, Clone)]
pub struct AccessGate {
    master_code: String,
}

impl Default for AccessGate {
    fn default() -> Self {
        Self::new(DEFAULT_MASTER_CODE)
    }
}

impl AccessGate {
    pub fn new(master_code: &str) -> Self {
        Self {
            master_code: normalize(master_code),
        }
    }

    pub fn month_token(today: NaiveDate) -> &'static str {
        MONTH_TOKENS[today.month0() as usize]
    }

    /// Returns the normalized code when `input` opens the gate on `today`.
    pub fn check(&self, input: &str, today: NaiveDate) -> Option<String> {
        let code = normalize(input);
        if code.is_empty() {
            return None;
        }
        if code == self.master_code || code == Self::month_token(today) {
            Some(code)
        } else {
            None
        }
    }

    pub fn accepts(&self, input: &str, today: NaiveDate) -> bool {
        self.check(input, today).is_some()
    }
}

fn normalize(code: &str) -> String {
    code.trim().to_uppercase()
}
