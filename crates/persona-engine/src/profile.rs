use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Static profile record served by the `collect_personal_data` tool. This is
/// business data, not logic: it lives in `data/profile.json` and only the
/// tenure is derived at lookup time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub joining_date: NaiveDate,
    pub contact: Value,
    pub profile_summary: String,
    pub experience: Vec<Value>,
    pub projects: Vec<Value>,
    pub technical_skills: Value,
    pub education: Vec<Education>,
    pub participations: Vec<Value>,
    pub extra_details: Value,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Education {
    pub degree: String,
    pub institution: String,
    pub location: String,
    pub duration: String,
}

impl Profile {
    /// The profile bundled with the crate.
    pub fn builtin() -> Self {
        serde_json::from_str(include_str!("../data/profile.json"))
            .expect("bundled profile.json is valid")
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Whole months elapsed between the joining date and `today`.
    pub fn tenure_months(&self, today: NaiveDate) -> i32 {
        (today.year() - self.joining_date.year()) * 12
            + (today.month() as i32 - self.joining_date.month() as i32)
    }

    /// The full payload handed to the completion service, with the derived
    /// tenure injected alongside the static record.
    pub fn to_payload(&self, today: NaiveDate) -> Value {
        let mut payload = serde_json::to_value(self).expect("profile serializes");
        payload["total_number_of_months_experience"] = json!(self.tenure_months(today));
        payload
    }
}
