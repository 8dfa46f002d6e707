use serde::Deserialize;
use time::Date;

/// Request body for creating a contact.
#[derive(Debug, Deserialize)]
pub struct ContactCreate {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub phone: String,
    pub birthday: Date,
    #[serde(default)]
    pub note: Option<String>,
}

/// Partial update: every field optional, unset fields keep their value.
#[derive(Debug, Default, Deserialize)]
pub struct ContactPatch {
    pub name: Option<String>,
    pub surname: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub birthday: Option<Date>,
    pub note: Option<String>,
}

/// Query parameters for the contact list.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub name: Option<String>,
    pub surname: Option<String>,
    pub email: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    10
}

/// Query parameters for the upcoming-birthdays endpoint.
#[derive(Debug, Deserialize)]
pub struct BirthdayParams {
    #[serde(default = "default_days")]
    pub days: u32,
}

fn default_days() -> u32 {
    7
}
