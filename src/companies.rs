//! Company registry record types.
//!
//! These mirror the server's GraphQL shapes: `CompanySummary` is a list row,
//! `CompanyDetail` the single-entity view, `CompanyStats` the registry-wide
//! statistics panel.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanySummary {
    /// Fiscal identification code, the registry's primary key.
    pub cui: String,
    pub name: String,
    #[serde(rename = "judet")]
    pub county: String,
    pub city: String,
    /// CAEN activity code, e.g. "6201".
    pub category_code: String,
    #[serde(default)]
    pub employees: Option<u32>,
    #[serde(default)]
    pub revenue: Option<f64>,
    #[serde(default)]
    pub registered_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanyStatus {
    Active,
    Suspended,
    Dissolved,
}

impl CompanyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompanyStatus::Active => "active",
            CompanyStatus::Suspended => "suspended",
            CompanyStatus::Dissolved => "dissolved",
        }
    }
}

/// One published balance-sheet year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceYear {
    pub year: i32,
    #[serde(default)]
    pub revenue: Option<f64>,
    #[serde(default)]
    pub profit: Option<f64>,
    #[serde(default)]
    pub employees: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyDetail {
    pub cui: String,
    pub name: String,
    #[serde(rename = "judet")]
    pub county: String,
    pub city: String,
    pub category_code: String,
    #[serde(default)]
    pub category_label: Option<String>,
    pub status: CompanyStatus,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub registered_on: Option<NaiveDate>,
    #[serde(default)]
    pub balance_years: Vec<BalanceYear>,
}

impl CompanyDetail {
    /// Most recent published balance-sheet year, if any.
    pub fn latest_balance(&self) -> Option<&BalanceYear> {
        self.balance_years.iter().max_by_key(|year| year.year)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountyCount {
    #[serde(rename = "judet")]
    pub county: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyStats {
    pub total_companies: u64,
    pub active_companies: u64,
    pub new_this_month: u64,
    #[serde(default)]
    pub top_counties: Vec<CountyCount>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_decodes_wire_shape() {
        let raw = serde_json::json!({
            "cui": "RO1234567",
            "name": "Exemplu Soft SRL",
            "judet": "Cluj",
            "city": "Cluj-Napoca",
            "categoryCode": "6201",
            "employees": 42,
            "revenue": 1_250_000.0,
            "registeredOn": "2019-03-14"
        });

        let summary: CompanySummary = serde_json::from_value(raw).expect("decode summary");
        assert_eq!(summary.county, "Cluj");
        assert_eq!(summary.category_code, "6201");
        assert_eq!(summary.employees, Some(42));
    }

    #[test]
    fn detail_latest_balance_picks_newest_year() {
        let detail = CompanyDetail {
            cui: "RO1".into(),
            name: "Firma".into(),
            county: "Timis".into(),
            city: "Timisoara".into(),
            category_code: "4711".into(),
            category_label: None,
            status: CompanyStatus::Active,
            address: None,
            phone: None,
            email: None,
            website: None,
            registered_on: None,
            balance_years: vec![
                BalanceYear { year: 2022, revenue: Some(10.0), profit: None, employees: None },
                BalanceYear { year: 2024, revenue: Some(30.0), profit: None, employees: None },
                BalanceYear { year: 2023, revenue: Some(20.0), profit: None, employees: None },
            ],
        };

        assert_eq!(detail.latest_balance().map(|b| b.year), Some(2024));
    }
}
