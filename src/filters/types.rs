//! Filter criteria for company list queries.
//!
//! `FilterSet` is a closed struct with one typed field per filter key, and all
//! mutation goes through `FilterUpdate`, so an invalid key or a value of the
//! wrong shape cannot be represented. Two rules are enforced on commit:
//!
//! - `single_category_code` and `multi_category_codes` are mutually
//!   exclusive: committing a non-empty value for one clears the other.
//!   Committing an empty value does NOT clear the partner. Callers rely on
//!   that asymmetry; keep it.
//! - committing `county` clears `city` (cities belong to a county).
//!
//! Values themselves are not validated here; the server rejects bad
//! combinations and the error is surfaced verbatim.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
    NameAsc,
    NameDesc,
    RevenueDesc,
    EmployeesDesc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::NewestFirst => "newest_first",
            SortOrder::OldestFirst => "oldest_first",
            SortOrder::NameAsc => "name_asc",
            SortOrder::NameDesc => "name_desc",
            SortOrder::RevenueDesc => "revenue_desc",
            SortOrder::EmployeesDesc => "employees_desc",
        }
    }

    pub fn from_str(value: &str) -> Self {
        match value {
            "oldest_first" => SortOrder::OldestFirst,
            "name_asc" => SortOrder::NameAsc,
            "name_desc" => SortOrder::NameDesc,
            "revenue_desc" => SortOrder::RevenueDesc,
            "employees_desc" => SortOrder::EmployeesDesc,
            _ => SortOrder::NewestFirst,
        }
    }
}

/// Inclusive numeric bounds; either side may be open.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumericRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl NumericRange {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(rename = "judet", default, skip_serializing_if = "Option::is_none")]
    pub county: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub single_category_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_category_codes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_range: Option<NumericRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue_range: Option<NumericRange>,
    /// Always present; `reset` restores the default rather than clearing it.
    #[serde(default)]
    pub sort_by: SortOrder,
}

impl Default for FilterSet {
    fn default() -> Self {
        Self {
            search: None,
            county: None,
            city: None,
            single_category_code: None,
            multi_category_codes: None,
            employee_range: None,
            revenue_range: None,
            sort_by: SortOrder::default(),
        }
    }
}

/// One committed mutation of a single filter key.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterUpdate {
    Search(Option<String>),
    County(Option<String>),
    City(Option<String>),
    SingleCategoryCode(Option<String>),
    MultiCategoryCodes(Option<Vec<String>>),
    EmployeeRange(Option<NumericRange>),
    RevenueRange(Option<NumericRange>),
    SortBy(SortOrder),
}

impl FilterUpdate {
    /// Search-as-you-type updates get the shorter debounce delay.
    pub fn is_search(&self) -> bool {
        matches!(self, FilterUpdate::Search(_))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl FilterSet {
    pub fn apply(&mut self, update: FilterUpdate) {
        match update {
            FilterUpdate::Search(value) => {
                self.search = non_empty(value);
            }
            FilterUpdate::County(value) => {
                self.county = non_empty(value);
                self.city = None;
            }
            FilterUpdate::City(value) => {
                self.city = non_empty(value);
            }
            FilterUpdate::SingleCategoryCode(value) => {
                let value = non_empty(value);
                // Only a non-empty value evicts the partner key.
                if value.is_some() {
                    self.multi_category_codes = None;
                }
                self.single_category_code = value;
            }
            FilterUpdate::MultiCategoryCodes(value) => {
                let value = value.filter(|codes| !codes.is_empty());
                if value.is_some() {
                    self.single_category_code = None;
                }
                self.multi_category_codes = value;
            }
            FilterUpdate::EmployeeRange(value) => {
                self.employee_range = value;
            }
            FilterUpdate::RevenueRange(value) => {
                self.revenue_range = value;
            }
            FilterUpdate::SortBy(order) => {
                self.sort_by = order;
            }
        }
    }

    /// Restore every key to its default, `sort_by` included.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Serialized form used both as GraphQL `filters` variable and as part of
    /// request cache keys.
    pub fn to_variables(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_codes_clear_single_code() {
        let mut filters = FilterSet::default();
        filters.apply(FilterUpdate::SingleCategoryCode(Some("4711".into())));
        assert_eq!(filters.single_category_code.as_deref(), Some("4711"));

        filters.apply(FilterUpdate::MultiCategoryCodes(Some(vec![
            "6201".into(),
            "6202".into(),
        ])));

        assert_eq!(filters.single_category_code, None);
        assert_eq!(
            filters.multi_category_codes,
            Some(vec!["6201".to_string(), "6202".to_string()])
        );
    }

    #[test]
    fn single_code_clears_multi_codes() {
        let mut filters = FilterSet::default();
        filters.apply(FilterUpdate::MultiCategoryCodes(Some(vec!["6201".into()])));

        filters.apply(FilterUpdate::SingleCategoryCode(Some("4711".into())));

        assert_eq!(filters.multi_category_codes, None);
        assert_eq!(filters.single_category_code.as_deref(), Some("4711"));
    }

    #[test]
    fn empty_value_does_not_clear_partner() {
        let mut filters = FilterSet::default();
        filters.apply(FilterUpdate::MultiCategoryCodes(Some(vec!["6201".into()])));

        // Clearing the single code must leave the multi list alone.
        filters.apply(FilterUpdate::SingleCategoryCode(None));
        assert_eq!(
            filters.multi_category_codes,
            Some(vec!["6201".to_string()])
        );

        filters.apply(FilterUpdate::SingleCategoryCode(Some("  ".into())));
        assert_eq!(
            filters.multi_category_codes,
            Some(vec!["6201".to_string()])
        );

        // Same the other way around.
        filters.apply(FilterUpdate::SingleCategoryCode(Some("4711".into())));
        filters.apply(FilterUpdate::MultiCategoryCodes(Some(vec![])));
        assert_eq!(filters.single_category_code.as_deref(), Some("4711"));
        assert_eq!(filters.multi_category_codes, None);
    }

    #[test]
    fn county_change_clears_city() {
        let mut filters = FilterSet::default();
        filters.apply(FilterUpdate::County(Some("Cluj".into())));
        filters.apply(FilterUpdate::City(Some("Cluj-Napoca".into())));
        assert_eq!(filters.city.as_deref(), Some("Cluj-Napoca"));

        filters.apply(FilterUpdate::County(Some("Timis".into())));
        assert_eq!(filters.county.as_deref(), Some("Timis"));
        assert_eq!(filters.city, None);
    }

    #[test]
    fn reset_restores_every_default_including_sort() {
        let mut filters = FilterSet::default();
        filters.apply(FilterUpdate::Search(Some("soft".into())));
        filters.apply(FilterUpdate::County(Some("Cluj".into())));
        filters.apply(FilterUpdate::SortBy(SortOrder::RevenueDesc));
        filters.apply(FilterUpdate::EmployeeRange(Some(NumericRange::new(
            Some(10.0),
            None,
        ))));

        filters.reset();

        assert_eq!(filters, FilterSet::default());
        assert_eq!(filters.sort_by, SortOrder::NewestFirst);
    }

    #[test]
    fn variables_skip_absent_keys_and_rename_county() {
        let mut filters = FilterSet::default();
        filters.apply(FilterUpdate::County(Some("Cluj".into())));

        let vars = filters.to_variables();
        assert_eq!(vars["judet"], "Cluj");
        assert_eq!(vars["sortBy"], "newest_first");
        assert!(vars.get("search").is_none());
        assert!(vars.get("singleCategoryCode").is_none());
    }
}
