pub mod store;
pub mod types;

pub use store::FilterStore;
pub use types::{FilterSet, FilterUpdate, NumericRange, SortOrder};
