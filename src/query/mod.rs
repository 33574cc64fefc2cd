pub mod connection;
pub mod debounce;
pub mod pagination;

pub use connection::{Connection, Edge, PageCursor, PageInfo};
pub use debounce::Debouncer;
pub use pagination::{FetchState, PageFetcher, PagedQuery, ResultsSnapshot};
