pub mod client;
pub mod query;

pub use client::{GerritClient, ABANDON_MESSAGE, WARN_MESSAGE};
pub use query::{parse_query_output, GerritQuery, QueryPage, QueryStats};
