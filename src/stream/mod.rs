/// Streaming Module
///
/// Lazy readers over the `user_data` table, each yielding `Result` items so
/// that a failed source is never mistaken for an exhausted one:
/// - **Rows** (`rows.rs`): one record at a time from a single query
/// - **Batches** (`batches.rs`): fixed-size groups of records, plus the age filter
/// - **Pages** (`pages.rs`): offset pagination with one connection per page
/// - **Aggregates** (`aggregate.rs`): constant-memory folds such as the average age
pub mod aggregate;
pub mod batches;
pub mod pages;
pub mod rows;

pub use aggregate::{average_age, average_user_age, format_average};
pub use batches::{ages_over, batches, stream_batches, AgesOver, BatchStream};
pub use pages::{fetch_page, lazy_paginate, LazyPaginator, Page};
pub use rows::{stream_ages, stream_query, stream_rows, stream_rows_on, RowConverter, RowStream};
