/// Database Module
///
/// The database layer is split into two concerns:
/// - **Connection Management** (`connection.rs`): resolves the server, opens and releases
///   connections, bootstraps the database and table, and wraps transactions
/// - **Query Execution** (`query.rs`): one-shot materialised queries and the explicit query cache
///
/// ## Error Handling
///
/// All database operations use the standardized `ProdevError` type for consistent error propagation.
pub mod connection;
pub mod query;

pub use connection::*;
pub use query::*;
