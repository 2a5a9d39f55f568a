pub mod database;
pub mod introspection;
pub mod query_executor;
pub mod session;
pub mod session_cache; // Idle-expiring session cache with shared loads
pub mod statistics;

#[cfg(test)]
pub(crate) mod testing;

pub use database::*;
pub use introspection::*;
pub use query_executor::*;
pub use session::*;
pub use session_cache::*;
