// Database driver layer for introspection sessions
pub mod adapter;
pub mod mysql;

pub use adapter::{SessionConnector, SqlClient};
pub use mysql::{MySqlClient, MySqlConnector};
