pub mod catalog;
pub mod connection;
pub mod query;

pub use catalog::*;
pub use connection::*;
pub use query::*;
