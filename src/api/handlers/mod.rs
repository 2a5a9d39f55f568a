pub mod connection;
pub mod introspection;
