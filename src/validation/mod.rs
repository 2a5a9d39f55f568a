pub mod existence;
pub mod identifier;
pub mod sql_validator;

pub use existence::ExistenceValidator;
pub use identifier::{quote_identifier, ValidatedSchema, ValidatedTable};
pub use sql_validator::SqlValidator;
