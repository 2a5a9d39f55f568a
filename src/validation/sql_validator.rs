use sqlparser::ast::Statement;
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;
use crate::api::middleware::AppError;

/// Guard for statements assembled from catalog identifiers
///
/// Every dynamically built statement must parse as exactly one SELECT before it is sent.
pub struct SqlValidator;

impl SqlValidator {
    /// Ensure `sql` is a single SELECT statement
    pub fn validate_select_only(sql: &str) -> Result<(), AppError> {
        let statements = Self::parse(sql)?;

        match statements.as_slice() {
            [Statement::Query(_)] => Ok(()),
            [] => Err(AppError::Internal("Empty SQL statement".to_string())),
            [_] => Err(AppError::Internal(format!(
                "Only SELECT statements may be built, got: {}",
                sql
            ))),
            _ => Err(AppError::Internal(format!(
                "Expected a single statement, got {}: {}",
                statements.len(),
                sql
            ))),
        }
    }

    fn parse(sql: &str) -> Result<Vec<Statement>, AppError> {
        let dialect = MySqlDialect {};
        Parser::new(&dialect)
            .try_with_sql(sql)
            .and_then(|mut parser| parser.parse_statements())
            .map_err(|e| AppError::Internal(format!("SQL parsing error: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_select_only() {
        assert!(SqlValidator::validate_select_only("select * from `shop`.`orders` limit 20 offset 0").is_ok());
        assert!(SqlValidator::validate_select_only(
            "select min(`total`) as `total_min`, median(`total`) over (partition by `id`) as `total_median` from `shop`.`orders`"
        )
        .is_ok());

        assert!(SqlValidator::validate_select_only("DELETE FROM users").is_err());
        assert!(SqlValidator::validate_select_only("UPDATE users SET name = 'test'").is_err());
    }

    #[test]
    fn test_stacked_statements_rejected() {
        // what an unescaped identifier like "orders; drop table orders" would produce
        let result = SqlValidator::validate_select_only("select * from orders; drop table orders");
        assert!(matches!(result, Err(AppError::Internal(_))));
    }
}
