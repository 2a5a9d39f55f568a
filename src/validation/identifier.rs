// Identifiers confirmed against the catalog
//
// Schema, table and column names cannot be bound as query parameters, so statements that
// need them interpolate the text. Only these types may reach such a statement, and they
// can only be built from a successful catalog lookup.

/// Quote a MySQL identifier with backticks, doubling any embedded backtick.
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// A schema name known to exist in the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSchema {
    name: String,
}

impl ValidatedSchema {
    pub(super) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A base table known to exist in the catalog under its schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTable {
    schema: String,
    table: String,
}

impl ValidatedTable {
    pub(super) fn new(schema: &str, table: &str) -> Self {
        Self {
            schema: schema.to_string(),
            table: table.to_string(),
        }
    }

    #[cfg(test)]
    pub(crate) fn for_tests(schema: &str, table: &str) -> Self {
        Self::new(schema, table)
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Schema-qualified, quoted table reference for use in a FROM clause
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", quote_identifier(&self.schema), quote_identifier(&self.table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("orders"), "`orders`");
        assert_eq!(quote_identifier("we`ird"), "`we``ird`");
    }

    #[test]
    fn test_qualified_name() {
        let table = ValidatedTable::new("mydb_app", "order items");
        assert_eq!(table.qualified_name(), "`mydb_app`.`order items`");
        assert_eq!(table.schema(), "mydb_app");
        assert_eq!(table.table(), "order items");
    }
}
