// Statistics builder
//
// One aggregate statement per table computing min/max/avg/median of every numeric,
// non-key column. The median is a MariaDB window function partitioned by the primary key.

use serde_json::Value;

use crate::models::{ColumnEntry, ColumnStatistics, Row};
use crate::validation::{quote_identifier, ValidatedTable};

/// Declared types that statistics are computed for
pub const NUMERIC_DATA_TYPES: &[&str] = &[
    "bigint", "tinyint", "smallint", "mediumint", "int", "integer", "decimal", "dec", "numeric",
    "fixed", "float", "double",
];

/// Columns eligible for statistics: numeric type and no key of any kind
pub fn numeric_columns(columns: &[ColumnEntry]) -> Vec<&ColumnEntry> {
    columns
        .iter()
        .filter(|c| c.column_key.is_none())
        .filter(|c| NUMERIC_DATA_TYPES.contains(&c.data_type.to_ascii_lowercase().as_str()))
        .collect()
}

/// Quoted, comma-separated primary key columns in catalog order; empty when there is no primary key
pub fn primary_key_list(columns: &[ColumnEntry]) -> String {
    columns
        .iter()
        .filter(|c| c.is_primary_key())
        .map(|c| quote_identifier(&c.name))
        .collect::<Vec<_>>()
        .join(",")
}

/// Build the statistics statement, or `None` when the table has no eligible column.
///
/// `columns` must be the catalog columns of `table`.
pub fn build_statistics_query(table: &ValidatedTable, columns: &[ColumnEntry]) -> Option<String> {
    let numeric = numeric_columns(columns);
    if numeric.is_empty() {
        return None;
    }

    let partition = primary_key_list(columns);
    let expressions = numeric
        .iter()
        .map(|c| column_stats_expressions(&c.name, &partition))
        .collect::<Vec<_>>()
        .join(", ");

    Some(format!("select {} from {}", expressions, table.qualified_name()))
}

fn column_stats_expressions(column: &str, partition: &str) -> String {
    let c = quote_identifier(column);
    let alias = |stat: &str| quote_identifier(&format!("{}_{}", column, stat));
    let window = if partition.is_empty() {
        "over ()".to_string()
    } else {
        format!("over (partition by {})", partition)
    };

    format!(
        "min({c}) as {}, max({c}) as {}, avg({c}) as {}, median({c}) {} as {}",
        alias("min"),
        alias("max"),
        alias("avg"),
        window,
        alias("median"),
        c = c
    )
}

/// Convert the single statistics row into name -> value
pub fn parse_statistics(row: Row) -> anyhow::Result<ColumnStatistics> {
    row.into_iter()
        .map(|(label, value)| {
            let number = match &value {
                Value::Null => None,
                Value::Number(n) => n.as_f64(),
                Value::String(s) => Some(s.trim().parse::<f64>().map_err(|_| {
                    anyhow::anyhow!("statistic '{}' is not numeric: {}", label, s)
                })?),
                other => anyhow::bail!("statistic '{}' is not numeric: {}", label, other),
            };
            Ok((label, number))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::KeyType;
    use crate::services::testing::row;
    use serde_json::json;

    fn column(name: &str, data_type: &str, key: Option<KeyType>) -> ColumnEntry {
        ColumnEntry {
            name: name.to_string(),
            data_type: data_type.to_string(),
            column_type: data_type.to_string(),
            position: 1,
            default_value: None,
            nullable: key.is_none(),
            character_max_length: None,
            numeric_precision: None,
            numeric_scale: None,
            datetime_precision: None,
            character_set_name: None,
            collation_name: None,
            column_key: key,
            extra: String::new(),
            privileges: "select".to_string(),
        }
    }

    #[test]
    fn test_numeric_columns_exclude_keys_and_text() {
        let columns = vec![
            column("id", "int", Some(KeyType::Primary)),
            column("sku", "bigint", Some(KeyType::Unique)),
            column("customer_id", "int", Some(KeyType::Multiple)),
            column("total", "decimal", None),
            column("qty", "SMALLINT", None),
            column("note", "varchar", None),
        ];

        let names: Vec<&str> = numeric_columns(&columns).iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["total", "qty"]);
        assert_eq!(primary_key_list(&columns), "`id`");
    }

    #[test]
    fn test_no_numeric_columns_no_query() {
        let table = ValidatedTable::for_tests("shop", "tags");
        let columns = vec![
            column("id", "int", Some(KeyType::Primary)),
            column("label", "varchar", None),
        ];
        assert_eq!(build_statistics_query(&table, &columns), None);
    }

    #[test]
    fn test_statistics_query_shape() {
        let table = ValidatedTable::for_tests("mydb_app", "orders");
        let columns = vec![
            column("id", "int", Some(KeyType::Primary)),
            column("total", "decimal", None),
        ];

        let sql = build_statistics_query(&table, &columns).unwrap();
        assert_eq!(
            sql,
            "select min(`total`) as `total_min`, max(`total`) as `total_max`, avg(`total`) as `total_avg`, \
             median(`total`) over (partition by `id`) as `total_median` from `mydb_app`.`orders`"
        );
        assert!(!sql.contains("`id_"));
    }

    #[test]
    fn test_composite_and_missing_primary_key() {
        let table = ValidatedTable::for_tests("s", "t");
        let composite = vec![
            column("a", "int", Some(KeyType::Primary)),
            column("b", "int", Some(KeyType::Primary)),
            column("v", "double", None),
        ];
        assert!(build_statistics_query(&table, &composite)
            .unwrap()
            .contains("over (partition by `a`,`b`)"));

        let keyless = vec![column("v", "float", None)];
        assert!(build_statistics_query(&table, &keyless).unwrap().contains("median(`v`) over ()"));
    }

    #[test]
    fn test_parse_statistics() {
        let stats = parse_statistics(row(json!({
            "total_min": "1.50",
            "total_max": 9,
            "total_avg": "5.2500",
            "total_median": null
        })))
        .unwrap();

        assert_eq!(stats["total_min"], Some(1.5));
        assert_eq!(stats["total_max"], Some(9.0));
        assert_eq!(stats["total_avg"], Some(5.25));
        assert_eq!(stats["total_median"], None);
    }

    #[test]
    fn test_parse_statistics_rejects_text() {
        assert!(parse_statistics(row(json!({ "total_min": "abc" }))).is_err());
    }
}
