// MySQL/MariaDB client: one physical connection per introspection session
use crate::models::{ConnectionDetails, Row};
use crate::services::database::adapter::{SessionConnector, SqlClient};
use anyhow::{anyhow, Context};
use mysql_async::{prelude::*, Conn, OptsBuilder, Params, Row as MySqlRow, Value as MySqlValue};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Opens a dedicated `mysql_async` connection for each session.
#[derive(Debug, Default, Clone)]
pub struct MySqlConnector;

impl MySqlConnector {
    pub fn new() -> Self {
        Self
    }

    fn opts(details: &ConnectionDetails) -> OptsBuilder {
        let password = if details.password.is_empty() {
            None
        } else {
            Some(details.password.clone())
        };

        OptsBuilder::default()
            .ip_or_hostname(details.hostname.clone())
            .tcp_port(details.port)
            .db_name(Some(details.database_name.clone()))
            .user(Some(details.username.clone()))
            .pass(password)
    }
}

#[async_trait::async_trait]
impl SessionConnector for MySqlConnector {
    async fn connect(&self, details: &ConnectionDetails) -> anyhow::Result<Arc<dyn SqlClient>> {
        let conn = Conn::new(Self::opts(details))
            .await
            .with_context(|| format!("Failed to connect to {}", details.masked_url()))?;

        Ok(Arc::new(MySqlClient::new(conn)) as Arc<dyn SqlClient>)
    }
}

/// A single MySQL connection; the mutex serializes queries issued on it.
pub struct MySqlClient {
    conn: Mutex<Option<Conn>>,
}

impl MySqlClient {
    pub fn new(conn: Conn) -> Self {
        Self {
            conn: Mutex::new(Some(conn)),
        }
    }

    fn bind(params: &[&str]) -> Params {
        if params.is_empty() {
            Params::Empty
        } else {
            Params::Positional(
                params
                    .iter()
                    .map(|p| MySqlValue::Bytes(p.as_bytes().to_vec()))
                    .collect(),
            )
        }
    }

    /// Convert a MySQL row into a JSON object keyed by column label
    fn row_to_json(row: MySqlRow) -> Row {
        let mut row_obj = Row::new();
        let columns = row.columns();

        for (idx, column) in columns.iter().enumerate() {
            let value: Value = match row.get_opt::<MySqlValue, usize>(idx) {
                Some(Ok(mysql_val)) => Self::mysql_value_to_json(mysql_val),
                Some(Err(_)) => Value::Null,
                None => Value::Null,
            };
            row_obj.insert(column.name_str().to_string(), value);
        }

        row_obj
    }

    /// Helper function to convert MySQL Value to JSON Value
    fn mysql_value_to_json(mysql_val: MySqlValue) -> Value {
        match mysql_val {
            MySqlValue::NULL => Value::Null,
            // DECIMAL and character data arrive as bytes
            MySqlValue::Bytes(bytes) => json!(String::from_utf8_lossy(&bytes)),
            MySqlValue::Int(i) => json!(i),
            MySqlValue::UInt(u) => json!(u),
            MySqlValue::Float(f) => json!(f),
            MySqlValue::Double(d) => json!(d),
            MySqlValue::Date(y, m, d, h, min, s, _) => {
                json!(format!("{:04}-{:02}-{:02} {:02}:{:02}:{:02}", y, m, d, h, min, s))
            }
            MySqlValue::Time(is_neg, d, h, m, s, _) => {
                let sign = if is_neg { "-" } else { "" };
                let total_hours = d * 24 + h as u32;
                json!(format!("{}{}:{:02}:{:02}", sign, total_hours, m, s))
            }
        }
    }
}

#[async_trait::async_trait]
impl SqlClient for MySqlClient {
    async fn query(&self, sql: &str, params: &[&str]) -> anyhow::Result<Vec<Row>> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(|| anyhow!("session is closed"))?;

        // binary protocol, so numbers come back typed rather than as text
        let rows: Vec<MySqlRow> = conn.exec(sql, Self::bind(params)).await?;

        Ok(rows.into_iter().map(Self::row_to_json).collect())
    }

    async fn close(&self) -> anyhow::Result<()> {
        let conn = self.conn.lock().await.take();
        match conn {
            Some(conn) => conn.disconnect().await.map_err(Into::into),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_conversion() {
        assert_eq!(MySqlClient::mysql_value_to_json(MySqlValue::NULL), Value::Null);
        assert_eq!(MySqlClient::mysql_value_to_json(MySqlValue::Int(-3)), json!(-3));
        assert_eq!(MySqlClient::mysql_value_to_json(MySqlValue::UInt(7)), json!(7));
        assert_eq!(
            MySqlClient::mysql_value_to_json(MySqlValue::Bytes(b"12.50".to_vec())),
            json!("12.50")
        );
    }

    #[test]
    fn test_temporal_conversion() {
        assert_eq!(
            MySqlClient::mysql_value_to_json(MySqlValue::Date(2024, 1, 2, 3, 4, 5, 0)),
            json!("2024-01-02 03:04:05")
        );
        assert_eq!(
            MySqlClient::mysql_value_to_json(MySqlValue::Time(true, 1, 2, 3, 4, 0)),
            json!("-26:03:04")
        );
    }

    #[test]
    fn test_bind_params() {
        assert!(matches!(MySqlClient::bind(&[]), Params::Empty));
        match MySqlClient::bind(&["shop", "orders"]) {
            Params::Positional(values) => {
                assert_eq!(values, vec![MySqlValue::Bytes(b"shop".to_vec()), MySqlValue::Bytes(b"orders".to_vec())]);
            }
            other => panic!("unexpected params: {:?}", other),
        }
    }

    #[test]
    fn test_opts_from_details() {
        let details = ConnectionDetails::new("mydb", "db.local", 3307, "app", "reader", "");
        let opts: mysql_async::Opts = MySqlConnector::opts(&details).into();
        assert_eq!(opts.ip_or_hostname(), "db.local");
        assert_eq!(opts.tcp_port(), 3307);
        assert_eq!(opts.db_name(), Some("app"));
        assert_eq!(opts.user(), Some("reader"));
        assert_eq!(opts.pass(), None);
    }
}
