use serde::{Deserialize, Serialize};

/// Named connection details as kept in the connection directory.
///
/// The numeric `id` is internal; callers address connections by their unique `name`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionDetails {
    #[serde(skip)]
    pub id: i64,
    pub name: String,
    pub hostname: String,
    pub port: u16,
    pub database_name: String,
    pub username: String,
    pub password: String,
}

impl ConnectionDetails {
    pub fn new(
        name: impl Into<String>,
        hostname: impl Into<String>,
        port: u16,
        database_name: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            name: name.into(),
            hostname: hostname.into(),
            port,
            database_name: database_name.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Build a `mysql://` URL for these details, credentials percent-encoded.
    pub fn connection_url(&self) -> Result<url::Url, url::ParseError> {
        let mut url = url::Url::parse(&format!("mysql://{}:{}", self.hostname, self.port))?;
        // set_username/set_password only fail for cannot-be-a-base URLs
        let _ = url.set_username(&self.username);
        if !self.password.is_empty() {
            let _ = url.set_password(Some(&self.password));
        }
        url.set_path(&self.database_name);
        Ok(url)
    }

    /// Connection URL with the password masked, safe for logging.
    pub fn masked_url(&self) -> String {
        match self.connection_url() {
            Ok(mut url) => {
                if url.password().is_some() {
                    let _ = url.set_password(Some("***"));
                }
                url.to_string()
            }
            Err(_) => "[invalid-url]".to_string(),
        }
    }
}

/// Request body for creating or replacing connection details.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionDetailsRequest {
    pub name: String,
    pub hostname: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub database_name: String,
    pub username: String,
    #[serde(default)]
    pub password: String,
}

fn default_port() -> u16 {
    3306
}

impl From<ConnectionDetailsRequest> for ConnectionDetails {
    fn from(req: ConnectionDetailsRequest) -> Self {
        ConnectionDetails::new(
            req.name,
            req.hostname,
            req.port,
            req.database_name,
            req.username,
            req.password,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_url() {
        let details = ConnectionDetails::new("mydb", "db.local", 3307, "app", "reader", "p@ss:word");
        let url = details.connection_url().unwrap();
        assert_eq!(url.scheme(), "mysql");
        assert_eq!(url.host_str(), Some("db.local"));
        assert_eq!(url.port(), Some(3307));
        assert_eq!(url.path(), "/app");
        assert_eq!(url.username(), "reader");
        assert_ne!(url.password(), Some("p@ss:word"));
    }

    #[test]
    fn test_masked_url_hides_password() {
        let details = ConnectionDetails::new("mydb", "localhost", 3306, "app", "root", "secret");
        let masked = details.masked_url();
        assert!(masked.contains("***"));
        assert!(!masked.contains("secret"));
    }

    #[test]
    fn test_id_not_serialized() {
        let mut details = ConnectionDetails::new("mydb", "localhost", 3306, "app", "root", "secret");
        details.id = 42;
        let json = serde_json::to_value(&details).unwrap();
        assert!(json.get("id").is_none());
        assert_eq!(json["database_name"], "app");
    }

    #[test]
    fn test_request_default_port() {
        let req: ConnectionDetailsRequest = serde_json::from_str(
            r#"{"name":"mydb","hostname":"localhost","database_name":"app","username":"root"}"#,
        )
        .unwrap();
        let details = ConnectionDetails::from(req);
        assert_eq!(details.port, 3306);
        assert_eq!(details.password, "");
    }
}
