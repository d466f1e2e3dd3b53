//! ClickHouse catalog driver over the HTTP interface.
//!
//! Queries go to `http://host:port/` with credentials in the
//! `X-ClickHouse-User`/`X-ClickHouse-Key` headers and results in
//! `JSONEachRow`, one object per line.
use super::{ConnectionDescriptor, DatabaseIntrospector, IntrospectError, with_timeout};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

const SCHEMAS_SQL: &str = "SELECT name FROM system.databases \
     WHERE name NOT IN ('system', 'INFORMATION_SCHEMA', 'information_schema') \
     ORDER BY name FORMAT JSONEachRow";

const TABLES_SQL: &str = "SELECT name FROM system.tables \
     WHERE database = {db:String} ORDER BY name FORMAT JSONEachRow";

#[derive(Debug, Deserialize)]
struct NameRow {
    name: String,
}

#[derive(Debug, Clone)]
pub struct ClickHouseIntrospector {
    client: reqwest::Client,
    timeout: Duration,
}

impl ClickHouseIntrospector {
    pub fn new(timeout: Duration) -> Result<Self, IntrospectError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| IntrospectError::Connect(err.to_string()))?;
        Ok(Self { client, timeout })
    }

    async fn query(
        &self,
        descriptor: &ConnectionDescriptor,
        sql: &str,
        params: &[(&str, &str)],
    ) -> Result<String, IntrospectError> {
        let url = format!("http://{}:{}/", descriptor.host, descriptor.port);
        let mut query: Vec<(&str, &str)> = vec![("database", descriptor.database.as_str())];
        query.extend_from_slice(params);
        let response = self
            .client
            .post(url)
            .query(&query)
            .header("X-ClickHouse-User", &descriptor.username)
            .header("X-ClickHouse-Key", &descriptor.password)
            .body(sql.to_string())
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(IntrospectError::Query(format!(
                "clickhouse returned {status}: {}",
                body.trim()
            )));
        }
        Ok(body)
    }

    async fn names(
        &self,
        descriptor: &ConnectionDescriptor,
        sql: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<String>, IntrospectError> {
        let body = with_timeout(self.timeout, self.query(descriptor, sql, params)).await?;
        parse_names(&body)
    }
}

fn parse_names(body: &str) -> Result<Vec<String>, IntrospectError> {
    body.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str::<NameRow>(line)
                .map(|row| row.name)
                .map_err(|err| IntrospectError::Decode(err.to_string()))
        })
        .collect()
}

#[async_trait]
impl DatabaseIntrospector for ClickHouseIntrospector {
    async fn test(&self, descriptor: &ConnectionDescriptor) -> Result<(), IntrospectError> {
        with_timeout(
            self.timeout,
            self.query(descriptor, "SELECT 1 FORMAT JSONEachRow", &[]),
        )
        .await
        .map(|_| ())
    }

    async fn list_schemas(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<Vec<String>, IntrospectError> {
        self.names(descriptor, SCHEMAS_SQL, &[]).await
    }

    async fn list_tables(
        &self,
        descriptor: &ConnectionDescriptor,
        schema: Option<&str>,
    ) -> Result<Vec<String>, IntrospectError> {
        let database = schema.unwrap_or(descriptor.database.as_str());
        self.names(descriptor, TABLES_SQL, &[("param_db", database)])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_each_row_lines_parse() {
        let body = "{\"name\":\"default\"}\n{\"name\":\"metrics\"}\n\n";
        assert_eq!(parse_names(body).expect("names"), vec!["default", "metrics"]);
    }

    #[test]
    fn empty_body_is_an_empty_list() {
        assert!(parse_names("").expect("names").is_empty());
    }

    #[test]
    fn unexpected_rows_are_decode_errors() {
        assert!(matches!(
            parse_names("Code: 516. Authentication failed"),
            Err(IntrospectError::Decode(_))
        ));
    }
}
