//! Explain output for resolved queries
//!
//! Deterministic, human-readable description of how a fetch reads the store.

use std::fmt;

use super::errors::RetrieveError;
use super::query::DatabaseQuery;

/// How a fetch reads its range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// One transaction per page
    Streaming { page_size: usize },
    /// One transaction for the whole range
    Materialized,
}

impl FetchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchMode::Streaming { .. } => "STREAMING",
            FetchMode::Materialized => "MATERIALIZED",
        }
    }
}

/// Explain output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplainQuery {
    /// Whether resolution succeeded
    pub accepted: bool,
    pub store: String,
    pub mode: Option<FetchMode>,
    /// Scanned index, `None` for a primary key scan
    pub index: Option<String>,
    /// Key range, `None` for the whole index
    pub key: Option<String>,
    pub direction: Option<&'static str>,
    pub fallback: bool,
    pub post_filter: bool,
    /// Rejection error code (if rejected)
    pub rejection_code: Option<String>,
    /// Rejection reason (if rejected)
    pub rejection_reason: Option<String>,
}

impl ExplainQuery {
    /// Creates explain output for a resolved query
    pub fn from_query<T>(store: &str, query: &DatabaseQuery<T>, mode: FetchMode) -> Self {
        Self {
            accepted: true,
            store: store.to_string(),
            mode: Some(mode),
            index: query.index_name.clone(),
            key: query.key.as_ref().map(|k| k.to_string()),
            direction: Some(query.direction().as_str()),
            fallback: query.fallback.is_some(),
            post_filter: query.post_filter.is_some(),
            rejection_code: None,
            rejection_reason: None,
        }
    }

    /// Creates explain output for a query that failed to resolve
    pub fn from_error(store: &str, err: &RetrieveError) -> Self {
        Self {
            accepted: false,
            store: store.to_string(),
            mode: None,
            index: None,
            key: None,
            direction: None,
            fallback: false,
            post_filter: false,
            rejection_code: Some(err.code().code().to_string()),
            rejection_reason: Some(err.message().to_string()),
        }
    }

    /// Flattened fields for one log line
    pub fn log_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![("store", self.store.clone())];
        if let Some(mode) = self.mode {
            fields.push(("mode", mode.as_str().to_string()));
            if let FetchMode::Streaming { page_size } = mode {
                fields.push(("page_size", page_size.to_string()));
            }
        }
        if self.accepted {
            fields.push((
                "index",
                self.index.clone().unwrap_or_else(|| "PRIMARY".to_string()),
            ));
            if let Some(key) = &self.key {
                fields.push(("key", key.clone()));
            }
            if let Some(direction) = self.direction {
                fields.push(("direction", direction.to_string()));
            }
            fields.push(("fallback", self.fallback.to_string()));
            fields.push(("post_filter", self.post_filter.to_string()));
        }
        if let Some(code) = &self.rejection_code {
            fields.push(("code", code.clone()));
        }
        if let Some(reason) = &self.rejection_reason {
            fields.push(("reason", reason.clone()));
        }
        fields
    }
}

impl fmt::Display for ExplainQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== EXPLAIN FETCH ===")?;
        writeln!(f, "Store: {}", self.store)?;

        if self.accepted {
            writeln!(f, "Status: ACCEPTED")?;
            if let Some(mode) = self.mode {
                writeln!(f, "Mode: {}", mode.as_str())?;
                if let FetchMode::Streaming { page_size } = mode {
                    writeln!(f, "Page Size: {}", page_size)?;
                }
            }
            match &self.index {
                Some(index) => writeln!(f, "Index: {}", index)?,
                None => writeln!(f, "Index: PRIMARY")?,
            }
            match &self.key {
                Some(key) => writeln!(f, "Key: {}", key)?,
                None => writeln!(f, "Key: ALL")?,
            }
            if let Some(direction) = self.direction {
                writeln!(f, "Direction: {}", direction)?;
            }
            if self.fallback {
                writeln!(f, "Fallback Sort: per run")?;
            }
            if self.post_filter {
                writeln!(f, "Post Filter: yes")?;
            }
        } else {
            writeln!(f, "Status: REJECTED")?;
            if let Some(code) = &self.rejection_code {
                writeln!(f, "Error Code: {}", code)?;
            }
            if let Some(reason) = &self.rejection_reason {
                writeln!(f, "Reason: {}", reason)?;
            }
        }

        Ok(())
    }
}
