//! Typed column values for building listing INSERT / UPDATE statements with `QueryBuilder`.

use std::fmt::Display;

use chrono::NaiveDate;
use sqlx::query_builder::Separated;
use sqlx::{Postgres, QueryBuilder};

use super::models::ListingStatus;

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Text(Option<String>),
    BigInt(Option<i64>),
    Bool(bool),
    Date(Option<NaiveDate>),
    Status(ListingStatus),
}

/// A column name paired with the value to write
pub type Column = (&'static str, ColumnValue);

impl ColumnValue {
    /// Bind as one element of a `push_values` row
    pub fn bind_separated<'args, Sep: Display>(
        self,
        row: &mut Separated<'_, 'args, Postgres, Sep>,
    ) {
        match self {
            ColumnValue::Text(v) => row.push_bind(v),
            ColumnValue::BigInt(v) => row.push_bind(v),
            ColumnValue::Bool(v) => row.push_bind(v),
            ColumnValue::Date(v) => row.push_bind(v),
            ColumnValue::Status(v) => row.push_bind(v),
        };
    }

    pub fn bind(self, qb: &mut QueryBuilder<'_, Postgres>) {
        match self {
            ColumnValue::Text(v) => qb.push_bind(v),
            ColumnValue::BigInt(v) => qb.push_bind(v),
            ColumnValue::Bool(v) => qb.push_bind(v),
            ColumnValue::Date(v) => qb.push_bind(v),
            ColumnValue::Status(v) => qb.push_bind(v),
        };
    }
}

/// Trim and drop empty strings so blank form fields land as NULL
pub fn text(value: &Option<String>) -> ColumnValue {
    ColumnValue::Text(
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string),
    )
}

/// Prefix `https://` onto bare hostnames
pub fn url(value: &Option<String>) -> ColumnValue {
    match text(value) {
        ColumnValue::Text(Some(v)) => {
            let lowered = v.to_lowercase();
            if lowered.starts_with("http://") || lowered.starts_with("https://") {
                ColumnValue::Text(Some(v))
            } else {
                ColumnValue::Text(Some(format!("https://{}", v)))
            }
        }
        other => other,
    }
}

/// Columns for the fields that are present; `urls` get a scheme
pub fn present_columns(
    texts: &[(&'static str, &Option<String>)],
    urls: &[(&'static str, &Option<String>)],
) -> Vec<Column> {
    let texts = texts
        .iter()
        .filter(|(_, value)| value.is_some())
        .map(|(name, value)| (*name, text(value)));
    let urls = urls
        .iter()
        .filter(|(_, value)| value.is_some())
        .map(|(name, value)| (*name, url(value)));
    texts.chain(urls).collect()
}

/// `SET a = $1, b = $2, ...` for the given columns; returns false when there is nothing to set
pub fn push_assignments(qb: &mut QueryBuilder<'_, Postgres>, columns: Vec<Column>) -> bool {
    let mut any = false;
    for (name, value) in columns {
        qb.push(if any { ", " } else { " " });
        qb.push(name).push(" = ");
        value.bind(qb);
        any = true;
    }
    any
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_blank_is_null() {
        assert_eq!(text(&Some("   ".to_string())), ColumnValue::Text(None));
        assert_eq!(
            text(&Some(" Austin ".to_string())),
            ColumnValue::Text(Some("Austin".to_string()))
        );
        assert_eq!(text(&None), ColumnValue::Text(None));
    }

    #[test]
    fn test_url_gets_scheme() {
        assert_eq!(
            url(&Some("example.com".to_string())),
            ColumnValue::Text(Some("https://example.com".to_string()))
        );
        assert_eq!(
            url(&Some("HTTP://example.com".to_string())),
            ColumnValue::Text(Some("HTTP://example.com".to_string()))
        );
        assert_eq!(url(&Some("".to_string())), ColumnValue::Text(None));
    }

    #[test]
    fn test_present_columns_skip_absent() {
        let city = Some("Austin".to_string());
        let website = Some("acme.example".to_string());
        let columns = present_columns(
            &[("city", &city), ("state", &None)],
            &[("website", &website), ("works_for", &None)],
        );
        assert_eq!(
            columns,
            vec![
                ("city", ColumnValue::Text(Some("Austin".to_string()))),
                ("website", ColumnValue::Text(Some("https://acme.example".to_string()))),
            ]
        );
    }

    #[test]
    fn test_push_assignments_sql() {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE businesses SET");
        let any = push_assignments(
            &mut qb,
            vec![
                ("city", ColumnValue::Text(Some("Austin".to_string()))),
                ("is_premium", ColumnValue::Bool(true)),
            ],
        );
        assert!(any);
        assert_eq!(qb.sql(), "UPDATE businesses SET city = $1, is_premium = $2");
    }

    #[test]
    fn test_push_assignments_empty() {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE businesses SET");
        assert!(!push_assignments(&mut qb, vec![]));
    }
}
