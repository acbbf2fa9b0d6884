//! Relevance rules for blended search.
//!
//! One rule table drives both the SQL score expression (used for ordering)
//! and the in-process explanation attached to each hit, so the two cannot drift.
//! The name field scores only its best tier; every other rule adds independently.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};

use crate::features::listings::listing::SearchText;
use crate::features::listings::models::ListingKind;
use crate::shared::sql::{contains_pattern, prefix_pattern};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Secondary,
    Description,
    CategoryName,
    City,
    State,
    Zip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Test {
    Exact,
    Prefix,
    Contains,
}

#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub label: &'static str,
    pub field: Field,
    pub test: Test,
    pub points: i32,
}

/// Name tiers, best first; only the first matching tier counts
pub const NAME_TIERS: [Rule; 3] = [
    Rule { label: "name_exact", field: Field::Name, test: Test::Exact, points: 100 },
    Rule { label: "name_prefix", field: Field::Name, test: Test::Prefix, points: 60 },
    Rule { label: "name_contains", field: Field::Name, test: Test::Contains, points: 40 },
];

pub const ADDITIVE_RULES: [Rule; 6] = [
    Rule { label: "secondary", field: Field::Secondary, test: Test::Contains, points: 20 },
    Rule { label: "description", field: Field::Description, test: Test::Contains, points: 10 },
    Rule { label: "category", field: Field::CategoryName, test: Test::Contains, points: 5 },
    Rule { label: "city", field: Field::City, test: Test::Contains, points: 5 },
    Rule { label: "state", field: Field::State, test: Test::Contains, points: 5 },
    Rule { label: "zip", field: Field::Zip, test: Test::Contains, points: 5 },
];

impl Field {
    /// SQL expression for the field; listing rows are aliased `l`, categories `c`
    fn column(self, kind: ListingKind) -> String {
        match self {
            Field::Name => format!("l.{}", kind.name_column()),
            Field::Secondary => format!("l.{}", kind.secondary_column()),
            Field::Description => "l.description".to_string(),
            Field::CategoryName => "c.name".to_string(),
            Field::City => "l.city".to_string(),
            Field::State => "l.state".to_string(),
            Field::Zip => "l.zip".to_string(),
        }
    }

    fn value<'a>(self, text: &SearchText<'a>, category_name: Option<&'a str>) -> Option<&'a str> {
        match self {
            Field::Name => Some(text.name),
            Field::Secondary => text.secondary,
            Field::Description => text.description,
            Field::CategoryName => category_name,
            Field::City => text.city,
            Field::State => text.state,
            Field::Zip => text.zip,
        }
    }
}

impl Test {
    fn push_sql(self, qb: &mut QueryBuilder<'_, Postgres>, column: &str, q: &str) {
        match self {
            Test::Exact => {
                qb.push(format!("LOWER({}) = LOWER(", column))
                    .push_bind(q.to_string())
                    .push(")");
            }
            Test::Prefix => {
                qb.push(format!("{} ILIKE ", column))
                    .push_bind(prefix_pattern(q))
                    .push(" ESCAPE '\\'");
            }
            Test::Contains => {
                qb.push(format!("{} ILIKE ", column))
                    .push_bind(contains_pattern(q))
                    .push(" ESCAPE '\\'");
            }
        }
    }

    /// `q` must already be lowercase
    fn matches(self, value: &str, q: &str) -> bool {
        let value = value.to_lowercase();
        match self {
            Test::Exact => value == q,
            Test::Prefix => value.starts_with(q),
            Test::Contains => value.contains(q),
        }
    }
}

/// Append `(CASE ... END) + (CASE ... END) + ...` scoring `q` for this kind
pub fn push_score(qb: &mut QueryBuilder<'_, Postgres>, kind: ListingKind, q: &str) {
    qb.push("(CASE");
    for rule in NAME_TIERS {
        qb.push(" WHEN ");
        rule.test.push_sql(qb, &rule.field.column(kind), q);
        qb.push(format!(" THEN {}", rule.points));
    }
    qb.push(" ELSE 0 END)");

    for rule in ADDITIVE_RULES {
        qb.push(" + (CASE WHEN ");
        rule.test.push_sql(qb, &rule.field.column(kind), q);
        qb.push(format!(" THEN {} ELSE 0 END)", rule.points));
    }
}

/// Append `(a ILIKE $n OR b ILIKE $m ...)`: a record is a candidate when any
/// scored field, the category path, or a kind-specific identifier contains `q`
pub fn push_match(qb: &mut QueryBuilder<'_, Postgres>, kind: ListingKind, q: &str) {
    let mut columns: Vec<String> = std::iter::once(Field::Name)
        .chain(ADDITIVE_RULES.iter().map(|rule| rule.field))
        .map(|field| field.column(kind))
        .collect();
    columns.push("c.full_slug".to_string());
    columns.extend(kind.extra_match_columns().iter().map(|c| format!("l.{}", c)));

    qb.push("(");
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            qb.push(" OR ");
        }
        Test::Contains.push_sql(qb, column, q);
    }
    qb.push(")");
}

/// Score and contributing rule labels, evaluated in process
pub fn explain(text: &SearchText<'_>, category_name: Option<&str>, q: &str) -> (i32, Vec<&'static str>) {
    let q = q.trim().to_lowercase();
    if q.is_empty() {
        return (0, Vec::new());
    }

    let mut score = 0;
    let mut matched = Vec::new();

    let name_tier = NAME_TIERS.iter().find(|rule| rule.test.matches(text.name, &q));
    if let Some(rule) = name_tier {
        score += rule.points;
        matched.push(rule.label);
    }

    for rule in ADDITIVE_RULES {
        if let Some(value) = rule.field.value(text, category_name) {
            if rule.test.matches(value, &q) {
                score += rule.points;
                matched.push(rule.label);
            }
        }
    }

    (score, matched)
}

/// Ordering key shared by the per-kind SQL `ORDER BY` and the merge
#[derive(Debug, Clone, Copy)]
pub struct RankKey {
    pub rank: i32,
    pub is_premium: bool,
    pub average_rating: f64,
    pub updated_at: DateTime<Utc>,
    /// Unique within a kind so pages never reshuffle tied rows
    pub id: i64,
}

impl RankKey {
    /// Descending on every component
    pub fn cmp_desc(&self, other: &Self) -> Ordering {
        other
            .rank
            .cmp(&self.rank)
            .then_with(|| other.is_premium.cmp(&self.is_premium))
            .then_with(|| other.average_rating.total_cmp(&self.average_rating))
            .then_with(|| other.updated_at.cmp(&self.updated_at))
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// Merge two per-kind ranked prefixes and cut the requested page.
///
/// Each input must already hold its kind's first `offset + limit` rows.
/// The sort is stable, so ties keep businesses ahead of providers.
pub fn merge_ranked<H, F>(businesses: Vec<H>, providers: Vec<H>, key: F, offset: usize, limit: usize) -> Vec<H>
where
    F: Fn(&H) -> RankKey,
{
    let mut merged = businesses;
    merged.extend(providers);
    merged.sort_by(|a, b| key(a).cmp_desc(&key(b)));
    merged.into_iter().skip(offset).take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn text(name: &str) -> SearchText<'_> {
        SearchText {
            name,
            ..Default::default()
        }
    }

    #[test]
    fn test_exact_name_scores_best_tier_only() {
        assert_eq!(explain(&text("Smith"), None, "Smith"), (100, vec!["name_exact"]));
        assert_eq!(explain(&text("SMITH"), None, "smith").0, 100);
    }

    #[test]
    fn test_prefix_name() {
        assert_eq!(
            explain(&text("Smith & Associates"), None, "Smith"),
            (60, vec!["name_prefix"])
        );
    }

    #[test]
    fn test_substring_name() {
        assert_eq!(explain(&text("Jane Smith Law"), None, "smith").0, 40);
    }

    #[test]
    fn test_additive_fields() {
        let text = SearchText {
            name: "Smith",
            secondary: Some("Smith family law"),
            description: Some("Ask for Smith"),
            city: Some("Smithville"),
            state: Some("TX"),
            zip: None,
        };
        let (score, matched) = explain(&text, Some("Smiths"), "smith");
        assert_eq!(score, 100 + 20 + 10 + 5 + 5);
        assert_eq!(
            matched,
            vec!["name_exact", "secondary", "description", "category", "city"]
        );
    }

    #[test]
    fn test_blank_query_scores_zero() {
        assert_eq!(explain(&text("Smith"), None, "  "), (0, vec![]));
    }

    #[test]
    fn test_score_sql_shape() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        push_score(&mut qb, ListingKind::Provider, "smith");
        let sql = qb.sql();
        assert!(sql.starts_with(
            "SELECT (CASE WHEN LOWER(l.provider_name) = LOWER($1) THEN 100 \
             WHEN l.provider_name ILIKE $2 ESCAPE '\\' THEN 60"
        ));
        assert!(sql.contains("l.specialty ILIKE $4 ESCAPE '\\' THEN 20 ELSE 0 END)"));
        assert!(sql.contains("c.name ILIKE $6"));
    }

    #[test]
    fn test_match_sql_includes_kind_columns() {
        let mut qb = QueryBuilder::<Postgres>::new("");
        push_match(&mut qb, ListingKind::Provider, "123");
        assert!(qb.sql().contains("l.npi_number ILIKE"));
        assert!(qb.sql().contains("c.full_slug ILIKE"));

        let mut qb = QueryBuilder::<Postgres>::new("");
        push_match(&mut qb, ListingKind::Business, "123");
        assert!(qb.sql().contains("l.practice_areas ILIKE"));
        assert!(!qb.sql().contains("npi_number"));
    }

    #[derive(Debug, PartialEq)]
    struct Hit(&'static str, i32);

    fn key(hit: &Hit) -> RankKey {
        RankKey {
            rank: hit.1,
            is_premium: false,
            average_rating: 0.0,
            updated_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            id: 0,
        }
    }

    #[test]
    fn test_merge_first_page() {
        let page = merge_ranked(
            vec![Hit("business", 100), Hit("business", 60)],
            vec![Hit("provider", 80)],
            key,
            0,
            2,
        );
        assert_eq!(page, vec![Hit("business", 100), Hit("provider", 80)]);
    }

    #[test]
    fn test_merge_offset_page() {
        // each kind fetched offset + limit = 2 rows
        let page = merge_ranked(
            vec![Hit("business", 100), Hit("business", 60)],
            vec![Hit("provider", 80)],
            key,
            1,
            1,
        );
        assert_eq!(page, vec![Hit("provider", 80)]);
    }

    #[test]
    fn test_merge_ties_keep_businesses_first() {
        let page = merge_ranked(
            vec![Hit("business", 50)],
            vec![Hit("provider", 50)],
            key,
            0,
            10,
        );
        assert_eq!(page, vec![Hit("business", 50), Hit("provider", 50)]);
    }

    #[test]
    fn test_rank_key_tiebreakers() {
        let base = RankKey {
            rank: 10,
            is_premium: false,
            average_rating: 4.0,
            updated_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            id: 1,
        };
        let higher_id = RankKey { id: 2, ..base };
        let premium = RankKey { is_premium: true, ..base };
        let better = RankKey { average_rating: 4.5, ..base };
        let newer = RankKey {
            updated_at: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            ..base
        };
        assert_eq!(premium.cmp_desc(&base), Ordering::Less);
        assert_eq!(better.cmp_desc(&base), Ordering::Less);
        assert_eq!(newer.cmp_desc(&base), Ordering::Less);
        assert_eq!(higher_id.cmp_desc(&base), Ordering::Less);
        assert_eq!(base.cmp_desc(&base), Ordering::Equal);
    }
}
