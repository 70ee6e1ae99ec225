//! FTS5 query shaping and execution.
//!
//! # Invariants
//! - Plain text terms are quoted and AND-joined, so user text never reaches
//!   FTS5 as syntax unless `raw_fts_syntax` is set.
//! - Ordering is deterministic by rank, then `last_modified_time DESC`, then `ref_id`.

use super::{SearchError, SearchResult};
use crate::db::DbError;
use crate::model::framework::{EntityId, Timestamp};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};

#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub text: String,
    /// Empty means every kind.
    pub entity_kinds: Vec<String>,
    pub include_archived: bool,
    pub limit: u32,
    pub raw_fts_syntax: bool,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            entity_kinds: Vec::new(),
            include_archived: false,
            limit: 20,
            raw_fts_syntax: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub entity_kind: String,
    pub ref_id: EntityId,
    pub name: String,
    pub snippet: String,
    pub archived: bool,
    pub created_time: Timestamp,
    pub last_modified_time: Timestamp,
    pub archived_time: Option<Timestamp>,
}

pub(super) fn search_workspace(
    conn: &Connection,
    workspace_ref_id: EntityId,
    query: &SearchQuery,
) -> SearchResult<Vec<SearchHit>> {
    let Some(match_expr) = build_match_expression(query) else {
        return Ok(Vec::new());
    };
    if query.limit == 0 {
        return Ok(Vec::new());
    }

    let mut sql = String::from(
        "SELECT
            e.entity_kind AS entity_kind,
            e.ref_id AS ref_id,
            e.name AS name,
            snippet(search_fts, 0, '[', ']', ' ... ', 10) AS snippet,
            e.archived AS archived,
            e.created_time AS created_time,
            e.last_modified_time AS last_modified_time,
            e.archived_time AS archived_time
         FROM search_fts
         JOIN search_entries e ON e.id = search_fts.rowid
         WHERE search_fts MATCH ?
           AND e.workspace_ref_id = ?",
    );
    let mut bind_values = vec![
        Value::Text(match_expr.clone()),
        Value::Integer(workspace_ref_id.as_i64()),
    ];
    if !query.include_archived {
        sql.push_str(" AND e.archived = 0");
    }
    if !query.entity_kinds.is_empty() {
        let placeholders = vec!["?"; query.entity_kinds.len()].join(", ");
        sql.push_str(&format!(" AND e.entity_kind IN ({placeholders})"));
        bind_values.extend(query.entity_kinds.iter().cloned().map(Value::Text));
    }
    sql.push_str(" ORDER BY bm25(search_fts), e.last_modified_time DESC, e.ref_id ASC LIMIT ?");
    bind_values.push(Value::Integer(i64::from(query.limit)));

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt
        .query(params_from_iter(bind_values))
        .map_err(|err| map_query_error(err, &match_expr))?;
    let mut hits = Vec::new();
    while let Some(row) = rows.next().map_err(|err| map_query_error(err, &match_expr))? {
        hits.push(parse_search_hit(row)?);
    }
    Ok(hits)
}

fn parse_search_hit(row: &Row<'_>) -> SearchResult<SearchHit> {
    let parse_time = |raw: String| {
        raw.parse::<Timestamp>()
            .map_err(|_| SearchError::InvalidData(format!("invalid timestamp `{raw}`")))
    };
    let archived_time = match row.get::<_, Option<String>>("archived_time")? {
        Some(raw) => Some(parse_time(raw)?),
        None => None,
    };
    Ok(SearchHit {
        entity_kind: row.get("entity_kind")?,
        ref_id: EntityId::from_raw(row.get("ref_id")?),
        name: row.get("name")?,
        snippet: row.get("snippet")?,
        archived: row.get::<_, i64>("archived")? == 1,
        created_time: parse_time(row.get("created_time")?)?,
        last_modified_time: parse_time(row.get("last_modified_time")?)?,
        archived_time,
    })
}

fn build_match_expression(query: &SearchQuery) -> Option<String> {
    let text = query.text.trim();
    if text.is_empty() {
        return None;
    }
    if query.raw_fts_syntax {
        return Some(text.to_string());
    }
    let terms = text.split_whitespace().map(escape_fts_term).collect::<Vec<_>>();
    if terms.is_empty() {
        return None;
    }
    Some(terms.join(" AND "))
}

fn escape_fts_term(raw: &str) -> String {
    format!("\"{}\"", raw.replace('"', "\"\""))
}

fn map_query_error(err: rusqlite::Error, query: &str) -> SearchError {
    if is_match_syntax_error(&err) {
        return SearchError::InvalidQuery {
            query: query.to_string(),
            message: err.to_string(),
        };
    }
    SearchError::Db(DbError::Sqlite(err))
}

fn is_match_syntax_error(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(message)) => {
            let msg = message.to_lowercase();
            (msg.contains("fts5") && msg.contains("syntax"))
                || msg.contains("malformed match expression")
                || msg.contains("unterminated")
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::{build_match_expression, SearchQuery};

    #[test]
    fn plain_terms_are_quoted_and_joined() {
        let query = SearchQuery::new(r#"  buy "milk  "#);
        assert_eq!(
            build_match_expression(&query).as_deref(),
            Some(r#""buy" AND """milk""#)
        );
    }

    #[test]
    fn raw_syntax_passes_through() {
        let mut query = SearchQuery::new("buy OR sell");
        query.raw_fts_syntax = true;
        assert_eq!(build_match_expression(&query).as_deref(), Some("buy OR sell"));
    }
}
