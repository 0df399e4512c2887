//! Query parser
//!
//! Splits a query into columns at top-level whitespace, then each column
//! into a primary, multiplicative `[...]` select clauses, and retained
//! `(...)` filter clauses. Unbalanced brackets are malformed; empty
//! clauses parse but select nothing.

use tally_common::{Error, Result};

/// A single attribute term: `#id`, `name`, or `name=value`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryAttr {
    pub key: String,
    pub value: Option<String>,
}

/// The leading selector of a column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Primary {
    /// `#id`: a specific set
    Id(String),
    /// `type`: every set of a type
    Type(String),
}

/// One parsed column
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionQuery {
    pub primary: Option<Primary>,
    /// `[...]` clauses; each multiplies the selection
    pub selects: Vec<Vec<QueryAttr>>,
    /// `(...)` attrs; applied after intersection
    pub filters: Vec<QueryAttr>,
}

fn malformed(reason: impl Into<String>) -> Error {
    Error::MalformedQuery {
        reason: reason.into(),
    }
}

/// Split a query into column strings at top-level whitespace
fn split_columns(query: &str) -> Result<Vec<String>> {
    let mut columns = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    for ch in query.chars() {
        match ch {
            '[' | '(' => {
                depth += 1;
                current.push(ch);
            }
            ']' | ')' => {
                depth -= 1;
                if depth < 0 {
                    return Err(malformed(format!("unopened '{ch}'")));
                }
                current.push(ch);
            }
            c if c.is_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    columns.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if depth != 0 {
        return Err(malformed("unbalanced brackets"));
    }
    if !current.is_empty() {
        columns.push(current);
    }
    Ok(columns)
}

/// Parse a comma-separated attribute list
fn parse_attr_list(raw: &str) -> Vec<QueryAttr> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            if let Some(id) = part.strip_prefix('#') {
                return QueryAttr {
                    key: "id".to_string(),
                    value: Some(id.trim().to_string()),
                };
            }
            match part.split_once('=') {
                Some((key, value)) => QueryAttr {
                    key: key.trim().to_string(),
                    value: Some(value.trim().to_string()),
                },
                None => QueryAttr {
                    key: part.to_string(),
                    value: None,
                },
            }
        })
        .collect()
}

/// Parse one column
fn parse_column(column: &str) -> Result<SelectionQuery> {
    let mut query = SelectionQuery::default();
    let mut chars = column.char_indices().peekable();

    // Primary runs until the first clause opener
    let clause_start = column
        .find(|c| c == '[' || c == '(')
        .unwrap_or(column.len());
    let head = column[..clause_start].trim();
    if !head.is_empty() {
        query.primary = Some(match head.strip_prefix('#') {
            Some(id) => Primary::Id(id.to_string()),
            None => Primary::Type(head.to_string()),
        });
    }
    while let Some(&(index, ch)) = chars.peek() {
        if index < clause_start {
            chars.next();
            continue;
        }
        match ch {
            '[' | '(' => {
                let close = if ch == '[' { ']' } else { ')' };
                chars.next();
                let mut body = String::new();
                let mut closed = false;
                for (_, inner) in chars.by_ref() {
                    if inner == close {
                        closed = true;
                        break;
                    }
                    if inner == '[' || inner == '(' {
                        return Err(malformed(format!("nested '{inner}' clause")));
                    }
                    body.push(inner);
                }
                if !closed {
                    return Err(malformed(format!("missing '{close}'")));
                }
                let attrs = parse_attr_list(&body);
                if ch == '[' {
                    query.selects.push(attrs);
                } else {
                    query.filters.extend(attrs);
                }
            }
            other => {
                return Err(malformed(format!(
                    "unexpected '{other}' between clauses"
                )));
            }
        }
    }
    Ok(query)
}

/// Parse a whole intersection query into its columns
pub fn parse(query: &str) -> Result<Vec<SelectionQuery>> {
    split_columns(query)?
        .iter()
        .map(|column| parse_column(column))
        .collect()
}

/// Split a `"a.b.c"` path into its set ids
pub fn parse_path(path: &str) -> Vec<String> {
    path.split('.')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}
