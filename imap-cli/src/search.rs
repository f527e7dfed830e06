//! Search filter compilation
//!
//! Turns the `search` command's filters into a [`SearchExpression`]: an AND
//! of leaf predicates, with subject-or-body grouping for free text. The
//! expression renders to IMAP `SEARCH` syntax and can also be evaluated
//! against a message in memory.

use crate::error::{MailError, Result};
use chrono::NaiveDate;

/// Expected shape of `--after` / `--before`
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// User-supplied search filters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    /// Matched against subject OR body
    pub query: Option<String>,
    pub from: Option<String>,
    pub subject: Option<String>,
    /// Inclusive lower bound
    pub after: Option<NaiveDate>,
    /// Exclusive upper bound
    pub before: Option<NaiveDate>,
}

impl FilterSet {
    /// Build a filter set from raw command arguments, validating dates.
    ///
    /// Blank strings are treated as absent.
    pub fn from_args(
        query: Option<&str>,
        from: Option<&str>,
        subject: Option<&str>,
        after: Option<&str>,
        before: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            query: search_text("search text", query)?,
            from: search_text("--from", from)?,
            subject: search_text("--subject", subject)?,
            after: non_blank(after).map(|d| parse_date(&d)).transpose()?,
            before: non_blank(before).map(|d| parse_date(&d)).transpose()?,
        })
    }

    /// Compile into a search expression; one conjunct per set field
    pub fn compile(&self) -> SearchExpression {
        let mut terms = Vec::new();

        if let Some(query) = &self.query {
            terms.push(SearchExpression::Or(
                Box::new(SearchExpression::Subject(query.clone())),
                Box::new(SearchExpression::Body(query.clone())),
            ));
        }
        if let Some(from) = &self.from {
            terms.push(SearchExpression::From(from.clone()));
        }
        if let Some(subject) = &self.subject {
            terms.push(SearchExpression::Subject(subject.clone()));
        }
        if let Some(after) = self.after {
            terms.push(SearchExpression::Since(after));
        }
        if let Some(before) = self.before {
            terms.push(SearchExpression::Before(before));
        }

        if terms.is_empty() {
            SearchExpression::All
        } else {
            SearchExpression::And(terms)
        }
    }
}

/// Parse a `YYYY-MM-DD` calendar date
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| MailError::InvalidDate(raw.to_string()))
}

/// Whether `text` can go inside an IMAP quoted string
pub fn is_quotable(text: &str) -> bool {
    !text.contains(|c: char| matches!(c, '\r' | '\n' | '\0'))
}

fn search_text(field: &str, value: Option<&str>) -> Result<Option<String>> {
    match non_blank(value) {
        Some(text) if !is_quotable(&text) => Err(MailError::Validation(format!(
            "{} must not contain line breaks or NUL characters",
            field
        ))),
        text => Ok(text),
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Compiled search criteria
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchExpression {
    /// ALL - every message in the folder
    All,
    /// Conjunction of terms
    And(Vec<SearchExpression>),
    /// Disjunction of two terms
    Or(Box<SearchExpression>, Box<SearchExpression>),
    /// SUBJECT string
    Subject(String),
    /// BODY string
    Body(String),
    /// FROM string
    From(String),
    /// SINCE date - on or after
    Since(NaiveDate),
    /// BEFORE date - strictly before
    Before(NaiveDate),
}

/// Message fields an expression is evaluated against
#[derive(Debug, Clone, Copy)]
pub struct MatchTarget<'a> {
    pub subject: &'a str,
    pub from: &'a str,
    pub body: &'a str,
    pub date: Option<NaiveDate>,
}

impl SearchExpression {
    /// Render as IMAP SEARCH criteria (RFC 3501 section 6.4.4)
    pub fn to_imap(&self) -> String {
        match self {
            SearchExpression::All => "ALL".to_string(),
            SearchExpression::And(terms) if terms.is_empty() => "ALL".to_string(),
            SearchExpression::And(terms) => terms
                .iter()
                .map(|term| match term {
                    // A nested AND needs parentheses to stay one search key
                    SearchExpression::And(inner) if inner.len() > 1 => {
                        format!("({})", term.to_imap())
                    }
                    _ => term.to_imap(),
                })
                .collect::<Vec<_>>()
                .join(" "),
            SearchExpression::Or(left, right) => {
                format!("OR {} {}", left.to_imap_key(), right.to_imap_key())
            }
            SearchExpression::Subject(text) => format!("SUBJECT {}", quote(text)),
            SearchExpression::Body(text) => format!("BODY {}", quote(text)),
            SearchExpression::From(text) => format!("FROM {}", quote(text)),
            SearchExpression::Since(date) => format!("SINCE {}", imap_date(*date)),
            SearchExpression::Before(date) => format!("BEFORE {}", imap_date(*date)),
        }
    }

    fn to_imap_key(&self) -> String {
        match self {
            SearchExpression::And(terms) if terms.len() > 1 => format!("({})", self.to_imap()),
            _ => self.to_imap(),
        }
    }

    /// Evaluate against a message the way an IMAP server would:
    /// case-insensitive substring matching and date-only comparisons.
    pub fn matches(&self, target: &MatchTarget<'_>) -> bool {
        match self {
            SearchExpression::All => true,
            SearchExpression::And(terms) => terms.iter().all(|term| term.matches(target)),
            SearchExpression::Or(left, right) => left.matches(target) || right.matches(target),
            SearchExpression::Subject(text) => contains_ignore_case(target.subject, text),
            SearchExpression::Body(text) => contains_ignore_case(target.body, text),
            SearchExpression::From(text) => contains_ignore_case(target.from, text),
            SearchExpression::Since(date) => target.date.map_or(false, |d| d >= *date),
            SearchExpression::Before(date) => target.date.map_or(false, |d| d < *date),
        }
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// IMAP quoted string
fn quote(text: &str) -> String {
    let escaped = text.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

/// IMAP date: `1-Jan-2024`
fn imap_date(date: NaiveDate) -> String {
    date.format("%-d-%b-%Y").to_string()
}
