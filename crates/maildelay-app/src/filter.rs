// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use regex::{Regex, RegexBuilder};

use crate::model::MailRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    Regex,
    /// The query was not a valid pattern and is matched as literal text.
    Literal,
}

/// Case-insensitive row filter compiled from the search field.
#[derive(Debug, Clone)]
pub struct SearchFilter {
    query: String,
    pattern: Option<Regex>,
    kind: PatternKind,
}

impl Default for SearchFilter {
    fn default() -> Self {
        Self::compile("")
    }
}

impl SearchFilter {
    pub fn compile(query: &str) -> Self {
        match build_case_insensitive(query) {
            Ok(pattern) => Self {
                query: query.to_owned(),
                pattern: Some(pattern),
                kind: PatternKind::Regex,
            },
            Err(error) => {
                tracing::debug!(%error, query, "search query is not a valid pattern; matching literally");
                Self {
                    query: query.to_owned(),
                    pattern: build_case_insensitive(&regex::escape(query)).ok(),
                    kind: PatternKind::Literal,
                }
            }
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_empty()
    }

    pub fn matches(&self, row: &MailRow) -> bool {
        match &self.pattern {
            Some(pattern) => pattern.is_match(&row.search_text()),
            None => false,
        }
    }

    pub fn visible<'a>(&self, rows: &'a [MailRow]) -> Vec<&'a MailRow> {
        rows.iter().filter(|row| self.matches(row)).collect()
    }
}

fn build_case_insensitive(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}
