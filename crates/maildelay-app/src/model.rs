// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::ids::MailId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Popover {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailRow {
    pub id: MailId,
    pub subject: String,
    pub sent: String,
    pub due: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popover: Option<Popover>,
}

impl MailRow {
    /// Text the search filter runs against: subject, sent and due joined by
    /// single spaces.
    pub fn search_text(&self) -> String {
        format!("{} {} {}", self.subject, self.sent, self.due)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListMutation {
    Replace {
        fragment: String,
        rows: Vec<MailRow>,
    },
    PatchDue {
        id: MailId,
        due: String,
    },
    Remove {
        id: MailId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListChange {
    Replaced { rows: usize },
    DuePatched { id: MailId },
    Removed { id: MailId },
    Unchanged,
}

/// The displayed mail list. Everything that changes what the user sees goes
/// through [`MailList::apply`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MailList {
    fragment: String,
    rows: Vec<MailRow>,
}

impl MailList {
    pub fn apply(&mut self, mutation: ListMutation) -> ListChange {
        match mutation {
            ListMutation::Replace { fragment, rows } => {
                let count = rows.len();
                self.fragment = fragment;
                self.rows = rows;
                ListChange::Replaced { rows: count }
            }
            ListMutation::PatchDue { id, due } => {
                match self.rows.iter_mut().find(|row| row.id == id) {
                    Some(row) => {
                        row.due = due;
                        ListChange::DuePatched { id }
                    }
                    None => ListChange::Unchanged,
                }
            }
            ListMutation::Remove { id } => {
                let before = self.rows.len();
                self.rows.retain(|row| row.id != id);
                if self.rows.len() == before {
                    ListChange::Unchanged
                } else {
                    ListChange::Removed { id }
                }
            }
        }
    }

    pub fn rows(&self) -> &[MailRow] {
        &self.rows
    }

    pub fn row(&self, id: MailId) -> Option<&MailRow> {
        self.rows.iter().find(|row| row.id == id)
    }

    /// Markup of the last successful refresh, as fetched.
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
