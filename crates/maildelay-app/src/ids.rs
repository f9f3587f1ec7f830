// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MailId(i64);

impl MailId {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> i64 {
        self.0
    }

    /// Reads the id out of a row's `id` attribute. The server renders either a
    /// bare number (`42`) or a prefixed one (`mail-42`); the trailing digits win.
    pub fn from_row_attr(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let digits_start = trimmed
            .char_indices()
            .rev()
            .take_while(|(_, ch)| ch.is_ascii_digit())
            .last()
            .map(|(index, _)| index)?;
        trimmed[digits_start..].parse().ok().map(Self)
    }
}

impl From<i64> for MailId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for MailId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::MailId;

    #[test]
    fn row_attr_accepts_bare_and_prefixed_ids() {
        assert_eq!(MailId::from_row_attr("42"), Some(MailId::new(42)));
        assert_eq!(MailId::from_row_attr("mail-42"), Some(MailId::new(42)));
        assert_eq!(MailId::from_row_attr(" row_7 "), Some(MailId::new(7)));
    }

    #[test]
    fn row_attr_without_trailing_digits_is_rejected() {
        assert_eq!(MailId::from_row_attr(""), None);
        assert_eq!(MailId::from_row_attr("mail"), None);
        assert_eq!(MailId::from_row_attr("42-mail"), None);
    }
}
