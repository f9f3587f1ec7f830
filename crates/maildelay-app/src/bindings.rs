// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeSet;

use crate::ids::MailId;
use crate::model::MailRow;

/// Interactive widgets attached to the current list: one popover per row that
/// opts into one, plus the search field's keystroke listener.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WidgetBindings {
    popovers: BTreeSet<MailId>,
    search_armed: bool,
    initializations: u64,
}

impl WidgetBindings {
    /// Tears down every existing binding and attaches fresh ones for `rows`.
    /// Safe to call any number of times.
    pub fn initialize(&mut self, rows: &[MailRow]) {
        self.popovers.clear();
        self.popovers.extend(
            rows.iter()
                .filter(|row| row.popover.is_some())
                .map(|row| row.id),
        );
        self.search_armed = true;
        self.initializations = self.initializations.saturating_add(1);
    }

    pub fn popover_bound(&self, id: MailId) -> bool {
        self.popovers.contains(&id)
    }

    pub fn popover_count(&self) -> usize {
        self.popovers.len()
    }

    pub fn search_armed(&self) -> bool {
        self.search_armed
    }

    pub fn search_listener_count(&self) -> usize {
        usize::from(self.search_armed)
    }

    pub fn initializations(&self) -> u64 {
        self.initializations
    }
}
