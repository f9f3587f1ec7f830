// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::Date;
use time::macros::format_description;

use crate::bindings::WidgetBindings;
use crate::filter::SearchFilter;
use crate::fragment::parse_fragment;
use crate::ids::MailId;
use crate::model::{ListChange, ListMutation, MailList, MailRow, Popover};
use crate::refresh::{SuppressionReason, TickConditions, TickDecision};
use crate::request::{BackendRequest, RequestFailure};

/// Page lifecycle. Once unloading, failures are no longer reported and late
/// responses are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Running,
    Unloading,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Nav,
    Search,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    DatePicker,
    Popover,
    ConfirmDelete,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatePickerState {
    pub mail_id: MailId,
    pub subject: String,
    pub original: String,
    pub selected: Date,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopoverState {
    pub mail_id: MailId,
    pub popover: Popover,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmDeleteState {
    pub mail_id: MailId,
    pub subject: String,
    pub pending: bool,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub lifecycle: Lifecycle,
    pub mode: AppMode,
    pub selected: usize,
    pub date_picker: Option<DatePickerState>,
    pub popover: Option<PopoverState>,
    pub modal: Option<ConfirmDeleteState>,
    pub help_visible: bool,
    pub status_line: Option<String>,
    list: MailList,
    bindings: WidgetBindings,
    search: SearchFilter,
    refresh_in_flight: bool,
    refreshes: u64,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            lifecycle: Lifecycle::Running,
            mode: AppMode::Nav,
            selected: 0,
            date_picker: None,
            popover: None,
            modal: None,
            help_visible: false,
            status_line: None,
            list: MailList::default(),
            bindings: WidgetBindings::default(),
            search: SearchFilter::default(),
            refresh_in_flight: false,
            refreshes: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    Load,
    RefreshTick,
    TableFetched(Result<String, RequestFailure>),
    MoveSelection(isize),
    JumpFirstRow,
    JumpLastRow,
    FocusSearch,
    BlurSearch,
    SearchInput(char),
    SearchBackspace,
    ClearSearch,
    OpenDatePicker { today: Date },
    MoveDatePicker(Date),
    CommitDatePicker,
    CancelDatePicker,
    DueUpdated {
        id: MailId,
        due: String,
        result: Result<(), RequestFailure>,
    },
    OpenPopover,
    ClosePopover,
    RequestDelete,
    ConfirmDelete,
    CancelDelete,
    MailDeleted {
        id: MailId,
        result: Result<(), RequestFailure>,
    },
    ToggleHelp,
    BeginUnload,
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    RequestIssued(BackendRequest),
    RefreshSkipped(SuppressionReason),
    ListReplaced { rows: usize },
    DuePatched { id: MailId, due: String },
    MailRemoved { id: MailId },
    Initialized { count: u64 },
    SelectionMoved(usize),
    SearchChanged { visible: usize },
    ModeChanged(AppMode),
    OverlayOpened(Overlay),
    OverlayClosed(Overlay),
    ModalDismissed,
    LifecycleChanged(Lifecycle),
    Notified(String),
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn list(&self) -> &MailList {
        &self.list
    }

    pub fn bindings(&self) -> &WidgetBindings {
        &self.bindings
    }

    pub fn search(&self) -> &SearchFilter {
        &self.search
    }

    pub fn refresh_in_flight(&self) -> bool {
        self.refresh_in_flight
    }

    /// Number of refreshes that replaced the list.
    pub fn refreshes(&self) -> u64 {
        self.refreshes
    }

    pub fn visible_rows(&self) -> Vec<&MailRow> {
        self.search.visible(self.list.rows())
    }

    pub fn selected_row(&self) -> Option<&MailRow> {
        self.visible_rows().get(self.selected).copied()
    }

    pub fn tick_conditions(&self) -> TickConditions {
        TickConditions {
            date_picker_visible: self.date_picker.is_some(),
            search_active: !self.search.is_empty(),
            popover_visible: self.popover.is_some(),
            refresh_in_flight: self.refresh_in_flight,
        }
    }

    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::Load => {
                let mut events = self.initialize();
                events.extend(self.issue_refresh());
                events
            }
            AppCommand::RefreshTick => self.refresh_tick(),
            AppCommand::TableFetched(result) => self.table_fetched(result),
            AppCommand::MoveSelection(delta) => self.move_selection(delta),
            AppCommand::JumpFirstRow => {
                self.selected = 0;
                vec![AppEvent::SelectionMoved(self.selected)]
            }
            AppCommand::JumpLastRow => {
                self.selected = self.visible_rows().len().saturating_sub(1);
                vec![AppEvent::SelectionMoved(self.selected)]
            }
            AppCommand::FocusSearch => {
                self.mode = AppMode::Search;
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::BlurSearch => {
                self.mode = AppMode::Nav;
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::SearchInput(ch) => {
                let mut query = self.search.query().to_owned();
                query.push(ch);
                self.update_search(&query)
            }
            AppCommand::SearchBackspace => {
                let mut query = self.search.query().to_owned();
                query.pop();
                self.update_search(&query)
            }
            AppCommand::ClearSearch => {
                let mut events = self.update_search("");
                if self.mode == AppMode::Search {
                    self.mode = AppMode::Nav;
                    events.push(AppEvent::ModeChanged(self.mode));
                }
                events
            }
            AppCommand::OpenDatePicker { today } => self.open_date_picker(today),
            AppCommand::MoveDatePicker(date) => {
                if let Some(picker) = self.date_picker.as_mut() {
                    picker.selected = date;
                }
                Vec::new()
            }
            AppCommand::CommitDatePicker => self.commit_date_picker(),
            AppCommand::CancelDatePicker => {
                if self.date_picker.take().is_some() {
                    vec![
                        AppEvent::OverlayClosed(Overlay::DatePicker),
                        self.set_status("date edit canceled"),
                    ]
                } else {
                    Vec::new()
                }
            }
            AppCommand::DueUpdated { id, due, result } => self.due_updated(id, due, result),
            AppCommand::OpenPopover => self.open_popover(),
            AppCommand::ClosePopover => {
                if self.popover.take().is_some() {
                    vec![AppEvent::OverlayClosed(Overlay::Popover)]
                } else {
                    Vec::new()
                }
            }
            AppCommand::RequestDelete => self.request_delete(),
            AppCommand::ConfirmDelete => self.confirm_delete(),
            AppCommand::CancelDelete => {
                if self.modal.take().is_some() {
                    vec![AppEvent::OverlayClosed(Overlay::ConfirmDelete)]
                } else {
                    Vec::new()
                }
            }
            AppCommand::MailDeleted { id, result } => self.mail_deleted(id, result),
            AppCommand::ToggleHelp => {
                self.help_visible = !self.help_visible;
                if self.help_visible {
                    vec![AppEvent::OverlayOpened(Overlay::Help)]
                } else {
                    vec![AppEvent::OverlayClosed(Overlay::Help)]
                }
            }
            AppCommand::BeginUnload => {
                if self.lifecycle == Lifecycle::Unloading {
                    return Vec::new();
                }
                self.lifecycle = Lifecycle::Unloading;
                tracing::info!("unloading; request failures will no longer be reported");
                vec![AppEvent::LifecycleChanged(self.lifecycle)]
            }
            AppCommand::SetStatus(message) => vec![self.set_status(&message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    fn initialize(&mut self) -> Vec<AppEvent> {
        self.bindings.initialize(self.list.rows());
        vec![AppEvent::Initialized {
            count: self.bindings.initializations(),
        }]
    }

    fn issue_refresh(&mut self) -> Vec<AppEvent> {
        self.refresh_in_flight = true;
        vec![AppEvent::RequestIssued(BackendRequest::FetchTable)]
    }

    fn refresh_tick(&mut self) -> Vec<AppEvent> {
        if self.lifecycle == Lifecycle::Unloading {
            return Vec::new();
        }
        match self.tick_conditions().decide() {
            TickDecision::Fetch => {
                tracing::debug!("refresh tick: fetching table");
                self.issue_refresh()
            }
            TickDecision::Skip(reason) => {
                tracing::debug!(reason = reason.as_str(), "refresh tick skipped");
                vec![AppEvent::RefreshSkipped(reason)]
            }
        }
    }

    fn table_fetched(&mut self, result: Result<String, RequestFailure>) -> Vec<AppEvent> {
        self.refresh_in_flight = false;
        if self.lifecycle == Lifecycle::Unloading {
            return Vec::new();
        }

        let markup = match result {
            Ok(markup) => markup,
            Err(failure) => return self.report_failure(&failure),
        };
        let rows = match parse_fragment(&markup) {
            Ok(rows) => rows,
            Err(error) => {
                return self.report_failure(&RequestFailure::Decode {
                    message: error.to_string(),
                });
            }
        };

        let mut events = Vec::new();
        if let ListChange::Replaced { rows } = self.list.apply(ListMutation::Replace {
            fragment: markup,
            rows,
        }) {
            events.push(AppEvent::ListReplaced { rows });
        }
        self.refreshes = self.refreshes.saturating_add(1);
        events.extend(self.initialize());
        events.extend(self.close_orphaned_overlays());
        self.clamp_selection();
        events
    }

    // A fetch issued before an overlay opened can land while it is still up.
    // Overlays whose row disappeared with that refresh are closed.
    fn close_orphaned_overlays(&mut self) -> Vec<AppEvent> {
        let mut events = Vec::new();
        if let Some(picker) = &self.date_picker
            && self.list.row(picker.mail_id).is_none()
        {
            self.date_picker = None;
            events.push(AppEvent::OverlayClosed(Overlay::DatePicker));
        }
        if let Some(popover) = &self.popover
            && !self.bindings.popover_bound(popover.mail_id)
        {
            self.popover = None;
            events.push(AppEvent::OverlayClosed(Overlay::Popover));
        }
        if let Some(modal) = &self.modal
            && !modal.pending
            && self.list.row(modal.mail_id).is_none()
        {
            self.modal = None;
            events.push(AppEvent::OverlayClosed(Overlay::ConfirmDelete));
        }
        events
    }

    fn report_failure(&mut self, failure: &RequestFailure) -> Vec<AppEvent> {
        if self.lifecycle == Lifecycle::Unloading {
            tracing::debug!(%failure, "request failed during unload; not reported");
            return Vec::new();
        }
        tracing::warn!(%failure, "request failed");

        let mut events = Vec::new();
        if self.modal.take().is_some() {
            events.push(AppEvent::ModalDismissed);
        }
        let message = failure.notification_message().to_owned();
        self.status_line = Some(message.clone());
        events.push(AppEvent::Notified(message));
        events
    }

    fn move_selection(&mut self, delta: isize) -> Vec<AppEvent> {
        let len = self.visible_rows().len();
        self.selected = if len == 0 {
            0
        } else {
            (self.selected as isize + delta).clamp(0, len as isize - 1) as usize
        };
        vec![AppEvent::SelectionMoved(self.selected)]
    }

    fn clamp_selection(&mut self) {
        let len = self.visible_rows().len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    fn update_search(&mut self, query: &str) -> Vec<AppEvent> {
        if !self.bindings.search_armed() {
            return Vec::new();
        }
        self.search = SearchFilter::compile(query);
        self.clamp_selection();
        vec![AppEvent::SearchChanged {
            visible: self.visible_rows().len(),
        }]
    }

    fn open_date_picker(&mut self, today: Date) -> Vec<AppEvent> {
        let Some(row) = self.selected_row() else {
            return vec![self.set_status("no mail selected")];
        };
        let format = format_description!("[year]-[month]-[day]");
        let picker = DatePickerState {
            mail_id: row.id,
            subject: row.subject.clone(),
            original: row.due.clone(),
            selected: Date::parse(&row.due, &format).unwrap_or(today),
        };
        self.date_picker = Some(picker);
        vec![AppEvent::OverlayOpened(Overlay::DatePicker)]
    }

    fn commit_date_picker(&mut self) -> Vec<AppEvent> {
        let Some(picker) = self.date_picker.take() else {
            return Vec::new();
        };
        let due = picker.selected.to_string();
        tracing::debug!(mail = %picker.mail_id, due = %due, "committing due date");
        vec![
            AppEvent::OverlayClosed(Overlay::DatePicker),
            AppEvent::RequestIssued(BackendRequest::UpdateDue {
                id: picker.mail_id,
                due,
            }),
        ]
    }

    fn due_updated(
        &mut self,
        id: MailId,
        due: String,
        result: Result<(), RequestFailure>,
    ) -> Vec<AppEvent> {
        if self.lifecycle == Lifecycle::Unloading {
            return Vec::new();
        }
        if let Err(failure) = result {
            return self.report_failure(&failure);
        }
        match self.list.apply(ListMutation::PatchDue {
            id,
            due: due.clone(),
        }) {
            ListChange::DuePatched { id } => vec![AppEvent::DuePatched { id, due }],
            _ => {
                tracing::debug!(mail = %id, "due date saved for a row no longer listed");
                Vec::new()
            }
        }
    }

    fn open_popover(&mut self) -> Vec<AppEvent> {
        let Some(row) = self.selected_row() else {
            return vec![self.set_status("no mail selected")];
        };
        let mail_id = row.id;
        let popover = row
            .popover
            .clone()
            .filter(|_| self.bindings.popover_bound(mail_id));
        let Some(popover) = popover else {
            return vec![self.set_status("no details for this mail")];
        };
        self.popover = Some(PopoverState { mail_id, popover });
        vec![AppEvent::OverlayOpened(Overlay::Popover)]
    }

    fn request_delete(&mut self) -> Vec<AppEvent> {
        let Some(row) = self.selected_row() else {
            return vec![self.set_status("no mail selected")];
        };
        self.modal = Some(ConfirmDeleteState {
            mail_id: row.id,
            subject: row.subject.clone(),
            pending: false,
        });
        vec![AppEvent::OverlayOpened(Overlay::ConfirmDelete)]
    }

    fn confirm_delete(&mut self) -> Vec<AppEvent> {
        let Some(modal) = self.modal.as_mut() else {
            return Vec::new();
        };
        if modal.pending {
            return Vec::new();
        }
        modal.pending = true;
        vec![AppEvent::RequestIssued(BackendRequest::DeleteMail {
            id: modal.mail_id,
        })]
    }

    fn mail_deleted(&mut self, id: MailId, result: Result<(), RequestFailure>) -> Vec<AppEvent> {
        if self.lifecycle == Lifecycle::Unloading {
            return Vec::new();
        }
        if let Err(failure) = result {
            return self.report_failure(&failure);
        }

        let mut events = Vec::new();
        if let ListChange::Removed { id } = self.list.apply(ListMutation::Remove { id }) {
            events.push(AppEvent::MailRemoved { id });
        }
        if self.modal.as_ref().is_some_and(|modal| modal.mail_id == id) {
            self.modal = None;
            events.push(AppEvent::OverlayClosed(Overlay::ConfirmDelete));
        }
        self.clamp_selection();
        events.push(self.set_status("mail deleted"));
        events
    }

    fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }
}
