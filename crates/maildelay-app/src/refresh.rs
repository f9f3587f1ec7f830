// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::time::{Duration, Instant};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(10);
/// Longest period a schedule will wait between ticks.
pub const MAX_REFRESH_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Transient UI state that makes a refresh tick skip its fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressionReason {
    DatePickerOpen,
    SearchActive,
    PopoverOpen,
    RefreshInFlight,
}

impl SuppressionReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DatePickerOpen => "date picker open",
            Self::SearchActive => "search active",
            Self::PopoverOpen => "popover open",
            Self::RefreshInFlight => "refresh in flight",
        }
    }
}

/// What the refresh coordinator looks at when a tick fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickConditions {
    pub date_picker_visible: bool,
    pub search_active: bool,
    pub popover_visible: bool,
    pub refresh_in_flight: bool,
}

impl TickConditions {
    pub const fn suppression(self) -> Option<SuppressionReason> {
        if self.date_picker_visible {
            Some(SuppressionReason::DatePickerOpen)
        } else if self.search_active {
            Some(SuppressionReason::SearchActive)
        } else if self.popover_visible {
            Some(SuppressionReason::PopoverOpen)
        } else if self.refresh_in_flight {
            Some(SuppressionReason::RefreshInFlight)
        } else {
            None
        }
    }

    pub const fn decide(self) -> TickDecision {
        match self.suppression() {
            Some(reason) => TickDecision::Skip(reason),
            None => TickDecision::Fetch,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickDecision {
    Fetch,
    Skip(SuppressionReason),
}

/// Self-rescheduling timer for refresh ticks.
///
/// The next tick is armed from the moment the current tick ran, never from
/// when its fetch settles, so request latency does not stretch the period.
/// Ticks run on the caller's thread and therefore never overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSchedule {
    interval: Duration,
    next_tick: Instant,
}

impl RefreshSchedule {
    /// Intervals above [`MAX_REFRESH_INTERVAL`] are clamped.
    pub fn starting_at(now: Instant, interval: Duration) -> Self {
        let interval = interval.min(MAX_REFRESH_INTERVAL);
        Self {
            interval,
            next_tick: arm(now, interval),
        }
    }

    pub fn next_tick(&self) -> Instant {
        self.next_tick
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.next_tick
    }

    pub fn until_due(&self, now: Instant) -> Duration {
        self.next_tick.saturating_duration_since(now)
    }

    /// Runs `tick` when the schedule is due and re-arms the timer before
    /// returning the tick's output.
    pub fn run_if_due<T>(&mut self, now: Instant, tick: impl FnOnce() -> T) -> Option<T> {
        if !self.is_due(now) {
            return None;
        }
        let output = tick();
        self.next_tick = arm(now, self.interval);
        Some(output)
    }
}

fn arm(now: Instant, interval: Duration) -> Instant {
    now.checked_add(interval)
        .or_else(|| now.checked_add(MAX_REFRESH_INTERVAL))
        .unwrap_or(now)
}
