// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use html_escape::{encode_double_quoted_attribute, encode_safe};
use maildelay_app::{MailId, MailRow, Popover};
use time::{Date, Duration, Month};

const SUBJECT_TOPICS: [&str; 14] = [
    "Invoice",
    "Lease renewal",
    "Quarterly report",
    "Dentist appointment",
    "Flight booking",
    "Insurance claim",
    "Team offsite",
    "Tax documents",
    "Conference talk",
    "Car service",
    "Contract draft",
    "Birthday party",
    "Library loan",
    "Warranty",
];

const SUBJECT_PREFIXES: [&str; 5] = ["", "Re: ", "Fwd: ", "AW: ", "Re: Re: "];

const FIRST_NAMES: [&str; 12] = [
    "avery", "jordan", "taylor", "riley", "morgan", "casey", "alex", "quinn", "parker", "drew",
    "kai", "robin",
];

const DOMAINS: [&str; 6] = [
    "example.com",
    "example.org",
    "mail.test",
    "corp.test",
    "school.test",
    "home.test",
];

/// Delay suffixes of the delay addresses (`3d@…`, `2w@…`, `1m@…`) and the
/// number of days each stands for.
const DELAY_UNITS: [(char, i64); 3] = [('d', 1), ('w', 7), ('m', 30)];

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// Deterministic generator of tracked mails, for tests and demo mode.
#[derive(Debug, Clone)]
pub struct MailFaker {
    rng: DeterministicRng,
}

impl MailFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    pub fn mail_row(&mut self, id: i64) -> MailRow {
        let subject = format!(
            "{}{}",
            self.pick(&SUBJECT_PREFIXES),
            self.pick(&SUBJECT_TOPICS)
        );
        let sent = reference_date() - Duration::days(self.int_range(0, 60));
        let (unit, days_per_unit) = DELAY_UNITS[self.rng.int_n(DELAY_UNITS.len())];
        let amount = self.int_range(1, 6);
        let due = sent + Duration::days(amount * days_per_unit);

        let popover = self.rng.bool().then(|| {
            let count = self.rng.int_n(3) + 1;
            let recipients = (0..count)
                .map(|_| self.address())
                .collect::<Vec<_>>()
                .join(", ");
            Popover {
                title: format!("Delay {amount}{unit}"),
                content: recipients,
            }
        });

        MailRow {
            id: MailId::new(id),
            subject,
            sent: sent.to_string(),
            due: due.to_string(),
            popover,
        }
    }

    /// `count` rows with ids starting at 1, ordered by due date the way the
    /// server lists them.
    pub fn mail_rows(&mut self, count: usize) -> Vec<MailRow> {
        let mut rows = (1..=count as i64)
            .map(|id| self.mail_row(id))
            .collect::<Vec<_>>();
        rows.sort_by(|left, right| left.due.cmp(&right.due));
        rows
    }

    fn address(&mut self) -> String {
        format!("{}@{}", self.pick(&FIRST_NAMES), self.pick(&DOMAINS))
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    fn int_range(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = max - min + 1;
        min + (self.rng.next_u64() % (span as u64)) as i64
    }
}

/// Renders rows the way the table endpoint does: a `#list` container holding
/// a table of `tr.item` rows.
pub fn render_fragment(rows: &[MailRow]) -> String {
    let mut out = String::from(
        "<div id=\"list\">\n<table class=\"table\">\n<thead><tr><th>Subject</th><th>Sent</th><th>Due</th><th></th></tr></thead>\n<tbody>\n",
    );
    for row in rows {
        out.push_str(&render_row(row));
    }
    out.push_str("</tbody>\n</table>\n</div>\n");
    out
}

pub fn render_row(row: &MailRow) -> String {
    let id = row.id;
    let popover = row
        .popover
        .as_ref()
        .map(|popover| {
            format!(
                "<a class=\"add-popover\" title=\"{}\" data-content=\"{}\">&#9432;</a>",
                encode_double_quoted_attribute(&popover.title),
                encode_double_quoted_attribute(&popover.content)
            )
        })
        .unwrap_or_default();

    format!(
        "<tr class=\"item\" id=\"{id}\">\
<td class=\"subject\">{}</td>\
<td class=\"sent\">{}</td>\
<td><span class=\"due\" id=\"due-{id}\">{}</span>\
<input class=\"due-edit\" type=\"text\" value=\"{}\"></td>\
<td>{popover}</td></tr>\n",
        encode_safe(&row.subject),
        encode_safe(&row.sent),
        encode_safe(&row.due),
        encode_double_quoted_attribute(&row.due),
    )
}

pub fn reference_date() -> Date {
    Date::from_calendar_date(2026, Month::January, 15).unwrap_or(Date::MIN)
}

#[cfg(test)]
mod tests {
    use super::{MailFaker, reference_date, render_fragment};
    use maildelay_app::{Popover, parse_fragment};
    use std::collections::BTreeSet;

    #[test]
    fn new_deterministic_seed() {
        let mut left = MailFaker::new(42);
        let mut right = MailFaker::new(42);
        assert_eq!(left.mail_rows(5), right.mail_rows(5));
    }

    #[test]
    fn mail_row_has_dates_in_order() {
        let mut faker = MailFaker::new(7);
        for id in 1..=20 {
            let row = faker.mail_row(id);
            assert!(!row.subject.is_empty());
            assert!(row.sent <= row.due, "sent {} after due {}", row.sent, row.due);
            assert!(row.sent <= reference_date().to_string());
        }
    }

    #[test]
    fn mail_rows_are_sorted_by_due_with_unique_ids() {
        let mut faker = MailFaker::new(3);
        let rows = faker.mail_rows(12);
        assert_eq!(rows.len(), 12);
        assert!(rows.windows(2).all(|pair| pair[0].due <= pair[1].due));
        let ids = rows.iter().map(|row| row.id).collect::<BTreeSet<_>>();
        assert_eq!(ids.len(), 12);
    }

    #[test]
    fn fragment_contains_list_container_and_due_targets() {
        let mut faker = MailFaker::new(9);
        let rows = faker.mail_rows(3);
        let fragment = render_fragment(&rows);
        assert!(fragment.starts_with("<div id=\"list\">"));
        for row in &rows {
            assert!(fragment.contains(&format!("id=\"due-{}\"", row.id)));
        }
    }

    #[test]
    fn markup_characters_survive_rendering() {
        let mut row = MailFaker::new(3).mail_row(7);
        row.subject = "<b>Tom & Jerry's</b> \"draft\"".to_owned();
        row.popover = Some(Popover {
            title: "Delay \"2w\"".to_owned(),
            content: "a&b@example.com, <c@example.com>".to_owned(),
        });

        let parsed =
            parse_fragment(&render_fragment(std::slice::from_ref(&row))).expect("parse fragment");
        assert_eq!(parsed, vec![row]);
    }

    #[test]
    fn variety_across_seeds() {
        let subjects = (1..=8)
            .map(|seed| MailFaker::new(seed).mail_row(1).subject)
            .collect::<BTreeSet<_>>();
        assert!(subjects.len() > 1);
    }
}
