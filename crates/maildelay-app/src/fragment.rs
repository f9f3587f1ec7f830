// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use scraper::{ElementRef, Html, Selector};

use crate::ids::MailId;
use crate::model::{MailRow, Popover};

pub const LIST_CONTAINER_SELECTOR: &str = "#list";
const ROW_SELECTOR: &str = "tr.item";
const SUBJECT_SELECTOR: &str = ".subject";
const SENT_SELECTOR: &str = ".sent";
const DUE_SELECTOR: &str = ".due";
const POPOVER_SELECTOR: &str = ".add-popover";

/// Parses the markup served by the table endpoint into row records.
///
/// Rows are `tr.item` elements; the text of their `.subject`, `.sent` and
/// `.due` descendants becomes the row fields. When the markup carries a
/// `#list` container only its content is read. Rows whose `id` attribute has
/// no trailing number are skipped.
pub fn parse_fragment(markup: &str) -> Result<Vec<MailRow>> {
    let rows_selector = selector(ROW_SELECTOR)?;
    let container_selector = selector(LIST_CONTAINER_SELECTOR)?;
    let subject_selector = selector(SUBJECT_SELECTOR)?;
    let sent_selector = selector(SENT_SELECTOR)?;
    let due_selector = selector(DUE_SELECTOR)?;
    let popover_selector = selector(POPOVER_SELECTOR)?;

    let document = Html::parse_fragment(&table_context(markup));
    let root = document
        .select(&container_selector)
        .next()
        .unwrap_or_else(|| document.root_element());

    let mut rows = Vec::new();
    for element in root.select(&rows_selector) {
        let raw_id = element.value().attr("id").unwrap_or_default();
        let Some(id) = MailId::from_row_attr(raw_id) else {
            tracing::warn!(id = raw_id, "skipping table row without a mail id");
            continue;
        };

        rows.push(MailRow {
            id,
            subject: first_text(element, &subject_selector),
            sent: first_text(element, &sent_selector),
            due: first_text(element, &due_selector),
            popover: element.select(&popover_selector).next().map(read_popover),
        });
    }

    tracing::debug!(rows = rows.len(), "parsed table fragment");
    Ok(rows)
}

fn selector(css: &'static str) -> Result<Selector> {
    Selector::parse(css).map_err(|error| anyhow!("invalid selector {css:?}: {error}"))
}

// Table rows outside a <table> are dropped by the HTML tree builder, so a
// bare run of <tr> elements gets a table around it before parsing.
fn table_context(markup: &str) -> String {
    if markup.to_ascii_lowercase().contains("<table") {
        markup.to_owned()
    } else {
        format!("<table>{markup}</table>")
    }
}

fn first_text(row: ElementRef<'_>, selector: &Selector) -> String {
    row.select(selector)
        .next()
        .map(collapsed_text)
        .unwrap_or_default()
}

fn collapsed_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn read_popover(element: ElementRef<'_>) -> Popover {
    let attrs = element.value();
    let title = attrs
        .attr("data-original-title")
        .or_else(|| attrs.attr("title"))
        .or_else(|| attrs.attr("data-title"))
        .unwrap_or_default()
        .trim()
        .to_owned();
    let content = attrs
        .attr("data-content")
        .unwrap_or_default()
        .trim()
        .to_owned();
    Popover { title, content }
}

#[cfg(test)]
mod tests {
    use super::parse_fragment;
    use crate::{MailId, Popover};
    use anyhow::Result;

    const FRAGMENT: &str = r#"
        <div id="list">
          <table class="table">
            <tbody>
              <tr class="item" id="41">
                <td class="subject">  Invoice   March </td>
                <td class="sent">2024-03-01</td>
                <td><span class="due" id="due-41">2024-03-15</span></td>
                <td><a class="add-popover" title="Recipients"
                       data-content="ann@example.com, bob@example.com">i</a></td>
              </tr>
              <tr class="item" id="mail-42">
                <td class="subject">Lease renewal</td>
                <td class="sent">2024-02-11</td>
                <td><span class="due" id="due-42">2024-05-01</span></td>
              </tr>
              <tr class="header"><th>Subject</th></tr>
            </tbody>
          </table>
        </div>
    "#;

    #[test]
    fn parses_rows_inside_list_container() -> Result<()> {
        let rows = parse_fragment(FRAGMENT)?;
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].id, MailId::new(41));
        assert_eq!(rows[0].subject, "Invoice March");
        assert_eq!(rows[0].sent, "2024-03-01");
        assert_eq!(rows[0].due, "2024-03-15");
        assert_eq!(
            rows[0].popover,
            Some(Popover {
                title: "Recipients".to_owned(),
                content: "ann@example.com, bob@example.com".to_owned(),
            })
        );

        assert_eq!(rows[1].id, MailId::new(42));
        assert_eq!(rows[1].popover, None);
        Ok(())
    }

    #[test]
    fn bare_rows_without_table_are_still_read() -> Result<()> {
        let rows = parse_fragment(
            r#"<tr class="item" id="3"><td class="subject">Hi</td><td class="sent">a</td><td class="due">b</td></tr>"#,
        )?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].subject, "Hi");
        assert_eq!(rows[0].due, "b");
        Ok(())
    }

    #[test]
    fn rows_without_numeric_id_are_skipped() -> Result<()> {
        let rows = parse_fragment(
            r#"<table>
                 <tr class="item" id="draft"><td class="subject">x</td></tr>
                 <tr class="item"><td class="subject">y</td></tr>
                 <tr class="item" id="9"><td class="subject">z</td></tr>
               </table>"#,
        )?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, MailId::new(9));
        Ok(())
    }

    #[test]
    fn empty_fragment_yields_no_rows() -> Result<()> {
        assert!(parse_fragment("")?.is_empty());
        assert!(parse_fragment("<p>No mails yet</p>")?.is_empty());
        Ok(())
    }

    #[test]
    fn missing_cells_become_empty_text() -> Result<()> {
        let rows = parse_fragment(r#"<table><tr class="item" id="5"></tr></table>"#)?;
        assert_eq!(rows.len(), 1);
        assert!(rows[0].subject.is_empty());
        assert!(rows[0].sent.is_empty());
        assert!(rows[0].due.is_empty());
        Ok(())
    }
}
