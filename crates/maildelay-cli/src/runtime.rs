// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use maildelay_app::{MailId, MailRow, RequestFailure};
use maildelay_client::{CSRF_COOKIE, Client, SESSION_COOKIE};
use maildelay_testkit::{MailFaker, render_fragment};
use maildelay_tui::MailBackend;

use crate::config::Config;

/// Builds the HTTP client from `[server]` and seeds its cookie jar.
pub fn build_client(config: &Config) -> Result<Client> {
    let client = Client::new(config.base_url(), config.timeout()?)
        .context("invalid [server] config; fix base_url/timeout values")?;
    if let Some(session) = config.session_cookie() {
        client.set_cookie(SESSION_COOKIE, session);
    }
    if let Some(token) = config.csrf_token() {
        client.set_cookie(CSRF_COOKIE, token);
    }
    Ok(client)
}

#[derive(Debug, Clone)]
pub struct HttpRuntime {
    client: Client,
}

impl HttpRuntime {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl MailBackend for HttpRuntime {
    fn fetch_table(&mut self) -> Result<String, RequestFailure> {
        self.client.fetch_table()
    }

    fn update_due(&mut self, id: MailId, due: &str) -> Result<(), RequestFailure> {
        self.client.update_due(id, due)
    }

    fn delete_mail(&mut self, id: MailId) -> Result<(), RequestFailure> {
        self.client.delete_mail(id)
    }
}

const DEMO_SEED: u64 = 20_240_101;
const DEMO_ROWS: usize = 24;

/// In-memory stand-in for the server, seeded with generated mails.
#[derive(Debug, Clone)]
pub struct DemoRuntime {
    rows: Vec<MailRow>,
}

impl Default for DemoRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoRuntime {
    pub fn new() -> Self {
        Self::with_rows(MailFaker::new(DEMO_SEED).mail_rows(DEMO_ROWS))
    }

    pub fn with_rows(rows: Vec<MailRow>) -> Self {
        Self { rows }
    }

    fn row_mut(&mut self, id: MailId) -> Result<&mut MailRow, RequestFailure> {
        self.rows
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or(RequestFailure::Status { status: 404 })
    }
}

impl MailBackend for DemoRuntime {
    fn fetch_table(&mut self) -> Result<String, RequestFailure> {
        self.rows.sort_by(|left, right| left.due.cmp(&right.due));
        Ok(render_fragment(&self.rows))
    }

    fn update_due(&mut self, id: MailId, due: &str) -> Result<(), RequestFailure> {
        self.row_mut(id)?.due = due.to_owned();
        Ok(())
    }

    fn delete_mail(&mut self, id: MailId) -> Result<(), RequestFailure> {
        let before = self.rows.len();
        self.rows.retain(|row| row.id != id);
        if self.rows.len() == before {
            return Err(RequestFailure::Status { status: 404 });
        }
        Ok(())
    }
}
