// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use maildelay_app::{MailId, RequestFailure};
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use reqwest::cookie::{CookieStore, Jar};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub const CSRF_COOKIE: &str = "csrftoken";
pub const CSRF_HEADER: &str = "X-CSRFToken";
pub const SESSION_COOKIE: &str = "sessionid";

pub const TABLE_PATH: &str = "/mails/table/";
pub const DELETE_PATH: &str = "/mails/delete/";

pub fn update_path(id: MailId) -> String {
    format!("/mails/update/{id}/")
}

/// Blocking client for the mail tracker backend.
///
/// Every request whose target is relative to the base URL carries the CSRF
/// header, valued from the `csrftoken` cookie in the client's jar (empty when
/// the cookie is absent). Absolute targets go out without it.
#[derive(Clone)]
pub struct Client {
    base_url: Url,
    timeout: Duration,
    jar: Arc<Jar>,
    http: HttpClient,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let trimmed = base_url.trim();
        if trimmed.is_empty() {
            bail!("server.base_url must not be empty");
        }
        let base_url =
            Url::parse(trimmed).with_context(|| format!("parse server.base_url {trimmed:?}"))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            bail!(
                "server.base_url must use http or https, got {:?} -- e.g. http://localhost:8000",
                base_url.scheme()
            );
        }

        let jar = Arc::new(Jar::default());
        let http = HttpClient::builder()
            .timeout(timeout)
            .cookie_provider(Arc::clone(&jar))
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            jar,
            http,
        })
    }

    /// Stores a cookie for the base URL's origin, as if the server had set it.
    pub fn set_cookie(&self, name: &str, value: &str) {
        self.jar
            .add_cookie_str(&format!("{name}={value}; Path=/"), &self.base_url);
    }

    pub fn cookie(&self, name: &str) -> Option<String> {
        let header = self.jar.cookies(&self.base_url)?;
        let header = header.to_str().ok()?;
        header.split(';').find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then(|| value.to_owned())
        })
    }

    pub fn csrf_token(&self) -> Option<String> {
        self.cookie(CSRF_COOKIE)
    }

    /// Header value a request to `target` gets, or `None` for absolute
    /// targets and relative ones that resolve off the base URL's origin
    /// (`//host/path`).
    pub fn csrf_header(&self, target: &str) -> Option<String> {
        if is_absolute_url(target) || !self.is_same_origin(target) {
            return None;
        }
        Some(self.csrf_token().unwrap_or_default())
    }

    fn is_same_origin(&self, target: &str) -> bool {
        self.base_url
            .join(target)
            .is_ok_and(|url| url.origin() == self.base_url.origin())
    }

    pub fn fetch_table(&self) -> Result<String, RequestFailure> {
        let response = self.get(TABLE_PATH)?;
        response.text().map_err(|error| RequestFailure::Decode {
            message: error.to_string(),
        })
    }

    pub fn update_due(&self, id: MailId, due: &str) -> Result<(), RequestFailure> {
        self.post_form(&update_path(id), &[("due", due)])?;
        Ok(())
    }

    pub fn delete_mail(&self, id: MailId) -> Result<(), RequestFailure> {
        let id = id.to_string();
        self.post_form(DELETE_PATH, &[("id", id.as_str())])?;
        Ok(())
    }

    pub fn get(&self, target: &str) -> Result<Response, RequestFailure> {
        let url = self.resolve(target)?;
        self.send(target, self.http.get(url))
    }

    pub fn post_form(
        &self,
        target: &str,
        fields: &[(&str, &str)],
    ) -> Result<Response, RequestFailure> {
        let url = self.resolve(target)?;
        self.send(target, self.http.post(url).form(fields))
    }

    fn resolve(&self, target: &str) -> Result<Url, RequestFailure> {
        if is_absolute_url(target) {
            return Url::parse(target)
                .map_err(|error| RequestFailure::transport(error.to_string()));
        }
        self.base_url
            .join(target)
            .map_err(|error| RequestFailure::transport(format!("join {target:?}: {error}")))
    }

    fn send(&self, target: &str, request: RequestBuilder) -> Result<Response, RequestFailure> {
        let request = match self.csrf_header(target) {
            Some(token) => request.header(CSRF_HEADER, token),
            None => request,
        };
        let response = request
            .send()
            .map_err(|error| connection_error(self.base_url.as_str(), &error))?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(path = target, status = status.as_u16(), "server rejected request");
            return Err(RequestFailure::Status {
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

/// A target is absolute when it parses as a URL with a scheme.
pub fn is_absolute_url(target: &str) -> bool {
    Url::parse(target).is_ok()
}

fn connection_error(base_url: &str, error: &reqwest::Error) -> RequestFailure {
    if let Some(status) = error.status() {
        return RequestFailure::Status {
            status: status.as_u16(),
        };
    }
    let hint = if error.is_timeout() {
        "timed out"
    } else {
        "is the server running?"
    };
    RequestFailure::transport(format!("cannot reach {base_url} -- {hint} ({error})"))
}

#[cfg(test)]
mod tests {
    use super::{Client, DELETE_PATH, TABLE_PATH, is_absolute_url, update_path};
    use maildelay_app::MailId;
    use std::time::Duration;

    fn client() -> Client {
        Client::new("http://localhost:8000", Duration::from_secs(1)).expect("client")
    }

    #[test]
    fn relative_and_absolute_targets() {
        assert!(!is_absolute_url(TABLE_PATH));
        assert!(!is_absolute_url("mails/table/"));
        assert!(is_absolute_url("https://example.com/mails/table/"));
        assert!(is_absolute_url("http://localhost:8000/"));
    }

    #[test]
    fn missing_cookie_gives_empty_header_on_relative_targets() {
        let client = client();
        assert_eq!(client.csrf_header(TABLE_PATH), Some(String::new()));
        assert_eq!(client.csrf_header("https://elsewhere.test/x"), None);
    }

    #[test]
    fn scheme_relative_target_gets_header_only_on_own_origin() {
        let client = client();
        client.set_cookie("csrftoken", "tok");
        assert!(!is_absolute_url("//other.host/x"));
        assert_eq!(client.csrf_header("//other.host/x"), None);
        assert_eq!(
            client.csrf_header("//localhost:8000/x"),
            Some("tok".to_owned())
        );
    }

    #[test]
    fn header_tracks_current_cookie_value() {
        let client = client();
        client.set_cookie("csrftoken", "first");
        assert_eq!(client.csrf_header(DELETE_PATH), Some("first".to_owned()));
        client.set_cookie("csrftoken", "second");
        assert_eq!(client.csrf_header(DELETE_PATH), Some("second".to_owned()));
    }

    #[test]
    fn cookie_lookup_picks_named_pair() {
        let client = client();
        client.set_cookie("sessionid", "s3ss");
        client.set_cookie("csrftoken", "tok");
        assert_eq!(client.cookie("sessionid").as_deref(), Some("s3ss"));
        assert_eq!(client.csrf_token().as_deref(), Some("tok"));
        assert_eq!(client.cookie("missing"), None);
    }

    #[test]
    fn update_path_embeds_id() {
        assert_eq!(update_path(MailId::new(42)), "/mails/update/42/");
    }

    #[test]
    fn new_rejects_bad_base_urls() {
        assert!(Client::new("", Duration::from_secs(1)).is_err());
        assert!(Client::new("not a url", Duration::from_secs(1)).is_err());
        let error = Client::new("ftp://example.com", Duration::from_secs(1))
            .expect_err("ftp should be rejected");
        assert!(error.to_string().contains("http or https"));
    }
}
