// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use maildelay_app::{MailId, RequestFailure};
use maildelay_client::{CSRF_HEADER, Client};
use std::io::Read;
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Request, Response, Server};

fn header_value(request: &Request, name: &'static str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|header| header.field.equiv(name))
        .map(|header| header.value.as_str().to_owned())
}

fn read_body(request: &mut Request) -> String {
    let mut body = String::new();
    request
        .as_reader()
        .read_to_string(&mut body)
        .expect("request body should be readable");
    body
}

#[test]
fn unreachable_server_is_a_transport_failure() {
    let client = Client::new("http://127.0.0.1:1", Duration::from_millis(50))
        .expect("client should initialize");

    let failure = client
        .fetch_table()
        .expect_err("fetch should fail for unreachable endpoint");
    assert!(matches!(failure, RequestFailure::Transport { .. }));
    assert_eq!(failure.status(), None);
    assert!(failure.to_string().contains("cannot reach"));
}

#[test]
fn fetch_table_returns_fragment_and_sends_csrf_header() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/mails/table/");
        assert_eq!(request.method().as_str(), "GET");
        assert_eq!(
            header_value(&request, CSRF_HEADER).as_deref(),
            Some("seeded")
        );
        let response = Response::from_string(r#"<div id="list"></div>"#)
            .with_status_code(200)
            .with_header(
                Header::from_bytes("Content-Type", "text/html; charset=utf-8")
                    .expect("valid content type header"),
            );
        request.respond(response).expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    client.set_cookie("csrftoken", "seeded");
    let fragment = client.fetch_table().map_err(|failure| anyhow!(failure))?;
    assert_eq!(fragment, r#"<div id="list"></div>"#);

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn csrf_header_follows_cookie_set_by_server() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("table request expected");
        assert_eq!(request.url(), "/mails/table/");
        assert_eq!(header_value(&request, CSRF_HEADER).as_deref(), Some(""));
        let response = Response::from_string("<table></table>")
            .with_status_code(200)
            .with_header(
                Header::from_bytes("Set-Cookie", "csrftoken=abc123; Path=/")
                    .expect("valid cookie header"),
            );
        request.respond(response).expect("response should succeed");

        let mut request = server.recv().expect("update request expected");
        assert_eq!(request.url(), "/mails/update/42/");
        assert_eq!(request.method().as_str(), "POST");
        assert_eq!(
            header_value(&request, CSRF_HEADER).as_deref(),
            Some("abc123")
        );
        assert_eq!(read_body(&mut request), "due=2024-01-01");
        request
            .respond(Response::empty(200))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    client.fetch_table().map_err(|failure| anyhow!(failure))?;
    assert_eq!(client.csrf_token().as_deref(), Some("abc123"));
    client
        .update_due(MailId::new(42), "2024-01-01")
        .map_err(|failure| anyhow!(failure))?;

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn absolute_targets_never_carry_the_header() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());
    let absolute = format!("{addr}/elsewhere/");

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/elsewhere/");
        assert_eq!(header_value(&request, CSRF_HEADER), None);
        request
            .respond(Response::empty(200))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    client.set_cookie("csrftoken", "secret");
    client
        .post_form(&absolute, &[("id", "1")])
        .map_err(|failure| anyhow!(failure))?;

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn scheme_relative_target_to_another_host_gets_no_header() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let port = server.server_addr().to_ip().expect("ip listener").port();
    let base = format!("http://localhost:{port}");
    let other_host = format!("//127.0.0.1:{port}/elsewhere/");

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/elsewhere/");
        assert_eq!(header_value(&request, CSRF_HEADER), None);
        request
            .respond(Response::empty(200))
            .expect("response should succeed");
    });

    let client = Client::new(&base, Duration::from_secs(1))?;
    client.set_cookie("csrftoken", "secret");
    client
        .get(&other_host)
        .map_err(|failure| anyhow!(failure))?;

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn error_statuses_are_classified() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        for status in [404, 500] {
            let request = server.recv().expect("request expected");
            request
                .respond(Response::from_string("nope").with_status_code(status))
                .expect("response should succeed");
        }
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let not_found = client
        .update_due(MailId::new(7), "2024-02-02")
        .expect_err("404 should fail");
    assert_eq!(not_found, RequestFailure::Status { status: 404 });
    assert_eq!(not_found.notification_message(), "Page not found.");

    let server_error = client
        .delete_mail(MailId::new(7))
        .expect_err("500 should fail");
    assert_eq!(server_error.status(), Some(500));
    assert_eq!(
        server_error.notification_message(),
        "Something went wrong. Please try again later."
    );

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn delete_posts_id_form_field() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let mut request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/mails/delete/");
        assert_eq!(request.method().as_str(), "POST");
        assert_eq!(read_body(&mut request), "id=9");
        request
            .respond(Response::empty(200))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    client
        .delete_mail(MailId::new(9))
        .map_err(|failure| anyhow!(failure))?;

    handle.join().expect("server thread should join");
    Ok(())
}
