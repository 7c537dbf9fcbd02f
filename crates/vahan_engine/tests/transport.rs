use std::time::Duration;

use pretty_assertions::assert_eq;
use vahan_core::SessionState;
use vahan_engine::{
    encode_form_body, AjaxRequest, AjaxTransport, FailureKind, ReqwestTransport, ScrapeConfig,
};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PAGE_PATH: &str = "/vahan/reportview.xhtml";

fn config_for(server: &MockServer) -> ScrapeConfig {
    ScrapeConfig {
        base_url: format!("{}{PAGE_PATH}", server.uri()),
        max_attempts: 3,
        retry_backoff_ms: 1,
        page_delay_ms: 0,
        ..ScrapeConfig::default()
    }
}

fn session() -> SessionState {
    SessionState::new("-123:456", "masterLayout_formlogin")
        .with_cascade(["yaxisVar_input", "xaxisVar_input", "selectedYear_input"])
        .with_fields([("selectedRto_input", "-1"), ("yaxisVar_input", "4")])
}

fn envelope(updates: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!("<?xml version='1.0' encoding='UTF-8'?><partial-response><changes>{updates}</changes></partial-response>"),
        "text/xml; charset=UTF-8",
    )
}

#[test]
fn form_body_carries_protocol_fields_and_focus_companions() {
    let request = AjaxRequest::new("yaxisVar", "yaxisVar", "xaxisVar");
    let body = encode_form_body(&session(), &request);

    assert!(body.starts_with(
        "javax.faces.partial.ajax=true&javax.faces.source=yaxisVar\
         &javax.faces.partial.execute=yaxisVar&javax.faces.partial.render=xaxisVar\
         &masterLayout_formlogin=masterLayout_formlogin&javax.faces.ViewState=-123%3A456"
    ));
    assert!(body.contains("&selectedRto_input=-1"));
    assert!(body.contains("&yaxisVar_input=4"));
    assert!(body.contains("&yaxisVar_focus="));
    assert!(body.contains("&xaxisVar_focus="));
    assert!(body.contains("&selectedRto_focus="));
}

#[test]
fn overrides_replace_session_fields_of_the_same_name() {
    let request = AjaxRequest::new("groupingTable", "groupingTable", "groupingTable")
        .with_field("yaxisVar_input", "7")
        .with_field("groupingTable_first", "100");
    let body = encode_form_body(&session(), &request);

    assert_eq!(body.matches("yaxisVar_input=").count(), 1);
    assert!(body.ends_with("&yaxisVar_input=7&groupingTable_first=100"));
}

#[tokio::test]
async fn load_returns_the_bootstrap_document() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PAGE_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<html>report</html>", "text/html; charset=utf-8"),
        )
        .mount(&server)
        .await;

    let transport = ReqwestTransport::new(&config_for(&server)).unwrap();
    assert_eq!(transport.load().await.unwrap(), "<html>report</html>");
}

#[tokio::test]
async fn exchange_sends_ajax_headers_and_returns_new_view_state() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PAGE_PATH))
        .and(header("faces-request", "partial/ajax"))
        .and(header("x-requested-with", "XMLHttpRequest"))
        .and(body_string_contains("javax.faces.source=yaxisVar"))
        .and(body_string_contains("javax.faces.ViewState=-123%3A456"))
        .respond_with(envelope(
            r#"<update id="xaxisVar"><![CDATA[<div></div>]]></update><update id="j_id1:javax.faces.ViewState:0"><![CDATA[-789:012]]></update>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let transport = ReqwestTransport::new(&config_for(&server)).unwrap();
    let request = AjaxRequest::new("yaxisVar", "yaxisVar", "xaxisVar");
    let response = transport.exchange(&session(), &request).await.unwrap();

    assert_eq!(response.view_state, "-789:012");
    assert_eq!(response.envelope.extract_fragment("xaxisVar"), Some("<div></div>"));
}

#[tokio::test]
async fn missing_view_state_keeps_the_submitted_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(envelope(r#"<update id="msg"><![CDATA[]]></update>"#))
        .mount(&server)
        .await;

    let transport = ReqwestTransport::new(&config_for(&server)).unwrap();
    let request = AjaxRequest::new("j_idt66", "@all", "combTablePnl");
    let response = transport.exchange(&session(), &request).await.unwrap();
    assert_eq!(response.view_state, "-123:456");
}

#[tokio::test]
async fn server_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(envelope(
            r#"<update id="javax.faces.ViewState"><![CDATA[fresh]]></update>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let transport = ReqwestTransport::new(&config_for(&server)).unwrap();
    let request = AjaxRequest::new("xaxisVar", "xaxisVar", "multipleYear");
    let response = transport.exchange(&session(), &request).await.unwrap();
    assert_eq!(response.view_state, "fresh");
}

#[tokio::test]
async fn exhausted_retries_report_status_attempts_and_source() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let transport = ReqwestTransport::new(&config_for(&server)).unwrap();
    let request = AjaxRequest::new("selectedYear", "selectedYear", "selectedYear");
    let err = transport.exchange(&session(), &request).await.unwrap_err();

    assert_eq!(err.kind, FailureKind::HttpStatus(503));
    assert_eq!(err.attempts, 3);
    assert_eq!(err.source_id, "selectedYear");
}

#[tokio::test]
async fn exchange_timeouts_are_retried_then_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(envelope("").set_delay(Duration::from_millis(500)))
        .expect(3)
        .mount(&server)
        .await;

    let config = ScrapeConfig {
        request_timeout_ms: 100,
        ..config_for(&server)
    };
    let transport = ReqwestTransport::new(&config).unwrap();
    let request = AjaxRequest::new("j_idt66", "@all", "combTablePnl groupingTable msg");
    let err = transport.exchange(&session(), &request).await.unwrap_err();

    assert_eq!(err.kind, FailureKind::Timeout);
    assert_eq!(err.attempts, 3);
    assert_eq!(err.source_id, "j_idt66");
}

#[tokio::test]
async fn non_envelope_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<html>Session expired</html>", "text/html"),
        )
        .mount(&server)
        .await;

    let config = ScrapeConfig {
        max_attempts: 1,
        ..config_for(&server)
    };
    let transport = ReqwestTransport::new(&config).unwrap();
    let request = AjaxRequest::new("j_idt66", "@all", "combTablePnl");
    let err = transport.exchange(&session(), &request).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::MalformedEnvelope);
    assert_eq!(err.attempts, 1);
}

#[test]
fn invalid_base_url_is_rejected_up_front() {
    let config = ScrapeConfig {
        base_url: "not a url".to_string(),
        ..ScrapeConfig::default()
    };
    let err = ReqwestTransport::new(&config).unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidUrl);
}
