//! A scripted report page served by wiremock.
#![allow(dead_code)]

use std::path::Path;

use vahan_engine::ScrapeConfig;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const PAGE_PATH: &str = "/vahan4dashboard/vahan/view/reportview.xhtml";

pub const BOOTSTRAP_PAGE: &str = r#"<!DOCTYPE html>
<html><body>
<form id="masterLayout_formlogin" name="masterLayout_formlogin" method="post">
  <div id="yaxisVar" class="ui-selectonemenu">
    <select id="yaxisVar_input" name="yaxisVar_input">
      <option value="4">Vehicle Class</option>
      <option value="7">Maker</option>
    </select>
  </div>
  <div id="xaxisVar" class="ui-selectonemenu">
    <select id="xaxisVar_input" name="xaxisVar_input">
      <option value="0">Y-Wise</option>
      <option value="6">Month Wise</option>
    </select>
  </div>
  <div id="multipleYear">
    <select id="selectedYear_input" name="selectedYear_input">
      <option value="">Select Year</option>
      <option value="3">2024</option>
    </select>
  </div>
  <input type="hidden" name="javax.faces.ViewState" id="j_id1:javax.faces.ViewState:0" value="vs-0" />
</form>
</body></html>"#;

pub const TWO_ROW_TABLE: &str = r#"<div id="combTablePnl"><div id="groupingTable" class="ui-datatable"><table><thead id="groupingTable_head"><tr><th role="columnheader">Maker</th><th role="columnheader">Total</th></tr></thead><tbody id="groupingTable_data"><tr role="row"><td>Acme, Inc.</td><td>1,200</td></tr><tr role="row"><td>Zenith</td><td>34</td></tr></tbody></table></div><script id="groupingTable_s">PrimeFaces.cw("DataTable","widget_groupingTable",{id:"groupingTable",paginator:{rows:2,rowCount:__TOTAL__}});</script></div>"#;

pub fn envelope(updates: &str, view_state: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!(
            "<?xml version='1.0' encoding='UTF-8'?><partial-response id=\"j_id1\"><changes>{updates}<update id=\"j_id1:javax.faces.ViewState:0\"><![CDATA[{view_state}]]></update></changes></partial-response>"
        ),
        "text/xml; charset=UTF-8",
    )
}

fn update(id: &str, content: &str) -> String {
    format!("<update id=\"{id}\"><![CDATA[{content}]]></update>")
}

pub fn portal_config(server: &MockServer, output_dir: &Path) -> ScrapeConfig {
    ScrapeConfig {
        base_url: format!("{}{PAGE_PATH}", server.uri()),
        output_dir: output_dir.to_path_buf(),
        max_attempts: 2,
        retry_backoff_ms: 1,
        page_delay_ms: 0,
        ..ScrapeConfig::default()
    }
}

/// Bootstrap page plus the three cascade exchanges. Each exchange hands
/// out the next view-state token and only answers when sent the previous
/// one.
pub async fn mount_cascade(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(PAGE_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(BOOTSTRAP_PAGE, "text/html; charset=UTF-8"),
        )
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(body_string_contains("javax.faces.source=yaxisVar"))
        .and(body_string_contains("javax.faces.ViewState=vs-0"))
        .respond_with(envelope(
            &update(
                "xaxisVar",
                r#"<select id="xaxisVar_input"><option value="0">Y-Wise</option><option value="6">Month Wise</option></select>"#,
            ),
            "vs-1",
        ))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(body_string_contains("javax.faces.source=xaxisVar"))
        .and(body_string_contains("javax.faces.ViewState=vs-1"))
        .respond_with(envelope(
            &update(
                "multipleYear",
                r#"<select id="selectedYear_input"><option value="">Select Year</option><option value="3">2024</option><option value="2">2023</option></select>"#,
            ),
            "vs-2",
        ))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(body_string_contains("javax.faces.source=selectedYear"))
        .and(body_string_contains("javax.faces.ViewState=vs-2"))
        .respond_with(envelope(&update("selectedYear", "<div></div>"), "vs-3"))
        .mount(server)
        .await;
}

/// Refresh answering with the two-row first page; `total` is the row count
/// the table widget announces.
pub async fn mount_refresh(server: &MockServer, total: usize) {
    Mock::given(method("POST"))
        .and(body_string_contains("javax.faces.source=j_idt66"))
        .and(body_string_contains("javax.faces.ViewState=vs-3"))
        .respond_with(envelope(
            &update(
                "combTablePnl",
                &TWO_ROW_TABLE.replace("__TOTAL__", &total.to_string()),
            ),
            "vs-4",
        ))
        .mount(server)
        .await;
}

/// Second page of the table, as a bare row update.
pub async fn mount_second_page(server: &MockServer) {
    Mock::given(method("POST"))
        .and(body_string_contains("javax.faces.source=groupingTable"))
        .and(body_string_contains("groupingTable_first=2"))
        .and(body_string_contains("groupingTable_rows=2"))
        .and(body_string_contains("javax.faces.ViewState=vs-4"))
        .respond_with(envelope(
            &update(
                "groupingTable",
                r#"<tr data-ri="2" role="row"><td>Orbit</td><td>5</td></tr>"#,
            ),
            "vs-5",
        ))
        .expect(1)
        .mount(server)
        .await;
}
