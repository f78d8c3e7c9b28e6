use chrono::NaiveDate;
use debenture_scraper::models::{Asset, ErrorKind, Source};
use debenture_scraper::services::resolver::PriceSource;
use debenture_scraper::services::tabular::TabularClient;
use pretty_assertions::assert_eq;
use std::time::Duration;
use wiremock::matchers::{body_string, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENDPOINT: &str = "/puhistorico_r.asp";

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
}

fn table(rows: &[[&str; 6]]) -> String {
    let rows: String = rows
        .iter()
        .map(|r| format!("<tr>{}</tr>", r.iter().map(|c| format!("<td>{}</td>", c)).collect::<String>()))
        .collect();
    format!(
        "<html><body><table><tr><td>Ativo</td><td>Data</td><td>Juros</td><td>Premio</td><td>Amort</td><td>PU</td></tr>{}</table></body></html>",
        rows
    )
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
}

fn client(server: &MockServer) -> TabularClient {
    TabularClient::new(format!("{}{}", server.uri(), ENDPOINT), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn posts_padded_code_and_two_week_window() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("ativo=ABC12+++++&dt_ini=03%2F01%2F2024&dt_fim=17%2F01%2F2024"))
        .respond_with(html(table(&[["ABC12", "01/01/2024", "", "", "", "1.234,5600"]])))
        .expect(1)
        .mount(&server)
        .await;

    let mut assets = vec![Asset::new("ABC12", "", "0,0000")];
    let report = client(&server).fetch(&mut assets, today()).await.unwrap();

    assert!(report.changed);
    assert!(report.errors.is_empty());
    assert_eq!(assets, vec![Asset::new("ABC12", "2024-01-01", "1.234,5600")]);
}

#[tokio::test]
async fn missing_row_and_bad_value_are_reported_per_asset() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("ativo=XYZ99+"))
        .respond_with(html(table(&[["OTHER", "01/01/2024", "", "", "", "1,0"]])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("ativo=BAD00+"))
        .respond_with(html(table(&[["BAD00", "01/01/2024", "", "", "", "abc"]])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("ativo=GOOD1+"))
        .respond_with(html(table(&[["GOOD1", "09/01/2024", "", "", "", "987,65"]])))
        .mount(&server)
        .await;

    let mut assets = vec![
        Asset::new("XYZ99", "", "0,0000"),
        Asset::new("BAD00", "2023-12-01", "5,0"),
        Asset::new("GOOD1", "", "0,0000"),
    ];
    let report = client(&server).fetch(&mut assets, today()).await.unwrap();

    assert!(report.changed);
    let summary: Vec<(&str, ErrorKind)> = report
        .errors
        .iter()
        .map(|e| (e.asset_code.as_str(), e.kind))
        .collect();
    assert_eq!(summary, vec![("XYZ99", ErrorKind::NotFound), ("BAD00", ErrorKind::Format)]);
    assert!(report.errors.iter().all(|e| e.source == Source::Tabular));
    assert!(report.errors[1].message.contains("'abc'"));

    assert_eq!(assets[0], Asset::new("XYZ99", "", "0,0000"));
    assert_eq!(assets[1], Asset::new("BAD00", "2023-12-01", "5,0"));
    assert_eq!(assets[2], Asset::new("GOOD1", "2024-01-09", "987,65"));
}

#[tokio::test]
async fn transport_and_non_text_responses_do_not_stop_the_batch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("ativo=DOWN1+"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("ativo=JSON1+"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("ativo=GOOD1+"))
        .respond_with(html(table(&[["GOOD1", "09/01/2024", "", "", "", "1,5"]])))
        .expect(1)
        .mount(&server)
        .await;

    let mut assets = vec![
        Asset::new("DOWN1", "", "0,0000"),
        Asset::new("JSON1", "", "0,0000"),
        Asset::new("GOOD1", "", "0,0000"),
    ];
    let report = client(&server).fetch(&mut assets, today()).await.unwrap();

    assert_eq!(report.errors.len(), 2);
    assert_eq!(report.errors[0].kind, ErrorKind::Transport);
    assert!(report.errors[0].message.contains("Make sure its code is correct"));
    assert_eq!(report.errors[1].kind, ErrorKind::Format);
    assert!(report.errors[1].message.starts_with("Unknown data type for the asset 'JSON1'"));
    assert_eq!(assets[2].value, "1,5");
}

#[tokio::test]
async fn fresh_assets_issue_no_requests() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let mut assets = vec![Asset::new("ABC12", "2024-01-10", "1,0"), Asset::new("XYZ99", "2024-01-10", "2,0")];
    let before = assets.clone();
    let report = client(&server).fetch(&mut assets, today()).await.unwrap();

    assert!(!report.changed);
    assert!(report.errors.is_empty());
    assert_eq!(assets, before);
}

#[tokio::test]
async fn only_stale_assets_are_requested() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("ativo=STALE+"))
        .respond_with(html(table(&[["STALE", "10/01/2024", "", "", "", "3,0"]])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("ativo=FRESH+"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let mut assets = vec![Asset::new("FRESH", "2024-01-10", "1,0"), Asset::new("STALE", "2024-01-03", "2,0")];
    let report = client(&server).fetch(&mut assets, today()).await.unwrap();

    assert!(report.changed);
    assert_eq!(assets[0], Asset::new("FRESH", "2024-01-10", "1,0"));
    assert_eq!(assets[1], Asset::new("STALE", "2024-01-10", "3,0"));
}
