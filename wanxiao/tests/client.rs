use std::time::Duration;

use serde_json::json;
use url::Url;
use wanxiao::{Client, Error, Room};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SERVLET_PATH: &str = "/smartWaterAndElectricityService/SWAEServlet";

fn client_for(server: &MockServer, timeout: Duration) -> Client {
    let http = reqwest::Client::builder().timeout(timeout).build().unwrap();
    let endpoint = Url::parse(&format!("{}{SERVLET_PATH}", server.uri())).unwrap();

    Client::with_client(http).with_endpoint(endpoint)
}

fn success_body() -> serde_json::Value {
    json!({
        "code_": 0,
        "message_": "成功",
        "body": json!({
            "roomfullname": "东区 12 栋 305",
            "modlist": [{ "odd": "23.5" }],
        })
        .to_string(),
    })
}

#[tokio::test]
async fn it_should_post_form_encoded_query() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SERVLET_PATH))
        .and(body_string_contains("customercode=1575"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .expect(1)
        .mount(&server)
        .await;

    let usage = client_for(&server, Duration::from_secs(5))
        .usage("20225080905096")
        .await
        .unwrap();

    assert_eq!(usage.room, Room::Name("东区 12 栋 305".to_string()));
    assert!((usage.balance - 23.5).abs() < f64::EPSILON);

    let requests = server.received_requests().await.unwrap();
    let form: Vec<(String, String)> = url::form_urlencoded::parse(&requests[0].body)
        .into_owned()
        .collect();
    let param = form
        .iter()
        .find_map(|(key, value)| (key == "param").then_some(value))
        .unwrap();
    let param: serde_json::Value = serde_json::from_str(param).unwrap();

    assert_eq!(
        param,
        json!({ "cmd": "h5_getstuindexpage", "account": "20225080905096" })
    );
}

#[tokio::test]
async fn it_should_use_configured_customer_code() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("customercode=99"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::from_secs(5)).with_customer_code(99);

    assert!(client.usage("2022").await.is_ok());
}

#[tokio::test]
async fn it_should_not_send_blank_accounts() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::from_secs(5));

    assert!(matches!(client.usage("   ").await, Err(Error::EmptyAccount)));
}

#[tokio::test]
async fn it_should_report_unexpected_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let result = client_for(&server, Duration::from_secs(5))
        .usage("2022")
        .await;

    assert!(matches!(result, Err(Error::Status(status)) if status.as_u16() == 502));
}

#[tokio::test]
async fn it_should_report_timeouts() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(success_body())
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let result = client_for(&server, Duration::from_millis(200))
        .usage("2022")
        .await;

    assert!(matches!(result, Err(Error::Timeout(_))));
}

#[tokio::test]
async fn it_should_report_connection_failures() {
    let server = MockServer::start().await;
    let client = client_for(&server, Duration::from_secs(5));
    drop(server);

    assert!(matches!(client.usage("2022").await, Err(Error::Request(_))));
}

#[tokio::test]
async fn it_should_report_malformed_envelopes() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let result = client_for(&server, Duration::from_secs(5))
        .usage("2022")
        .await;

    assert!(matches!(result, Err(Error::Envelope(_))));
}
