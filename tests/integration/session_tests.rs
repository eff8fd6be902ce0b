use super::*;
use alliance_monitor::session::SiteSession;
use tempfile::TempDir;
use wiremock::matchers::body_string_contains;

async fn session_for(server: &MockServer) -> (SiteSession, TempDir) {
    let dir = TempDir::new().unwrap();
    let config = get_test_config(&server.uri(), &dir.path().join("history.json"));
    (SiteSession::new(&config.site).unwrap(), dir)
}

#[tokio::test]
async fn test_login_posts_credentials_with_csrf_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ok_html(landing_page(true)))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_string_contains("email=reader%40example.com"))
        .and(body_string_contains("password=hunter2"))
        .and(body_string_contains("_token=tok123"))
        .respond_with(ok_html(landing_page(true)))
        .expect(1)
        .mount(&server)
        .await;

    let (session, _dir) = session_for(&server).await;
    assert!(session.login().await);
}

#[tokio::test]
async fn test_login_without_csrf_token_omits_field() {
    let server = MockServer::start().await;
    let signed_in = r#"<html><body><div class="header-profile"></div></body></html>"#;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ok_html(signed_in.to_string()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let (session, _dir) = session_for(&server).await;
    assert!(session.login().await);

    let requests = server.received_requests().await.unwrap();
    let login = requests
        .iter()
        .find(|request| request.url.path() == "/login")
        .expect("login request was sent");
    let body = String::from_utf8_lossy(&login.body);
    assert!(body.contains("email="));
    assert!(!body.contains("_token"));
}

#[tokio::test]
async fn test_login_rejected_when_profile_missing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ok_html(landing_page(false)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ok_html(landing_page(false)))
        .mount(&server)
        .await;

    let (session, _dir) = session_for(&server).await;
    assert!(!session.login().await);
}

#[tokio::test]
async fn test_login_fails_when_landing_page_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (session, _dir) = session_for(&server).await;
    assert!(!session.login().await);
}

#[tokio::test]
async fn test_login_fails_on_rejected_post() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ok_html(landing_page(true)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(422))
        .mount(&server)
        .await;

    let (session, _dir) = session_for(&server).await;
    assert!(!session.login().await);
}
