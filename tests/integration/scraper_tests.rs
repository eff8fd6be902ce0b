use super::*;
use alliance_monitor::models::ItemIdentifier;
use alliance_monitor::scraper::PageScraper;
use alliance_monitor::session::SiteSession;
use tempfile::TempDir;

struct Harness {
    config: AppConfig,
    session: SiteSession,
    scraper: PageScraper,
    _dir: TempDir,
}

fn harness(base_url: &str) -> Harness {
    let dir = TempDir::new().unwrap();
    let config = get_test_config(base_url, &dir.path().join("history.json"));
    let session = SiteSession::new(&config.site).unwrap();
    let scraper = PageScraper::new(config.site.clone(), config.monitor.retry_policy());
    Harness {
        config,
        session,
        scraper,
        _dir: dir,
    }
}

fn slug(value: &str) -> ItemIdentifier {
    ItemIdentifier::new(value).unwrap()
}

#[tokio::test]
async fn test_identifier_from_placeholder_link() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ALLIANCE_PATH))
        .respond_with(ok_html(alliance_page("solo-leveling")))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server.uri());
    let found = h
        .scraper
        .fetch_current_identifier(&h.session, &h.config.site.alliance_url())
        .await
        .unwrap();

    assert_eq!(found, Some(slug("solo-leveling")));
}

#[tokio::test]
async fn test_identifier_from_poster_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ALLIANCE_PATH))
        .respond_with(ok_html(poster_only_page("omniscient-reader")))
        .mount(&server)
        .await;

    let h = harness(&server.uri());
    let found = h
        .scraper
        .fetch_current_identifier(&h.session, &h.config.site.alliance_url())
        .await
        .unwrap();

    assert_eq!(found, Some(slug("omniscient-reader")));
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ALLIANCE_PATH))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(ALLIANCE_PATH))
        .respond_with(ok_html(alliance_page("tower-of-god")))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server.uri());
    let found = h
        .scraper
        .fetch_current_identifier(&h.session, &h.config.site.alliance_url())
        .await
        .unwrap();

    assert_eq!(found, Some(slug("tower-of-god")));
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_missing_selectors_give_up_after_three_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ALLIANCE_PATH))
        .respond_with(ok_html(html(r#"<div class="alliance-empty"></div>"#)))
        .expect(3)
        .mount(&server)
        .await;

    let h = harness(&server.uri());
    let found = h
        .scraper
        .fetch_current_identifier(&h.session, &h.config.site.alliance_url())
        .await
        .unwrap();

    assert_eq!(found, None);
}

#[tokio::test]
async fn test_non_200_status_gives_up_after_three_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ALLIANCE_PATH))
        .respond_with(ResponseTemplate::new(404))
        .expect(3)
        .mount(&server)
        .await;

    let h = harness(&server.uri());
    let found = h
        .scraper
        .fetch_current_identifier(&h.session, &h.config.site.alliance_url())
        .await
        .unwrap();

    assert_eq!(found, None);
}

#[tokio::test]
async fn test_connection_refused_gives_up_quietly() {
    // Nothing listens on the discard port locally.
    let h = harness("http://127.0.0.1:9");
    let found = h
        .scraper
        .fetch_current_identifier(&h.session, &h.config.site.alliance_url())
        .await
        .unwrap();

    assert_eq!(found, None);
}

#[tokio::test]
async fn test_details_with_relative_image() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/manga/solo-leveling"))
        .respond_with(ok_html(item_page(
            "Solo Leveling",
            Some("/img/manga/posters/solo-leveling.jpg"),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server.uri());
    let record = h
        .scraper
        .fetch_item_details(&h.session, &slug("solo-leveling"))
        .await
        .unwrap()
        .expect("details fetched");

    assert_eq!(record.slug, slug("solo-leveling"));
    assert_eq!(record.title, "Solo Leveling");
    assert_eq!(
        record.image,
        Some(format!("{}/img/manga/posters/solo-leveling.jpg", server.uri()))
    );
}

#[tokio::test]
async fn test_details_fall_back_to_slug_title() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/manga/untitled"))
        .respond_with(ok_html(html("<main>redesigned page</main>")))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server.uri());
    let record = h
        .scraper
        .fetch_item_details(&h.session, &slug("untitled"))
        .await
        .unwrap()
        .expect("extraction misses do not fail the fetch");

    assert_eq!(record.title, "untitled");
    assert_eq!(record.image, None);
}

#[tokio::test]
async fn test_details_from_desktop_layout() {
    let server = MockServer::start().await;
    let desktop = html(
        r#"<div class="manga"><div class="manga__img"><img src="https://cdn.example.com/tower.jpg"></div>
           <h1 class="manga__name">Tower of God</h1></div>"#,
    );
    Mock::given(method("GET"))
        .and(path("/manga/tower-of-god"))
        .respond_with(ok_html(desktop))
        .mount(&server)
        .await;

    let h = harness(&server.uri());
    let record = h
        .scraper
        .fetch_item_details(&h.session, &slug("tower-of-god"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(record.title, "Tower of God");
    assert_eq!(record.image.as_deref(), Some("https://cdn.example.com/tower.jpg"));
}

#[tokio::test]
async fn test_details_unavailable_after_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/manga/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let h = harness(&server.uri());
    let record = h
        .scraper
        .fetch_item_details(&h.session, &slug("broken"))
        .await
        .unwrap();

    assert_eq!(record, None);
}

#[tokio::test]
async fn test_redirect_loop_is_retried_then_gives_up() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ALLIANCE_PATH))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", ALLIANCE_PATH))
        .mount(&server)
        .await;

    let h = harness(&server.uri());
    let found = h
        .scraper
        .fetch_current_identifier(&h.session, &h.config.site.alliance_url())
        .await
        .unwrap();

    assert_eq!(found, None);
    // Each attempt follows one full redirect chain.
    let requests = server.received_requests().await.unwrap().len();
    assert!(requests > 20, "only {} requests", requests);
}
