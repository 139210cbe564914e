use crate::auth::users::{ensure_demo_user, DEMO_EMAIL, DEMO_PASSWORD};
use crate::build_rocket;
use crate::db::Database;
use crate::models::config::Config;
use crate::models::context::Context;
use anime_catalog_client::{
    CatalogClient, CatalogConfig, Result, RetryPolicy, Transport, UpstreamResponse, Url,
};
use async_trait::async_trait;
use rocket::http::{ContentType, Header, Status};
use rocket::local::asynchronous::{Client, LocalResponse};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Serves a fixed listing for list endpoints and single items by id.
#[derive(Default)]
struct FixtureUpstream {
    failing: AtomicBool,
    calls: AtomicUsize,
}

fn fixture_items() -> Value {
    json!([
        {"mal_id": 5114, "title": "Fullmetal Alchemist: Brotherhood", "genres": [{"name": "Action"}, {"name": "Drama"}], "episodes": 64, "score": 9.1},
        {"mal_id": 52991, "title": "Sousou no Frieren", "genres": [{"name": "Adventure"}, {"name": "Drama"}], "episodes": 28, "score": 9.3},
        {"mal_id": 9253, "title": "Steins;Gate", "genres": [{"name": "Sci-Fi"}], "episodes": 24, "score": 9.1},
        {"mal_id": 21, "title": "One Piece", "genres": [{"name": "Action"}, {"name": "Adventure"}], "episodes": null, "score": 8.7}
    ])
}

fn response(status: u16, body: String) -> UpstreamResponse {
    UpstreamResponse {
        status,
        retry_after: None,
        body,
    }
}

#[async_trait]
impl Transport for FixtureUpstream {
    async fn get(&self, url: &Url) -> Result<UpstreamResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Ok(response(503, String::new()));
        }

        let items = fixture_items();
        let segments: Vec<&str> = url.path_segments().map(Iterator::collect).unwrap_or_default();
        match segments.as_slice() {
            [.., "anime", id] => {
                let found = items
                    .as_array()
                    .and_then(|items| items.iter().find(|item| item["mal_id"].to_string() == *id));
                Ok(match found {
                    Some(item) => response(200, json!({ "data": item }).to_string()),
                    None => response(404, String::new()),
                })
            }
            _ => Ok(response(200, json!({ "data": items }).to_string())),
        }
    }
}

struct TestApp {
    client: Client,
    upstream: Arc<FixtureUpstream>,
}

async fn app() -> TestApp {
    let upstream = Arc::new(FixtureUpstream::default());
    let catalog_config = CatalogConfig {
        base_url: Url::parse("http://jikan.test/v4").unwrap(),
        retry: RetryPolicy::default().with_max_attempts(1),
        ..CatalogConfig::default()
    };
    let catalog_client = CatalogClient::with_transport(catalog_config, upstream.clone());

    let database = Database::open_in_memory().unwrap();
    database.run_migrations().unwrap();
    let config = Config::default().with_database_path(":memory:");
    let context = Arc::new(Context::new(catalog_client, database, config));

    let client = Client::tracked(build_rocket(context)).await.unwrap();
    TestApp { client, upstream }
}

async fn body(response: LocalResponse<'_>) -> Value {
    response.into_json::<Value>().await.unwrap_or(Value::Null)
}

fn bearer(token: &str) -> Header<'static> {
    Header::new("Authorization", format!("Bearer {}", token))
}

impl TestApp {
    async fn post(&self, uri: &str, payload: Value) -> (Status, Value) {
        let response = self
            .client
            .post(uri)
            .header(ContentType::JSON)
            .body(payload.to_string())
            .dispatch()
            .await;
        (response.status(), body(response).await)
    }

    async fn get(&self, uri: &str) -> (Status, Value) {
        let response = self.client.get(uri).dispatch().await;
        (response.status(), body(response).await)
    }

    async fn get_authed(&self, uri: &str, token: &str) -> (Status, Value) {
        let response = self
            .client
            .get(uri)
            .header(bearer(token))
            .dispatch()
            .await;
        (response.status(), body(response).await)
    }

    async fn send_authed(
        &self,
        method: rocket::http::Method,
        uri: &str,
        token: &str,
        payload: Option<Value>,
    ) -> (Status, Value) {
        let mut request = self
            .client
            .req(method, uri)
            .header(bearer(token))
            .header(ContentType::JSON);
        if let Some(payload) = payload {
            request = request.body(payload.to_string());
        }
        let response = request.dispatch().await;
        (response.status(), body(response).await)
    }

    async fn signup(&self, email: &str) -> String {
        let (status, body) = self
            .post(
                "/auth/signup",
                json!({ "email": email, "username": "fan", "password": "hunter2hunter2" }),
            )
            .await;
        assert_eq!(status, Status::Created, "{}", body);
        body["token"].as_str().unwrap().to_string()
    }
}

#[rocket::async_test]
async fn health_reports_ok() {
    let app = app().await;
    let (status, body) = app.get("/health").await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "anime-api");
    assert!(body["timestamp"].is_string());
}

#[rocket::async_test]
async fn unknown_routes_are_json_404s() {
    let app = app().await;
    let (status, body) = app.get("/nope").await;
    assert_eq!(status, Status::NotFound);
    assert_eq!(body["message"], "Route not found");
}

#[rocket::async_test]
async fn protected_routes_need_a_valid_token() {
    let app = app().await;

    let (status, body) = app.get("/watchlist").await;
    assert_eq!(status, Status::Unauthorized);
    assert_eq!(body["message"], "Missing bearer token");

    let (status, body) = app.get_authed("/auth/me", "not-a-token").await;
    assert_eq!(status, Status::Unauthorized);
    assert_eq!(body["message"], "Invalid or expired token");

    let (status, _) = app.get("/recommendations/personalized").await;
    assert_eq!(status, Status::Unauthorized);
}

#[rocket::async_test]
async fn signup_validation() {
    let app = app().await;

    let cases = [
        (json!({ "email": "a@b.co", "password": "longenough" }), "email, username, and password are required"),
        (json!({ "email": "nope", "username": "x", "password": "longenough" }), "invalid email format"),
        (json!({ "email": "a@b.co", "username": "x", "password": "short" }), "password must be at least 8 characters"),
    ];
    for (payload, message) in cases {
        let (status, body) = app.post("/auth/signup", payload).await;
        assert_eq!(status, Status::BadRequest);
        assert_eq!(body["message"], message);
    }

    app.signup("Fan@Anime.app").await;
    let (status, body) = app
        .post(
            "/auth/signup",
            json!({ "email": "fan@anime.app", "username": "again", "password": "longenough" }),
        )
        .await;
    assert_eq!(status, Status::Conflict);
    assert_eq!(body["message"], "email is already registered");

    let response = app
        .client
        .post("/auth/signup")
        .header(ContentType::JSON)
        .body("{not json")
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);
}

#[rocket::async_test]
async fn demo_user_can_log_in() {
    let app = app().await;
    let context = app.client.rocket().state::<crate::models::context::ContextPointer>().unwrap();
    assert!(ensure_demo_user(context.database()).await.unwrap());

    let (status, body) = app
        .post("/auth/login", json!({ "email": DEMO_EMAIL, "password": "wrong-password" }))
        .await;
    assert_eq!(status, Status::Unauthorized);
    assert_eq!(body["message"], "invalid credentials");

    let (status, body) = app
        .post("/auth/login", json!({ "email": DEMO_EMAIL, "password": DEMO_PASSWORD }))
        .await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["user"]["username"], "demo_user");
    assert!(body["user"].get("passwordHash").is_none());

    let token = body["token"].as_str().unwrap();
    let (status, body) = app.get_authed("/auth/me", token).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["user"]["email"], DEMO_EMAIL);

    let (status, body) = app.post("/auth/logout", json!({})).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["message"], "logout successful");
}

#[rocket::async_test]
async fn catalog_filters_and_validation() {
    let app = app().await;

    let (status, body) = app.get("/catalog?genre=drama&sort=title_asc").await;
    assert_eq!(status, Status::Ok);
    let titles: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Fullmetal Alchemist: Brotherhood", "Sousou no Frieren"]);

    // Genre is matched case-insensitively, so this is the same cached search
    let (status, _) = app.get("/catalog?genre=%20Drama&sort=title_asc").await;
    assert_eq!(status, Status::Ok);
    assert_eq!(app.upstream.calls.load(Ordering::SeqCst), 1);

    let (status, body) = app.get("/catalog?minRating=9.2").await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["items"].as_array().unwrap().len(), 1);

    let (status, body) = app.get("/catalog?minRating=11").await;
    assert_eq!(status, Status::BadRequest);
    assert_eq!(body["message"], "minRating must be a number between 0 and 10");

    let (status, body) = app.get("/catalog?maxEpisodes=0").await;
    assert_eq!(status, Status::BadRequest);
    assert_eq!(body["message"], "maxEpisodes must be a positive integer");
}

#[rocket::async_test]
async fn catalog_item_lookup() {
    let app = app().await;

    let (status, body) = app.get("/catalog/9253").await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["title"], "Steins;Gate");
    assert_eq!(body["rating"], 9.1);

    let (status, _) = app.get("/catalog/77").await;
    assert_eq!(status, Status::NotFound);

    let calls = app.upstream.calls.load(Ordering::SeqCst);
    let (status, _) = app.get("/catalog/abc").await;
    assert_eq!(status, Status::NotFound);
    assert_eq!(app.upstream.calls.load(Ordering::SeqCst), calls);
}

#[rocket::async_test]
async fn upstream_failure_maps_to_bad_gateway() {
    let app = app().await;
    app.upstream.failing.store(true, Ordering::SeqCst);

    let (status, body) = app.get("/catalog?q=frieren").await;
    assert_eq!(status, Status::BadGateway);
    assert_eq!(body["message"], "Catalog service is unavailable, try again later");

    let (status, _) = app.get("/recommendations/preview").await;
    assert_eq!(status, Status::BadGateway);
}

#[rocket::async_test]
async fn recommendation_preview() {
    let app = app().await;
    let (status, body) = app.get("/recommendations/preview").await;
    assert_eq!(status, Status::Ok);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["animeId"], "52991");
    assert_eq!(items[0]["score"], 9.3);
}

#[rocket::async_test]
async fn watchlist_and_recommendations_end_to_end() {
    use rocket::http::Method;

    let app = app().await;
    app.signup("fan@anime.app").await;
    let (status, login) = app
        .post("/auth/login", json!({ "email": "fan@anime.app", "password": "hunter2hunter2" }))
        .await;
    assert_eq!(status, Status::Ok);
    let token = login["token"].as_str().unwrap().to_string();

    let (status, entry) = app
        .send_authed(
            Method::Post,
            "/watchlist",
            &token,
            Some(json!({ "animeId": "5114", "status": "completed" })),
        )
        .await;
    assert_eq!(status, Status::Created);
    assert_eq!(entry["animeTitle"], "Fullmetal Alchemist: Brotherhood");
    assert_eq!(entry["animeGenres"], json!(["Action", "Drama"]));
    assert_eq!(entry["rating"], Value::Null);

    let (status, body) = app
        .send_authed(Method::Post, "/watchlist", &token, Some(json!({ "animeId": "5114" })))
        .await;
    assert_eq!(status, Status::Conflict);
    assert_eq!(body["message"], "anime already in watchlist");

    let (status, body) = app
        .send_authed(Method::Post, "/watchlist", &token, Some(json!({ "animeId": "77" })))
        .await;
    assert_eq!(status, Status::NotFound);
    assert_eq!(body["message"], "anime not found in catalog");

    let (status, body) = app
        .send_authed(Method::Post, "/watchlist", &token, Some(json!({ "status": "plan" })))
        .await;
    assert_eq!(status, Status::BadRequest);
    assert_eq!(body["message"], "animeId is required");

    let (status, body) = app
        .send_authed(
            Method::Patch,
            "/watchlist/5114",
            &token,
            Some(json!({ "rating": 9.5, "progressEpisodes": 64, "notes": "  peak  " })),
        )
        .await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["rating"], 9.5);
    assert_eq!(body["progressEpisodes"], 64);
    assert_eq!(body["notes"], "peak");
    assert_eq!(body["status"], "completed");

    let (status, _) = app
        .send_authed(Method::Patch, "/watchlist/5114", &token, Some(json!({ "rating": 12 })))
        .await;
    assert_eq!(status, Status::BadRequest);

    let (status, _) = app
        .send_authed(Method::Patch, "/watchlist/9253", &token, Some(json!({ "rating": 5 })))
        .await;
    assert_eq!(status, Status::NotFound);

    let (status, body) = app.get_authed("/watchlist", &token).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["items"].as_array().unwrap().len(), 1);

    let (status, body) = app.get_authed("/recommendations/personalized", &token).await;
    assert_eq!(status, Status::Ok);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert!(items.iter().all(|item| item["animeId"] != "5114"));
    // Drama carries the weight of the completed, highly rated entry
    assert_eq!(items[0]["animeId"], "52991");
    assert_eq!(items[0]["score"], 3.13);
    assert_eq!(items[0]["reason"], "Matches your genre preferences: Drama.");
    assert_eq!(items[1]["animeId"], "21");
    assert_eq!(items[2]["reason"], "Good overall match from your recent watchlist behavior.");

    let (status, _) = app.send_authed(Method::Delete, "/watchlist/5114", &token, None).await;
    assert_eq!(status, Status::NoContent);
    let (status, body) = app.send_authed(Method::Delete, "/watchlist/5114", &token, None).await;
    assert_eq!(status, Status::NotFound);
    assert_eq!(body["message"], "watchlist item not found");
}

#[rocket::async_test]
async fn graphql_exposes_catalog_and_cache_stats() {
    let app = app().await;
    let query = r#"{ catalog(genre: "Sci-Fi") { id title } anime(id: "5114") { title } }"#;

    let (status, body) = app.post("/graphql", json!({ "query": query })).await;
    assert_eq!(status, Status::Ok);
    assert!(body.get("errors").is_none(), "{}", body);
    assert_eq!(body["data"]["catalog"], json!([{ "id": "9253", "title": "Steins;Gate" }]));
    assert_eq!(body["data"]["anime"]["title"], "Fullmetal Alchemist: Brotherhood");

    let query = "{ cacheStats { search { totalEntries } items { totalEntries } searchRequests { inFlight } } }";
    let (status, body) = app.post("/graphql", json!({ "query": query })).await;
    assert_eq!(status, Status::Ok);
    let stats = &body["data"]["cacheStats"];
    assert_eq!(stats["search"]["totalEntries"], 1);
    assert_eq!(stats["items"]["totalEntries"], 1);
    assert_eq!(stats["searchRequests"]["inFlight"], 0);

    let (status, body) = app.post("/graphql", json!({ "query": "{ catalog(minRating: 12) { id } }" })).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["errors"][0]["message"], "minRating must be a number between 0 and 10");
}
