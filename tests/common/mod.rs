#![allow(dead_code)]

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use blog_api::config::AppConfig;
use blog_api::database::Repositories;
use blog_api::{app, AppState};

/// An in-process server on an ephemeral port, backed by the in-memory store.
pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
}

pub struct Session {
    pub id: String,
    pub token: String,
    pub email: String,
}

async fn listen(router: Router) -> Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .context("failed to bind test listener")?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok(addr)
}

/// Start the API. With `mock_api` set, the import endpoints read from it.
pub async fn spawn_server_with(mock_api: Option<String>) -> Result<TestServer> {
    let mut config = AppConfig::for_tests();
    if let Some(url) = mock_api {
        config.import.mock_api_url = url;
    }

    let state = AppState::new(&config, Repositories::memory())?;
    let addr = listen(app(state, &config.security)).await?;

    Ok(TestServer {
        base_url: format!("http://{addr}"),
        client: reqwest::Client::new(),
    })
}

pub async fn spawn_server() -> Result<TestServer> {
    spawn_server_with(None).await
}

/// A JSONPlaceholder stand-in with two users, three posts and three comments.
pub async fn spawn_mock_api() -> Result<String> {
    let users = json!([
        {
            "id": 1, "name": "Leanne Graham", "username": "Bret", "email": "Sincere@april.biz",
            "address": {
                "street": "Kulas Light", "suite": "Apt. 556", "city": "Gwenborough",
                "zipcode": "92998-3874", "geo": { "lat": "-37.3159", "lng": "81.1496" }
            },
            "phone": "1-770-736-8031 x56442", "website": "hildegard.org",
            "company": { "name": "Romaguera-Crona", "catchPhrase": "Multi-layered client-server neural-net", "bs": "harness real-time e-markets" }
        },
        {
            "id": 2, "name": "Ervin Howell", "username": "Antonette", "email": "Shanna@melissa.tv",
            "phone": "010-692-6593 x09125", "website": "anastasia.net"
        }
    ]);
    let posts = json!([
        { "userId": 1, "id": 1, "title": "sunt aut facere", "body": "quia et suscipit" },
        { "userId": 2, "id": 2, "title": "qui est esse", "body": "est rerum tempore" },
        { "userId": 7, "id": 3, "title": "orphan post", "body": "no such user" }
    ]);
    let comments = json!([
        { "postId": 1, "id": 1, "name": "id labore", "email": "Eliseo@gardner.biz", "body": "laudantium" },
        { "postId": 1, "id": 2, "name": "quo vero", "email": "Jayne_Kuhic@sydney.com", "body": "est natus" },
        { "postId": 9, "id": 3, "name": "odio adipisci", "email": "Nikita@garfield.biz", "body": "quia molestiae" }
    ]);

    let router = Router::new()
        .route("/users", get(move || async move { Json(users) }))
        .route("/posts", get(move || async move { Json(posts) }))
        .route("/comments", get(move || async move { Json(comments) }));
    let addr = listen(router).await?;
    Ok(format!("http://{addr}"))
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get(&self, path: &str) -> Result<(reqwest::StatusCode, Value)> {
        let res = self.client.get(self.url(path)).send().await?;
        Ok((res.status(), res.json().await?))
    }

    pub async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(reqwest::StatusCode, Value)> {
        let mut req = self.client.request(method, self.url(path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let res = req.send().await?;
        Ok((res.status(), res.json().await?))
    }

    /// Register a fresh account and log it in.
    pub async fn signup(&self, tag: &str) -> Result<Session> {
        let email = format!("{tag}@example.com");
        let (status, body) = self
            .send(
                reqwest::Method::POST,
                "/v1/user/register",
                None,
                Some(json!({
                    "name": format!("Name {tag}"),
                    "username": format!("user_{tag}"),
                    "email": email,
                    "password": "secret"
                })),
            )
            .await?;
        anyhow::ensure!(status == reqwest::StatusCode::CREATED, "register failed: {body}");

        let (status, body) = self
            .send(
                reqwest::Method::POST,
                "/v1/user/login",
                None,
                Some(json!({ "email": email, "password": "secret" })),
            )
            .await?;
        anyhow::ensure!(status == reqwest::StatusCode::OK, "login failed: {body}");

        Ok(Session {
            id: body["data"]["id"].as_str().unwrap_or_default().to_string(),
            token: body["data"]["accessToken"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
            email,
        })
    }
}
