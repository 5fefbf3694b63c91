use std::net::SocketAddr;

use axum::{middleware, routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{auth, auth::extractors::require_principal, messages, rentals, state::AppState};

pub fn build_app(state: AppState) -> Router {
    // Everything in here is behind the gate; the gate runs before any
    // handler extractor, so a rejected request never reads its body.
    let protected = Router::new()
        .merge(auth::protected_router())
        .merge(rentals::router(state.config.upload_max_bytes))
        .merge(messages::router())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_principal,
        ));

    let public = Router::new()
        .merge(auth::public_router())
        .route("/health", get(|| async { "ok" }));

    Router::new()
        .nest("/api", public.merge(protected))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let path = req.uri().path().to_string();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        path = %path,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, host: &str, port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const BOUNDARY: &str = "rental-app-test-boundary";
    const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake-image";

    async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn json_req(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut b = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(t) = token {
            b = b.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        b.body(Body::from(body.to_string())).unwrap()
    }

    fn get_req(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut b = Request::builder().uri(uri);
        if let Some(t) = token {
            b = b.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        b.body(Body::empty()).unwrap()
    }

    fn rental_form(token: Option<&str>, fields: &[(&str, &str)], picture: bool) -> Request<Body> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if picture {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"picture\"; filename=\"p.png\"\r\nContent-Type: image/png\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(PNG);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let mut b = Request::builder()
            .method("POST")
            .uri("/api/rentals")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(t) = token {
            b = b.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        b.body(Body::from(body)).unwrap()
    }

    fn put_form(token: &str, id: &str, fields: &[(&str, &str)]) -> Request<Body> {
        let mut req = rental_form(Some(token), fields, false);
        *req.method_mut() = axum::http::Method::PUT;
        *req.uri_mut() = format!("/api/rentals/{id}").parse().unwrap();
        req
    }

    const FLAT: &[(&str, &str)] = &[
        ("name", "Flat"),
        ("surface", "42"),
        ("price", "900"),
        ("description", "Near the station"),
    ];

    async fn register(app: &Router, email: &str) -> String {
        let (status, body) = call(
            app,
            json_req(
                "POST",
                "/api/auth/register",
                None,
                json!({ "email": email, "password": "pw", "name": "A" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = build_app(AppState::fake());
        let res = app.oneshot(get_req("/api/health", None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn register_then_me_returns_the_same_account() {
        let app = build_app(AppState::fake());
        let token = register(&app, "a@x.com").await;

        let (status, me) = call(&app, get_req("/api/auth/me", Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["email"], "a@x.com");
        assert_eq!(me["name"], "A");
        assert!(me.get("password_hash").is_none());

        let (status, other) = call(
            &app,
            get_req(&format!("/api/user/{}", me["id"].as_str().unwrap()), Some(&token)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(other["email"], "a@x.com");
    }

    #[tokio::test]
    async fn login_issues_a_usable_token() {
        let app = build_app(AppState::fake());
        register(&app, "a@x.com").await;

        let (status, body) = call(
            &app,
            json_req(
                "POST",
                "/api/auth/login",
                None,
                json!({ "login": "A@X.com", "password": "pw" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["token"].as_str().unwrap();

        let (status, me) = call(&app, get_req("/api/auth/me", Some(token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["email"], "a@x.com");
    }

    #[tokio::test]
    async fn failed_logins_look_alike() {
        let app = build_app(AppState::fake());
        register(&app, "a@x.com").await;

        let (s1, wrong_pw) = call(
            &app,
            json_req(
                "POST",
                "/api/auth/login",
                None,
                json!({ "login": "a@x.com", "password": "nope" }),
            ),
        )
        .await;
        let (s2, no_user) = call(
            &app,
            json_req(
                "POST",
                "/api/auth/login",
                None,
                json!({ "login": "ghost@x.com", "password": "pw" }),
            ),
        )
        .await;

        assert_eq!(s1, StatusCode::UNAUTHORIZED);
        assert_eq!(s2, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_pw, no_user);
        let text = wrong_pw.to_string().to_lowercase();
        assert!(!text.contains("email"));
        assert!(!text.contains("not found"));
    }

    #[tokio::test]
    async fn duplicate_registration_is_a_conflict() {
        let app = build_app(AppState::fake());
        let first = register(&app, "a@x.com").await;

        let (status, _) = call(
            &app,
            json_req(
                "POST",
                "/api/auth/register",
                None,
                json!({ "email": "a@x.com", "password": "other", "name": "B" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, me) = call(&app, get_req("/api/auth/me", Some(&first))).await;
        assert_eq!(me["name"], "A");

        let (status, _) = call(
            &app,
            json_req(
                "POST",
                "/api/auth/login",
                None,
                json!({ "login": "a@x.com", "password": "pw" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_routes_refuse_anonymous_and_bad_tokens() {
        let app = build_app(AppState::fake());
        let valid = register(&app, "a@x.com").await;
        let tampered = format!("{}x", valid);

        for token in [None, Some(""), Some("junk"), Some(tampered.as_str())] {
            for uri in ["/api/auth/me", "/api/rentals", "/api/rentals/image/a.png"] {
                let (status, body) = call(&app, get_req(uri, token)).await;
                assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri} {token:?}");
                assert_eq!(body["message"], "Unauthorized");
            }
        }
    }

    #[tokio::test]
    async fn anonymous_create_stores_nothing() {
        let (state, storage) = AppState::fake_with_storage();
        let app = build_app(state.clone());

        let (status, _) = call(&app, rental_form(None, FLAT, true)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(state.rentals.list_all().await.unwrap().is_empty());
        assert_eq!(storage.len(), 0);
    }

    #[tokio::test]
    async fn rental_lifecycle() {
        let (state, storage) = AppState::fake_with_storage();
        let app = build_app(state.clone());
        let owner = register(&app, "owner@x.com").await;
        let guest = register(&app, "guest@x.com").await;

        let (status, body) = call(&app, rental_form(Some(&owner), FLAT, true)).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["message"], "Rental created !");
        assert_eq!(storage.len(), 1);

        let (status, list) = call(&app, get_req("/api/rentals", Some(&guest))).await;
        assert_eq!(status, StatusCode::OK);
        let rental = &list["rentals"][0];
        assert_eq!(rental["name"], "Flat");
        assert_eq!(rental["surface"], 42.0);
        let id = rental["id"].as_str().unwrap().to_string();
        let picture = rental["picture"].as_str().unwrap().to_string();
        assert!(picture.starts_with("/api/rentals/image/"));

        let res = app
            .clone()
            .oneshot(get_req(&picture, Some(&guest)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[header::CONTENT_TYPE], "image/png");
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], PNG);

        // The guest may read but not edit.
        let edit = [("name", "Mine"), ("surface", "1"), ("price", "1")];
        let (status, _) = call(&app, put_form(&guest, &id, &edit)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let edit = [("name", "Loft"), ("surface", "50"), ("price", "1000")];
        let (status, body) = call(&app, put_form(&owner, &id, &edit)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Rental updated !");

        let (_, one) = call(&app, get_req(&format!("/api/rentals/{id}"), Some(&guest))).await;
        assert_eq!(one["name"], "Loft");
        assert_eq!(one["picture"], picture.as_str());
    }

    #[tokio::test]
    async fn create_without_picture_is_rejected() {
        let (state, storage) = AppState::fake_with_storage();
        let app = build_app(state.clone());
        let owner = register(&app, "owner@x.com").await;

        let (status, _) = call(&app, rental_form(Some(&owner), FLAT, false)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(state.rentals.list_all().await.unwrap().is_empty());
        assert_eq!(storage.len(), 0);
    }

    #[tokio::test]
    async fn messages_are_stamped_with_the_caller() {
        let (state, _) = AppState::fake_with_storage();
        let app = build_app(state.clone());
        let owner = register(&app, "owner@x.com").await;
        let guest = register(&app, "guest@x.com").await;

        call(&app, rental_form(Some(&owner), FLAT, true)).await;
        let rental_id = state.rentals.list_all().await.unwrap()[0].id;

        let (status, body) = call(
            &app,
            json_req(
                "POST",
                "/api/messages",
                Some(&guest),
                json!({ "message": "Is it free in May?", "rental_id": rental_id }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Message sent with success");

        let (_, guest_me) = call(&app, get_req("/api/auth/me", Some(&guest))).await;
        let (status, listed) = call(
            &app,
            get_req(&format!("/api/messages?rental_id={rental_id}"), Some(&owner)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert_eq!(listed[0]["user_id"], guest_me["id"]);

        let (status, _) = call(
            &app,
            json_req(
                "POST",
                "/api/messages",
                None,
                json!({ "message": "hi", "rental_id": rental_id }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
