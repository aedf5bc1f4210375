//! End-to-end tests over real TCP connections.

use reqwest::{multipart, StatusCode};

mod common;

use common::{base_config, client, spawn_with_echo, PASSWORD, USER};

#[tokio::test]
async fn missing_credentials_get_challenge() {
    let server = spawn_with_echo(base_config()).await;

    let response = client().get(server.url("/echo")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()["www-authenticate"], "Basic");
    assert_eq!(response.text().await.unwrap(), "Authentication required");

    server.stop().await;
}

#[tokio::test]
async fn authenticated_get_reaches_module() {
    let server = spawn_with_echo(base_config()).await;

    let response = client()
        .get(server.url("/echo"))
        .basic_auth(USER, Some(PASSWORD))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-module"], "echo");
    assert_eq!(
        response.headers()["content-type"],
        "text/html; charset=utf-8"
    );
    assert_eq!(response.text().await.unwrap(), "ready");

    server.stop().await;
}

#[tokio::test]
async fn suppressed_headers_are_stripped_even_when_modules_set_them() {
    let server = spawn_with_echo(base_config()).await;

    let response = client()
        .get(server.url("/echo"))
        .basic_auth(USER, Some(PASSWORD))
        .send()
        .await
        .unwrap();
    assert!(response.headers().get("server").is_none());

    server.stop().await;
}

#[tokio::test]
async fn multipart_and_urlencoded_posts_are_decoded() {
    let server = spawn_with_echo(base_config()).await;

    let form = multipart::Form::new().text("msg", "via multipart");
    let response = client()
        .post(server.url("/echo"))
        .basic_auth(USER, Some(PASSWORD))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "via multipart");

    let response = client()
        .post(server.url("/echo"))
        .basic_auth(USER, Some(PASSWORD))
        .header("content-type", "application/x-www-form-urlencoded")
        .body("msg=via%20form")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "via form");

    server.stop().await;
}

#[tokio::test]
async fn module_failure_is_500() {
    let server = spawn_with_echo(base_config()).await;

    let response = client()
        .post(server.url("/echo"))
        .basic_auth(USER, Some(PASSWORD))
        .multipart(multipart::Form::new().text("other", "x"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.text().await.unwrap(), "msg field missing");

    server.stop().await;
}

#[tokio::test]
async fn unclaimed_path_is_generic_404() {
    let server = spawn_with_echo(base_config()).await;

    let response = client()
        .get(server.url("/admin"))
        .basic_auth(USER, Some(PASSWORD))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.headers().get("x-module").is_none());
    let body = response.text().await.unwrap();
    assert!(!body.contains("echo"));

    server.stop().await;
}

#[tokio::test]
async fn transport_errors_use_status_codes() {
    let mut config = base_config();
    config.transport.max_body_size = 1024;
    let server = spawn_with_echo(config).await;

    let response = client()
        .post(server.url("/echo"))
        .basic_auth(USER, Some(PASSWORD))
        .header("content-type", "application/json")
        .body("{}")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(response.text().await.unwrap(), "");

    let response = client()
        .post(server.url("/echo"))
        .basic_auth(USER, Some(PASSWORD))
        .header("content-type", "application/x-www-form-urlencoded")
        .body(format!("msg={}", "a".repeat(4096)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let response = client()
        .delete(server.url("/echo"))
        .basic_auth(USER, Some(PASSWORD))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);

    server.stop().await;
}

#[tokio::test]
async fn repeated_failures_drop_the_connection() {
    let mut config = base_config();
    config.throttle.failure_threshold = 2;
    config.throttle.block_duration_secs = 60;
    let server = spawn_with_echo(config).await;
    let client = client();

    for _ in 0..2 {
        let response = client
            .get(server.url("/echo"))
            .basic_auth(USER, Some("wrong"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    // Correct credentials no longer help; the peer gets no response at all.
    let result = client
        .get(server.url("/echo"))
        .basic_auth(USER, Some(PASSWORD))
        .send()
        .await;
    assert!(result.is_err());

    server.stop().await;
}

#[tokio::test]
async fn peer_blocked_on_a_kept_alive_connection_loses_it() {
    let mut config = base_config();
    config.throttle.failure_threshold = 2;
    let server = spawn_with_echo(config).await;
    let client = common::pooled_client();

    let response = client
        .get(server.url("/echo"))
        .basic_auth(USER, Some(PASSWORD))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    response.text().await.unwrap();

    for _ in 0..2 {
        let response = client
            .get(server.url("/echo"))
            .basic_auth(USER, Some("wrong"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        response.text().await.unwrap();
    }

    let result = client
        .get(server.url("/echo"))
        .basic_auth(USER, Some(PASSWORD))
        .send()
        .await;
    assert!(result.is_err());

    server.stop().await;
}

#[tokio::test]
async fn http2_is_not_served() {
    let server = spawn_with_echo(base_config()).await;
    let client = reqwest::Client::builder()
        .http2_prior_knowledge()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .unwrap();

    let result = client
        .get(server.url("/echo"))
        .basic_auth(USER, Some(PASSWORD))
        .send()
        .await;
    assert!(result.is_err());

    server.stop().await;
}

#[tokio::test]
async fn allow_listed_peer_is_never_blocked() {
    let mut config = base_config();
    config.throttle.allow = vec!["127.0.0.1".to_string()];
    config.throttle.failure_threshold = 1;
    let server = spawn_with_echo(config).await;
    let client = client();

    for _ in 0..3 {
        let response = client.get(server.url("/echo")).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
    let response = client
        .get(server.url("/echo"))
        .basic_auth(USER, Some(PASSWORD))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    server.stop().await;
}

#[tokio::test]
async fn deny_listed_peer_is_dropped() {
    let mut config = base_config();
    config.throttle.allow = vec!["127.0.0.1".to_string()];
    config.throttle.deny = vec!["127.0.0.1".to_string()];
    let server = spawn_with_echo(config).await;

    let result = client()
        .get(server.url("/echo"))
        .basic_auth(USER, Some(PASSWORD))
        .send()
        .await;
    assert!(result.is_err());

    server.stop().await;
}

#[cfg(unix)]
#[tokio::test]
async fn gpg_upload_is_decrypted_and_stored() {
    let dir = common::scratch_dir();
    let script = common::fake_gpg(&dir);
    let output_dir = dir.join("out");

    let mut config = base_config();
    let mut module = common::gpg_config(&script, output_dir.clone());
    module.additional_headers.insert("X-Upload".to_string(), "gpg".to_string());
    common::add_gpg_module(&mut config, module);
    let server = common::spawn_from_config(config).await;

    let response = client()
        .get(server.url("/gpg"))
        .basic_auth(USER, Some(PASSWORD))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-upload"], "gpg");
    assert!(response.text().await.unwrap().contains("<form"));

    let part = multipart::Part::bytes(b"top secret".to_vec()).file_name("secret.gpg");
    let response = client()
        .post(server.url("/gpg/"))
        .basic_auth(USER, Some(PASSWORD))
        .multipart(multipart::Form::new().part("file", part))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let stored: Vec<_> = std::fs::read_dir(&output_dir).unwrap().collect();
    assert_eq!(stored.len(), 1);
    let contents = std::fs::read(stored[0].as_ref().unwrap().path()).unwrap();
    assert_eq!(contents, b"top secret");

    server.stop().await;
    std::fs::remove_dir_all(dir).unwrap_or_default();
}
