//! Chain execution: ordering, short-circuits, failures and defaults.

use super::*;
use crate::{Error, Router};
use axum::http::StatusCode;
use tracing_test::traced_test;

#[tokio::test]
async fn test_global_then_group_then_route() {
    let log = new_log();
    let app = create_test_app();
    app.use_middleware([recorder(&log, "global")]);
    let api = app.group("/api");
    api.use_middleware([recorder(&log, "api")]);
    api.get("/users", [recorder(&log, "handler"), text("users")]);

    let response = send(app, get_request("/api/users")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(get_body_string(response).await, "users");
    assert_eq!(*log.lock().unwrap(), vec!["global", "api", "handler"]);
}

#[tokio::test]
async fn test_root_route_gets_only_global_middleware() {
    let log = new_log();
    let app = create_test_app();
    app.use_middleware([recorder(&log, "g1")]);
    app.group("/admin").use_middleware([recorder(&log, "admin")]);
    app.use_middleware([recorder(&log, "g2")]);
    app.get("/users", [text("ok")]);

    send(app, get_request("/users")).await;

    assert_eq!(*log.lock().unwrap(), vec!["g1", "g2"]);
}

#[tokio::test]
async fn test_failure_stops_chain_with_fixed_500() {
    let log = new_log();
    let app = create_test_app();
    app.use_middleware([recorder(&log, "m1")]);
    app.get(
        "/fail",
        [
            handler_fn(|_ctx| {
                Box::pin(async move { Err(Error::internal("upstream unavailable")) })
            }),
            recorder(&log, "never"),
        ],
    );

    let response = send(app, get_request("/fail")).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = get_body_json(response).await;
    assert_eq!(body["error_code"], "INTERNAL_ERROR");
    assert_eq!(body["message"], "upstream unavailable");
    assert_eq!(*log.lock().unwrap(), vec!["m1"]);
}

#[tokio::test]
async fn test_failure_response_drops_staged_headers() {
    let app = create_test_app();
    app.get(
        "/fail",
        [handler_fn(|ctx| {
            Box::pin(async move {
                ctx.try_header("x-served-by", "chainroute")?
                    .status(StatusCode::ACCEPTED);
                Err(Error::internal("gave up"))
            })
        })],
    );

    let response = send(app, get_request("/fail")).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!response.headers().contains_key("x-served-by"));
    assert_eq!(response.headers()["content-type"], "application/json");
    let body = get_body_json(response).await;
    assert_eq!(body["error_code"], "INTERNAL_ERROR");
}

#[tokio::test]
async fn test_short_circuit_response_is_kept() {
    let log = new_log();
    let app = create_test_app();
    app.use_middleware([handler_fn(|ctx| {
        Box::pin(async move { ctx.status(StatusCode::CREATED).text("created early") })
    })]);
    app.get("/items", [recorder(&log, "handler"), text("late")]);

    let response = send(app, get_request("/items")).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(get_body_string(response).await, "created early");
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_chain_defaults_to_200() {
    let app = create_test_app();
    app.get("/empty", Vec::new());

    let response = send(app, get_request("/empty")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(get_body_string(response).await, "");
}

#[tokio::test]
async fn test_staged_status_without_write() {
    let app = create_test_app();
    app.use_middleware([handler_fn(|ctx| {
        Box::pin(async move {
            ctx.status(StatusCode::ACCEPTED);
            ctx.next().await
        })
    })]);
    app.post("/jobs", Vec::new());

    let response = send(app, post_request("/jobs")).await;

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(get_body_string(response).await, "");
}

#[tokio::test]
async fn test_middleware_sees_result_after_next() {
    let app = create_test_app();
    app.use_middleware([handler_fn(|ctx| {
        Box::pin(async move {
            let result = ctx.next().await;
            if result.is_err() && !ctx.is_written() {
                ctx.status(StatusCode::SERVICE_UNAVAILABLE).text("recovered")?;
                return Ok(());
            }
            result
        })
    })]);
    app.get(
        "/flaky",
        [handler_fn(|_ctx| {
            Box::pin(async move { Err(Error::internal("flaky")) })
        })],
    );

    let response = send(app, get_request("/flaky")).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(get_body_string(response).await, "recovered");
}

#[tokio::test]
async fn test_locals_flow_from_middleware_to_handler() {
    let app = create_test_app();
    app.use_middleware([handler_fn(|ctx| {
        Box::pin(async move {
            ctx.set_local("user", "alice".to_string());
            ctx.next().await
        })
    })]);
    app.get(
        "/me",
        [handler_fn(|ctx| {
            Box::pin(async move {
                let user = ctx
                    .local::<String>("user")
                    .cloned()
                    .unwrap_or_default();
                ctx.text(user)
            })
        })],
    );

    let response = send(app, get_request("/me")).await;
    assert_eq!(get_body_string(response).await, "alice");
}

#[tokio::test]
#[traced_test]
async fn test_double_write_keeps_first_response() {
    let app = create_test_app();
    app.get(
        "/twice",
        [handler_fn(|ctx| {
            Box::pin(async move {
                ctx.status(StatusCode::CREATED).text("first")?;
                ctx.send_status(StatusCode::NO_CONTENT)
            })
        })],
    );

    let response = send(app, get_request("/twice")).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(get_body_string(response).await, "first");
    assert!(logs_contain("Response already written"));
}

#[tokio::test]
#[traced_test]
async fn test_failure_after_write_keeps_written_response() {
    let app = create_test_app();
    app.get(
        "/late-fail",
        [handler_fn(|ctx| {
            Box::pin(async move {
                ctx.text("partial")?;
                Err(Error::internal("after write"))
            })
        })],
    );

    let response = send(app, get_request("/late-fail")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(get_body_string(response).await, "partial");
    assert!(logs_contain("Handler chain failed"));
    assert!(logs_contain("cannot send error response"));
}
