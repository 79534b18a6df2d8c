mod common;

use actix_cors::Cors;
use actix_web::http::StatusCode;
use actix_web::middleware::Logger;
use actix_web::{rt, test, App, HttpServer};
use chrono::Duration;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::net::TcpListener;

use common::{bearer, register_verify_and_login, TestContext};
use taskwarden::models::{Task, TaskPage, TaskStatus};
use taskwarden::routes;

#[actix_rt::test]
async fn test_create_task_unauthorized() {
    let ctx = TestContext::new();

    // Find an available port
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let state = ctx.state.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .configure(routes::config)
    })
    .workers(1)
    .bind(("127.0.0.1", port))
    .unwrap_or_else(|_| panic!("Failed to bind to port {}", port))
    .run();
    let handle = server.handle();
    rt::spawn(server);

    // Give the server a moment to start
    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("http://127.0.0.1:{}/api/tasks", port))
        .json(&json!({ "title": "Unauthorized Task" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Authentication required");

    let resp = client
        .get(format!("http://127.0.0.1:{}/api/tasks", port))
        .bearer_auth("not-a-token")
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Invalid or expired token");

    let resp = client
        .get(format!("http://127.0.0.1:{}/health", port))
        .send()
        .await
        .expect("Failed to send request");
    assert!(resp.status().is_success());

    handle.stop(false).await;
}

#[actix_rt::test]
async fn test_task_crud_flow() {
    let mut ctx = TestContext::new();
    let app = test::init_service(
        App::new()
            .app_data(ctx.state.clone())
            .configure(routes::config),
    )
    .await;
    let user = register_verify_and_login(&app, &mut ctx, "crud_user", "crud@example.com", "Password123!")
        .await
        .unwrap();

    // Create
    let req = test::TestRequest::post()
        .uri("/api/tasks")
        .insert_header(bearer(&user.token))
        .set_json(json!({ "title": "CRUD Test Task", "description": "Initial", "priority": 3 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Task = test::read_body_json(resp).await;
    assert_eq!(created.user_id, user.id);
    assert_eq!(created.status, TaskStatus::Pending);
    assert_eq!(created.priority, 3);
    assert!(created.completed_at.is_none());

    // Read
    let req = test::TestRequest::get()
        .uri(&format!("/api/tasks/{}", created.id))
        .insert_header(bearer(&user.token))
        .to_request();
    let fetched: Task = test::call_and_read_body_json(&app, req).await;
    assert_eq!(fetched, created);

    // Partial update: only status; completion is stamped.
    ctx.clock.advance(Duration::seconds(5));
    let req = test::TestRequest::put()
        .uri(&format!("/api/tasks/{}", created.id))
        .insert_header(bearer(&user.token))
        .set_json(json!({ "status": "completed", "title": "" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Task = test::read_body_json(resp).await;
    assert_eq!(updated.title, "CRUD Test Task");
    assert_eq!(updated.description, "Initial");
    assert_eq!(updated.status, TaskStatus::Completed);
    assert!(updated.completed_at.is_some());
    assert!(updated.updated_at > created.updated_at);

    // Empty update is rejected and changes nothing.
    let req = test::TestRequest::put()
        .uri(&format!("/api/tasks/{}", created.id))
        .insert_header(bearer(&user.token))
        .set_json(json!({ "title": "", "description": "" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "No fields provided to update");
    assert_eq!(ctx.store.tasks()[0], updated);

    // Invalid priority
    let req = test::TestRequest::put()
        .uri(&format!("/api/tasks/{}", created.id))
        .insert_header(bearer(&user.token))
        .set_json(json!({ "priority": 11 }))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNPROCESSABLE_ENTITY
    );

    // Delete
    let req = test::TestRequest::delete()
        .uri(&format!("/api/tasks/{}", created.id))
        .insert_header(bearer(&user.token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::get()
        .uri(&format!("/api/tasks/{}", created.id))
        .insert_header(bearer(&user.token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_tasks_are_scoped_to_their_owner() {
    let mut ctx = TestContext::new();
    let app = test::init_service(
        App::new()
            .app_data(ctx.state.clone())
            .configure(routes::config),
    )
    .await;
    let owner = register_verify_and_login(&app, &mut ctx, "owner", "owner@x.com", "pw12345678")
        .await
        .unwrap();
    let other = register_verify_and_login(&app, &mut ctx, "other", "other@x.com", "pw12345678")
        .await
        .unwrap();

    let req = test::TestRequest::post()
        .uri("/api/tasks")
        .insert_header(bearer(&owner.token))
        .set_json(json!({ "title": "Private" }))
        .to_request();
    let task: Task = test::call_and_read_body_json(&app, req).await;

    let missing_id = task.id + 1000;
    for id in [task.id, missing_id] {
        let req = test::TestRequest::get()
            .uri(&format!("/api/tasks/{}", id))
            .insert_header(bearer(&other.token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Task not found or not owned by you");

        let req = test::TestRequest::put()
            .uri(&format!("/api/tasks/{}", id))
            .insert_header(bearer(&other.token))
            .set_json(json!({ "title": "Hijacked" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/tasks/{}", id))
            .insert_header(bearer(&other.token))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    let req = test::TestRequest::get()
        .uri("/api/tasks")
        .insert_header(bearer(&other.token))
        .to_request();
    let page: TaskPage = test::call_and_read_body_json(&app, req).await;
    assert!(page.tasks.is_empty());
    assert_eq!(page.meta.total, 0);

    assert_eq!(ctx.store.tasks(), vec![task]);
}

#[actix_rt::test]
async fn test_list_tasks_pagination_filter_and_sort() {
    let mut ctx = TestContext::new();
    let app = test::init_service(
        App::new()
            .app_data(ctx.state.clone())
            .configure(routes::config),
    )
    .await;
    let user = register_verify_and_login(&app, &mut ctx, "lister", "list@x.com", "pw12345678")
        .await
        .unwrap();

    for i in 0..12 {
        ctx.clock.advance(Duration::seconds(1));
        let status = if i % 3 == 0 { "completed" } else { "pending" };
        let req = test::TestRequest::post()
            .uri("/api/tasks")
            .insert_header(bearer(&user.token))
            .set_json(json!({ "title": format!("Task {}", i), "priority": i % 5, "status": status }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
    }

    let list = |query: &str| {
        test::TestRequest::get()
            .uri(&format!("/api/tasks{}", query))
            .insert_header(bearer(&user.token))
            .to_request()
    };

    // Defaults: page 1, limit 10, newest first.
    let page: TaskPage = test::call_and_read_body_json(&app, list("")).await;
    assert_eq!(page.meta.total, 12);
    assert_eq!(page.meta.page, 1);
    assert_eq!(page.meta.limit, 10);
    assert_eq!(page.tasks.len(), 10);
    assert_eq!(page.tasks[0].title, "Task 11");

    let page: TaskPage = test::call_and_read_body_json(&app, list("?page=2&limit=5")).await;
    let titles: Vec<_> = page.tasks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["Task 6", "Task 5", "Task 4", "Task 3", "Task 2"]);

    // Out-of-range limit falls back to the default.
    let page: TaskPage = test::call_and_read_body_json(&app, list("?limit=500")).await;
    assert_eq!(page.meta.limit, 10);

    let page: TaskPage =
        test::call_and_read_body_json(&app, list("?status=completed&sort=created_at:asc")).await;
    assert_eq!(page.meta.total, 4);
    let titles: Vec<_> = page.tasks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["Task 0", "Task 3", "Task 6", "Task 9"]);

    // Ties on priority break newest first.
    let page: TaskPage = test::call_and_read_body_json(&app, list("?sort=priority:desc&limit=3")).await;
    let titles: Vec<_> = page.tasks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["Task 9", "Task 4", "Task 8"]);
}
