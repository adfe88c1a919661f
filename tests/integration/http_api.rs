//! Integration tests for the REST client against an in-process backend.
//!
//! Verifies the exact paths and JSON bodies `HttpTaskApi` sends, that the
//! task list decodes from the backend's `_id` shape, and that non-2xx
//! answers surface as `ApiError::Status`.
//!
//! Verification command: `cargo test --test http_api`

mod support;

use serde_json::json;

use taskboard::api::http::{HttpApiConfig, HttpTaskApi};
use taskboard::api::{ApiError, TaskApi};
use taskboard_proto::api::{NewTask, OrderEntry, ReorderRequest, TaskPatch, UserRecord};
use taskboard_proto::task::{Category, TaskId};

use support::{FakeBackend, task};

fn client(backend: &FakeBackend) -> HttpTaskApi {
    HttpTaskApi::new(&HttpApiConfig::new(backend.base_url())).unwrap()
}

#[tokio::test]
async fn list_decodes_backend_ids() {
    let backend = FakeBackend::start_with(vec![
        task("65f0a", Category::Todo, 0),
        task("65f0b", Category::Done, 3),
    ])
    .await;

    let tasks = client(&backend).list_tasks().await.unwrap();

    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].id, TaskId::new("65f0a"));
    assert_eq!(tasks[1].category, Category::Done);
    assert_eq!(tasks[1].order, 3);
}

#[tokio::test]
async fn create_posts_full_body() {
    let backend = FakeBackend::start().await;
    let new = NewTask {
        email: "ada@example.com".to_string(),
        title: "Write docs".to_string(),
        description: "all of them".to_string(),
        timestamp: "2025-02-20T10:00:00.000Z".to_string(),
        category: Category::Todo,
        order: 0,
    };

    client(&backend).create_task(&new).await.unwrap();

    let requests = backend.mutations();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].path, "/task");
    assert_eq!(
        requests[0].body,
        json!({
            "email": "ada@example.com",
            "title": "Write docs",
            "description": "all of them",
            "timestamp": "2025-02-20T10:00:00.000Z",
            "category": "To-Do",
            "order": 0,
        })
    );
    assert_eq!(backend.tasks().len(), 1);
}

#[tokio::test]
async fn category_patch_sends_only_category() {
    let backend = FakeBackend::start_with(vec![task("1", Category::Todo, 0)]).await;

    client(&backend)
        .update_task(&TaskId::new("1"), &TaskPatch::category(Category::InProgress))
        .await
        .unwrap();

    let requests = backend.mutations();
    assert_eq!(requests[0].method, "PUT");
    assert_eq!(requests[0].path, "/tasks/1");
    assert_eq!(requests[0].body, json!({ "category": "In Progress" }));
    assert_eq!(backend.tasks()[0].category, Category::InProgress);
}

#[tokio::test]
async fn reorder_sends_every_entry() {
    let backend = FakeBackend::start_with(vec![
        task("1", Category::Todo, 0),
        task("2", Category::Todo, 1),
    ])
    .await;
    let request = ReorderRequest {
        category: Category::Todo,
        tasks: vec![
            OrderEntry {
                id: TaskId::new("2"),
                order: 0,
            },
            OrderEntry {
                id: TaskId::new("1"),
                order: 1,
            },
        ],
    };

    client(&backend).reorder(&request).await.unwrap();

    let requests = backend.mutations();
    assert_eq!(requests[0].path, "/reorder");
    assert_eq!(
        requests[0].body,
        json!({
            "category": "To-Do",
            "tasks": [{ "id": "2", "order": 0 }, { "id": "1", "order": 1 }],
        })
    );
}

#[tokio::test]
async fn delete_encodes_id_in_path() {
    let backend = FakeBackend::start_with(vec![task("a b", Category::Todo, 0)]).await;

    client(&backend)
        .delete_task(&TaskId::new("a b"))
        .await
        .unwrap();

    assert!(backend.tasks().is_empty());
    assert_eq!(backend.mutations()[0].path, "/delete/a b");
}

#[tokio::test]
async fn missing_task_is_status_404() {
    let backend = FakeBackend::start().await;

    let result = client(&backend).delete_task(&TaskId::new("ghost")).await;

    assert!(
        matches!(result, Err(ApiError::Status { status: 404, .. })),
        "got {result:?}"
    );
}

#[tokio::test]
async fn server_error_is_status_500() {
    let backend = FakeBackend::start().await;
    backend.fail_next(1);

    let result = client(&backend).list_tasks().await;
    assert!(matches!(result, Err(ApiError::Status { status: 500, .. })));

    // The failure is consumed.
    assert!(client(&backend).list_tasks().await.is_ok());
}

#[tokio::test]
async fn unreachable_backend_is_http_error() {
    let backend = FakeBackend::start().await;
    let url = backend.base_url();
    backend.stop();
    drop(backend);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let api = HttpTaskApi::new(&HttpApiConfig::new(url)).unwrap();
    assert!(matches!(api.list_tasks().await, Err(ApiError::Http(_))));
}

#[tokio::test]
async fn users_go_to_their_own_host() {
    let tasks_backend = FakeBackend::start().await;
    let users_backend = FakeBackend::start().await;
    let api = HttpTaskApi::new(&HttpApiConfig {
        base_url: tasks_backend.base_url(),
        user_base_url: Some(users_backend.base_url()),
        request_timeout: None,
    })
    .unwrap();

    let user = UserRecord {
        name: "Ada".to_string(),
        email: "ada@example.com".to_string(),
        imgurl: "https://img/ada.png".to_string(),
    };
    api.register_user(&user).await.unwrap();

    assert!(tasks_backend.requests().is_empty());
    assert_eq!(users_backend.users(), vec![user]);
    assert_eq!(
        users_backend.requests()[0].body,
        json!({ "name": "Ada", "email": "ada@example.com", "imgurl": "https://img/ada.png" })
    );
}
