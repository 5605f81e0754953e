use std::time::Duration;

use pretty_assertions::assert_eq;
use rstest::*;
use serde_json::json;
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, ResponseTemplate,
};

use taskdeck::task::{TaskDraft, TaskId, TaskPriority, TaskStatus};
use taskdeck_client::{errors::ClientError, session::SessionState};

use crate::helpers::{authenticated_client, mock_list_tasks, task_json, tested_client, TestedClient};

#[rstest]
#[tokio::test]
async fn test_create_task_then_list(#[future] authenticated_client: TestedClient) {
    let app = authenticated_client.await;
    let created = task_json(1, "A", "todo", "high", "2024-03-01T10:00:00Z");

    Mock::given(method("POST"))
        .and(path("/tasks"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_partial_json(
            json!({ "title": "A", "status": "todo", "priority": "high" }),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(created.clone()))
        .expect(1)
        .mount(&app.mock_server)
        .await;
    mock_list_tasks(&app.mock_server, json!([created])).await;

    let mut draft = TaskDraft::try_new("A".to_string()).unwrap();
    draft.priority = TaskPriority::High;
    let task = app.client.tasks.create(draft).await.unwrap();

    assert_eq!(task.title, "A");
    assert_eq!(task.status, TaskStatus::Todo);

    let derived = app.client.tasks.derived_tasks();
    assert_eq!(derived.len(), 1);
    assert_eq!(derived[0].id, TaskId(1));
    assert_eq!(derived[0].priority, TaskPriority::High);
}

#[rstest]
#[tokio::test]
async fn test_create_with_empty_title_is_refused_locally(
    #[future] authenticated_client: TestedClient,
) {
    let app = authenticated_client.await;

    let result = app.client.tasks.create(TaskDraft::default()).await;

    assert!(matches!(result, Err(ClientError::InvalidInputData { .. })));
    assert!(app
        .mock_server
        .received_requests()
        .await
        .unwrap()
        .is_empty());
}

#[rstest]
#[tokio::test]
async fn test_concurrent_updates_on_same_task_conflict(
    #[future] authenticated_client: TestedClient,
) {
    let app = authenticated_client.await;
    let existing = task_json(7, "Report", "todo", "medium", "2024-03-01T10:00:00Z");
    mock_list_tasks(&app.mock_server, json!([existing.clone()])).await;
    app.client.tasks.refresh().await.unwrap();

    Mock::given(method("PUT"))
        .and(path("/tasks/7"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(existing)
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&app.mock_server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/tasks/8"))
        .respond_with(ResponseTemplate::new(200).set_body_json(task_json(
            8,
            "Other",
            "todo",
            "low",
            "2024-03-02T10:00:00Z",
        )))
        .expect(1)
        .mount(&app.mock_server)
        .await;

    let draft = TaskDraft::try_new("Report".to_string()).unwrap();
    let other_draft = TaskDraft::try_new("Other".to_string()).unwrap();
    let (first, second, other) = tokio::join!(
        app.client.tasks.update(TaskId(7), draft.clone()),
        async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            assert!(app.client.tasks.is_mutating(TaskId(7)));
            app.client.tasks.update(TaskId(7), draft.clone()).await
        },
        async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            app.client.tasks.update(TaskId(8), other_draft).await
        }
    );

    assert!(first.is_ok());
    assert!(matches!(second, Err(ClientError::Conflict(TaskId(7)))));
    assert!(other.is_ok());
    assert!(!app.client.tasks.is_mutating(TaskId(7)));
}

#[rstest]
#[tokio::test]
async fn test_failed_update_leaves_collection_unchanged(
    #[future] authenticated_client: TestedClient,
) {
    let app = authenticated_client.await;
    let existing = task_json(7, "Report", "todo", "medium", "2024-03-01T10:00:00Z");
    mock_list_tasks(&app.mock_server, json!([existing])).await;
    app.client.tasks.refresh().await.unwrap();
    let before = app.client.tasks.derived_tasks();

    Mock::given(method("PUT"))
        .and(path("/tasks/7"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "detail": "Something went wrong" })),
        )
        .mount(&app.mock_server)
        .await;

    let draft = TaskDraft::try_new("Renamed".to_string()).unwrap();
    let result = app.client.tasks.update(TaskId(7), draft).await;

    let error = result.unwrap_err();
    assert!(matches!(error, ClientError::Remote { .. }));
    assert_eq!(error.user_message(), "Something went wrong");
    assert_eq!(app.client.tasks.derived_tasks(), before);

    // No reconciling read is issued for a failed mutation
    let list_calls = app
        .mock_server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|request| request.method.as_str() == "GET" && request.url.path() == "/tasks")
        .count();
    assert_eq!(list_calls, 1);
}

#[rstest]
#[tokio::test]
async fn test_stale_refresh_response_is_discarded(#[future] authenticated_client: TestedClient) {
    let app = authenticated_client.await;
    let old = json!([task_json(1, "Old", "todo", "medium", "2024-03-01T10:00:00Z")]);
    let new = json!([
        task_json(1, "Old", "todo", "medium", "2024-03-01T10:00:00Z"),
        task_json(2, "New", "todo", "medium", "2024-03-02T10:00:00Z"),
    ]);

    Mock::given(method("GET"))
        .and(path("/tasks"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(old)
                .set_delay(Duration::from_millis(300)),
        )
        .up_to_n_times(1)
        .mount(&app.mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(new))
        .mount(&app.mock_server)
        .await;

    let (slow, fast) = tokio::join!(app.client.tasks.refresh(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        app.client.tasks.refresh().await
    });
    slow.unwrap();
    fast.unwrap();

    // The slower, earlier-issued response must not overwrite the newer one
    assert_eq!(app.client.tasks.derived_tasks().len(), 2);
}

#[rstest]
#[tokio::test]
async fn test_delete_is_a_two_step_commit(#[future] authenticated_client: TestedClient) {
    let app = authenticated_client.await;
    let existing = task_json(7, "Report", "todo", "medium", "2024-03-01T10:00:00Z");
    Mock::given(method("GET"))
        .and(path("/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([existing])))
        .up_to_n_times(1)
        .mount(&app.mock_server)
        .await;
    app.client.tasks.refresh().await.unwrap();

    let result = app.client.tasks.confirm_delete(TaskId(7)).await;
    assert!(matches!(result, Err(ClientError::InvalidInputData { .. })));

    app.client.tasks.request_delete(TaskId(7));
    assert!(app.client.tasks.has_pending_delete(TaskId(7)));
    assert_eq!(
        app.client.tasks.mutation_state().pending_delete,
        vec![TaskId(7)]
    );

    Mock::given(method("DELETE"))
        .and(path("/tasks/7"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&app.mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&app.mock_server)
        .await;

    app.client.tasks.confirm_delete(TaskId(7)).await.unwrap();

    assert!(!app.client.tasks.has_pending_delete(TaskId(7)));
    assert!(!app.client.tasks.is_mutating(TaskId(7)));
    assert!(app.client.tasks.derived_tasks().is_empty());
}

#[rstest]
#[tokio::test]
async fn test_cancel_delete(#[future] authenticated_client: TestedClient) {
    let app = authenticated_client.await;

    app.client.tasks.request_delete(TaskId(7));
    app.client.tasks.cancel_delete(TaskId(7));

    let result = app.client.tasks.confirm_delete(TaskId(7)).await;
    assert!(matches!(result, Err(ClientError::InvalidInputData { .. })));
    assert!(app
        .mock_server
        .received_requests()
        .await
        .unwrap()
        .is_empty());
}

#[rstest]
#[tokio::test]
async fn test_set_status_carries_forward_other_fields(
    #[future] authenticated_client: TestedClient,
) {
    let app = authenticated_client.await;
    let existing = json!({
        "id": 1,
        "title": "Write report",
        "description": "quarterly numbers",
        "status": "todo",
        "priority": "urgent",
        "deadline": "2024-04-01T09:00:00Z",
        "created_at": "2024-03-01T10:00:00Z",
    });
    mock_list_tasks(&app.mock_server, json!([existing])).await;
    app.client.tasks.refresh().await.unwrap();

    let mut updated = existing.clone();
    updated["status"] = json!("completed");
    Mock::given(method("PUT"))
        .and(path("/tasks/1"))
        .and(body_partial_json(json!({
            "title": "Write report",
            "description": "quarterly numbers",
            "priority": "urgent",
            "deadline": "2024-04-01T09:00:00Z",
            "status": "completed",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(updated))
        .expect(1)
        .mount(&app.mock_server)
        .await;

    let task = app
        .client
        .tasks
        .set_status(TaskId(1), TaskStatus::Completed)
        .await
        .unwrap();
    assert_eq!(task.status, TaskStatus::Completed);

    let unknown = app
        .client
        .tasks
        .set_status(TaskId(99), TaskStatus::Completed)
        .await;
    assert!(matches!(unknown, Err(ClientError::InvalidInputData { .. })));
}

#[rstest]
#[tokio::test]
async fn test_unauthorized_response_logs_out(#[future] authenticated_client: TestedClient) {
    let app = authenticated_client.await;
    Mock::given(method("GET"))
        .and(path("/tasks"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "detail": "Invalid authentication credentials" })),
        )
        .mount(&app.mock_server)
        .await;

    let result = app.client.tasks.refresh().await;

    assert!(
        matches!(result, Err(ClientError::Unauthorized(ref message)) if message == "Invalid authentication credentials")
    );
    assert_eq!(app.client.session.state(), SessionState::LoggedOut);
    assert!(!app.settings.storage.credentials_file.exists());
}

#[rstest]
#[tokio::test]
async fn test_protected_call_refused_when_logged_out(#[future] tested_client: TestedClient) {
    let app = tested_client.await;

    let result = app.client.tasks.refresh().await;

    assert!(matches!(result, Err(ClientError::Unauthorized(_))));
    assert!(app
        .mock_server
        .received_requests()
        .await
        .unwrap()
        .is_empty());
}
