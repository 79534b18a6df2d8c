use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{NewTask, TaskInput, TaskListParams, TaskQuery, UpdateTaskRequest},
    state::AppState,
};
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use validator::Validate;

const NOT_FOUND_OR_NOT_OWNED: &str = "Task not found or not owned by you";

fn not_found() -> AppError {
    AppError::NotFound(NOT_FOUND_OR_NOT_OWNED.into())
}

/// Retrieves a page of the authenticated user's tasks.
///
/// ## Query Parameters:
/// - `page` (optional): 1-based page number, defaults to 1.
/// - `limit` (optional): page size between 1 and 100, defaults to 10.
/// - `status` (optional): `pending`, `in_progress` or `completed`.
/// - `sort` (optional): `created_at:asc`, `created_at:desc` (default),
///   `priority:asc` or `priority:desc`.
///
/// ## Responses:
/// - `200 OK`: `{ "tasks": [...], "meta": { "total", "page", "limit" } }`.
/// - `401 Unauthorized`: If the request lacks a valid session token.
#[get("")]
pub async fn get_tasks(
    state: web::Data<AppState>,
    query_params: web::Query<TaskQuery>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let params = TaskListParams::from(&*query_params);
    let page = state.store.list_tasks(user.id, &params).await?;
    Ok(HttpResponse::Ok().json(page))
}

/// Creates a new task owned by the authenticated user.
///
/// ## Responses:
/// - `201 Created`: Returns the new task.
/// - `422 Unprocessable Entity`: If `TaskInput` validation fails.
#[post("")]
pub async fn create_task(
    state: web::Data<AppState>,
    task_data: web::Json<TaskInput>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;

    let task = state
        .store
        .create_task(
            user.id,
            NewTask::from(task_data.into_inner()),
            state.clock.now(),
        )
        .await?;

    log::debug!("account {} created task {}", user.id, task.id);
    Ok(HttpResponse::Created().json(task))
}

/// Retrieves a task by id.
///
/// A task that does not exist and a task owned by someone else produce the
/// same `404`.
#[get("/{id}")]
pub async fn get_task(
    state: web::Data<AppState>,
    task_id: web::Path<i64>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let task = state
        .store
        .find_task(task_id.into_inner(), user.id)
        .await?
        .ok_or_else(not_found)?;
    Ok(HttpResponse::Ok().json(task))
}

/// Partially updates a task.
///
/// Only present, non-empty fields are written. A body with nothing to apply is
/// rejected with `400` before the store is touched.
#[put("/{id}")]
pub async fn update_task(
    state: web::Data<AppState>,
    task_id: web::Path<i64>,
    task_data: web::Json<UpdateTaskRequest>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;
    let changes = task_data.into_inner().into_changes();
    if changes.is_empty() {
        return Err(AppError::NoFieldsProvided);
    }

    let task = state
        .store
        .update_task(task_id.into_inner(), user.id, &changes, state.clock.now())
        .await?
        .ok_or_else(not_found)?;
    Ok(HttpResponse::Ok().json(task))
}

/// Deletes a task.
///
/// ## Responses:
/// - `204 No Content`: On successful deletion.
/// - `404 Not Found`: Missing or not owned by the caller.
#[delete("/{id}")]
pub async fn delete_task(
    state: web::Data<AppState>,
    task_id: web::Path<i64>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let deleted = state.store.delete_task(task_id.into_inner(), user.id).await?;
    if deleted == 0 {
        return Err(not_found());
    }

    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use crate::models::{TaskInput, TaskStatus, UpdateTaskRequest};
    use validator::Validate;

    #[test]
    fn test_task_input_validation() {
        let input = |title: &str, description: &str, priority: Option<i16>| TaskInput {
            title: title.to_string(),
            description: description.to_string(),
            priority,
            status: Some(TaskStatus::Pending),
        };

        assert!(
            input("", "Test Description", Some(1)).validate().is_err(),
            "Validation should fail for empty title."
        );
        assert!(
            input(&"a".repeat(201), "", None).validate().is_err(),
            "Validation should fail for overly long title."
        );
        assert!(
            input("Valid Title", &"b".repeat(1001), None).validate().is_err(),
            "Validation should fail for overly long description."
        );
        assert!(
            input("Valid Title", "", Some(11)).validate().is_err(),
            "Validation should fail for priority above 10."
        );
        assert!(
            input("Valid Title", "Test Description", Some(10)).validate().is_ok(),
            "Validation should pass for valid input."
        );
    }

    #[test]
    fn test_update_with_only_empty_strings_has_no_changes() {
        let update = UpdateTaskRequest {
            title: Some(String::new()),
            description: Some("  ".into()),
            ..Default::default()
        };
        assert!(update.into_changes().is_empty());
    }
}
