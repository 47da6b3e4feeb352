//! Shared route helpers.

use axum::Json;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::models::Role;

/// Wrap a single document in the standard `{success, data}` response.
pub fn data_response<T: Serialize>(data: &T) -> AppResult<Json<serde_json::Value>> {
    Ok(Json(json!({ "success": true, "data": data })))
}

/// Wrap a plain list (no pagination) in `{success, count, data}`.
pub fn list_response<T: Serialize>(data: &[T]) -> AppResult<Json<serde_json::Value>> {
    Ok(Json(json!({
        "success": true,
        "count": data.len(),
        "data": data,
    })))
}

/// Require the current user to own the record or be an admin.
pub fn ensure_owner(user: &CurrentUser, owner_id: Uuid, what: &str) -> Result<(), AppError> {
    if user.role == Role::Admin || user.id == owner_id {
        return Ok(());
    }
    Err(AppError::Forbidden(format!(
        "user {} is not allowed to modify this {what}",
        user.name
    )))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn user_with_role(role: Role) -> CurrentUser {
        CurrentUser {
            id: Uuid::now_v7(),
            name: "Sam".to_string(),
            email: "sam@example.com".to_string(),
            role,
        }
    }

    #[test]
    fn owner_and_admin_pass_ownership_check() {
        let owner = user_with_role(Role::Publisher);
        assert!(ensure_owner(&owner, owner.id, "bootcamp").is_ok());

        let admin = user_with_role(Role::Admin);
        assert!(ensure_owner(&admin, Uuid::now_v7(), "bootcamp").is_ok());
    }

    #[test]
    fn stranger_fails_ownership_check() {
        let user = user_with_role(Role::Publisher);
        let err = ensure_owner(&user, Uuid::now_v7(), "course").unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
}
