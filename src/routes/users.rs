use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::Role;
use crate::db::users;
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::user::{RoleUpdateRequest, User};

#[utoipa::path(
    put,
    path = "/users/{id}/role",
    tag = "Users",
    security(("bearerAuth" = [])),
    params(("id" = Uuid, Path, description = "User id")),
    request_body = RoleUpdateRequest,
    responses(
        (status = 200, description = "Role updated", body = User),
        (status = 400, description = "Unknown role"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_role(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RoleUpdateRequest>,
) -> AppResult<Json<User>> {
    // the token may predate a demotion; decide on the stored role
    let caller = match users::fetch_by_id(&state.pool, auth.user_id).await {
        Err(AppError::NotFound(_)) => return Err(AppError::unauthorized("account no longer exists")),
        other => other?,
    };
    let caller_role = caller.role()?;

    if !state.authority.has_permission(Role::Admin.as_str(), Some(caller_role.as_str())) {
        return Err(AppError::forbidden("changing roles requires admin"));
    }

    let role = payload.role.parse::<Role>()?;
    let updated = users::update_role(&state.pool, id, role).await?;
    tracing::info!(actor = %auth.user_id, user_id = %id, role = %role, "role changed");

    Ok(Json(updated.try_into()?))
}
