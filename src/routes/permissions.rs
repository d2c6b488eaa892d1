use axum::extract::State;
use axum::Json;

use crate::app::AppState;
use crate::authz::Role;
use crate::errors::AppResult;
use crate::models::permission::{
    CheckMode, HighestRoleRequest, HighestRoleResponse, PermissionCheckRequest, PermissionCheckResponse,
    RoleOverview,
};

#[utoipa::path(
    get,
    path = "/permissions/roles",
    tag = "Permissions",
    responses((status = 200, description = "Role set and hierarchy table", body = RoleOverview))
)]
pub async fn roles(State(state): State<AppState>) -> AppResult<Json<RoleOverview>> {
    Ok(Json(RoleOverview::from_authority(&state.authority)))
}

#[utoipa::path(
    post,
    path = "/permissions/check",
    tag = "Permissions",
    request_body = PermissionCheckRequest,
    responses((status = 200, description = "Decision for the given role", body = PermissionCheckResponse))
)]
pub async fn check(
    State(state): State<AppState>,
    Json(payload): Json<PermissionCheckRequest>,
) -> AppResult<Json<PermissionCheckResponse>> {
    let authority = &state.authority;
    let actual = payload.role.as_deref();
    let required = &payload.required_roles;

    let allowed = match payload.mode {
        // an empty requirement list never grants anything
        CheckMode::All => {
            !required.is_empty() && required.iter().all(|role| authority.has_permission(role, actual))
        }
        CheckMode::Any => authority.has_any_permission(required, actual),
        CheckMode::CanAny => authority.can_any_role(required, actual),
        CheckMode::CannotAny => authority.cannot_any_role(required, actual),
    };

    Ok(Json(PermissionCheckResponse {
        allowed,
        role_valid: actual.is_some_and(|role| authority.is_valid_role(role)),
        mode: payload.mode,
    }))
}

#[utoipa::path(
    post,
    path = "/permissions/highest",
    tag = "Permissions",
    request_body = HighestRoleRequest,
    responses(
        (status = 200, description = "Most senior role in the list", body = HighestRoleResponse),
        (status = 400, description = "Empty list or unknown role")
    )
)]
pub async fn highest(
    State(state): State<AppState>,
    Json(payload): Json<HighestRoleRequest>,
) -> AppResult<Json<HighestRoleResponse>> {
    let roles = payload
        .roles
        .iter()
        .map(|raw| raw.parse::<Role>())
        .collect::<Result<Vec<_>, _>>()?;

    let role = state.authority.get_highest_role(&roles)?;
    Ok(Json(HighestRoleResponse { role }))
}
