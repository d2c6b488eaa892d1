use axum::extract::State;
use axum::Json;

use crate::app::AppState;
use crate::errors::AppResult;
use crate::jwt::MaybeAuthUser;
use crate::models::permission::NavigationResponse;

#[utoipa::path(
    get,
    path = "/navigation",
    tag = "Navigation",
    security((), ("bearerAuth" = [])),
    responses(
        (status = 200, description = "Sidebar visible to the caller", body = NavigationResponse),
        (status = 401, description = "Bearer token present but invalid")
    )
)]
pub async fn sidebar(State(state): State<AppState>, caller: MaybeAuthUser) -> AppResult<Json<NavigationResponse>> {
    let session = caller.session();
    let links = state.navigation.for_session(&state.authority, session);

    tracing::debug!(
        authenticated = session.is_authenticated,
        role = ?session.role,
        visible = links.len(),
        "sidebar filtered"
    );

    Ok(Json(NavigationResponse {
        authenticated: session.is_authenticated,
        role: session.role,
        links,
    }))
}
