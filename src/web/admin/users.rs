use axum::{
    extract::{Form, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::info;

use crate::web::{
    AppState,
    auth::{redirect_after_failure, require_session},
};

#[derive(Deserialize)]
pub(crate) struct DeleteUserForm {
    #[serde(default)]
    id: String,
}

pub async fn delete_user(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<DeleteUserForm>,
) -> Response {
    let (session, token) = match require_session(&state, jar) {
        Ok(signed_in) => signed_in,
        Err(redirect) => return redirect.into_response(),
    };

    let user_id = form.id.trim();
    if user_id.is_empty() {
        return (
            session.into_store().into_jar(),
            Redirect::to("/manage?error=not_found"),
        )
            .into_response();
    }

    match state.api().delete_user(&token, user_id).await {
        Ok(()) => {
            info!(user_id, "user deleted");
            (
                session.into_store().into_jar(),
                Redirect::to("/manage?status=user_deleted"),
            )
                .into_response()
        }
        Err(err) => redirect_after_failure(session, err, "/manage").into_response(),
    }
}
