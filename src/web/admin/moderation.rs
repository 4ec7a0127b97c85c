use axum::{
    extract::{Form, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::info;

use crate::{
    resources::ResourceStatus,
    web::{
        AppState,
        auth::{redirect_after_failure, require_session},
    },
};

use super::types::ReturnTo;

#[derive(Deserialize)]
pub(crate) struct StatusChangeForm {
    #[serde(default)]
    id: String,
    #[serde(default)]
    status: String,
    #[serde(flatten)]
    return_to: ReturnTo,
}

#[derive(Deserialize)]
pub(crate) struct DeleteResourceForm {
    #[serde(default)]
    id: String,
    #[serde(flatten)]
    return_to: ReturnTo,
}

pub async fn change_resource_status(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<StatusChangeForm>,
) -> Response {
    let (session, token) = match require_session(&state, jar) {
        Ok(signed_in) => signed_in,
        Err(redirect) => return redirect.into_response(),
    };
    let back = form.return_to.location();

    let Some(status) = ResourceStatus::parse(&form.status) else {
        return (
            session.into_store().into_jar(),
            Redirect::to(&form.return_to.with_error("invalid_status")),
        )
            .into_response();
    };
    let resource_id = form.id.trim();
    if resource_id.is_empty() {
        return (
            session.into_store().into_jar(),
            Redirect::to(&form.return_to.with_error("not_found")),
        )
            .into_response();
    }

    match state
        .api()
        .set_resource_status(&token, resource_id, status)
        .await
    {
        Ok(()) => {
            info!(resource_id, status = %status, "resource status changed");
            let code = format!("resource_{}", status.as_str().to_ascii_lowercase());
            (
                session.into_store().into_jar(),
                Redirect::to(&form.return_to.with_status(&code)),
            )
                .into_response()
        }
        Err(err) => redirect_after_failure(session, err, &back).into_response(),
    }
}

pub async fn delete_resource(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<DeleteResourceForm>,
) -> Response {
    let (session, token) = match require_session(&state, jar) {
        Ok(signed_in) => signed_in,
        Err(redirect) => return redirect.into_response(),
    };
    let back = form.return_to.location();

    let resource_id = form.id.trim();
    if resource_id.is_empty() {
        return (
            session.into_store().into_jar(),
            Redirect::to(&form.return_to.with_error("not_found")),
        )
            .into_response();
    }

    match state.api().delete_resource(&token, resource_id).await {
        Ok(()) => {
            info!(resource_id, "resource deleted");
            (
                session.into_store().into_jar(),
                Redirect::to(&form.return_to.with_status("resource_deleted")),
            )
                .into_response()
        }
        Err(err) => redirect_after_failure(session, err, &back).into_response(),
    }
}
