//! Stand-in downstream endpoint.
//!
//! Real deployments forward enriched requests to backend services; this
//! handler plays that role in-process by echoing the identity headers the
//! gateway attached, which is what integration tests assert against.

use axum::{Json, http::HeaderMap};
use serde::Serialize;

use crate::gateway::{USER_EMAIL_HEADER, USER_ID_HEADER, USER_ROLES_HEADER};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub roles: Vec<String>,
}

pub async fn me(headers: HeaderMap) -> Json<MeResponse> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    let roles = header(USER_ROLES_HEADER)
        .map(|list| list.split(',').map(str::to_string).collect())
        .unwrap_or_default();

    Json(MeResponse {
        user_id: header(USER_ID_HEADER),
        email: header(USER_EMAIL_HEADER),
        roles,
    })
}
