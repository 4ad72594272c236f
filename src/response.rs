//! Response bodies for the CRUD routes.

use axum::{http::StatusCode, Json};
use serde::Serialize;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationBody {
    pub message: &'static str,
    pub insert_id: u64,
}

#[derive(Serialize)]
pub struct MessageBody {
    pub message: &'static str,
}

pub fn created(insert_id: u64) -> (StatusCode, Json<CreationBody>) {
    (
        StatusCode::CREATED,
        Json(CreationBody {
            message: "Successful creation",
            insert_id,
        }),
    )
}

pub fn message(message: &'static str) -> (StatusCode, Json<MessageBody>) {
    (StatusCode::OK, Json(MessageBody { message }))
}
