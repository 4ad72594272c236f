//! Collection CRUD handlers: `:collection` is the table name, `:id` the row id.

use crate::error::AppError;
use crate::response::{created, message};
use crate::service::CrudService;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::{Map, Value};

fn parse_id(id_str: &str) -> Result<i64, AppError> {
    id_str
        .parse()
        .map_err(|_| AppError::BadRequest(format!("invalid id '{}'", id_str)))
}

fn body_to_map(value: Value) -> Result<Map<String, Value>, AppError> {
    match value {
        Value::Object(m) => Ok(m),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

pub async fn create(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let record = body_to_map(body)?;
    let insert_id = CrudService::create(state.executor.as_ref(), &state.schema, &collection, &record).await?;
    Ok(created(insert_id))
}

pub async fn read(
    State(state): State<AppState>,
    Path((collection, id_str)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    let rows = CrudService::read(state.executor.as_ref(), &collection, id).await?;
    Ok(Json(rows))
}

pub async fn update(
    State(state): State<AppState>,
    Path((collection, id_str)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    let record = body_to_map(body)?;
    CrudService::update(state.executor.as_ref(), &state.schema, &collection, id, &record).await?;
    Ok(message("Successful update"))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((collection, id_str)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    CrudService::delete(state.executor.as_ref(), &collection, id).await?;
    Ok(message("Successful deletion"))
}
