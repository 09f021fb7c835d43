use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::models::category::ModuleCategory;
use crate::models::quiz::Quiz;
use crate::models::settings::AppSettings;
use crate::models::user::User;
use crate::services::partitioned_store::{PartitionKey, PartitionedStore, StoreData};
use crate::services::AppState;

use super::ApiError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataResponse {
    pub users: Vec<User>,
    pub quizzes: Vec<Quiz>,
    pub module_categories: Option<Vec<ModuleCategory>>,
    pub settings: AppSettings,
}

/// Batched read of the partitioned store. Runs the legacy migration and, on a
/// never-written store, seeds the defaults. The category partition may come
/// back null; the client derives a layout in that case.
pub async fn get_data(State(state): State<Arc<AppState>>) -> Result<Json<DataResponse>, ApiError> {
    let store = PartitionedStore::new(state.kv.clone());
    let data = store
        .read()
        .await
        .map_err(|err| ApiError::internal(err.to_string()))?;
    Ok(Json(DataResponse {
        users: data.users,
        quizzes: data.quizzes,
        module_categories: data.module_categories,
        settings: data.settings,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub users: Option<Vec<User>>,
    pub quizzes: Option<Vec<Quiz>>,
    pub settings: Option<AppSettings>,
    pub module_categories: Option<Vec<ModuleCategory>>,
}

/// Full-snapshot write: all keys in one atomic transaction.
pub async fn update(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<UpdateRequest>,
) -> Result<Json<Value>, ApiError> {
    let (Some(users), Some(quizzes), Some(settings)) =
        (payload.users, payload.quizzes, payload.settings)
    else {
        return Err(ApiError::bad_request(
            "users, quizzes and settings are required",
        ));
    };

    let store = PartitionedStore::new(state.kv.clone());
    store
        .write_all(&StoreData {
            users,
            quizzes,
            module_categories: payload.module_categories,
            settings,
        })
        .await
        .map_err(|err| ApiError::internal(err.to_string()))?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct UpdatePartialRequest {
    pub key: String,
    pub value: Value,
}

/// Incremental write of exactly one partition; siblings are untouched.
pub async fn update_partial(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<UpdatePartialRequest>,
) -> Result<Json<Value>, ApiError> {
    let Some(partition) = PartitionKey::parse(&payload.key) else {
        return Err(ApiError::bad_request(format!(
            "Invalid key '{}': must be one of users, quizzes, moduleCategories, settings",
            payload.key
        )));
    };

    let store = PartitionedStore::new(state.kv.clone());
    store
        .write_key_raw(partition, &payload.value)
        .await
        .map_err(|err| ApiError::internal(err.to_string()))?;
    Ok(Json(json!({ "success": true, "key": payload.key })))
}
