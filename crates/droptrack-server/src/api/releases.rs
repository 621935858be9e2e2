use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct ReleaseItem {
    id: String,
    retailer_id: String,
    retailer_name: String,
    product_name: Option<String>,
    release_date: Option<DateTime<Utc>>,
    price: Option<f64>,
    currency: String,
    status: String,
    url: String,
    region: String,
    images: Vec<String>,
    updated_at: DateTime<Utc>,
}

impl From<droptrack_db::ReleaseRow> for ReleaseItem {
    fn from(row: droptrack_db::ReleaseRow) -> Self {
        let updated_at = row.updated_at;
        let status = row.status.clone();
        let release = row.into_release();
        Self {
            id: release.id,
            retailer_id: release.retailer_id,
            retailer_name: release.retailer_name,
            product_name: release.product_name,
            release_date: release.release_date,
            price: release.price,
            currency: release.currency,
            status,
            url: release.url,
            region: release.region,
            images: release.images,
            updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ReleaseQuery {
    pub retailer_id: Option<String>,
    pub status: Option<String>,
    pub limit: Option<i64>,
}

pub(super) async fn list_releases(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ReleaseQuery>,
) -> Result<Json<ApiResponse<Vec<ReleaseItem>>>, ApiError> {
    let rows = droptrack_db::list_releases(
        &state.pool,
        droptrack_db::ReleaseListFilters {
            retailer_id: query.retailer_id.as_deref(),
            status: query.status.as_deref(),
            limit: Some(normalize_limit(query.limit)),
        },
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows.into_iter().map(ReleaseItem::from).collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn get_release(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(release_id): Path<String>,
) -> Result<Json<ApiResponse<ReleaseItem>>, ApiError> {
    let row = droptrack_db::get_release(&state.pool, &release_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| {
            ApiError::new(
                req_id.0.clone(),
                "not_found",
                format!("release '{release_id}' not found"),
            )
        })?;

    Ok(Json(ApiResponse {
        data: ReleaseItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Serialize)]
pub(super) struct DeleteData {
    deleted: bool,
}

pub(super) async fn delete_release(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(release_id): Path<String>,
) -> Result<Json<ApiResponse<DeleteData>>, ApiError> {
    let deleted = droptrack_db::delete_release(&state.pool, &release_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    if !deleted {
        return Err(ApiError::new(
            req_id.0,
            "not_found",
            format!("release '{release_id}' not found"),
        ));
    }

    Ok(Json(ApiResponse {
        data: DeleteData { deleted },
        meta: ResponseMeta::new(req_id.0),
    }))
}
