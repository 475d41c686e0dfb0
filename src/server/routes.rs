use axum::{
    Json,
    body::Bytes,
    extract::{FromRequest, Path, Query, Request, State},
    http::StatusCode,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use crate::server::AppState;
use crate::server::error::{ApiError, MessageResponse};
use crate::source::ContentSource;
use crate::storage::DbStats;
use crate::{Collection, DataPoint, Error, Tag};

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateCollectionRequest {
    pub name: Option<String>,
    /// Remote http(s) URL to fetch the seed content from
    pub url: Option<String>,
    /// Inline seed content
    pub text: Option<String>,
    /// Local file path to read the seed content from
    pub file: Option<String>,
    /// Name of the first tag; defaults to the URL, the file path, or "default"
    pub tag: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateCollectionResponse {
    pub id: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct DataPointsRequest {
    pub collection_name: Option<String>,
    /// Case-sensitive substring the value must contain
    pub query: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DataPointsParams {
    /// Case-sensitive substring the value must contain
    pub query: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateTagRequest {
    pub collection_name: Option<String>,
    pub tag_id: Option<String>,
    pub new_tag: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateCollectionRequest {
    pub collection_name: Option<String>,
    pub new_name: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateTagRequest {
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct DataPointValueRequest {
    pub value: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DataPointsResponse {
    pub data_points: Vec<DataPoint>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TagsResponse {
    pub tags: Vec<Tag>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CollectionsResponse {
    pub collections: Vec<Collection>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub stats: DbStats,
}

/// Raw request body whose rejections answer with a `{message}` body
pub struct RawBody(pub Bytes);

impl<S> FromRequest<S> for RawBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Bytes::from_request(req, state).await.map(Self).map_err(|rejection| {
            tracing::debug!(error = %rejection.body_text(), "failed to read request body");
            let status = rejection.status();
            if status == StatusCode::PAYLOAD_TOO_LARGE {
                ApiError::new(status, "Request body too large")
            } else {
                ApiError::new(status, "Invalid request payload")
            }
        })
    }
}

/// Decode a JSON body, mapping any failure to a 400
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> ApiResult<T> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(error = %e, "rejected request body");
        ApiError::bad_request("Invalid request payload")
    })
}

/// Decode a JSON body that may be absent altogether
fn parse_optional_body<T: DeserializeOwned + Default>(body: &Bytes) -> ApiResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    parse_body(body)
}

/// A required, non-blank string field
fn required(value: Option<String>, field: &str) -> ApiResult<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request(format!("Missing required field: {}", field)))
}

/// Body fields that repeat a path parameter must agree with it
fn check_matches(body_value: Option<&str>, path_value: &str, field: &str) -> ApiResult<()> {
    match body_value {
        Some(v) if v != path_value => Err(ApiError::bad_request(format!(
            "{} in body does not match the request path",
            field
        ))),
        _ => Ok(()),
    }
}

fn resolve_tag(conn: &Connection, collection_name: &str, tag_id: &str) -> crate::Result<(Collection, Tag)> {
    let collection = Collection::get(conn, collection_name)?;
    let tag = Tag::get(conn, tag_id, &collection.id)?;
    Ok((collection, tag))
}

/// POST /collections
#[utoipa::path(post, path = "/collections", tag = "Collections",
    request_body = CreateCollectionRequest,
    responses(
        (status = 201, description = "Collection created", body = CreateCollectionResponse),
        (status = 400, description = "Invalid payload, missing source, or acquisition failure", body = MessageResponse),
        (status = 500, description = "Storage failure", body = MessageResponse)
    ))]
pub async fn create_collection(
    State(state): State<Arc<AppState>>,
    RawBody(body): RawBody,
) -> ApiResult<(StatusCode, Json<CreateCollectionResponse>)> {
    let req: CreateCollectionRequest = parse_body(&body)?;
    let name = required(req.name, "name")?;
    let source = ContentSource::from_parts(req.url, req.text, req.file)?;

    let data = state
        .fetcher
        .acquire(&source)
        .await
        .map_err(|e| ApiError::with_context(e, "Failed to acquire content"))?;

    let tag_name = req
        .tag
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| source.default_tag());

    let collection = state
        .db
        .run_transaction(move |tx| {
            let collection = Collection::create(tx, name)?;
            let tag = Tag::create(tx, &collection.id, tag_name)?;
            DataPoint::create(tx, &tag.id, data)?;
            Ok(collection)
        })
        .await
        .map_err(|e| ApiError::with_context(e, "Failed to create collection"))?;

    tracing::info!(id = %collection.id, name = %collection.name, "collection created");
    Ok((
        StatusCode::CREATED,
        Json(CreateCollectionResponse { id: collection.id }),
    ))
}

/// GET /collections
#[utoipa::path(get, path = "/collections", tag = "Collections",
    responses((status = 200, description = "All collections", body = CollectionsResponse)))]
pub async fn list_collections(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<CollectionsResponse>> {
    let collections = state
        .db
        .run(|conn| Collection::list_all(conn))
        .await
        .map_err(|e| ApiError::with_context(e, "Failed to list collections"))?;
    Ok(Json(CollectionsResponse { collections }))
}

/// GET /collections/{name}
#[utoipa::path(get, path = "/collections/{name}", tag = "Collections",
    params(("name" = String, Path, description = "Collection name")),
    responses(
        (status = 200, description = "Collection", body = Collection),
        (status = 404, description = "Collection not found", body = MessageResponse)
    ))]
pub async fn get_collection(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Json<Collection>> {
    let collection = state
        .db
        .run(move |conn| Collection::get(conn, &name))
        .await
        .map_err(|e| ApiError::with_context(e, "Failed to get collection"))?;
    Ok(Json(collection))
}

/// GET /collections/{name}/datapoints
///
/// The filter comes from the optional JSON body, or from `?query=`.
#[utoipa::path(get, path = "/collections/{name}/datapoints", tag = "Data points",
    params(("name" = String, Path, description = "Collection name")),
    request_body(content = DataPointsRequest, description = "Optional filter; `?query=` is used when absent"),
    responses(
        (status = 200, description = "Data points of the collection", body = DataPointsResponse),
        (status = 400, description = "Invalid payload", body = MessageResponse),
        (status = 404, description = "Collection not found", body = MessageResponse)
    ))]
pub async fn get_collection_data_points(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(params): Query<DataPointsParams>,
    RawBody(body): RawBody,
) -> ApiResult<Json<DataPointsResponse>> {
    let req: DataPointsRequest = parse_optional_body(&body)?;
    check_matches(req.collection_name.as_deref(), &name, "collection_name")?;
    let query = req.query.or(params.query);

    let data_points = state
        .db
        .run(move |conn| {
            let collection = Collection::get(conn, &name)?;
            collection.list_data_points(conn, query.as_deref())
        })
        .await
        .map_err(|e| ApiError::with_context(e, "Failed to get data points"))?;
    Ok(Json(DataPointsResponse { data_points }))
}

/// PUT /collections/{name}
#[utoipa::path(put, path = "/collections/{name}", tag = "Collections",
    params(("name" = String, Path, description = "Collection name")),
    request_body = UpdateCollectionRequest,
    responses(
        (status = 200, description = "Collection renamed", body = MessageResponse),
        (status = 400, description = "Invalid payload", body = MessageResponse),
        (status = 404, description = "Collection not found", body = MessageResponse),
        (status = 500, description = "Storage failure", body = MessageResponse)
    ))]
pub async fn update_collection(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    RawBody(body): RawBody,
) -> ApiResult<Json<MessageResponse>> {
    let req: UpdateCollectionRequest = parse_body(&body)?;
    check_matches(req.collection_name.as_deref(), &name, "collection_name")?;
    let new_name = required(req.new_name, "new_name")?;

    state
        .db
        .run(move |conn| {
            let mut collection = Collection::get(conn, &name)?;
            collection.update(conn, new_name)
        })
        .await
        .map_err(|e| ApiError::with_context(e, "Failed to update collection"))?;
    Ok(Json(MessageResponse::new("Collection updated successfully")))
}

/// DELETE /collections/{name}
#[utoipa::path(delete, path = "/collections/{name}", tag = "Collections",
    params(("name" = String, Path, description = "Collection name")),
    responses(
        (status = 200, description = "Collection deleted with its tags and data points", body = MessageResponse),
        (status = 404, description = "Collection not found (strict deletes only)", body = MessageResponse),
        (status = 500, description = "Storage failure", body = MessageResponse)
    ))]
pub async fn delete_collection(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let lookup = name.clone();
    let removed = state
        .db
        .run(move |conn| match Collection::get(conn, &lookup) {
            Ok(collection) => collection.delete(conn),
            Err(Error::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        })
        .await
        .map_err(|e| ApiError::with_context(e, "Failed to delete collection"))?;

    if !removed {
        if state.strict_deletes {
            return Err(ApiError::not_found(format!("collection '{}' not found", name)));
        }
        tracing::debug!(%name, "delete of absent collection");
        return Ok(Json(MessageResponse::new("Collection not found, nothing deleted")));
    }

    tracing::info!(%name, "collection deleted");
    Ok(Json(MessageResponse::new("Collection deleted successfully")))
}

/// GET /collections/{name}/tags
#[utoipa::path(get, path = "/collections/{name}/tags", tag = "Tags",
    params(("name" = String, Path, description = "Collection name")),
    responses(
        (status = 200, description = "Tags of the collection", body = TagsResponse),
        (status = 404, description = "Collection not found", body = MessageResponse)
    ))]
pub async fn list_tags(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Json<TagsResponse>> {
    let tags = state
        .db
        .run(move |conn| Collection::get(conn, &name)?.list_tags(conn))
        .await
        .map_err(|e| ApiError::with_context(e, "Failed to get tags"))?;
    Ok(Json(TagsResponse { tags }))
}

/// POST /collections/{name}/tags
#[utoipa::path(post, path = "/collections/{name}/tags", tag = "Tags",
    params(("name" = String, Path, description = "Collection name")),
    request_body = CreateTagRequest,
    responses(
        (status = 201, description = "Tag created", body = Tag),
        (status = 400, description = "Invalid payload", body = MessageResponse),
        (status = 404, description = "Collection not found", body = MessageResponse)
    ))]
pub async fn create_tag(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    RawBody(body): RawBody,
) -> ApiResult<(StatusCode, Json<Tag>)> {
    let req: CreateTagRequest = parse_body(&body)?;
    let tag_name = required(req.name, "name")?;

    let tag = state
        .db
        .run(move |conn| {
            let collection = Collection::get(conn, &name)?;
            Tag::create(conn, &collection.id, tag_name)
        })
        .await
        .map_err(|e| ApiError::with_context(e, "Failed to create tag"))?;
    Ok((StatusCode::CREATED, Json(tag)))
}

/// PUT /collections/{name}/tags/{tag_id}
#[utoipa::path(put, path = "/collections/{name}/tags/{tag_id}", tag = "Tags",
    params(("name" = String, Path, description = "Collection name"), ("tag_id" = String, Path, description = "Tag id")),
    request_body = UpdateTagRequest,
    responses(
        (status = 200, description = "Tag renamed", body = MessageResponse),
        (status = 400, description = "Invalid payload", body = MessageResponse),
        (status = 404, description = "Collection or tag not found", body = MessageResponse)
    ))]
pub async fn update_tag(
    State(state): State<Arc<AppState>>,
    Path((name, tag_id)): Path<(String, String)>,
    RawBody(body): RawBody,
) -> ApiResult<Json<MessageResponse>> {
    let req: UpdateTagRequest = parse_body(&body)?;
    check_matches(req.collection_name.as_deref(), &name, "collection_name")?;
    check_matches(req.tag_id.as_deref(), &tag_id, "tag_id")?;
    let new_tag = required(req.new_tag, "new_tag")?;

    state
        .db
        .run(move |conn| {
            let (_, mut tag) = resolve_tag(conn, &name, &tag_id)?;
            tag.update(conn, new_tag)
        })
        .await
        .map_err(|e| ApiError::with_context(e, "Failed to update tag"))?;
    Ok(Json(MessageResponse::new("Tag updated successfully")))
}

/// DELETE /collections/{name}/tags/{tag_id}
#[utoipa::path(delete, path = "/collections/{name}/tags/{tag_id}", tag = "Tags",
    params(("name" = String, Path, description = "Collection name"), ("tag_id" = String, Path, description = "Tag id")),
    responses(
        (status = 200, description = "Tag deleted with its data points", body = MessageResponse),
        (status = 404, description = "Collection or tag not found", body = MessageResponse),
        (status = 500, description = "Storage failure", body = MessageResponse)
    ))]
pub async fn delete_tag(
    State(state): State<Arc<AppState>>,
    Path((name, tag_id)): Path<(String, String)>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .db
        .run_transaction(move |tx| {
            let collection = Collection::get(tx, &name)?;
            Tag::delete_by_id(tx, &tag_id, &collection.id)
        })
        .await
        .map_err(|e| ApiError::with_context(e, "Failed to delete tag"))?;
    Ok(Json(MessageResponse::new("Tag deleted successfully")))
}

/// GET /collections/{name}/tags/{tag_id}/datapoints
#[utoipa::path(get, path = "/collections/{name}/tags/{tag_id}/datapoints", tag = "Data points",
    params(("name" = String, Path, description = "Collection name"), ("tag_id" = String, Path, description = "Tag id")),
    responses(
        (status = 200, description = "Data points of the tag", body = DataPointsResponse),
        (status = 404, description = "Collection or tag not found", body = MessageResponse)
    ))]
pub async fn get_tag_data_points(
    State(state): State<Arc<AppState>>,
    Path((name, tag_id)): Path<(String, String)>,
) -> ApiResult<Json<DataPointsResponse>> {
    let data_points = state
        .db
        .run(move |conn| {
            let (_, tag) = resolve_tag(conn, &name, &tag_id)?;
            tag.list_data_points(conn)
        })
        .await
        .map_err(|e| ApiError::with_context(e, "Failed to get data points"))?;
    Ok(Json(DataPointsResponse { data_points }))
}

/// POST /collections/{name}/tags/{tag_id}/datapoints
#[utoipa::path(post, path = "/collections/{name}/tags/{tag_id}/datapoints", tag = "Data points",
    params(("name" = String, Path, description = "Collection name"), ("tag_id" = String, Path, description = "Tag id")),
    request_body = DataPointValueRequest,
    responses(
        (status = 201, description = "Data point created", body = DataPoint),
        (status = 400, description = "Invalid payload", body = MessageResponse),
        (status = 404, description = "Collection or tag not found", body = MessageResponse)
    ))]
pub async fn create_data_point(
    State(state): State<Arc<AppState>>,
    Path((name, tag_id)): Path<(String, String)>,
    RawBody(body): RawBody,
) -> ApiResult<(StatusCode, Json<DataPoint>)> {
    let req: DataPointValueRequest = parse_body(&body)?;
    let value = req
        .value
        .ok_or_else(|| ApiError::bad_request("Missing required field: value"))?;

    let data_point = state
        .db
        .run(move |conn| {
            let (_, tag) = resolve_tag(conn, &name, &tag_id)?;
            DataPoint::create(conn, &tag.id, value)
        })
        .await
        .map_err(|e| ApiError::with_context(e, "Failed to create data point"))?;
    Ok((StatusCode::CREATED, Json(data_point)))
}

/// PUT /collections/{name}/tags/{tag_id}/datapoints/{id}
#[utoipa::path(put, path = "/collections/{name}/tags/{tag_id}/datapoints/{id}", tag = "Data points",
    params(("name" = String, Path, description = "Collection name"), ("tag_id" = String, Path, description = "Tag id"), ("id" = String, Path, description = "Data point id")),
    request_body = DataPointValueRequest,
    responses(
        (status = 200, description = "Data point updated", body = MessageResponse),
        (status = 400, description = "Invalid payload", body = MessageResponse),
        (status = 404, description = "Not found", body = MessageResponse)
    ))]
pub async fn update_data_point(
    State(state): State<Arc<AppState>>,
    Path((name, tag_id, id)): Path<(String, String, String)>,
    RawBody(body): RawBody,
) -> ApiResult<Json<MessageResponse>> {
    let req: DataPointValueRequest = parse_body(&body)?;
    let value = req
        .value
        .ok_or_else(|| ApiError::bad_request("Missing required field: value"))?;

    state
        .db
        .run(move |conn| {
            let (_, tag) = resolve_tag(conn, &name, &tag_id)?;
            let mut data_point = DataPoint::get(conn, &id, &tag.id)?;
            data_point.update(conn, value)
        })
        .await
        .map_err(|e| ApiError::with_context(e, "Failed to update data point"))?;
    Ok(Json(MessageResponse::new("Data point updated successfully")))
}

/// DELETE /collections/{name}/tags/{tag_id}/datapoints/{id}
#[utoipa::path(delete, path = "/collections/{name}/tags/{tag_id}/datapoints/{id}", tag = "Data points",
    params(("name" = String, Path, description = "Collection name"), ("tag_id" = String, Path, description = "Tag id"), ("id" = String, Path, description = "Data point id")),
    responses(
        (status = 200, description = "Data point deleted", body = MessageResponse),
        (status = 404, description = "Not found", body = MessageResponse)
    ))]
pub async fn delete_data_point(
    State(state): State<Arc<AppState>>,
    Path((name, tag_id, id)): Path<(String, String, String)>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .db
        .run(move |conn| {
            let (_, tag) = resolve_tag(conn, &name, &tag_id)?;
            DataPoint::get(conn, &id, &tag.id)?.delete(conn)
        })
        .await
        .map_err(|e| ApiError::with_context(e, "Failed to delete data point"))?;
    Ok(Json(MessageResponse::new("Data point deleted successfully")))
}

/// GET /healthz
#[utoipa::path(get, path = "/healthz", tag = "System",
    responses((status = 200, description = "Database reachable", body = HealthResponse)))]
pub async fn health(State(state): State<Arc<AppState>>) -> ApiResult<Json<HealthResponse>> {
    let stats = state
        .db
        .run(|conn| DbStats::collect(conn))
        .await
        .map_err(|e| ApiError::with_context(e, "Database unavailable"))?;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        stats,
    }))
}
