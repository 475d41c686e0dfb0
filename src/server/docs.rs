//! OpenAPI document, served as JSON at `/api-docs/openapi.json` and browsable
//! through Swagger UI at `/swagger`

use utoipa::OpenApi;
use crate::server::error::MessageResponse;
use crate::server::routes;
use crate::storage::DbStats;
use crate::{Collection, DataPoint, Tag};

pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";
pub const SWAGGER_PATH: &str = "/swagger";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Cognivault",
        description = "Collections of tagged text snippets, backed by SQLite"
    ),
    paths(
        routes::create_collection,
        routes::list_collections,
        routes::get_collection,
        routes::get_collection_data_points,
        routes::update_collection,
        routes::delete_collection,
        routes::list_tags,
        routes::create_tag,
        routes::update_tag,
        routes::delete_tag,
        routes::get_tag_data_points,
        routes::create_data_point,
        routes::update_data_point,
        routes::delete_data_point,
        routes::health,
    ),
    components(schemas(
        Collection,
        Tag,
        DataPoint,
        DbStats,
        MessageResponse,
        routes::CreateCollectionRequest,
        routes::CreateCollectionResponse,
        routes::DataPointsRequest,
        routes::UpdateCollectionRequest,
        routes::UpdateTagRequest,
        routes::CreateTagRequest,
        routes::DataPointValueRequest,
        routes::CollectionsResponse,
        routes::TagsResponse,
        routes::DataPointsResponse,
        routes::HealthResponse,
    )),
    tags(
        (name = "Collections", description = "Named groupings of tags"),
        (name = "Tags", description = "Labels within a collection"),
        (name = "Data points", description = "Stored text snippets"),
        (name = "System", description = "Health checks")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documents_every_path() {
        let doc = ApiDoc::openapi();
        for path in [
            "/collections",
            "/collections/{name}",
            "/collections/{name}/datapoints",
            "/collections/{name}/tags",
            "/collections/{name}/tags/{tag_id}",
            "/collections/{name}/tags/{tag_id}/datapoints",
            "/collections/{name}/tags/{tag_id}/datapoints/{id}",
            "/healthz",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }

    #[test]
    fn test_schemas_follow_the_serde_types() {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().unwrap().schemas;
        for name in ["Collection", "Tag", "DataPoint", "MessageResponse", "CreateCollectionRequest"] {
            assert!(schemas.contains_key(name), "missing schema {}", name);
        }

        let json = serde_json::to_value(&doc).unwrap();
        let collection = &json["components"]["schemas"]["Collection"]["properties"];
        for field in ["id", "name", "created_at", "updated_at"] {
            assert!(collection.get(field).is_some(), "missing field {}", field);
        }
    }
}
