use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{services::documentation::ApiDoc, state::SharedState};

/// Path the raw OpenAPI document is served from.
pub const OPENAPI_JSON_PATH: &str = "/docs/openapi.json";

/// Swagger UI for the game manager API, mounted under `/docs`.
pub fn router(state: SharedState) -> Router<SharedState> {
    let swagger: Router<SharedState> = SwaggerUi::new("/docs")
        .url(OPENAPI_JSON_PATH, ApiDoc::openapi())
        .into();

    swagger.with_state(state)
}
