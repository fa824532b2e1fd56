use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the game manager.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::game::set_up_game,
        crate::routes::game::session,
        crate::routes::game::shutdown,
        crate::routes::sse::countdown,
        crate::routes::sse::timer,
        crate::routes::sse::setup_events,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::SessionHealth,
            crate::dto::setup::SetupResponse,
            crate::dto::setup::SyncKind,
            crate::dto::setup::SessionSummary,
            crate::dto::setup::SessionStatusResponse,
            crate::dto::setup::ShutdownResponse,
            crate::dto::clock::TimerTick,
            crate::state::SetupStatus,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "game", description = "Game checkout, launch and teardown"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
