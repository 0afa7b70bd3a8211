use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::health::health))
        .nest("/configs", config_routes())
}

fn config_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::config::create_config))
        .routes(routes!(
            handlers::config::get_config,
            handlers::config::update_config,
            handlers::config::delete_config
        ))
        .routes(routes!(
            handlers::collection::list_coupons,
            handlers::collection::reconcile_coupons
        ))
        .routes(routes!(
            handlers::collection::list_gallery,
            handlers::collection::reconcile_gallery
        ))
        .routes(routes!(
            handlers::collection::list_timeline,
            handlers::collection::reconcile_timeline
        ))
}
