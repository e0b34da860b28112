use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers::submission;
use crate::state::AppState;

/// Every API route, versioned under `/v1`.
pub fn api_routes() -> OpenApiRouter<AppState> {
    let submissions = OpenApiRouter::new()
        .routes(routes!(
            submission::create_submission,
            submission::list_submissions
        ))
        .routes(routes!(
            submission::create_test_run,
            submission::get_test_results
        ))
        .routes(routes!(
            submission::create_user_test_run,
            submission::get_user_test_results
        ))
        .routes(routes!(submission::get_submission));

    OpenApiRouter::new().nest("/v1/submissions", submissions)
}
