use axum::response::Html;

const DASHBOARD_PAGE: &str = include_str!("dashboard.html");

/// GET /
///
/// Static page; all data comes from the `/api/*` endpoints.
pub async fn index() -> Html<&'static str> {
    Html(DASHBOARD_PAGE)
}
