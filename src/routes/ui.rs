use axum::response::Html;

/// GET / - chat page
pub async fn index() -> Html<&'static str> {
    Html(include_str!("../../static/index.html"))
}
