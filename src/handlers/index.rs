use axum::response::Html;

const INDEX_PAGE: &str = include_str!("index.html");

/// Upload form; talks to `/api/v1/summarize`.
pub async fn index_handler() -> Html<&'static str> {
    Html(INDEX_PAGE)
}
