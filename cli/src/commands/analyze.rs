use std::path::Path;

use crate::util::{api_request, read_payload};

/// POST a day payload to `/analyze-day` as-is.
pub async fn run(api_url: &str, file: Option<&Path>, raw: bool) -> i32 {
    let body = read_payload(file);
    api_request(api_url, reqwest::Method::POST, "/analyze-day", Some(body), raw).await
}
