use std::io::Read;
use std::path::Path;

use serde_json::json;

pub fn client() -> reqwest::Client {
    reqwest::Client::new()
}

pub fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(formatted) => println!("{formatted}"),
        Err(_) => println!("{value}"),
    }
}

pub fn exit_error(message: &str, docs_hint: Option<&str>) -> ! {
    let mut err = json!({
        "error": "cli_error",
        "message": message
    });
    if let Some(hint) = docs_hint {
        err["docs_hint"] = json!(hint);
    }
    eprintln!(
        "{}",
        serde_json::to_string_pretty(&err).unwrap_or_else(|_| err.to_string())
    );
    std::process::exit(1);
}

/// Read a payload from `--file`, or from stdin when no file is given.
/// Bytes are passed through untouched; malformed JSON is the server's
/// (or the scorer's) problem, not ours.
pub fn read_payload(file: Option<&Path>) -> Vec<u8> {
    match file {
        Some(path) => std::fs::read(path).unwrap_or_else(|e| {
            exit_error(
                &format!("Failed to read {}: {e}", path.display()),
                Some("Pass an existing JSON file with --file, or pipe the payload on stdin."),
            )
        }),
        None => {
            let mut buf = Vec::new();
            if let Err(e) = std::io::stdin().read_to_end(&mut buf) {
                exit_error(&format!("Failed to read stdin: {e}"), None);
            }
            buf
        }
    }
}

/// Send a request to the API and print the JSON response.
///
/// Returns the process exit code: 0 for 2xx, 1 for 4xx, 2 for 5xx,
/// 3 when the server could not be reached.
pub async fn api_request(
    api_url: &str,
    method: reqwest::Method,
    path: &str,
    body: Option<Vec<u8>>,
    raw: bool,
) -> i32 {
    let url = format!("{}{path}", api_url.trim_end_matches('/'));
    let mut req = client().request(method, &url);

    if let Some(b) = body {
        req = req
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(b);
    }

    let resp = match req.send().await {
        Ok(r) => r,
        Err(e) => {
            let err = json!({
                "error": "connection_error",
                "message": format!("{e}"),
                "docs_hint": "Is the API server running? Check BENTO_API_URL."
            });
            eprintln!("{err:#}");
            return 3;
        }
    };

    let exit_code = exit_code_for(resp.status().as_u16());

    let resp_body: serde_json::Value = match resp.json().await {
        Ok(v) => v,
        Err(e) => json!({"raw_error": format!("Failed to parse response as JSON: {e}")}),
    };

    let formatted = if raw {
        resp_body.to_string()
    } else {
        format!("{resp_body:#}")
    };

    if exit_code == 0 {
        println!("{formatted}");
    } else {
        eprintln!("{formatted}");
    }

    exit_code
}

fn exit_code_for(status: u16) -> i32 {
    match status {
        200..=299 => 0,
        400..=499 => 1,
        _ => 2,
    }
}
