//! HTTP adapter for the JSON surface
//!
//! `pathweaver serve` -> blocking tiny_http accept loop on a worker thread,
//! dispatching each request into the async API handlers through the runtime
//! handle. Requests are handled one at a time; the heavy lifting (reasoning
//! calls, SQLite) happens inside the handlers.

use std::io::Read;

use pathweaver_core::Error;
use pathweaver_core::api::{self, ApiContext};
use serde_json::{Value, json};
use tiny_http::{Header, Method, Request, Response, Server};
use tokio::runtime::Handle;
use tracing::{error, info};

/// Run the API server until the process is stopped
pub async fn serve(ctx: ApiContext, port: u16) -> anyhow::Result<()> {
    let handle = Handle::current();
    tokio::task::spawn_blocking(move || run(ctx, handle, port)).await?
}

fn run(ctx: ApiContext, handle: Handle, port: u16) -> anyhow::Result<()> {
    let addr = format!("127.0.0.1:{}", port);
    let server =
        Server::http(&addr).map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", addr, e))?;

    info!(port, "API server listening");
    println!("Pathweaver API listening on http://{}", addr);
    println!("Press Ctrl+C to stop");

    for request in server.incoming_requests() {
        if let Err(e) = handle_request(&ctx, &handle, request) {
            error!(error = %e, "Failed to answer request");
        }
    }
    Ok(())
}

fn handle_request(ctx: &ApiContext, handle: &Handle, mut request: Request) -> std::io::Result<()> {
    let url = request.url().to_string();
    let (path, query) = match url.split_once('?') {
        Some((p, q)) => (p.to_string(), q.to_string()),
        None => (url, String::new()),
    };
    let method = request.method().clone();

    let mut body = String::new();
    request.as_reader().read_to_string(&mut body)?;

    match handle.block_on(dispatch(ctx, &method, &path, &query, &body)) {
        Some(Ok(value)) => respond(request, 200, value),
        Some(Err(e)) => {
            let status = status_for(&e);
            respond(
                request,
                status,
                json!({
                    "success": false,
                    "error": e.to_string(),
                    "code": e.code(),
                }),
            )
        }
        None => respond(
            request,
            404,
            json!({"success": false, "error": format!("No route for {} {}", method, path)}),
        ),
    }
}

/// Route to a handler; `None` means no such route
async fn dispatch(
    ctx: &ApiContext,
    method: &Method,
    path: &str,
    query: &str,
    body: &str,
) -> Option<Result<Value, Error>> {
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    let result = match (method, segments.as_slice()) {
        (&Method::Post, ["nodes"]) => match parse(body) {
            Ok(request) => api::create_node(ctx, request).await.and_then(to_value),
            Err(e) => Err(e),
        },
        (&Method::Get, ["nodes", topic_id]) => {
            api::list_nodes(ctx, topic_id).await.and_then(to_value)
        }
        (&Method::Post, ["validate-path"]) => match parse(body) {
            Ok(request) => api::validate_path(ctx, request).await.and_then(to_value),
            Err(e) => Err(e),
        },
        (&Method::Post, ["estimate-nodes"]) => match parse(body) {
            Ok(request) => api::estimate_nodes(ctx, request).await.and_then(to_value),
            Err(e) => Err(e),
        },
        (&Method::Post, ["workflows"]) => match parse(body) {
            Ok(request) => api::save_workflow(ctx, request).await.and_then(to_value),
            Err(e) => Err(e),
        },
        (&Method::Get, ["workflows"]) => {
            let topic_id = query_param(query, "topic_id").unwrap_or_default();
            let include_drafts = query_param(query, "include_drafts")
                .is_some_and(|v| v == "true" || v == "1");
            api::list_workflows(ctx, &topic_id, include_drafts)
                .await
                .and_then(to_value)
        }
        (&Method::Get, ["workflows", id]) => api::get_workflow(ctx, id).await.and_then(to_value),
        (&Method::Post, ["workflows", id, "estimate"]) => {
            api::estimate_workflow(ctx, id).await.and_then(to_value)
        }
        (&Method::Post, ["workflows", id, "implement"]) => match parse(body) {
            Ok(request) => api::implement_workflow(ctx, id, request)
                .await
                .and_then(to_value),
            Err(e) => Err(e),
        },
        _ => return None,
    };
    Some(result)
}

fn parse<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, Error> {
    serde_json::from_str(body).map_err(|e| Error::InvalidInput(format!("Invalid JSON body: {}", e)))
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Value, Error> {
    serde_json::to_value(value).map_err(|e| Error::Other(format!("Serialization failed: {}", e)))
}

fn status_for(error: &Error) -> u16 {
    match error {
        Error::InvalidInput(_) => 400,
        Error::AuthRequired => 401,
        Error::ConceptNotFound(_) | Error::WorkflowNotFound(_) => 404,
        Error::AlreadyImplemented(_) => 409,
        Error::RateLimited(_) => 429,
        Error::PartialPublish { .. } => 502,
        _ => 500,
    }
}

fn query_param(query: &str, name: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

fn respond(request: Request, status: u16, body: Value) -> std::io::Result<()> {
    let response = Response::from_string(body.to_string())
        .with_status_code(status)
        .with_header(
            Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                .expect("static header"),
        );
    request.respond(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_param() {
        assert_eq!(
            query_param("topic_id=abc&include_drafts=true", "topic_id").as_deref(),
            Some("abc")
        );
        assert_eq!(
            query_param("topic_id=abc&include_drafts=true", "include_drafts").as_deref(),
            Some("true")
        );
        assert!(query_param("topic_id=abc", "missing").is_none());
        assert!(query_param("", "topic_id").is_none());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&Error::AuthRequired), 401);
        assert_eq!(status_for(&Error::WorkflowNotFound("x".into())), 404);
        assert_eq!(status_for(&Error::InvalidInput("x".into())), 400);
        assert_eq!(
            status_for(&Error::PartialPublish {
                created_count: 2,
                failed_at: "2026-09-03".into()
            }),
            502
        );
        assert_eq!(status_for(&Error::Other("x".into())), 500);
    }
}
