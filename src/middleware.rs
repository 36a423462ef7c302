use axum::{
    body::Body,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tracing::{error, warn};

/// Identifier of the rebranding job a response belongs to. The video
/// handler attaches it as a response extension; the logging layer turns it
/// into a response header and a log field.
#[derive(Clone, Debug)]
pub struct JobId(pub String);

pub const JOB_ID_HEADER: &str = "x-job-id";

/// Log every 4xx/5xx response with its method, URI and job id (when the
/// request ran a job) so failed jobs are visible in the service log even
/// when the client discards the body. Also echoes the job id back to the
/// caller for support tickets.
pub async fn log_request_errors(req: Request<Body>, next: Next) -> Response {
    let uri = req.uri().clone();
    let method = req.method().clone();

    let mut response = next.run(req).await;

    let job_id = response
        .extensions()
        .get::<JobId>()
        .map(|JobId(id)| id.clone());
    if let Some(id) = &job_id
        && let Ok(value) = HeaderValue::from_str(id)
    {
        response.headers_mut().insert(JOB_ID_HEADER, value);
    }

    let status = response.status();
    let job_id = job_id.as_deref().unwrap_or("-");
    if status.is_client_error() {
        warn!(
            method = %method,
            uri = %uri,
            status = %status,
            job_id,
            "Client error"
        );
    } else if status.is_server_error() {
        error!(
            method = %method,
            uri = %uri,
            status = %status,
            job_id,
            "Server error"
        );
    }

    response
}
