use rocket::fairing::AdHoc;
use std::time::Instant;

const DEFAULT_FILTER: &str = "ticket_booking_system=info,rocket=warn";

/// Initialize the tracing subscriber. `RUST_LOG` overrides the default filter.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[derive(Clone, Copy)]
struct RequestStart(Option<Instant>);

/// Logs method, path, status and latency of every request.
pub fn request_logger() -> AdHoc {
    AdHoc::on_request("Request timer", |req, _| {
        Box::pin(async move {
            req.local_cache(|| RequestStart(Some(Instant::now())));
        })
    })
}

pub fn response_logger() -> AdHoc {
    AdHoc::on_response("Request logger", |req, res| {
        Box::pin(async move {
            let start = req.local_cache(|| RequestStart(None));
            let elapsed_ms = start.0.map(|t| t.elapsed().as_millis()).unwrap_or_default();
            tracing::info!(
                method = %req.method(),
                path = %req.uri().path(),
                status = res.status().code,
                elapsed_ms = elapsed_ms as u64,
                "request handled"
            );
        })
    })
}
