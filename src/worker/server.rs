//! HTTP server: one JSON route per worker method.

use std::future::Future;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tracing::{debug, info};

use super::{Request, Response, Worker};
use crate::error::Result;

/// Worker methods, each served at `POST /<method>`.
pub const ROUTES: [&str; 4] = ["init", "apply", "predict", "restart"];

type SharedWorker = Arc<Mutex<Worker>>;

/// Builds the worker's router.
///
/// Requests are answered one at a time; training runs on the blocking pool
/// so the listener stays responsive.
pub fn router(worker: Worker) -> Router {
    let shared: SharedWorker = Arc::new(Mutex::new(worker));
    ROUTES
        .into_iter()
        .fold(Router::new(), |router, route| {
            router.route(
                &format!("/{route}"),
                post(move |State(worker): State<SharedWorker>, Json(request): Json<Request>| {
                    answer(worker, route, request)
                }),
            )
        })
        .with_state(shared)
}

async fn answer(worker: SharedWorker, route: &'static str, request: Request) -> Json<Response> {
    if request.method() != route {
        return Json(Response::Error {
            message: format!("'{}' request sent to /{route}", request.method()),
        });
    }
    debug!(method = route, "request");
    let handled = tokio::task::spawn_blocking(move || match worker.lock() {
        Ok(mut worker) => worker.handle(request),
        Err(_) => Response::Error {
            message: "worker state poisoned by an earlier failure".to_string(),
        },
    })
    .await;
    Json(handled.unwrap_or_else(|err| Response::Error {
        message: format!("worker task failed: {err}"),
    }))
}

/// Serves worker requests on `listener` until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the listener fails.
pub async fn serve<F>(listener: TcpListener, worker: Worker, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!(addr = %listener.local_addr()?, "worker listening");
    axum::serve(listener, router(worker))
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("worker stopped");
    Ok(())
}
