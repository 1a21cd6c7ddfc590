//! OpenAPI documentation aggregator.
//!
//! Collects the `#[utoipa::path]`-annotated handlers into a single
//! OpenAPI spec, served via Scalar UI at `/docs`.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "libra API",
        version = "0.1.0",
        description = "Autoscaling control plane for Nomad task groups.",
    ),
    tags(
        (name = "Scaling", description = "Direct scale, capacity, and restart operations"),
        (name = "Alerts", description = "Grafana alert webhook intake"),
        (name = "Status", description = "Backend listing and liveness"),
    ),
    paths(
        crate::api::scale::scale,
        crate::api::capacity::capacity,
        crate::api::restart::restart,
        crate::api::grafana::grafana,
        crate::api::backends::backends,
        crate::api::health::ping,
        crate::api::health::home,
    )
)]
pub struct ApiDoc;
