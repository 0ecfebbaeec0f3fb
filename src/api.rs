//! REST API for the layer planner.
//!
//! Provides HTTP endpoints for layer arrangement, candidate listing and grid
//! evaluation. Uses Axum as the web framework and supports CORS.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use utoipa::{OpenApi, ToSchema};

use crate::candidates::generate_candidates;
use crate::config::{ApiConfig, OptimizerConfig};
use crate::geometry::{Footprint, fits_with_tolerance, footprint};
use crate::grid::Grid;
use crate::model::{Box2D, Pallet, ValidationError};
use crate::optimizer::{
    Arrangement, Guidance, LayoutConfig, SearchError, SuggestedBox, auto_optimize_with_progress,
    find_arrangement_with_progress,
};

#[derive(Clone)]
struct ApiState {
    optimizer_config: OptimizerConfig,
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>layer-it-now API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-standalone-preset.js"
            integrity="sha384-2YH8WDRaj7V2OqU/trsmzSagmk/E2SutiCsGkdgoQwC9pNUJV1u/141DHB6jgs8t"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                const ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                    presets: [SwaggerUIBundle.presets.apis, SwaggerUIStandalonePreset],
                    layout: "StandaloneLayout",
                });
                window.ui = ui;
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// Request structure for the arrange endpoints.
///
/// Without `count` the service searches for the best count on the standard
/// pallet.
#[derive(Deserialize, Clone, ToSchema)]
#[schema(example = json!({ "width": 10.0, "length": 20.0, "count": 4 }))]
pub struct ArrangeRequest {
    pub width: f64,
    pub length: f64,
    #[serde(default)]
    #[schema(nullable = true)]
    pub count: Option<usize>,
}

#[derive(Debug)]
struct ValidatedArrangeRequest {
    box_dims: Box2D,
    dimensions_swapped: bool,
    count: Option<usize>,
}

impl ArrangeRequest {
    fn into_validated(
        self,
        config: &LayoutConfig,
    ) -> Result<ValidatedArrangeRequest, ValidationError> {
        let dimensions_swapped = Box2D::needs_swap(self.width, self.length);
        let box_dims = config.make_box(self.width, self.length)?;
        if let Some(count) = self.count {
            config.validate_count(count)?;
        }
        Ok(ValidatedArrangeRequest {
            box_dims,
            dimensions_swapped,
            count: self.count,
        })
    }
}

/// Whether the count was given or searched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ArrangeMode {
    Fixed,
    Auto,
}

/// Arrangement returned by `/arrange`.
///
/// # Fields
/// * `count` - Requested count, or the winning count in auto mode
/// * `box_count` - Boxes actually placed, at least `count`
/// * `grid` - Rows top to bottom, `N` normal, `R` rotated, `O` gap
#[derive(Serialize, ToSchema)]
pub struct ArrangeResponse {
    pub mode: ArrangeMode,
    #[serde(rename = "box")]
    pub box_dims: Box2D,
    pub dimensions_swapped: bool,
    pub count: usize,
    pub box_count: usize,
    pub rows: usize,
    pub columns: usize,
    #[schema(example = json!(["N N", "N N"]))]
    pub grid: Vec<String>,
    pub pallet: Pallet,
    pub pallet_is_standard: bool,
    pub footprint: Footprint,
    pub area_efficiency: f64,
    pub ratio_score: f64,
    pub strategy: String,
}

impl ArrangeResponse {
    fn from_arrangement(
        mode: ArrangeMode,
        request: &ValidatedArrangeRequest,
        count: usize,
        arrangement: Arrangement,
        standard: &Pallet,
    ) -> Self {
        Self {
            mode,
            box_dims: request.box_dims,
            dimensions_swapped: request.dimensions_swapped,
            count,
            box_count: arrangement.box_count,
            rows: arrangement.rows,
            columns: arrangement.columns,
            grid: arrangement.grid.to_lines(),
            pallet_is_standard: arrangement.pallet.is_standard_size(standard),
            pallet: arrangement.pallet,
            footprint: arrangement.footprint,
            area_efficiency: arrangement.area_efficiency,
            ratio_score: arrangement.ratio_score,
            strategy: arrangement.strategy.to_string(),
        }
    }
}

#[derive(Deserialize, ToSchema)]
#[schema(example = json!({ "count": 12 }))]
pub struct CandidatesRequest {
    pub count: usize,
}

/// Candidate shapes as `[rows, columns]`, best first.
#[derive(Serialize, ToSchema)]
pub struct CandidatesResponse {
    #[schema(value_type = Vec<Vec<usize>>, example = json!([[4, 3], [6, 2], [12, 1]]))]
    pub candidates: Vec<[usize; 2]>,
}

#[derive(Deserialize, Clone, Copy, ToSchema)]
pub struct PalletInput {
    pub width: f64,
    pub length: f64,
}

/// Request structure for the evaluate endpoint.
///
/// The pallet defaults to the configured standard pallet.
#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "width": 10.0,
        "length": 20.0,
        "grid": ["N N", "R O"],
        "pallet": { "width": 40.0, "length": 48.0 }
    })
)]
pub struct EvaluateRequest {
    pub width: f64,
    pub length: f64,
    pub grid: Vec<String>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub pallet: Option<PalletInput>,
}

#[derive(Serialize, ToSchema)]
pub struct EvaluateResponse {
    pub footprint: Footprint,
    pub fits: bool,
    pub box_count: usize,
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    guidance: Option<Guidance>,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
            guidance: None,
        }
    }

    fn from_search_error(err: &SearchError) -> Self {
        let error = match err {
            SearchError::InvalidInput(_) => "Invalid input data",
            SearchError::NoArrangement { .. } => "No arrangement found",
            SearchError::ScalingExhausted { .. } => "Pallet scaling exhausted",
        };
        Self {
            error: error.to_string(),
            details: err.to_string(),
            guidance: err.guidance().cloned(),
        }
    }
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    (status, Json(ErrorResponse::new(error, details))).into_response()
}

fn json_deserialize_error(err: JsonRejection) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid JSON data",
        err.to_string(),
    )
}

fn validation_error(details: impl Into<String>) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid input data",
        details,
    )
}

fn search_error_response(err: &SearchError) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ErrorResponse::from_search_error(err)),
    )
        .into_response()
}

fn parse_arrange_request(
    payload: Result<Json<ArrangeRequest>, JsonRejection>,
    config: &LayoutConfig,
) -> Result<ValidatedArrangeRequest, Response> {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(err) => return Err(json_deserialize_error(err)),
    };

    payload
        .into_validated(config)
        .map_err(|err| validation_error(err.to_string()))
}

/// Runs the search for a validated request, reporting progress as JSON
/// strings.
fn run_arrangement(
    request: &ValidatedArrangeRequest,
    config: &LayoutConfig,
    mut on_event: impl FnMut(String),
) -> Result<ArrangeResponse, SearchError> {
    let mut forward = |event: &crate::optimizer::SearchEvent| {
        if let Ok(json) = serde_json::to_string(event) {
            on_event(json);
        }
    };
    let standard = config.pallet();

    match request.count {
        Some(count) => {
            let arrangement =
                find_arrangement_with_progress(&request.box_dims, count, config, &mut forward)?;
            Ok(ArrangeResponse::from_arrangement(
                ArrangeMode::Fixed,
                request,
                count,
                arrangement,
                &standard,
            ))
        }
        None => {
            let layer = auto_optimize_with_progress(&request.box_dims, config, &mut forward)?;
            Ok(ArrangeResponse::from_arrangement(
                ArrangeMode::Auto,
                request,
                layer.count,
                layer.arrangement,
                &standard,
            ))
        }
    }
}

fn candidates_for(
    count: usize,
    config: &LayoutConfig,
) -> Result<CandidatesResponse, ValidationError> {
    config.validate_count(count)?;
    let candidates = generate_candidates(count, config.target_ratio)
        .into_iter()
        .map(|(rows, columns)| [rows, columns])
        .collect();
    Ok(CandidatesResponse { candidates })
}

fn evaluate_grid(
    request: EvaluateRequest,
    config: &LayoutConfig,
) -> Result<EvaluateResponse, ValidationError> {
    let box_dims = config.make_box(request.width, request.length)?;
    let pallet = match request.pallet {
        Some(input) => Pallet::new(input.width, input.length)?,
        None => config.pallet(),
    };
    let grid = Grid::parse(&request.grid)?;

    Ok(EvaluateResponse {
        footprint: footprint(&grid, &box_dims),
        fits: fits_with_tolerance(&grid, &box_dims, &pallet, config.general_epsilon),
        box_count: grid.box_count(),
    })
}

#[derive(OpenApi)]
#[openapi(
    paths(handle_arrange, handle_arrange_stream, handle_candidates, handle_evaluate),
    components(
        schemas(
            ArrangeRequest,
            ArrangeResponse,
            ArrangeMode,
            CandidatesRequest,
            CandidatesResponse,
            EvaluateRequest,
            EvaluateResponse,
            PalletInput,
            ErrorResponse,
            Guidance,
            SuggestedBox,
            Box2D,
            Pallet,
            Footprint
        )
    ),
    tags((name = "layers", description = "Endpoints for pallet layer planning"))
)]
struct ApiDoc;

/// Starts the API server.
///
/// Configures CORS for cross-origin requests. Returns once the server stops
/// or the listener cannot be bound.
pub async fn start_api_server(
    config: ApiConfig,
    optimizer_config: OptimizerConfig,
) -> std::io::Result<()> {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let state = ApiState { optimizer_config };

    let app = Router::new()
        // API endpoints
        .route("/arrange", post(handle_arrange))
        .route("/arrange_stream", post(handle_arrange_stream))
        .route("/candidates", post(handle_candidates))
        .route("/evaluate", post(handle_evaluate))
        // API documentation
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(cors)
        .with_state(state);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await.inspect_err(|err| {
        log::error!("❌ Could not bind API server to {}: {}", addr, err);
    })?;

    log::info!(
        "🚀 Server running on http://{}:{}",
        config.display_host(),
        config.port()
    );
    if config.binds_to_all_interfaces() && config.uses_default_host() {
        log::info!("💡 Local access: http://localhost:{}", config.port());
    }
    log::info!("📦 API Endpoints: POST /arrange, /arrange_stream, /candidates, /evaluate");
    log::info!("📑 Documentation: GET /docs, /docs/openapi.json");

    axum::serve(listener, app).await
}

/// Handler for POST /arrange endpoint.
///
/// With `count` the best layout for exactly that many boxes is returned,
/// enlarging the pallet if needed. Without `count` the best count for the
/// standard pallet is searched.
#[utoipa::path(
    post,
    path = "/arrange",
    request_body = ArrangeRequest,
    responses(
        (status = 200, description = "Layer arrangement found", body = ArrangeResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid input or no arrangement possible",
            body = ErrorResponse
        )
    ),
    tag = "layers"
)]
async fn handle_arrange(
    State(state): State<ApiState>,
    payload: Result<Json<ArrangeRequest>, JsonRejection>,
) -> impl IntoResponse {
    let config = state.optimizer_config.layout_config();
    let request = match parse_arrange_request(payload, &config) {
        Ok(request) => request,
        Err(response) => return response,
    };

    log::info!(
        "📥 New arrange request: {}, count {:?}",
        request.box_dims,
        request.count
    );

    let outcome =
        tokio::task::spawn_blocking(move || run_arrangement(&request, &config, |_| {})).await;

    match outcome {
        Ok(Ok(response)) => (StatusCode::OK, Json(response)).into_response(),
        Ok(Err(err)) => search_error_response(&err),
        Err(err) => {
            log::error!("❌ Search task failed: {}", err);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Search failed",
                err.to_string(),
            )
        }
    }
}

/// Handler for POST /arrange_stream endpoint (SSE).
///
/// Streams search events in real-time as Server-Sent Events. The last event
/// has type `Result` (with the arrangement) or `Error` (with the error body).
#[utoipa::path(
    post,
    path = "/arrange_stream",
    request_body = ArrangeRequest,
    responses(
        (
            status = 200,
            description = "Streams search events in real-time",
            content_type = "text/event-stream",
            body = String
        ),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid input data",
            body = ErrorResponse
        )
    ),
    tag = "layers"
)]
async fn handle_arrange_stream(
    State(state): State<ApiState>,
    payload: Result<Json<ArrangeRequest>, JsonRejection>,
) -> impl IntoResponse {
    let config = state.optimizer_config.layout_config();
    let request = match parse_arrange_request(payload, &config) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let (tx, rx) = mpsc::channel::<String>(32);

    tokio::task::spawn_blocking(move || {
        let outcome = run_arrangement(&request, &config, |json| {
            // A closed receiver discards the remaining events.
            let _ = tx.blocking_send(json);
        });
        let last = match outcome {
            Ok(response) => serde_json::to_string(&serde_json::json!({
                "type": "Result",
                "arrangement": response,
            })),
            Err(err) => serde_json::to_string(&serde_json::json!({
                "type": "Error",
                "error": ErrorResponse::from_search_error(&err),
            })),
        };
        if let Ok(json) = last {
            let _ = tx.blocking_send(json);
        }
    });

    let stream = ReceiverStream::new(rx)
        .map(|msg| Ok::<_, std::convert::Infallible>(Event::default().data(msg)));

    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response()
}

/// Handler for POST /candidates endpoint.
///
/// Lists the grid shapes the column-wise strategy tries for a count.
#[utoipa::path(
    post,
    path = "/candidates",
    request_body = CandidatesRequest,
    responses(
        (status = 200, description = "Candidate shapes, best first", body = CandidatesResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid count", body = ErrorResponse)
    ),
    tag = "layers"
)]
async fn handle_candidates(
    State(state): State<ApiState>,
    payload: Result<Json<CandidatesRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(err) => return json_deserialize_error(err),
    };
    match candidates_for(payload.count, &state.optimizer_config.layout_config()) {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => validation_error(err.to_string()),
    }
}

/// Handler for POST /evaluate endpoint.
///
/// Computes the footprint of a grid and checks it against a pallet.
#[utoipa::path(
    post,
    path = "/evaluate",
    request_body = EvaluateRequest,
    responses(
        (status = 200, description = "Grid evaluated", body = EvaluateResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid box, pallet or grid",
            body = ErrorResponse
        )
    ),
    tag = "layers"
)]
async fn handle_evaluate(
    State(state): State<ApiState>,
    payload: Result<Json<EvaluateRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(err) => return json_deserialize_error(err),
    };
    match evaluate_grid(payload, &state.optimizer_config.layout_config()) {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => validation_error(err.to_string()),
    }
}

async fn serve_openapi_json(State(_state): State<ApiState>) -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui(State(_state): State<ApiState>) -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_doc_lists_expected_paths() {
        let doc = openapi_doc();
        let paths = &doc.paths.paths;
        for path in ["/arrange", "/arrange_stream", "/candidates", "/evaluate"] {
            assert!(
                paths.contains_key(path),
                "OpenAPI documentation is missing the {} path",
                path
            );
        }
    }

    #[test]
    fn openapi_doc_contains_key_schemas() {
        let doc = openapi_doc();
        let components = doc
            .components
            .as_ref()
            .expect("OpenAPI documentation contains no components");
        let schemas = &components.schemas;
        for name in ["ArrangeRequest", "ArrangeResponse", "ErrorResponse", "Guidance"] {
            assert!(
                schemas.contains_key(name),
                "Expected schema '{}' is missing from the OpenAPI document",
                name
            );
        }
    }

    #[test]
    fn arrange_request_count_is_optional() {
        let request: ArrangeRequest =
            serde_json::from_str(r#"{"width": 10.0, "length": 20.0}"#).expect("Should parse");
        assert_eq!(request.count, None);

        let request: ArrangeRequest =
            serde_json::from_str(r#"{"width": 10.0, "length": 20.0, "count": null}"#)
                .expect("Should parse");
        assert_eq!(request.count, None);

        let request: ArrangeRequest =
            serde_json::from_str(r#"{"width": 10.0, "length": 20.0, "count": 4}"#)
                .expect("Should parse");
        assert_eq!(request.count, Some(4));
    }

    #[test]
    fn validation_reports_swapped_dimensions() {
        let request = ArrangeRequest {
            width: 20.0,
            length: 10.0,
            count: Some(4),
        };
        let validated = request
            .into_validated(&LayoutConfig::default())
            .expect("Should validate");
        assert!(validated.dimensions_swapped);
        assert_eq!(validated.box_dims.width, 10.0);
    }

    #[test]
    fn validation_rejects_bad_input() {
        let config = LayoutConfig::default();
        let zero_count = ArrangeRequest {
            width: 10.0,
            length: 20.0,
            count: Some(0),
        };
        assert!(matches!(
            zero_count.into_validated(&config),
            Err(ValidationError::InvalidCount(_))
        ));

        let huge_box = ArrangeRequest {
            width: 10.0,
            length: 500.0,
            count: None,
        };
        assert!(matches!(
            huge_box.into_validated(&config),
            Err(ValidationError::InvalidDimension(_))
        ));
    }

    #[test]
    fn fixed_arrangement_response() {
        let config = LayoutConfig::builder().pallet(50.0, 50.0).build();
        let request = ArrangeRequest {
            width: 10.0,
            length: 20.0,
            count: Some(4),
        }
        .into_validated(&config)
        .expect("Should validate");

        let mut events = 0;
        let response = run_arrangement(&request, &config, |_| events += 1).expect("Should arrange");
        assert_eq!(response.mode, ArrangeMode::Fixed);
        assert_eq!(response.count, 4);
        assert!(response.box_count >= 4);
        assert!(response.pallet_is_standard);
        assert_eq!(response.grid.len(), response.rows);
        assert!(events > 0);

        let json = serde_json::to_value(&response).expect("Should serialize");
        assert_eq!(json["box"]["width"], 10.0);
        assert_eq!(json["mode"], "fixed");
    }

    #[test]
    fn exhausted_search_maps_to_guidance() {
        let config = LayoutConfig::builder().pallet(50.0, 50.0).build();
        let request = ArrangeRequest {
            width: 10.0,
            length: 20.0,
            count: Some(100),
        }
        .into_validated(&config)
        .expect("Should validate");

        let err = match run_arrangement(&request, &config, |_| {}) {
            Err(err) => err,
            Ok(_) => panic!("100 boxes must not fit"),
        };
        let body = ErrorResponse::from_search_error(&err);
        assert!(body.guidance.is_some());
        assert_eq!(
            search_error_response(&err).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn candidates_are_listed_as_pairs() {
        let response = candidates_for(12, &LayoutConfig::default()).expect("Should list");
        assert_eq!(response.candidates, vec![[4, 3], [6, 2], [12, 1]]);
        assert!(candidates_for(0, &LayoutConfig::default()).is_err());
    }

    #[test]
    fn evaluate_uses_standard_pallet_by_default() {
        let request: EvaluateRequest = serde_json::from_str(
            r#"{"width": 10.0, "length": 20.0, "grid": ["N N", "N N"]}"#,
        )
        .expect("Should parse");
        let response = evaluate_grid(request, &LayoutConfig::default()).expect("Should evaluate");
        assert_eq!(response.footprint, Footprint { width: 20.0, height: 40.0 });
        assert!(response.fits);
        assert_eq!(response.box_count, 4);
    }

    #[test]
    fn evaluate_rejects_malformed_grid() {
        let request = EvaluateRequest {
            width: 10.0,
            length: 20.0,
            grid: vec!["N X".to_string()],
            pallet: Some(PalletInput {
                width: 30.0,
                length: 30.0,
            }),
        };
        assert!(matches!(
            evaluate_grid(request, &LayoutConfig::default()),
            Err(ValidationError::InvalidGrid(_))
        ));
    }
}
