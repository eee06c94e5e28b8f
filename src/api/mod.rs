use axum::{
    Router,
    extract::{Json, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::core::{
    AccessGate, Cart, CartSummary, Catalog, DEFAULT_TAX_RATE_PERCENT, LegInput, MenuEntry,
    PersonalStats, SimulationResult, Thresholds, ViewMode, compute_with_thresholds,
    select_entries, summarize_cart,
};
use crate::store::default_legs;

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

/// Immutable per-process configuration shared by every request.
#[derive(Debug, Clone)]
pub struct AppState {
    pub catalog: Catalog,
    pub thresholds: Thresholds,
    pub gate: AccessGate,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ComputePayload {
    personal_stats: Option<PersonalStats>,
    legs: Option<Vec<LegInput>>,
    tax_rate: Option<f64>,
    cart: Option<Cart>,
    search: Option<String>,
    view_mode: Option<ViewMode>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UnlockPayload {
    code: String,
}

/// Everything the engine and its overlays need for one recomputation.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanRequest {
    pub personal: PersonalStats,
    pub legs: Vec<LegInput>,
    pub tax_rate_percent: f64,
    pub cart: Cart,
    pub search: String,
    pub view_mode: ViewMode,
}

impl Default for PlanRequest {
    fn default() -> Self {
        Self {
            personal: PersonalStats::default(),
            legs: default_legs(),
            tax_rate_percent: DEFAULT_TAX_RATE_PERCENT,
            cart: Cart::new(),
            search: String::new(),
            view_mode: ViewMode::Top10,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegGap {
    pub id: u32,
    pub name: String,
    pub current_gsv: f64,
    pub target_gsv: f64,
    pub gap: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flex_points: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flex_reload_date: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResponse {
    #[serde(flatten)]
    pub result: SimulationResult,
    pub tax_rate: f64,
    pub view_mode: ViewMode,
    pub search: String,
    pub leg_gaps: Vec<LegGap>,
    pub displayed: Vec<MenuEntry>,
    pub cart: CartSummary,
}

#[derive(Debug, Serialize)]
struct UnlockResponse {
    granted: bool,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn validate_plan(request: &PlanRequest) -> Result<(), String> {
    if !request.tax_rate_percent.is_finite() || request.tax_rate_percent < 0.0 {
        return Err("--tax-rate must be a finite value >= 0".to_string());
    }

    for (name, value) in [
        ("--dcsv", request.personal.current_dcsv),
        ("--gsv", request.personal.current_gsv),
    ] {
        if !value.is_finite() {
            return Err(format!("{name} must be a finite number"));
        }
    }

    let mut ids = HashSet::with_capacity(request.legs.len());
    for leg in &request.legs {
        if !leg.current_gsv.is_finite() || !leg.target_gsv.is_finite() {
            return Err(format!("leg {} volumes must be finite numbers", leg.id));
        }
        if !ids.insert(leg.id) {
            return Err(format!("leg ids must be unique; {} appears twice", leg.id));
        }
    }

    Ok(())
}

pub fn validate_thresholds(thresholds: &Thresholds) -> Result<(), String> {
    for (name, value) in [
        ("--dcsv-threshold", thresholds.direct_customer_volume),
        ("--gsv-threshold", thresholds.group_volume),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(format!("{name} must be a finite value >= 0"));
        }
    }
    Ok(())
}

pub fn build_plan_response(
    catalog: &Catalog,
    thresholds: &Thresholds,
    request: &PlanRequest,
) -> PlanResponse {
    let result = compute_with_thresholds(
        thresholds,
        &request.personal,
        &request.legs,
        request.tax_rate_percent,
        catalog.products(),
    );
    let cart = summarize_cart(&result, &request.cart);
    let displayed = select_entries(&result.product_menu, &request.search, request.view_mode)
        .into_iter()
        .cloned()
        .collect();
    let leg_gaps = request
        .legs
        .iter()
        .map(|leg| LegGap {
            id: leg.id,
            name: leg.name.clone(),
            current_gsv: leg.current_gsv,
            target_gsv: leg.target_gsv,
            gap: leg.gap(),
            flex_points: leg.flex_points,
            flex_reload_date: leg.flex_reload_date.clone(),
        })
        .collect();

    PlanResponse {
        result,
        tax_rate: request.tax_rate_percent,
        view_mode: request.view_mode,
        search: request.search.clone(),
        leg_gaps,
        displayed,
        cart,
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route("/api/catalog", get(catalog_handler))
        .route("/api/compute", post(compute_handler))
        .route("/api/unlock", post(unlock_handler))
        .fallback(not_found_handler)
        .with_state(Arc::new(state))
}

pub async fn run_http_server(port: u16, state: AppState) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let products = state.catalog.len();
    let app = router(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(products, "solvency HTTP API listening on http://{addr}");
    tracing::info!("local access: http://127.0.0.1:{port}/");

    axum::serve(listener, app).await
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn styles_handler() -> impl IntoResponse {
    with_cache_control((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    ))
}

async fn app_js_handler() -> impl IntoResponse {
    with_cache_control((
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    ))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn catalog_handler(State(state): State<Arc<AppState>>) -> Response {
    json_response(StatusCode::OK, state.catalog.products())
}

async fn compute_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ComputePayload>, JsonRejection>,
) -> Response {
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(rejection) => {
            let msg = format!("Invalid API JSON payload: {}", rejection.body_text());
            tracing::debug!("rejected compute payload: {msg}");
            return error_response(StatusCode::BAD_REQUEST, &msg);
        }
    };
    let request = match plan_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => {
            tracing::debug!("rejected compute payload: {msg}");
            return error_response(StatusCode::BAD_REQUEST, &msg);
        }
    };

    let response = build_plan_response(&state.catalog, &state.thresholds, &request);
    json_response(StatusCode::OK, response)
}

async fn unlock_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<UnlockPayload>, JsonRejection>,
) -> Response {
    let Ok(Json(payload)) = payload else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid API JSON payload");
    };
    let today = Local::now().date_naive();
    if state.gate.accepts(&payload.code, today) {
        json_response(StatusCode::OK, UnlockResponse { granted: true })
    } else {
        tracing::info!("access denied for submitted code");
        error_response(StatusCode::FORBIDDEN, "ACCESS DENIED. INVALID FREQUENCY.")
    }
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn plan_request_from_json(json: &str) -> Result<PlanRequest, String> {
    let payload = serde_json::from_str::<ComputePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    plan_request_from_payload(payload)
}

fn plan_request_from_payload(payload: ComputePayload) -> Result<PlanRequest, String> {
    let mut request = PlanRequest::default();

    if let Some(v) = payload.personal_stats {
        request.personal = v;
    }
    if let Some(v) = payload.legs {
        request.legs = v;
    }
    if let Some(v) = payload.tax_rate {
        request.tax_rate_percent = v;
    }
    if let Some(v) = payload.cart {
        request.cart = v;
    }
    if let Some(v) = payload.search {
        request.search = v;
    }
    if let Some(v) = payload.view_mode {
        request.view_mode = v;
    }

    validate_plan(&request)?;
    Ok(request)
}
