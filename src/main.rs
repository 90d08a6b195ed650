use std::sync::Arc;

use anyhow::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use clap_serde_derive::ClapSerde;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::Config;
use crate::model::forest::ForestModel;
use crate::model::task::predict::{PredictHandler, PredictRequest, PredictResponse};

mod config;
mod error;
mod model;
mod telemetry;

use crate::error::PredictorResult;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env, default_value = "RainfallPredictor.toml")]
    config_file: String,

    /// Configuration options
    #[command(flatten)]
    pub opt_config: <Config as ClapSerde>::Opt,
}

#[derive(Clone)]
struct AppState {
    model: Arc<ForestModel>,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    telemetry::init_telemetry();

    let args = Args::parse();
    let config = match Config::from_toml(&args.config_file) {
        Ok(conf) => conf.merge(args.opt_config),
        Err(err) => {
            if args.config_file == "RainfallPredictor.toml" {
                Config::default().merge(args.opt_config)
            } else {
                exit_err!(
                    1,
                    "Failed to read configuration file {} with error: {}",
                    args.config_file,
                    err
                )
            }
        }
    };

    // Load failures are fatal: the process must not bind the socket without
    // a usable model.
    let model = match ForestModel::load(&config.model_file, &config.schema_file) {
        Ok(model) => Arc::new(model),
        Err(err) => exit_err!(1, "Failed to load model: {:#}", err),
    };
    info!(
        "Loaded model from {} expecting {} features per row",
        config.model_file,
        model.schema().arity()
    );

    let router = router(AppState { model });

    let listener = TcpListener::bind(format!("{}:{}", config.address, config.port)).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handle_index))
        .route("/predict", post(handle_predict_request))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutting down..."),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
}

async fn handle_index(State(state): State<AppState>) -> Html<String> {
    Html(format!(
        "<h1>Welcome to our rain prediction service</h1>\n\
         To use this service, make a JSON POST request to the /predict url \
         with {} climate model outputs.",
        state.model.schema().arity()
    ))
}

#[axum_macros::debug_handler(state = AppState)]
async fn handle_predict_request(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> PredictorResult<(StatusCode, Json<PredictResponse>)> {
    let Json(request) = match payload {
        Ok(json) => json,
        Err(rejection) => bail_predictor!(
            StatusCode::BAD_REQUEST,
            "Invalid request body: {}",
            rejection.body_text()
        ),
    };
    info!("Making prediction for {:?}", request);

    let rows = match state.model.schema().rows_from_request(&request) {
        Ok(rows) => rows,
        Err(err) => bail_predictor!(StatusCode::BAD_REQUEST, "{:#}", err),
    };
    let response = state.model.run_predict(rows)?;

    info!("Returning prediction {:?}", response.prediction);
    Ok((StatusCode::OK, Json(response)))
}

#[macro_export]
macro_rules! exit_err {
    ($code:expr, $fmt:expr $(, $arg:expr)*) => {{
        error!($fmt $(, $arg)*);
        std::process::exit($code)
    }};
}
