use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use pb_core::eval::{
    build_samples, DatasetName, EvalError, Phase, ResponseSink, Sample, Score, SessionState,
    SplitName, WizardError,
};

use crate::dataset::{DatasetClient, RowsQuery};
use crate::sessions::{SessionEntry, SharedSessions};

// ---------------------------------------------------------------------------
// AppState — shared state for all handlers
// ---------------------------------------------------------------------------

pub struct AppState {
    pub dataset: DatasetClient,
    pub sessions: SharedSessions,
    pub sink: Arc<dyn ResponseSink>,
    pub dataset_name: DatasetName,
    pub split: SplitName,
    pub templates_query: RowsQuery,
    pub images_query: RowsQuery,
    pub target_count: usize,
}

impl AppState {
    /// Loads (memoized) dataset rows and builds a fresh shuffled sample
    /// list with an unseeded RNG.
    async fn generate_samples(&self) -> Result<Vec<Sample>, EvalError> {
        let templates = self.dataset.template_set(&self.templates_query).await?;
        let rows = self.dataset.rows(&self.images_query).await?;

        let samples = {
            let mut rng = rand::rng();
            build_samples(
                &templates,
                &rows,
                &self.dataset_name,
                &self.split,
                self.target_count,
                &mut rng,
            )?
        };

        if samples.len() < self.target_count {
            tracing::warn!(
                generated = samples.len(),
                target = self.target_count,
                "fewer candidate samples than target"
            );
        }
        Ok(samples)
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/sessions", post(create_session))
        .route("/v1/sessions/{token}", get(get_session))
        .route("/v1/sessions/{token}/begin", post(begin_session))
        .route("/v1/sessions/{token}/score", post(score_sample))
        .route("/v1/sessions/{token}/back", post(go_back))
        .route("/v1/sessions/{token}/skip", post(skip_sample))
        .route("/v1/sessions/{token}/restart", post(restart_session))
        .route("/v1/sessions/{token}/submit", post(submit_session))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Views — rendering is a pure function of session state
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub token: Uuid,
    pub phase: Phase,
    pub user_id: Option<String>,
    pub total: usize,
    pub position: usize,
    pub scored: usize,
    pub sample: Option<SampleView>,
    pub can_back: bool,
    pub can_skip: bool,
    pub can_submit: bool,
}

#[derive(Debug, Serialize)]
pub struct SampleView {
    pub uid: String,
    pub instruction: String,
    pub image1: String,
    pub image2: String,
    pub pair: String,
    pub selected_score: Option<u8>,
}

pub fn render(token: Uuid, state: &SessionState) -> SessionView {
    let presenting = state.phase() == Phase::Presenting;
    let sample = presenting.then(|| {
        let current = state.current_sample();
        SampleView {
            uid: current.uid.as_str().to_owned(),
            instruction: current.instruction.clone(),
            image1: current.image1.clone(),
            image2: current.image2.clone(),
            pair: current.pair.as_str().to_owned(),
            selected_score: state.current_response().map(|r| r.user_score.value()),
        }
    });

    SessionView {
        token,
        phase: state.phase(),
        user_id: state.user_id().map(|u| u.as_str().to_owned()),
        total: state.len(),
        position: state.current_idx() + 1,
        scored: state.scored_count(),
        sample,
        can_back: presenting && state.current_idx() > 0,
        can_skip: presenting
            && state.current_idx() + 1 < state.len()
            && state.current_response().is_some(),
        can_submit: state.ready_to_submit(),
    }
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct BeginRequest {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ScoreRequest {
    pub score: u8,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub async fn create_session(State(state): State<Arc<AppState>>) -> Response {
    let samples = match state.generate_samples().await {
        Ok(samples) => samples,
        Err(e) => return eval_error_to_response(e),
    };

    let token = Uuid::new_v4();
    let session = SessionState::new(samples);
    let view = render(token, &session);
    state
        .sessions
        .write()
        .await
        .insert(token, SessionEntry::new(session));

    tracing::info!(token = %token, samples = view.total, "created session");
    (StatusCode::CREATED, Json(view)).into_response()
}

pub async fn get_session(State(state): State<Arc<AppState>>, Path(token): Path<Uuid>) -> Response {
    let mut map = state.sessions.write().await;
    let Some(entry) = map.get_mut(&token) else {
        return unknown_session(token);
    };
    entry.touch();
    (StatusCode::OK, Json(render(token, &entry.state))).into_response()
}

pub async fn begin_session(
    State(state): State<Arc<AppState>>,
    Path(token): Path<Uuid>,
    Json(body): Json<BeginRequest>,
) -> Response {
    apply_event(&state, token, |session| session.begin(&body.user_id)).await
}

pub async fn score_sample(
    State(state): State<Arc<AppState>>,
    Path(token): Path<Uuid>,
    Json(body): Json<ScoreRequest>,
) -> Response {
    let score = match Score::new(body.score) {
        Ok(score) => score,
        Err(e) => return eval_error_to_response(e.into()),
    };
    apply_event(&state, token, |session| session.score(score)).await
}

pub async fn go_back(State(state): State<Arc<AppState>>, Path(token): Path<Uuid>) -> Response {
    apply_event(&state, token, |session| session.back()).await
}

pub async fn skip_sample(State(state): State<Arc<AppState>>, Path(token): Path<Uuid>) -> Response {
    apply_event(&state, token, |session| session.skip()).await
}

pub async fn restart_session(
    State(state): State<Arc<AppState>>,
    Path(token): Path<Uuid>,
) -> Response {
    // Regenerate before taking the lock; the dataset fetches are memoized
    // so only the shuffle is fresh work.
    let samples = match state.generate_samples().await {
        Ok(samples) => samples,
        Err(e) => return eval_error_to_response(e),
    };

    let mut map = state.sessions.write().await;
    let Some(entry) = map.get_mut(&token) else {
        return unknown_session(token);
    };
    entry.touch();
    entry.state.restart(samples);

    tracing::info!(token = %token, "session restarted");
    (StatusCode::OK, Json(render(token, &entry.state))).into_response()
}

pub async fn submit_session(
    State(state): State<Arc<AppState>>,
    Path(token): Path<Uuid>,
) -> Response {
    // Collect rows under the lock, append without it, then mark submitted
    // only once the sink reported success so a failed append stays
    // retryable.
    let rows = {
        let mut map = state.sessions.write().await;
        let Some(entry) = map.get_mut(&token) else {
            return unknown_session(token);
        };
        entry.touch();
        match entry.state.pending_rows() {
            Ok(rows) => rows,
            Err(e) => return eval_error_to_response(e.into()),
        }
    };

    if let Err(e) = state.sink.append(&rows).await {
        tracing::error!(token = %token, error = %e, "sink append failed");
        return eval_error_to_response(e.into());
    }

    let mut map = state.sessions.write().await;
    let Some(entry) = map.get_mut(&token) else {
        return unknown_session(token);
    };
    entry.state.mark_submitted();

    tracing::info!(token = %token, rows = rows.len(), "responses submitted");
    (StatusCode::OK, Json(render(token, &entry.state))).into_response()
}

pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    let sessions = state.sessions.read().await.len();
    let body = serde_json::json!({
        "status": "ok",
        "sessions": sessions,
    });
    (StatusCode::OK, Json(body)).into_response()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn apply_event<F>(state: &AppState, token: Uuid, event: F) -> Response
where
    F: FnOnce(&mut SessionState) -> Result<(), WizardError>,
{
    let mut map = state.sessions.write().await;
    let Some(entry) = map.get_mut(&token) else {
        return unknown_session(token);
    };
    entry.touch();

    match event(&mut entry.state) {
        Ok(()) => (StatusCode::OK, Json(render(token, &entry.state))).into_response(),
        Err(e) => eval_error_to_response(e.into()),
    }
}

fn unknown_session(token: Uuid) -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        "not_found_error",
        format!("unknown session {token}"),
    )
}

// ---------------------------------------------------------------------------
// Error → Response conversion
// ---------------------------------------------------------------------------

pub fn eval_error_to_response(err: EvalError) -> Response {
    let (status, error_type) = match &err {
        EvalError::Wizard(WizardError::EmptyUserId | WizardError::ScoreOutOfRange { .. }) => {
            (StatusCode::UNPROCESSABLE_ENTITY, "validation_error")
        }
        EvalError::Wizard(_) => (StatusCode::CONFLICT, "session_state_error"),
        EvalError::Dataset(_) => (StatusCode::BAD_GATEWAY, "dataset_error"),
        EvalError::Template(_) => (StatusCode::BAD_GATEWAY, "template_error"),
        EvalError::Sink(_) => (StatusCode::BAD_GATEWAY, "sink_error"),
    };
    error_response(status, error_type, err.to_string())
}

fn error_response(status: StatusCode, error_type: &str, message: String) -> Response {
    let body = serde_json::json!({
        "error": {
            "message": message,
            "type": error_type,
            "code": status.as_u16(),
        }
    });
    (status, Json(body)).into_response()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
