use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::humanize::{humanize_resume_items, RewriteMode};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BulletsRequest {
    /// LaTeX content containing `\resumeItem{...}` bullets.
    pub tex_content: String,
    /// quality | balance | enhanced. Defaults to the configured mode.
    #[serde(default)]
    pub mode: Option<String>,
    /// Account email for the humanizer service (optional override).
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BulletsResponse {
    pub ok: bool,
    pub tex_content: String,
    pub found: usize,
    pub rewritten: usize,
    pub mode: RewriteMode,
}

/// POST /api/v1/humanize/bullets
///
/// Rewrites only the `\resumeItem{...}` bullets inside the provided LaTeX
/// string. Per-bullet failures fall back silently; the only hard failure is a
/// missing service credential.
pub async fn handle_humanize_bullets(
    State(state): State<AppState>,
    Json(req): Json<BulletsRequest>,
) -> Result<Json<BulletsResponse>, AppError> {
    if state.config.humanize_api_key.trim().is_empty() {
        return Err(AppError::MissingConfig(
            "HUMANIZE_API_KEY missing in environment".to_string(),
        ));
    }

    let mode = req
        .mode
        .as_deref()
        .map(RewriteMode::parse)
        .unwrap_or_else(|| RewriteMode::parse(&state.config.humanize_mode));

    let email = req
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .unwrap_or(&state.config.humanize_email)
        .to_string();

    let report = humanize_resume_items(
        state.humanizer.clone(),
        &state.events,
        &req.tex_content,
        mode,
        &email,
        state.config.humanize_max_concurrent,
    )
    .await;

    Ok(Json(BulletsResponse {
        ok: true,
        tex_content: report.tex_content,
        found: report.found,
        rewritten: report.rewritten,
        mode,
    }))
}
