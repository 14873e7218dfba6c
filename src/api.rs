//! JSON API routes for the dashboard front end.
//!
//! Routing is synchronous and socket-free: the server binary reads a request,
//! hands method, path and body here, and writes back the [`ApiResponse`].

use crate::claims_filter::ClaimsFilter;
use crate::error::DashboardError;
use crate::render;
use crate::session::Session;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

pub const NO_SESSION_MESSAGE: &str = "Upload both CSV files to get started.";

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "error": message.into() }),
        }
    }

    pub fn status_text(&self) -> &'static str {
        match self.status {
            200 => "OK",
            400 => "Bad Request",
            404 => "Not Found",
            409 => "Conflict",
            413 => "Payload Too Large",
            422 => "Unprocessable Entity",
            _ => "Internal Server Error",
        }
    }
}

impl From<DashboardError> for ApiResponse {
    fn from(err: DashboardError) -> Self {
        match err {
            DashboardError::MissingColumn { .. } => ApiResponse::error(422, err.to_string()),
            DashboardError::Load(_) | DashboardError::InvalidInput(_) | DashboardError::Json(_) => {
                ApiResponse::error(400, err.to_string())
            }
            other => ApiResponse::error(500, other.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct UploadRequest {
    encounters_csv: String,
    claims_csv: String,
}

#[derive(Debug, Deserialize)]
struct LookupRequest {
    query: String,
}

#[derive(Debug, Deserialize)]
struct ClaimsRequest {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    provider: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InsightRequest {
    prompt: String,
}

/// Dispatch one request against the current session slot.
pub fn handle(method: &str, path: &str, body: &str, session: &mut Option<Session>) -> ApiResponse {
    let path = normalize_path(path);
    match (method, path) {
        ("GET", "/api/health") => ApiResponse::ok(json!({
            "status": "ok",
            "service": "clinical-dashboard",
            "session_loaded": session.is_some(),
        })),
        ("POST", "/api/upload") => upload(body, session),
        ("GET", "/api/metrics") => with_session(session, |s| {
            let summary = s.metrics();
            Ok(json!({
                "metrics": summary,
                "approval_ratio": summary.approval.map(|a| a.to_string()),
            }))
        }),
        ("GET", "/api/filters") => with_session(session, |s| Ok(json!(s.filter_options()?))),
        ("GET", "/api/charts") => with_session(session, |s| Ok(json!(s.charts()))),
        ("POST", "/api/lookup") => with_session(session, |s| {
            let req: LookupRequest = serde_json::from_str(body)?;
            match s.lookup(&req.query)? {
                None => Ok(json!({ "query": req.query, "performed": false })),
                Some(matches) => Ok(json!({
                    "query": req.query,
                    "performed": true,
                    "icd_matches": render::table_json(&matches.diagnosis)?,
                    "cpt_matches": render::table_json(&matches.procedure)?,
                })),
            }
        }),
        ("POST", "/api/claims") => with_session(session, |s| {
            let req: ClaimsRequest = serde_json::from_str(body)?;
            let filter = ClaimsFilter::new(req.status, req.provider);
            render::table_json(&s.filter_claims(&filter)?)
        }),
        ("POST", "/api/insights") => with_session(session, |s| {
            let req: InsightRequest = serde_json::from_str(body)?;
            let plan = crate::prompt::plan(&req.prompt);
            let result = s.ask(&req.prompt)?;
            Ok(json!({
                "prompt": req.prompt,
                "date_range": plan.date_range,
                "title": result.as_ref().map(|r| r.insight().title()),
                "result": result,
            }))
        }),
        _ => ApiResponse::error(404, format!("No route for {} {}", method, path)),
    }
}

fn upload(body: &str, session: &mut Option<Session>) -> ApiResponse {
    let req: UploadRequest = match serde_json::from_str(body) {
        Ok(req) => req,
        Err(e) => return DashboardError::from(e).into(),
    };

    // the previous tables are dropped even if the new pair fails to load
    *session = None;
    match Session::from_csv_bytes(req.encounters_csv.as_bytes(), req.claims_csv.as_bytes()) {
        Ok(loaded) => {
            info!(
                "Session loaded: {} encounters, {} claims",
                loaded.encounters.height(),
                loaded.claims.height()
            );
            let body = json!({
                "success": true,
                "encounters": loaded.encounters.height(),
                "claims": loaded.claims.height(),
                "loaded_at": loaded.loaded_at,
            });
            *session = Some(loaded);
            ApiResponse::ok(body)
        }
        Err(e) => {
            warn!("Upload rejected: {}", e);
            e.into()
        }
    }
}

fn with_session<F>(session: &Option<Session>, f: F) -> ApiResponse
where
    F: FnOnce(&Session) -> crate::error::Result<Value>,
{
    match session {
        None => ApiResponse::error(409, NO_SESSION_MESSAGE),
        Some(s) => match f(s) {
            Ok(body) => ApiResponse::ok(body),
            Err(e) => e.into(),
        },
    }
}

fn normalize_path(path: &str) -> &str {
    let path = path.split('?').next().unwrap_or(path);
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload_body() -> String {
        json!({
            "encounters_csv": "Patient_ID,Provider,Procedure_Code,Length_of_Stay\nP1,Dr. Lee,99213,2\n",
            "claims_csv": "Claim_ID,Patient_ID,Status\nC1,P1,Paid\n",
        })
        .to_string()
    }

    #[test]
    fn test_requests_without_session_conflict() {
        let mut session = None;
        let resp = handle("GET", "/api/metrics", "", &mut session);
        assert_eq!(resp.status, 409);
        assert_eq!(resp.body["error"], NO_SESSION_MESSAGE);
    }

    #[test]
    fn test_upload_then_metrics() {
        let mut session = None;
        let resp = handle("POST", "/api/upload/", &upload_body(), &mut session);
        assert_eq!(resp.status, 200);
        assert!(session.is_some());

        let resp = handle("GET", "/api/metrics", "", &mut session);
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body["approval_ratio"], "1 / 0");
        assert_eq!(resp.body["metrics"]["total_patients"], 1);
    }

    #[test]
    fn test_failed_upload_clears_session() {
        let mut session = None;
        handle("POST", "/api/upload", &upload_body(), &mut session);
        let bad = json!({ "encounters_csv": "", "claims_csv": "" }).to_string();
        let resp = handle("POST", "/api/upload", &bad, &mut session);
        assert_eq!(resp.status, 400);
        assert!(session.is_none());
    }

    #[test]
    fn test_missing_column_maps_to_422() {
        let mut session = None;
        handle("POST", "/api/upload", &upload_body(), &mut session);
        let resp = handle("POST", "/api/lookup", r#"{"query":"i10"}"#, &mut session);
        assert_eq!(resp.status, 422);
    }

    #[test]
    fn test_unknown_route() {
        let mut session = None;
        assert_eq!(handle("GET", "/nope", "", &mut session).status, 404);
        assert_eq!(handle("GET", "/api/health?x=1", "", &mut session).status, 200);
    }
}
