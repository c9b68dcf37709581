use axum::{
    extract::{Multipart, Query, State},
    http::header,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::AppError,
    models::Feedback,
    services::pipeline::ReceivedUpload,
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(upload_form).post(upload))
        .route("/report", get(report_ready))
        .route("/download", get(download_report))
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    status: Option<String>,
}

async fn upload_form(Query(query): Query<StatusQuery>) -> Html<String> {
    let banner = query.status.as_deref().and_then(Feedback::for_code);
    Html(render_form(banner))
}

/// POST / - receives the multipart form and drives one pipeline cycle.
///
/// Ready redirects to the download-ready view; every failure redirects back
/// to the form carrying the outcome code in the query string.
async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Redirect, AppError> {
    let mut received = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Multipart(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Multipart(e.to_string()))?;
        tracing::info!("received upload '{}' ({} bytes)", filename, bytes.len());
        received = Some(ReceivedUpload { filename, bytes });
        break;
    }

    let outcome = state.pipeline.run(received).await;
    Ok(if outcome.is_ready() {
        Redirect::to("/report")
    } else {
        Redirect::to(&format!("/?status={}", outcome.code()))
    })
}

async fn report_ready(State(state): State<Arc<AppState>>) -> Response {
    if !state.store.report_exists() {
        return Redirect::to("/?status=no_report").into_response();
    }
    Html(render_report_ready()).into_response()
}

/// GET /download - serves the generated report as an attachment, or sends
/// the user back to the form with a warning when none exists.
async fn download_report(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    if !state.store.report_exists() {
        return Ok(Redirect::to("/?status=no_report").into_response());
    }

    let bytes = tokio::fs::read(state.store.report_path())
        .await
        .map_err(|e| AppError::Internal(format!("failed to read report: {}", e)))?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"report.html\"",
            ),
        ],
        bytes,
    )
        .into_response())
}

const PAGE_STYLE: &str = r#"
    body { font-family: Arial, sans-serif; margin: 2rem; color: #1d1d1f; max-width: 40rem; }
    h1 { margin-bottom: 0.5rem; }
    .card { border: 1px solid #ddd; padding: 1rem; border-radius: 8px; margin-bottom: 1rem; }
    .banner { padding: 0.75rem 1rem; border-radius: 8px; margin-bottom: 1rem; }
    .banner.danger { background: #fdecea; color: #8a1f16; }
    .banner.warning { background: #fff4e5; color: #7a4f01; }
    .banner.success { background: #e9f7ef; color: #1b5e33; }
    input[type=file] { display: block; margin: 0.75rem 0; }
    button, a.button { display: inline-block; padding: 0.6rem 1rem; border-radius: 6px;
      border: 1px solid #bbb; background: #f6f8fa; color: inherit; text-decoration: none; cursor: pointer; }
"#;

fn render_form(banner: Option<Feedback>) -> String {
    let banner_html = banner
        .map(|f| {
            format!(
                "  <div class=\"banner {}\">{}</div>\n",
                f.kind.css_class(),
                f.text
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>Tabular Profiler</title>
  <style>{PAGE_STYLE}</style>
</head>
<body>
  <h1>Tabular Profiler</h1>
  <p>Upload a CSV or Excel file to generate a statistical profile report.</p>
{banner_html}  <div class="card">
    <form method="post" enctype="multipart/form-data">
      <label for="file">Dataset (.csv, .xls, .xlsx)</label>
      <input id="file" name="file" type="file" />
      <button type="submit">Upload and profile</button>
    </form>
  </div>
</body>
</html>
"#
    )
}

fn render_report_ready() -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>Report Ready</title>
  <style>{PAGE_STYLE}</style>
</head>
<body>
  <h1>Report Ready</h1>
  <div class="banner success">Report generated successfully. Use Download Report to get it.</div>
  <div class="card">
    <a id="download" class="button" href="/download">Download Report</a>
  </div>
  <script>
    // After the download starts, return to the upload form without a
    // server round trip.
    document.getElementById('download').addEventListener('click', () => {{
      setTimeout(() => {{ window.location = '/'; }}, 3000);
    }});
  </script>
</body>
</html>
"#
    )
}
