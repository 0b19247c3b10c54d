//! Renders a [`SessionView`] into page content.
//!
//! Every function here is a pure function of its inputs.

use std::fmt::Write as _;

use super::page::{DISCLAIMER, escape_html, list};
use crate::analysis::AnalysisResult;
use crate::session::{Phase, SessionView};
use crate::upload::{FILE_FIELD, FileSummary, MediaType};

/// Seconds between refreshes while analyzing.
pub const REFRESH_SECS: u32 = 2;

/// The analyzer page body for one session.
pub fn session_page(view: &SessionView, max_bytes: usize) -> String {
    let id = escape_html(&view.id);
    let mut html = String::new();

    let _ = write!(
        html,
        r#"<div class="disclaimer" role="alert"><p><strong>Important Disclaimer</strong></p><p>{DISCLAIMER}</p></div>"#
    );

    if let Some(notice) = &view.notice {
        let _ = write!(
            html,
            r#"<div class="notice" role="status">{}</div>"#,
            escape_html(notice)
        );
    }

    html.push_str(r#"<section class="card">"#);
    if let Some(file) = &view.file {
        html.push_str(&file_preview(&id, file));
    }
    if view.phase != Phase::Analyzing {
        html.push_str(&upload_form(&id, view.file.is_some(), max_bytes));
    }
    html.push_str(&controls(&id, view.phase));
    html.push_str("</section>");

    match view.phase {
        Phase::Analyzing => html.push_str(
            r#"<div class="loader" aria-busy="true"><p><strong>AI is analyzing your report...</strong></p><p>This might take a moment.</p></div>"#,
        ),
        Phase::Failed => {
            let message = view.error.as_deref().unwrap_or_default();
            let _ = write!(
                html,
                r#"<div class="error" role="alert"><p><strong>Error</strong></p><p>{}</p></div>"#,
                escape_html(message)
            );
        }
        Phase::Ready => {
            if let Some(result) = &view.result {
                html.push_str(&analysis_results(result));
            }
            let _ = write!(
                html,
                r#"<form method="post" action="/sessions/{id}/reset" style="text-align:center;margin-top:2rem"><button type="submit" class="secondary">Analyze Another Report</button></form>"#
            );
        }
        Phase::Idle | Phase::FileSelected => {}
    }

    html
}

fn file_preview(id: &str, file: &FileSummary) -> String {
    if file.media_type.is_image() {
        format!(
            r#"<div class="preview"><img src="/sessions/{id}/preview" alt="Report preview"></div>"#
        )
    } else {
        format!(
            r#"<div class="preview"><p><strong>{}</strong></p><p>{} KB</p></div>"#,
            escape_html(&file.name),
            file.size_kb()
        )
    }
}

fn upload_form(id: &str, has_file: bool, max_bytes: usize) -> String {
    let label = if has_file {
        "Choose a different file"
    } else {
        "Upload your report"
    };
    format!(
        r#"<form method="post" action="/sessions/{id}/file" enctype="multipart/form-data">
<label for="report-file"><strong>{label}</strong></label>
<input id="report-file" type="file" name="{FILE_FIELD}" accept="{accept}" required>
<p><small>{types} up to {limit}</small></p>
<button type="submit">Upload</button>
</form>"#,
        accept = MediaType::accept_attribute(),
        types = MediaType::accepted_labels(),
        limit = format_limit(max_bytes),
    )
}

fn controls(id: &str, phase: Phase) -> String {
    let analyze = match phase {
        Phase::FileSelected => format!(
            r#"<form method="post" action="/sessions/{id}/analyze"><button type="submit">Analyze Report</button></form>"#
        ),
        Phase::Failed => format!(
            r#"<form method="post" action="/sessions/{id}/analyze"><button type="submit">Try Again</button></form>"#
        ),
        Phase::Analyzing => r#"<button type="button" disabled>Analyzing...</button>"#.to_string(),
        Phase::Idle | Phase::Ready => String::new(),
    };
    let reset = match phase {
        Phase::FileSelected | Phase::Analyzing | Phase::Failed => format!(
            r#"<form method="post" action="/sessions/{id}/reset"><button type="submit" class="secondary">Start Over</button></form>"#
        ),
        Phase::Idle | Phase::Ready => String::new(),
    };
    format!(r#"<div class="controls" style="text-align:center;margin-top:1.5rem">{analyze}{reset}</div>"#)
}

/// The result sections in display order. Empty lists are left out.
pub fn analysis_results(result: &AnalysisResult) -> String {
    let mut findings = String::from("<ul>");
    for finding in result.key_findings() {
        let _ = write!(
            findings,
            r#"<li class="finding"><p><strong>{}</strong></p><p>{}</p></li>"#,
            escape_html(&finding.term),
            escape_html(&finding.explanation)
        );
    }
    findings.push_str("</ul>");

    let summary = format!("<p>{}</p>", escape_html(result.summary()));

    let mut html = String::from(r#"<div class="results"><h2>Analysis Results</h2>"#);
    let sections = [
        ("Simplified Summary", true, summary),
        ("Key Findings Explained", !result.key_findings().is_empty(), findings),
        (
            "Potential Concerns",
            !result.potential_problems().is_empty(),
            list(result.potential_problems()),
        ),
        (
            "Recommended Next Steps",
            !result.recommended_actions().is_empty(),
            list(result.recommended_actions()),
        ),
    ];
    for (title, _, body) in sections.into_iter().filter(|(_, shown, _)| *shown) {
        let _ = write!(html, r#"<section class="card"><h3>{title}</h3>{body}</section>"#);
    }
    html.push_str("</div>");
    html
}

fn format_limit(bytes: usize) -> String {
    const MIB: usize = 1024 * 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else {
        format!("{}KB", bytes.div_ceil(1024))
    }
}
