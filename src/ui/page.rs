//! Page shell and HTML helpers.

use std::fmt::Write as _;

/// Product name shown in the header and title.
pub const APP_NAME: &str = "AI Medical Report Analyzer";

/// Shown above every analyzer page.
pub const DISCLAIMER: &str = "This tool provides an AI-generated analysis for informational purposes only. It is NOT a substitute for professional medical advice, diagnosis, or treatment. Always seek the advice of your physician or other qualified health provider with any questions you may have regarding a medical condition.";

const STYLES: &str = r"
body { margin: 0; font-family: system-ui, sans-serif; background: #f9fafb; color: #111827; }
header, footer { background: #fff; border-bottom: 1px solid #e5e7eb; padding: 1rem 2rem; }
footer { border-top: 1px solid #e5e7eb; border-bottom: none; text-align: center; font-size: .875rem; color: #6b7280; margin-top: 4rem; }
main { max-width: 56rem; margin: 0 auto; padding: 2rem 1rem; }
.card { background: #fff; border-radius: 1rem; box-shadow: 0 1px 3px rgba(0,0,0,.1); padding: 1.5rem; margin-top: 2rem; }
.disclaimer { background: #fef9c3; border-left: 4px solid #eab308; padding: 1rem; border-radius: .375rem; }
.error { background: #fee2e2; border-left: 4px solid #ef4444; padding: 1rem; border-radius: .375rem; margin-top: 2rem; }
.notice { background: #e0e7ff; border-left: 4px solid #6366f1; padding: 1rem; border-radius: .375rem; margin-top: 2rem; }
.loader { text-align: center; margin: 3rem 0; }
.finding { background: #f9fafb; border-radius: .5rem; padding: 1rem; margin-bottom: 1rem; }
.preview img { max-height: 24rem; display: block; margin: 0 auto; border-radius: .375rem; }
button { background: #4f46e5; color: #fff; border: none; border-radius: .5rem; padding: .75rem 2rem; font-weight: 600; cursor: pointer; }
button.secondary { background: #4b5563; }
";

/// Wrap `content` in the full document.
///
/// `refresh_secs` adds a meta refresh so a page waiting on an analysis
/// polls without any script.
pub fn html_shell(title: &str, content: &str, refresh_secs: Option<u32>) -> String {
    let refresh = refresh_secs
        .map(|secs| format!(r#"<meta http-equiv="refresh" content="{secs}">"#))
        .unwrap_or_default();
    let title = escape_html(title);

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="description" content="Plain-language explanations of medical reports">
    {refresh}
    <title>{title} - {APP_NAME}</title>
    <style>{STYLES}</style>
</head>
<body>
    <header>
        <a href="/" style="text-decoration:none;color:inherit"><strong>{APP_NAME}</strong></a>
    </header>
    <main id="app">
        {content}
    </main>
    <footer>
        <p>This tool is for informational purposes only and is not a substitute for professional medical advice.</p>
    </footer>
</body>
</html>"#
    )
}

/// Escape text for use in element content and quoted attributes.
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// `<ul>` of escaped items.
pub(crate) fn list(items: &[String]) -> String {
    let mut html = String::from("<ul>");
    for item in items {
        let _ = write!(html, "<li>{}</li>", escape_html(item));
    }
    html.push_str("</ul>");
    html
}
