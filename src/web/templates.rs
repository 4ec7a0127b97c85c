use std::{borrow::Cow, time::Duration};

use chrono::{Datelike, Utc};

pub const SITE_NAME: &str = "CSE Resource Sharing Platform";

const SESSION_CLIENT_JS: &str = include_str!("session_client.js");

const BASE_STYLES: &str = r#"
        :root { color-scheme: light; }
        body { font-family: "Helvetica Neue", Arial, sans-serif; margin: 0; background: #f8fafc; color: #0f172a; min-height: 100vh; display: flex; flex-direction: column; }
        a { color: #1e293b; }
        .site-nav { background: #ffffff; border-bottom: 1px solid #e2e8f0; padding: 0.85rem clamp(1rem, 4vw, 2.5rem); display: flex; align-items: center; justify-content: space-between; flex-wrap: wrap; gap: 1rem; }
        .site-nav .brand { font-weight: 700; font-size: 1.1rem; text-decoration: none; color: #0f172a; }
        .site-nav .links { display: flex; align-items: center; gap: 1rem; flex-wrap: wrap; }
        .site-nav .links a { text-decoration: none; font-weight: 600; color: #334155; }
        .site-nav .links a:hover { color: #0f172a; }
        .site-nav form { margin: 0; }
        .pill { display: inline-flex; align-items: center; padding: 0.5rem 1rem; border-radius: 999px; background: #1e293b; color: #ffffff !important; border: none; font-weight: 600; cursor: pointer; text-decoration: none; }
        .pill.secondary { background: #e2e8f0; color: #0f172a !important; }
        main { flex: 1; padding: clamp(1.5rem, 4vw, 2.5rem); max-width: 1120px; margin: 0 auto; width: 100%; box-sizing: border-box; }
        h1 { margin-top: 0; }
        .muted { color: #64748b; }
        .panel { background: #ffffff; border-radius: 14px; border: 1px solid #e2e8f0; padding: 1.5rem; box-shadow: 0 18px 40px rgba(15, 23, 42, 0.06); margin-bottom: 1.5rem; }
        .narrow { max-width: 480px; margin: 0 auto; }
        label { display: block; margin-top: 1rem; font-weight: 600; }
        input, select, textarea { width: 100%; padding: 0.75rem; margin-top: 0.45rem; border-radius: 8px; border: 1px solid #cbd5e1; background: #f8fafc; color: #0f172a; font-size: 1rem; box-sizing: border-box; }
        textarea { min-height: 6rem; }
        button { padding: 0.75rem 1.2rem; border: none; border-radius: 8px; background: #1e293b; color: #ffffff; font-weight: 600; cursor: pointer; }
        button:hover { background: #334155; }
        button.danger { background: #dc2626; }
        .form-actions { margin-top: 1.5rem; display: flex; gap: 0.75rem; align-items: center; flex-wrap: wrap; }
        .flash { padding: 1rem 1.25rem; border-radius: 10px; margin-bottom: 1.5rem; font-weight: 600; border: 1px solid transparent; }
        .flash.success { background: #ecfdf3; border-color: #bbf7d0; color: #166534; }
        .flash.error { background: #fef2f2; border-color: #fecaca; color: #b91c1c; }
        .flash strong { display: block; }
        .grid { display: grid; gap: 1.5rem; grid-template-columns: repeat(auto-fill, minmax(280px, 1fr)); }
        .card { background: #ffffff; border-radius: 14px; border: 1px solid #e2e8f0; padding: 1.25rem; display: flex; flex-direction: column; gap: 0.6rem; }
        .card h3 { margin: 0; font-size: 1.1rem; }
        .card p { margin: 0; color: #475569; font-size: 0.95rem; }
        .badges { display: flex; gap: 0.4rem; flex-wrap: wrap; }
        .badge { display: inline-flex; padding: 0.2rem 0.65rem; border-radius: 999px; font-size: 0.8rem; font-weight: 600; background: #f1f5f9; color: #0f172a; }
        .badge.approved { background: #dcfce7; color: #166534; }
        .badge.pending { background: #fef9c3; color: #854d0e; }
        .badge.declined { background: #fee2e2; color: #991b1b; }
        .badge.type-pdf { color: #dc2626; }
        .badge.type-word { color: #2563eb; }
        .badge.type-zip { color: #ca8a04; }
        .badge.type-slides { color: #ea580c; }
        .badge.type-sheet { color: #16a34a; }
        .meta { display: flex; gap: 1rem; flex-wrap: wrap; font-size: 0.88rem; color: #64748b; }
        .chips { display: flex; gap: 0.5rem; flex-wrap: wrap; margin-bottom: 1.5rem; }
        .chip { padding: 0.45rem 1rem; border-radius: 999px; border: 1px solid #e2e8f0; background: #ffffff; text-decoration: none; font-size: 0.9rem; font-weight: 600; }
        .chip.active { background: #1e293b; color: #ffffff; border-color: #1e293b; }
        .filters { display: grid; gap: 1rem; grid-template-columns: 2fr 1fr 1fr auto; align-items: end; }
        .filters label { margin-top: 0; }
        .empty { text-align: center; padding: 3rem 1rem; color: #64748b; }
        .stats { display: grid; gap: 1rem; grid-template-columns: repeat(auto-fit, minmax(160px, 1fr)); }
        .stat { background: #ffffff; border: 1px solid #e2e8f0; border-radius: 12px; padding: 1rem 1.25rem; }
        .stat strong { display: block; font-size: 1.6rem; }
        table { width: 100%; border-collapse: collapse; }
        th, td { padding: 0.65rem 0.85rem; border-bottom: 1px solid #e2e8f0; text-align: left; font-size: 0.92rem; vertical-align: top; }
        th { background: #f1f5f9; }
        td form { display: inline; }
        td button { padding: 0.35rem 0.75rem; font-size: 0.85rem; }
        .steps { display: flex; gap: 0.5rem; margin-bottom: 1rem; }
        .steps span { flex: 1; height: 6px; border-radius: 999px; background: #e2e8f0; }
        .steps span.done { background: #1e293b; }
        .toast { position: fixed; right: 1.5rem; bottom: 1.5rem; max-width: 320px; padding: 1rem 1.25rem; border-radius: 12px; background: #fef2f2; border: 1px solid #fecaca; color: #991b1b; box-shadow: 0 18px 40px rgba(15, 23, 42, 0.15); }
        .app-footer { margin-top: 3rem; text-align: center; font-size: 0.85rem; color: #94a3b8; padding-bottom: 2rem; }
        @media (max-width: 768px) {
            .filters { grid-template-columns: 1fr; }
            th, td { padding: 0.5rem; }
        }
"#;

pub struct PageLayout<'a> {
    pub title: &'a str,
    pub authenticated: bool,
    pub flash_html: Cow<'a, str>,
    pub body_html: Cow<'a, str>,
    /// Present on pages rendered for a signed-in user; drives the expiry poll.
    pub session_poll: Option<Duration>,
}

impl<'a> PageLayout<'a> {
    pub fn new(title: &'a str, authenticated: bool, body_html: impl Into<Cow<'a, str>>) -> Self {
        Self {
            title,
            authenticated,
            flash_html: Cow::Borrowed(""),
            body_html: body_html.into(),
            session_poll: None,
        }
    }

    pub fn with_flash(mut self, flash_html: impl Into<Cow<'a, str>>) -> Self {
        self.flash_html = flash_html.into();
        self
    }

    pub fn with_session_poll(mut self, interval: Duration) -> Self {
        if self.authenticated {
            self.session_poll = Some(interval);
        }
        self
    }
}

pub fn render_page(layout: PageLayout<'_>) -> String {
    let PageLayout {
        title,
        authenticated,
        flash_html,
        body_html,
        session_poll,
    } = layout;

    let nav = render_nav(authenticated);
    let footer = render_footer();
    let script = session_poll
        .map(|interval| {
            format!(
                "<script>\n{}\n</script>",
                SESSION_CLIENT_JS.replace("__POLL_MS__", &interval.as_millis().to_string())
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{title} | {site}</title>
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <style>
{styles}
    </style>
</head>
<body>
{nav}
    <main>
        {flash_html}
{body_html}
    </main>
    {footer}
{script}
</body>
</html>"#,
        title = escape_html(title),
        site = SITE_NAME,
        styles = BASE_STYLES,
        nav = nav,
        flash_html = flash_html,
        body_html = body_html,
        footer = footer,
        script = script,
    )
}

fn render_nav(authenticated: bool) -> String {
    let account_links = if authenticated {
        r#"<a href="/upload">Upload</a>
            <a href="/profile">Profile</a>
            <a href="/manage">Manage</a>
            <form method="post" action="/auth/logout"><button class="pill" type="submit">Log out</button></form>"#
    } else {
        r#"<a class="pill secondary" href="/auth/login">Log in</a>
            <a class="pill" href="/auth/signup">Sign up</a>"#
    };

    format!(
        r#"    <nav class="site-nav">
        <a class="brand" href="/">{site}</a>
        <div class="links">
            <a href="/">Home</a>
            <a href="/resources">Resources</a>
            {account_links}
        </div>
    </nav>"#,
        site = SITE_NAME,
        account_links = account_links,
    )
}

pub fn render_footer() -> String {
    let current_year = Utc::now().year();
    format!(
        r#"<footer class="app-footer">© {year} {site}</footer>"#,
        year = current_year,
        site = SITE_NAME,
    )
}

pub fn flash_success(message: &str) -> String {
    format!(
        r#"<div class="flash success">{}</div>"#,
        escape_html(message)
    )
}

pub fn flash_error(message: &str) -> String {
    format!(r#"<div class="flash error">{}</div>"#, escape_html(message))
}

pub fn flash_notice(title: &str, message: &str) -> String {
    format!(
        r#"<div class="flash error"><strong>{}</strong>{}</div>"#,
        escape_html(title),
        escape_html(message)
    )
}

pub fn render_not_found_page(authenticated: bool) -> String {
    render_page(PageLayout::new(
        "Not Found",
        authenticated,
        r#"        <section class="panel empty">
            <h1>404</h1>
            <p>The page you are looking for does not exist.</p>
            <a class="pill" href="/">Back to home</a>
        </section>"#,
    ))
}

pub fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Percent-encode a query string value.
pub fn encode_query(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            b' ' => encoded.push('+'),
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}
