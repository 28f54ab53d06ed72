//! HTML templates for the Mock IdP pages.

/// Escape HTML special characters to prevent XSS.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Hidden fields carried from `/authorize` to `/authorize/submit`.
pub struct LoginPage<'a> {
    pub client_id: &'a str,
    pub state: &'a str,
    pub nonce: &'a str,
    pub redirect_uri: &'a str,
    pub response_type: &'a str,
}

/// Generate the HTML login page.
pub fn login_page(page: &LoginPage<'_>) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Mock OpenID Provider Sign In (DEV ONLY)</title>
    <style>
        body {{
            font-family: -apple-system, BlinkMacSystemFont, sans-serif;
            max-width: 400px;
            margin: 100px auto;
            padding: 20px;
        }}
        .warning {{
            background: #fff3cd;
            border: 1px solid #ffc107;
            padding: 15px;
            border-radius: 8px;
            margin-bottom: 20px;
        }}
        .warning h2 {{
            color: #856404;
            margin-top: 0;
        }}
        form {{
            background: #f8f9fa;
            padding: 20px;
            border-radius: 8px;
        }}
        label {{
            display: block;
            margin-bottom: 5px;
            font-weight: 500;
        }}
        input[type="email"], input[type="text"] {{
            width: 100%;
            padding: 10px;
            margin-bottom: 15px;
            border: 1px solid #ced4da;
            border-radius: 4px;
            box-sizing: border-box;
        }}
        button {{
            width: 100%;
            padding: 12px;
            background: #007bff;
            color: white;
            border: none;
            border-radius: 4px;
            cursor: pointer;
            font-size: 16px;
        }}
    </style>
</head>
<body>
    <div class="warning">
        <h2>Development Only</h2>
        <p>Signing in to <strong>{client_id}</strong> through a mock provider.</p>
        <p>Enter any email address to simulate authentication.</p>
    </div>

    <form action="/authorize/submit" method="POST">
        <input type="hidden" name="state" value="{state}" />
        <input type="hidden" name="nonce" value="{nonce}" />
        <input type="hidden" name="redirect_uri" value="{redirect_uri}" />
        <input type="hidden" name="response_type" value="{response_type}" />

        <label for="email">Email Address</label>
        <input type="email" id="email" name="email" placeholder="dev@example.com" required />

        <label for="name">Name (optional)</label>
        <input type="text" id="name" name="name" placeholder="Dev User" />

        <button type="submit">Sign in</button>
    </form>
</body>
</html>"#,
        client_id = html_escape(page.client_id),
        state = html_escape(page.state),
        nonce = html_escape(page.nonce),
        redirect_uri = html_escape(page.redirect_uri),
        response_type = html_escape(page.response_type),
    )
}

/// Generate the check-session page.
///
/// The relying party posts `"{client_id} {session_state}"`; the page answers
/// `changed`, `unchanged` or `error` to the sender.
pub fn check_session_page(session_state: Option<&str>) -> String {
    let current = serde_json::to_string(&session_state).unwrap_or_else(|_| "null".to_string());

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Mock OpenID Provider Check Session</title>
</head>
<body>
<script>
    var currentSessionState = {current};
    window.addEventListener("message", function (e) {{
        var parts = typeof e.data === "string" ? e.data.split(" ") : [];
        if (parts.length !== 2) {{
            e.source.postMessage("error", e.origin);
            return;
        }}
        var answer = parts[1] === currentSessionState ? "unchanged" : "changed";
        e.source.postMessage(answer, e.origin);
    }}, false);
</script>
</body>
</html>"#
    )
}
