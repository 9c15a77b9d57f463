// frontend-server/src/page.rs
use common::FrontendConfig;

const TEMPLATE: &str = include_str!("../static/index.html");

pub const CONTENT_SECURITY_POLICY: &str = "script-src 'unsafe-inline' 'self';";

/// The auth page with its configuration baked in
#[derive(Clone, Debug)]
pub struct AuthPage {
    html: String,
}

impl AuthPage {
    pub fn render(config: &FrontendConfig) -> Self {
        let html = TEMPLATE
            .replace("{{TARGET_IFRAME_URL}}", &js_string(&config.target_iframe_url))
            .replace("{{BACKEND_URL}}", &js_string(&config.backend_url))
            .replace("{{ALLOWED_ORIGIN}}", &js_string(&config.allowed_origin));
        Self { html }
    }

    pub fn html(&self) -> &str {
        &self.html
    }
}

/// Quoted JavaScript string literal, safe inside a <script> element
fn js_string(value: &str) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "\"\"".to_string())
        .replace("</", "<\\/")
}
