//! Email templates
//!
//! Bodies are rendered with `tera`. Templates ending in `.html` are
//! autoescaped, so user-supplied values are safe to interpolate there.

use lazy_static::lazy_static;
use tera::{Context, Tera};

use crate::error::AppError;

const PASSWORD_RESET_HTML: &str = "password_reset.html";
const PASSWORD_RESET_TEXT: &str = "password_reset.txt";

const PASSWORD_RESET_HTML_SOURCE: &str = r#"<p>Hi {{ first_name }},</p>
<p>Use this link to reset your password:</p>
<p><a href="{{ reset_link | safe }}">{{ reset_link | safe }}</a></p>
<p>This link expires in {{ ttl_minutes }} minutes.</p>"#;

const PASSWORD_RESET_TEXT_SOURCE: &str = "Hi {{ first_name }},

Use this link to reset your password:
{{ reset_link }}

This link expires in {{ ttl_minutes }} minutes.";

lazy_static! {
    static ref TEMPLATES: Tera = {
        let mut tera = Tera::default();
        tera.add_raw_template(PASSWORD_RESET_HTML, PASSWORD_RESET_HTML_SOURCE)
            .unwrap();
        tera.add_raw_template(PASSWORD_RESET_TEXT, PASSWORD_RESET_TEXT_SOURCE)
            .unwrap();
        tera
    };
}

/// Render the password reset email as `(html, text)`.
///
/// `reset_link` is built from configuration and a base64url token and is
/// inserted unescaped; `first_name` is escaped in the HTML body.
pub fn render_password_reset(
    first_name: &str,
    reset_link: &str,
    ttl_minutes: i64,
) -> Result<(String, String), AppError> {
    let mut context = Context::new();
    context.insert("first_name", first_name);
    context.insert("reset_link", reset_link);
    context.insert("ttl_minutes", &ttl_minutes);

    let html = TEMPLATES
        .render(PASSWORD_RESET_HTML, &context)
        .map_err(|e| AppError::Internal(format!("Failed to render HTML template: {}", e)))?;
    let text = TEMPLATES
        .render(PASSWORD_RESET_TEXT, &context)
        .map_err(|e| AppError::Internal(format!("Failed to render text template: {}", e)))?;

    Ok((html, text))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINK: &str = "http://localhost:5173/reset-password?token=aaa.bbb.ccc";

    #[test]
    fn test_render_password_reset() {
        let (html, text) = render_password_reset("Alice", LINK, 30).unwrap();

        assert!(html.contains("<p>Hi Alice,</p>"));
        assert!(html.contains(&format!("<a href=\"{}\">", LINK)));
        assert!(text.contains(LINK));
        assert!(text.contains("expires in 30 minutes"));
    }

    #[test]
    fn test_name_is_escaped_in_html_only() {
        let (html, text) = render_password_reset("<b>Bob</b> & co", LINK, 30).unwrap();

        assert!(html.contains("&lt;b&gt;Bob&lt;&#x2F;b&gt; &amp; co"));
        assert!(!html.contains("<b>"));
        assert!(text.contains("Hi <b>Bob</b> & co,"));
    }
}
