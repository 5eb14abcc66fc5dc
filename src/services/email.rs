// src/services/email.rs
//! Verification email rendering
//!
//! No mailer is wired up in this deployment; the rendered message is logged
//! so the flow can be exercised end to end. Swap `deliver_verification_email`
//! for a real transport when one is configured.

use tracing::info;

use crate::common::helpers::{safe_email_log, safe_token_log};

/// Render the email-verification message body.
pub fn render_verification_email(display_name: &str, verify_url: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <style>
        body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; }}
        .container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
        .button {{ display: inline-block; padding: 12px 24px; background-color: #4F46E5; color: white; text-decoration: none; border-radius: 5px; margin: 10px 0; }}
        .footer {{ padding: 20px; text-align: center; font-size: 12px; color: #666; }}
    </style>
</head>
<body>
    <div class="container">
        <p>Hi {},</p>

        <p>Confirm your email address to finish setting up your account.</p>

        <p><a class="button" href="{}">Verify email</a></p>

        <p>If you did not create this account, you can ignore this message.</p>

        <div class="footer">
            <p>This link is single-use and expires soon.</p>
        </div>
    </div>
</body>
</html>"#,
        display_name, verify_url
    )
}

/// "Deliver" a verification email by logging it.
pub fn deliver_verification_email(email: &str, display_name: &str, token: &str) {
    let verify_url = format!("/verify?token={}", token);
    let body = render_verification_email(display_name, &verify_url);

    info!(
        email = %safe_email_log(email),
        token = %safe_token_log(token),
        body_bytes = body.len(),
        "Verification email rendered (no mailer configured, delivery skipped)"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rendered_email_contains_link_and_name() {
        let body = render_verification_email("Alice", "/verify?token=ABC123");
        assert!(body.contains("Hi Alice,"));
        assert!(body.contains("href=\"/verify?token=ABC123\""));
    }
}
