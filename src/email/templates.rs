/// Account email bodies.
///
/// Links point at the community site and carry the username and code as
/// query parameters.
use super::OutgoingEmail;
use url::Url;

fn link(base_url: &str, path: &str, username: &str, vcode: &str) -> Result<String, url::ParseError> {
    let mut url = Url::parse(base_url)?.join(path)?;
    url.query_pairs_mut()
        .append_pair("username", username)
        .append_pair("vcode", vcode);
    Ok(url.into())
}

fn wrap_html(title: &str, inner: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>{}</title>
</head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
    <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
{}
    </div>
</body>
</html>"#,
        title, inner
    )
}

/// Sign-up verification message.
pub fn verification_email(
    site_name: &str,
    base_url: &str,
    username: &str,
    nickname: &str,
    vcode: &str,
) -> Result<OutgoingEmail, url::ParseError> {
    let verification_link = link(base_url, "/auth/sign-up/verification", username, vcode)?;

    let body_text = format!(
        r#"Hello {},

Welcome to {}! Confirm your email address by opening the link below:
{}

If you did not sign up, please ignore this email.
"#,
        nickname, site_name, verification_link
    );

    let body_html = wrap_html(
        "Verify Your Email",
        &format!(
            r#"        <h2>Welcome to {}</h2>
        <p>Hello <strong>{}</strong>,</p>
        <p>Confirm your email address to finish signing up:</p>
        <p style="margin: 30px 0;"><a href="{}">Verify Email Address</a></p>
        <p style="color: #666; font-size: 0.9em;">If you did not sign up, please ignore this email.</p>"#,
            site_name, nickname, verification_link
        ),
    );

    Ok(OutgoingEmail {
        to: username.to_owned(),
        subject: format!("[{}] Verify your email address", site_name),
        body_text,
        body_html: Some(body_html),
    })
}

/// Password reset message.
pub fn password_reset_email(
    site_name: &str,
    base_url: &str,
    username: &str,
    nickname: &str,
    vcode: &str,
    valid_minutes: i64,
) -> Result<OutgoingEmail, url::ParseError> {
    let reset_link = link(base_url, "/auth/forgot-password/verification", username, vcode)?;

    let body_text = format!(
        r#"Hello {},

You have requested to reset your password. Open the link below within {} minutes:
{}

If you did not request a password reset, please ignore this email.
"#,
        nickname, valid_minutes, reset_link
    );

    let body_html = wrap_html(
        "Password Reset",
        &format!(
            r#"        <h2>Password Reset Request</h2>
        <p>Hello <strong>{}</strong>,</p>
        <p>You have requested to reset your password.</p>
        <p style="margin: 30px 0;"><a href="{}">Reset Password</a></p>
        <p><strong>This link will expire in {} minutes.</strong></p>
        <p style="color: #666; font-size: 0.9em;">If you did not request a password reset, please ignore this email.</p>"#,
            nickname, reset_link, valid_minutes
        ),
    );

    Ok(OutgoingEmail {
        to: username.to_owned(),
        subject: format!("[{}] Reset your password", site_name),
        body_text,
        body_html: Some(body_html),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_link_is_encoded() {
        let email = verification_email(
            "pyduck",
            "http://pyduck.localhost:8080",
            "duck+1@example.com",
            "duck",
            "abc123",
        )
        .unwrap();

        assert_eq!(email.to, "duck+1@example.com");
        assert!(email.body_text.contains(
            "http://pyduck.localhost:8080/auth/sign-up/verification?username=duck%2B1%40example.com&vcode=abc123"
        ));
    }

    #[test]
    fn test_password_reset_mentions_expiry() {
        let email =
            password_reset_email("pyduck", "http://localhost", "a@b.c", "a", "code", 10).unwrap();
        assert!(email.body_text.contains("within 10 minutes"));
        assert!(email
            .body_text
            .contains("/auth/forgot-password/verification?username=a%40b.c&vcode=code"));
    }

    #[test]
    fn test_bad_base_url() {
        assert!(verification_email("x", "not a url", "a@b.c", "a", "v").is_err());
    }
}
