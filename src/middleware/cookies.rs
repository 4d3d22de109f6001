use axum_extra::extract::cookie::{Cookie, SameSite};

/// Session cookie. No max-age: it lives as long as the browser session.
pub(super) fn session_cookie(name: &str, session_id: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((name.to_string(), session_id.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/".to_string())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("__horror_session", "abc", true);
        assert_eq!(cookie.name(), "__horror_session");
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert!(cookie.max_age().is_none());
    }
}
