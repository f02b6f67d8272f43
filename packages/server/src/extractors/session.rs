use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use uuid::Uuid;

use crate::state::AppState;

/// Anonymous caller identity carried in a cookie.
///
/// A request without the cookie gets a fresh identity; the handler must hand
/// [`Session::cookie`] back to the client for it to stick.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    cookie_name: String,
    fresh: bool,
}

impl Session {
    /// Whether the identity was issued by this request.
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    /// Cookie to set on the response, if one is needed.
    pub fn cookie(&self) -> Option<Cookie<'static>> {
        self.fresh.then(|| {
            Cookie::build((self.cookie_name.clone(), self.id.clone()))
                .http_only(true)
                .same_site(SameSite::Lax)
                .path("/")
                .build()
        })
    }

    /// Add the session cookie to `jar` when it was just issued.
    pub fn persist(&self, jar: CookieJar) -> CookieJar {
        match self.cookie() {
            Some(cookie) => jar.add(cookie),
            None => jar,
        }
    }

    /// Read the identity from `jar`, issuing a fresh one when the cookie is
    /// missing or does not hold a UUID.
    pub fn from_jar(jar: &CookieJar, cookie_name: &str) -> Self {
        let existing = jar
            .get(cookie_name)
            .and_then(|c| Uuid::parse_str(c.value().trim()).ok());

        match existing {
            Some(id) => Session {
                id: id.to_string(),
                cookie_name: cookie_name.to_string(),
                fresh: false,
            },
            None => Session {
                id: Uuid::new_v4().to_string(),
                cookie_name: cookie_name.to_string(),
                fresh: true,
            },
        }
    }
}

impl FromRequestParts<AppState> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        Ok(Session::from_jar(&jar, &state.config.session.cookie_name))
    }
}
