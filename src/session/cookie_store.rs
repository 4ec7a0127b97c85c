use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use cookie::time::Duration as CookieDuration;

use super::{EXPIRY_KEY, SESSION_TTL_HOURS, SessionStore, StoredCredential, TOKEN_KEY};

/// Session store backed by the request's cookie jar. Changes accumulate in
/// the jar, which the handler must hand back in its response.
#[derive(Clone)]
pub struct CookieSessionStore {
    jar: CookieJar,
    secure: bool,
}

impl CookieSessionStore {
    pub fn new(jar: CookieJar, secure: bool) -> Self {
        Self { jar, secure }
    }

    #[cfg(test)]
    pub fn jar(&self) -> &CookieJar {
        &self.jar
    }

    pub fn into_jar(self) -> CookieJar {
        self.jar
    }

    fn credential_cookie(&self, name: &'static str, value: String) -> Cookie<'static> {
        let mut cookie = Cookie::new(name, value);
        cookie.set_path("/");
        cookie.set_http_only(true);
        cookie.set_secure(self.secure);
        cookie.set_same_site(SameSite::Strict);
        cookie.set_max_age(CookieDuration::hours(SESSION_TTL_HOURS));
        cookie
    }

    fn removal_cookie(name: &'static str) -> Cookie<'static> {
        let mut removal = Cookie::new(name, "");
        removal.set_path("/");
        removal
    }
}

impl SessionStore for CookieSessionStore {
    fn save(&mut self, token: &str, expiry_ms: i64) {
        let token_cookie = self.credential_cookie(TOKEN_KEY, token.to_string());
        let expiry_cookie = self.credential_cookie(EXPIRY_KEY, expiry_ms.to_string());
        self.jar = self.jar.clone().add(token_cookie).add(expiry_cookie);
    }

    fn read(&self) -> StoredCredential {
        StoredCredential {
            token: self.jar.get(TOKEN_KEY).map(|c| c.value().to_string()),
            expiry: self.jar.get(EXPIRY_KEY).map(|c| c.value().to_string()),
        }
    }

    fn clear(&mut self) {
        self.jar = self
            .jar
            .clone()
            .remove(Self::removal_cookie(TOKEN_KEY))
            .remove(Self::removal_cookie(EXPIRY_KEY));
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, HeaderValue, header};

    use super::*;

    #[test]
    fn saved_cookies_carry_security_attributes() {
        let mut store = CookieSessionStore::new(CookieJar::new(), true);
        store.save("abc", 42);

        for name in [TOKEN_KEY, EXPIRY_KEY] {
            let cookie = store.jar().get(name).expect("cookie written");
            assert_eq!(cookie.secure(), Some(true));
            assert_eq!(cookie.same_site(), Some(SameSite::Strict));
            assert_eq!(cookie.http_only(), Some(true));
            assert_eq!(cookie.path(), Some("/"));
            assert_eq!(cookie.max_age(), Some(CookieDuration::hours(5)));
        }

        assert_eq!(
            store.read(),
            StoredCredential {
                token: Some("abc".to_string()),
                expiry: Some("42".to_string()),
            }
        );
    }

    #[test]
    fn clear_removes_request_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("authToken=abc; authTokenExpiry=99; theme=dark"),
        );
        let mut store = CookieSessionStore::new(CookieJar::from_headers(&headers), true);
        assert_eq!(store.read().token.as_deref(), Some("abc"));

        store.clear();

        assert_eq!(store.read(), StoredCredential::default());
        assert!(store.jar().get("theme").is_some());
    }

    #[test]
    fn insecure_mode_for_local_development() {
        let mut store = CookieSessionStore::new(CookieJar::new(), false);
        store.save("abc", 1);
        let cookie = store.jar().get(TOKEN_KEY).expect("cookie written");
        assert_eq!(cookie.secure(), Some(false));
    }
}
