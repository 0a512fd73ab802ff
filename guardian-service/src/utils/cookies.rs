//! Names and shared options for the auth cookies.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::config::{CookieConfig, JwtConfig};
use crate::services::jwt::TokenPair;

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

fn token_cookie(
    name: &'static str,
    value: String,
    max_age: time::Duration,
    config: &CookieConfig,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(config.secure)
        .same_site(SameSite::Strict)
        .max_age(max_age)
        .build()
}

/// Set both auth cookies, each living as long as its token.
pub fn set_auth_cookies(
    jar: CookieJar,
    tokens: &TokenPair,
    cookies: &CookieConfig,
    jwt: &JwtConfig,
) -> CookieJar {
    jar.add(token_cookie(
        ACCESS_TOKEN_COOKIE,
        tokens.access_token.clone(),
        time::Duration::minutes(jwt.access_token_expiry_minutes),
        cookies,
    ))
    .add(token_cookie(
        REFRESH_TOKEN_COOKIE,
        tokens.refresh_token.clone(),
        time::Duration::days(jwt.refresh_token_expiry_days),
        cookies,
    ))
}

fn removal_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::build((name, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .build();
    cookie.make_removal();
    cookie
}

/// Expire both auth cookies, whether or not the request carried them.
pub fn clear_auth_cookies(jar: CookieJar) -> CookieJar {
    // `CookieJar::remove` only emits a removal for cookies the request sent.
    jar.add(removal_cookie(ACCESS_TOKEN_COOKIE))
        .add(removal_cookie(REFRESH_TOKEN_COOKIE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;

    #[test]
    fn auth_cookies_are_http_only_and_scoped_to_root() {
        let config = test_config();
        let tokens = TokenPair {
            access_token: "a.b.c".to_string(),
            refresh_token: "d.e.f".to_string(),
        };

        let jar = set_auth_cookies(CookieJar::new(), &tokens, &config.cookies, &config.jwt);

        let access = jar.get(ACCESS_TOKEN_COOKIE).unwrap();
        assert_eq!(access.value(), "a.b.c");
        assert_eq!(access.http_only(), Some(true));
        assert_eq!(access.path(), Some("/"));
        assert_eq!(access.max_age(), Some(time::Duration::minutes(15)));

        let refresh = jar.get(REFRESH_TOKEN_COOKIE).unwrap();
        assert_eq!(refresh.value(), "d.e.f");
        assert_eq!(refresh.max_age(), Some(time::Duration::days(7)));
    }

    #[test]
    fn clearing_expires_cookies_the_request_never_sent() {
        let jar = clear_auth_cookies(CookieJar::new());

        let access = jar.get(ACCESS_TOKEN_COOKIE).unwrap();
        assert_eq!(access.value(), "");
        assert_eq!(access.max_age(), Some(time::Duration::ZERO));
        assert!(jar.get(REFRESH_TOKEN_COOKIE).is_some());
    }
}
