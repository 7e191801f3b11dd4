//! Backend addressing and credential lifetimes.

use taskdeck_domain::{ApiRequest, DomainResult};
use url::Url;

/// Default login route.
pub const DEFAULT_LOGIN_PATH: &str = "/auth/login";
/// Default refresh route.
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";

/// Where the backend lives and which routes are authentication endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoints {
    base_url: Url,
    login_path: String,
    refresh_path: String,
}

impl ApiEndpoints {
    /// Creates endpoints with the default `/auth/login` and `/auth/refresh` routes.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
        }
    }

    /// Overrides the login route.
    #[must_use]
    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    /// Overrides the refresh route.
    #[must_use]
    pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    /// The API base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// True when the backend is served over TLS.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.scheme() == "https"
    }

    /// Resolves a request target against the base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the target does not form a valid URL.
    pub fn resolve(&self, request: &ApiRequest) -> DomainResult<Url> {
        request.resolve(&self.base_url)
    }

    /// A bare POST to the login route.
    #[must_use]
    pub fn login_request(&self) -> ApiRequest {
        ApiRequest::post(self.login_path.clone())
    }

    /// A bare POST to the refresh route.
    #[must_use]
    pub fn refresh_request(&self) -> ApiRequest {
        ApiRequest::post(self.refresh_path.clone())
    }

    /// True if `url` shares the backend's origin (scheme, host and port).
    ///
    /// Credentials are only ever sent to this origin.
    #[must_use]
    pub fn is_backend(&self, url: &Url) -> bool {
        url.origin() == self.base_url.origin()
    }

    /// True if `url` addresses the login or refresh route of the backend.
    ///
    /// These routes never carry the access token and a 401 from them is
    /// final. The whole path must match the base path joined with the route.
    #[must_use]
    pub fn is_auth_endpoint(&self, url: &Url) -> bool {
        if !self.is_backend(url) {
            return false;
        }
        let path = url.path().trim_end_matches('/');
        [&self.login_path, &self.refresh_path]
            .iter()
            .filter(|route| !route.trim_matches('/').is_empty())
            .any(|route| path == self.route_path(route))
    }

    fn route_path(&self, route: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.path().trim_end_matches('/'),
            route.trim_matches('/')
        )
    }
}

/// How long each stored credential stays readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPolicy {
    /// Lifetime of the stored access token, in days.
    pub access_ttl_days: u32,
    /// Lifetime of the stored refresh token, in days.
    pub refresh_ttl_days: u32,
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            access_ttl_days: 1,
            refresh_ttl_days: 7,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn endpoints() -> ApiEndpoints {
        ApiEndpoints::new(Url::parse("https://api.example.com/v1").unwrap())
    }

    #[test]
    fn test_auth_endpoint_detection() {
        let endpoints = endpoints();
        let login = endpoints.resolve(&endpoints.login_request()).unwrap();
        let refresh = endpoints.resolve(&endpoints.refresh_request()).unwrap();
        let task = endpoints.resolve(&ApiRequest::get("/task")).unwrap();

        assert!(endpoints.is_auth_endpoint(&login));
        assert!(endpoints.is_auth_endpoint(&refresh));
        assert!(!endpoints.is_auth_endpoint(&task));
        assert_eq!(refresh.as_str(), "https://api.example.com/v1/auth/refresh");
    }

    #[test]
    fn test_auth_endpoint_ignores_query_and_trailing_slash() {
        let endpoints = endpoints();
        let url = Url::parse("https://api.example.com/v1/auth/login/?next=/task").unwrap();
        assert!(endpoints.is_auth_endpoint(&url));

        let url = Url::parse("https://api.example.com/v1/auth/login-history").unwrap();
        assert!(!endpoints.is_auth_endpoint(&url));
    }

    #[test]
    fn test_auth_endpoint_requires_full_path_on_backend_origin() {
        let endpoints = endpoints();

        let nested = Url::parse("https://api.example.com/v1/reports/auth/refresh").unwrap();
        assert!(!endpoints.is_auth_endpoint(&nested));

        let unprefixed = Url::parse("https://api.example.com/auth/refresh").unwrap();
        assert!(!endpoints.is_auth_endpoint(&unprefixed));

        let foreign = Url::parse("https://tracker.thirdparty.com/v1/auth/login").unwrap();
        assert!(!endpoints.is_auth_endpoint(&foreign));
    }

    #[test]
    fn test_is_backend_compares_origin() {
        let endpoints = endpoints();

        assert!(endpoints.is_backend(&Url::parse("https://api.example.com/other").unwrap()));
        assert!(endpoints.is_backend(&Url::parse("https://api.example.com:443/v1").unwrap()));
        assert!(!endpoints.is_backend(&Url::parse("http://api.example.com/v1").unwrap()));
        assert!(!endpoints.is_backend(&Url::parse("https://api.example.com:8443/v1").unwrap()));
        assert!(!endpoints.is_backend(&Url::parse("https://tracker.thirdparty.com/v1").unwrap()));
    }

    #[test]
    fn test_is_secure() {
        assert!(endpoints().is_secure());
        let plain = ApiEndpoints::new(Url::parse("http://localhost:3000").unwrap());
        assert!(!plain.is_secure());
    }
}
