use spaceapps_types::schema::DEFAULT_APPEEARS_URL;

/// Account and endpoint settings for the `AppEEARS` API.
#[derive(Clone, PartialEq, Eq)]
pub struct AppeearsConfig {
    pub base_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl AppeearsConfig {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_APPEEARS_URL.to_string(),
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl Default for AppeearsConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_APPEEARS_URL.to_string(),
            username: None,
            password: None,
        }
    }
}

impl std::fmt::Debug for AppeearsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppeearsConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}
