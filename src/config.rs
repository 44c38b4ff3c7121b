pub fn config_dir() -> crate::Result<std::path::PathBuf> {
    config_dir_from(
        std::env::var_os("XDG_CONFIG_HOME"),
        std::env::var_os("HOME"),
    )
}

fn config_dir_from(
    xdg_config_home: Option<std::ffi::OsString>,
    home: Option<std::ffi::OsString>,
) -> crate::Result<std::path::PathBuf> {
    let base = match (xdg_config_home, home) {
        (Some(x), _) => std::path::PathBuf::from(x),
        (None, Some(home)) => std::path::PathBuf::from(home).join(".config"),
        (None, None) => {
            return Err(crate::Error::ConfigError(
                "Can't determine the configuration directory: neither $XDG_CONFIG_HOME nor $HOME is set".to_owned(),
            ))
        }
    };
    Ok(base.join(env!("CARGO_PKG_NAME")))
}

pub fn providers_dir() -> crate::Result<std::path::PathBuf> {
    Ok(config_dir()?.join("providers.d"))
}

/// Identity provider (ADFS) and the AWS account federated with it.
#[derive(serde::Serialize, serde::Deserialize, Clone)]
pub struct Provider {
    #[serde(skip)]
    pub config_path: std::path::PathBuf,

    /// IdP-initiated sign-on endpoint, e.g.
    /// `https://sts.example.com/adfs/ls/IdpInitiatedSignOn.aspx?loginToRp=urn:amazon:webservices`
    pub url: url::Url,
    pub(crate) id: Option<String>,

    /// Name of the authentication session cookie issued by the sign-on endpoint.
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,

    /// Name of the SAML attribute carrying roles. When absent, the first attribute of the first
    /// attribute statement is used.
    #[serde(default)]
    pub role_attribute: Option<String>,

    /// Username to use when none is given on the command line.
    #[serde(default)]
    pub username: Option<String>,

    /// Default section name in the shared credentials file.
    #[serde(default)]
    pub profile: Option<String>,

    #[serde(default)]
    pub sts: ProviderSts,
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("id", &self.id)
            .field("url", &self.url.as_str())
            .field("config_path", &self.config_path)
            .finish()
    }
}

pub const DEFAULT_SESSION_COOKIE: &str = "MSISAuth";

fn default_session_cookie() -> String {
    DEFAULT_SESSION_COOKIE.to_owned()
}

impl Provider {
    /// Provider with default settings for a bare sign-on URL.
    pub fn from_url(url: url::Url) -> Self {
        Self {
            config_path: std::path::PathBuf::new(),
            url,
            id: None,
            session_cookie: default_session_cookie(),
            role_attribute: None,
            username: None,
            profile: None,
            sts: ProviderSts::default(),
        }
    }

    /// Looks up providers.d, then falls back to treating `query` as a sign-on URL.
    pub async fn resolve(query: &str) -> crate::Result<Self> {
        Self::fallback_to_url(query, Self::find_from_fs(query).await)
    }

    /// [`Provider::resolve`] against an explicit configuration directory.
    pub async fn resolve_in(dir: impl AsRef<std::path::Path>, query: &str) -> crate::Result<Self> {
        Self::fallback_to_url(query, Self::find_in_dir(dir, query).await)
    }

    fn fallback_to_url(query: &str, found: crate::Result<Self>) -> crate::Result<Self> {
        match found {
            Ok(p) => Ok(p),
            Err(e) => match url::Url::parse(query) {
                Ok(url) if matches!(url.scheme(), "https" | "http") => {
                    tracing::debug!(url = %url, err = %e, "No provider configuration matched, using URL with defaults");
                    Ok(Self::from_url(url))
                }
                _ => Err(e),
            },
        }
    }

    pub async fn find_from_fs(query: &str) -> crate::Result<Self> {
        Self::find_in_dir(providers_dir()?, query).await
    }

    /// Finds a provider in `dir` by `id`, then by `url`. An id wins over URL matches.
    pub async fn find_in_dir(dir: impl AsRef<std::path::Path>, query: &str) -> crate::Result<Self> {
        let mut d = tokio::fs::read_dir(dir.as_ref()).await.map_err(|e| {
            crate::Error::ConfigError(format!(
                "Can't list {}: {}",
                dir.as_ref().display(),
                e
            ))
        })?;
        let mut id_result = None;
        let mut url_result = vec![];
        while let Some(entry) = d.next_entry().await? {
            match Self::read_from_file(&entry.path()).await {
                Ok(c) => {
                    if c.id.as_deref() == Some(query) {
                        if id_result.is_some() {
                            return Err(crate::Error::ConfigError(format!(
                                "provider id is duplicated: {}",
                                query
                            )));
                        }
                        id_result = Some(c);
                    } else if c.url.as_str() == query {
                        url_result.push(c);
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        path = %entry.path().display(),
                        error = ?e,
                        "Error while enumerating provider configuration",
                    );
                }
            }
        }
        if let Some(s) = id_result {
            return Ok(s);
        }
        match url_result.len() {
            1 => Ok(url_result.remove(0)),
            0 => Err(crate::Error::UserError(format!(
                "No provider configuration found for: {}",
                query
            ))),
            _ => Err(crate::Error::UserError(format!(
                "provider is ambiguous (multiple configuration for the same URL found, use .id to specify): {}",
                query
            ))),
        }
    }

    pub async fn read_from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let data = tokio::fs::read(&path).await?;
        let mut parsed: Self = serde_json::from_slice(&data)?;
        parsed.config_path = path.as_ref().into();
        Ok(parsed)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if !matches!(self.url.scheme(), "https" | "http") {
            return Err(crate::Error::ConfigError(format!(
                "Provider '{}' url must be http(s)",
                self.id()
            )));
        }
        if self.session_cookie.trim().is_empty() {
            return Err(crate::Error::ConfigError(format!(
                "Provider '{}' session_cookie must not be empty",
                self.id()
            )));
        }
        self.sts.validate()?;
        Ok(())
    }

    #[inline]
    pub fn id(&self) -> &str {
        self.id.as_deref().unwrap_or_else(|| self.url.as_str())
    }
}

/// Security token service settings used for the assertion exchange.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
pub struct ProviderSts {
    #[serde(default = "default_sts_region")]
    pub region: String,
    /// Overrides the regional STS endpoint.
    #[serde(default)]
    pub endpoint_url: Option<url::Url>,
    #[serde(default = "default_duration_seconds")]
    pub duration_seconds: i32,
}

// AssumeRoleWithSAML accepts 15 minutes up to 12 hours.
const MIN_DURATION_SECONDS: i32 = 900;
const MAX_DURATION_SECONDS: i32 = 43200;

fn default_sts_region() -> String {
    "us-east-1".to_owned()
}

fn default_duration_seconds() -> i32 {
    3600
}

impl Default for ProviderSts {
    fn default() -> Self {
        Self {
            region: default_sts_region(),
            endpoint_url: None,
            duration_seconds: default_duration_seconds(),
        }
    }
}

impl ProviderSts {
    pub fn validate(&self) -> crate::Result<()> {
        if !(MIN_DURATION_SECONDS..=MAX_DURATION_SECONDS).contains(&self.duration_seconds) {
            return Err(crate::Error::ConfigError(format!(
                "sts.duration_seconds must be between {MIN_DURATION_SECONDS} and {MAX_DURATION_SECONDS}, got {}",
                self.duration_seconds
            )));
        }
        if self.region.is_empty() {
            return Err(crate::Error::ConfigError(
                "sts.region must not be empty".to_owned(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let provider: Provider =
            serde_json::from_str(r#"{"url": "https://sts.example.com/adfs/ls/IdpInitiatedSignOn.aspx"}"#)
                .unwrap();
        assert_eq!(provider.session_cookie, "MSISAuth");
        assert_eq!(provider.sts.region, "us-east-1");
        assert_eq!(provider.sts.duration_seconds, 3600);
        assert!(provider.sts.endpoint_url.is_none());
        assert!(provider.role_attribute.is_none());
        assert_eq!(
            provider.id(),
            "https://sts.example.com/adfs/ls/IdpInitiatedSignOn.aspx"
        );
        provider.validate().unwrap();
    }

    #[test]
    fn test_full() {
        let provider: Provider = serde_json::from_str(
            r#"{
                "id": "corp",
                "url": "https://sts.example.com/adfs/ls/IdpInitiatedSignOn.aspx",
                "session_cookie": "MSISAuthenticated",
                "role_attribute": "https://aws.amazon.com/SAML/Attributes/Role",
                "username": "CORP\\alice",
                "profile": "corp",
                "sts": {"region": "eu-west-1", "duration_seconds": 7200}
            }"#,
        )
        .unwrap();
        assert_eq!(provider.id(), "corp");
        assert_eq!(provider.session_cookie, "MSISAuthenticated");
        assert_eq!(provider.username.as_deref(), Some("CORP\\alice"));
        assert_eq!(provider.sts.region, "eu-west-1");
        assert_eq!(provider.sts.duration_seconds, 7200);
        provider.validate().unwrap();
    }

    #[test]
    fn test_validate_duration() {
        let mut provider =
            Provider::from_url(url::Url::parse("https://sts.example.com/adfs/ls/").unwrap());
        provider.sts.duration_seconds = 60;
        assert!(matches!(
            provider.validate(),
            Err(crate::Error::ConfigError(_))
        ));
        provider.sts.duration_seconds = 43200;
        provider.validate().unwrap();
    }

    #[test]
    fn test_validate_session_cookie() {
        let mut provider =
            Provider::from_url(url::Url::parse("https://sts.example.com/adfs/ls/").unwrap());
        provider.session_cookie = " ".to_owned();
        assert!(matches!(
            provider.validate(),
            Err(crate::Error::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_read_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corp.json");
        tokio::fs::write(
            &path,
            br#"{"id": "corp", "url": "https://sts.example.com/adfs/ls/"}"#,
        )
        .await
        .unwrap();
        let provider = Provider::read_from_file(&path).await.unwrap();
        assert_eq!(provider.id(), "corp");
        assert_eq!(provider.config_path, path);
    }

    #[test]
    fn test_config_dir_from() {
        assert_eq!(
            config_dir_from(Some("/xdg".into()), Some("/home/alice".into())).unwrap(),
            std::path::PathBuf::from("/xdg/adfs2aws")
        );
        assert_eq!(
            config_dir_from(None, Some("/home/alice".into())).unwrap(),
            std::path::PathBuf::from("/home/alice/.config/adfs2aws")
        );
        assert!(matches!(
            config_dir_from(None, None),
            Err(crate::Error::ConfigError(_))
        ));
    }

    mod find_in_dir {
        use super::*;

        const URL: &str = "https://sts.example.com/adfs/ls/IdpInitiatedSignOn.aspx";

        async fn write(dir: &std::path::Path, name: &str, json: &str) {
            tokio::fs::write(dir.join(name), json).await.unwrap();
        }

        #[tokio::test]
        async fn by_id() {
            let dir = tempfile::tempdir().unwrap();
            write(dir.path(), "a.json", &format!(r#"{{"id": "corp", "url": "{URL}"}}"#)).await;
            write(dir.path(), "b.json", r#"{"id": "lab", "url": "https://lab.example.com/adfs/ls/"}"#).await;
            write(dir.path(), "broken.json", "{").await;

            let provider = Provider::find_in_dir(dir.path(), "lab").await.unwrap();
            assert_eq!(provider.id(), "lab");
            assert_eq!(provider.config_path, dir.path().join("b.json"));
        }

        #[tokio::test]
        async fn by_url() {
            let dir = tempfile::tempdir().unwrap();
            write(dir.path(), "a.json", &format!(r#"{{"id": "corp", "url": "{URL}"}}"#)).await;

            let provider = Provider::find_in_dir(dir.path(), URL).await.unwrap();
            assert_eq!(provider.id(), "corp");
        }

        #[tokio::test]
        async fn id_wins_over_url() {
            let dir = tempfile::tempdir().unwrap();
            write(dir.path(), "a.json", &format!(r#"{{"id": "x", "url": "{URL}"}}"#)).await;
            write(dir.path(), "b.json", &format!(r#"{{"id": "{URL}", "url": "https://other.example.com/"}}"#)).await;

            let provider = Provider::find_in_dir(dir.path(), URL).await.unwrap();
            assert_eq!(provider.url.as_str(), "https://other.example.com/");
        }

        #[tokio::test]
        async fn duplicated_id() {
            let dir = tempfile::tempdir().unwrap();
            write(dir.path(), "a.json", &format!(r#"{{"id": "corp", "url": "{URL}"}}"#)).await;
            write(dir.path(), "b.json", r#"{"id": "corp", "url": "https://lab.example.com/adfs/ls/"}"#).await;

            let e = Provider::find_in_dir(dir.path(), "corp").await.unwrap_err();
            assert!(matches!(e, crate::Error::ConfigError(_)));
            assert!(e.to_string().contains("duplicated"));
        }

        #[tokio::test]
        async fn ambiguous_url() {
            let dir = tempfile::tempdir().unwrap();
            write(dir.path(), "a.json", &format!(r#"{{"id": "corp", "url": "{URL}"}}"#)).await;
            write(dir.path(), "b.json", &format!(r#"{{"id": "corp2", "url": "{URL}"}}"#)).await;

            let e = Provider::find_in_dir(dir.path(), URL).await.unwrap_err();
            assert!(matches!(e, crate::Error::UserError(_)));
            assert!(e.to_string().contains("ambiguous"));
        }

        #[tokio::test]
        async fn not_found() {
            let dir = tempfile::tempdir().unwrap();
            let e = Provider::find_in_dir(dir.path(), "corp").await.unwrap_err();
            assert!(matches!(e, crate::Error::UserError(_)));
        }

        #[tokio::test]
        async fn missing_dir() {
            let dir = tempfile::tempdir().unwrap();
            let e = Provider::find_in_dir(dir.path().join("providers.d"), "corp")
                .await
                .unwrap_err();
            assert!(matches!(e, crate::Error::ConfigError(_)));
        }
    }

    mod resolve_in {
        use super::*;

        #[tokio::test]
        async fn url_without_configuration() {
            let dir = tempfile::tempdir().unwrap();
            tokio::fs::write(
                dir.path().join("a.json"),
                r#"{"id": "corp", "url": "https://sts.example.com/adfs/ls/"}"#,
            )
            .await
            .unwrap();

            let provider = Provider::resolve_in(dir.path(), "https://lab.example.com/adfs/ls/")
                .await
                .unwrap();
            assert_eq!(provider.url.as_str(), "https://lab.example.com/adfs/ls/");
            assert_eq!(provider.session_cookie, DEFAULT_SESSION_COOKIE);
            assert_eq!(provider.config_path, std::path::PathBuf::new());
        }

        #[tokio::test]
        async fn url_with_configuration() {
            let dir = tempfile::tempdir().unwrap();
            tokio::fs::write(
                dir.path().join("a.json"),
                r#"{"id": "corp", "url": "https://sts.example.com/adfs/ls/", "session_cookie": "MSISAuthenticated"}"#,
            )
            .await
            .unwrap();

            let provider = Provider::resolve_in(dir.path(), "https://sts.example.com/adfs/ls/")
                .await
                .unwrap();
            assert_eq!(provider.id(), "corp");
            assert_eq!(provider.session_cookie, "MSISAuthenticated");
        }

        #[tokio::test]
        async fn url_with_missing_dir() {
            let dir = tempfile::tempdir().unwrap();
            let provider = Provider::resolve_in(
                dir.path().join("providers.d"),
                "https://sts.example.com/adfs/ls/",
            )
            .await
            .unwrap();
            assert_eq!(provider.id(), "https://sts.example.com/adfs/ls/");
        }

        #[tokio::test]
        async fn unknown_id() {
            let dir = tempfile::tempdir().unwrap();
            let e = Provider::resolve_in(dir.path(), "corp").await.unwrap_err();
            assert!(matches!(e, crate::Error::UserError(_)));
        }

        #[tokio::test]
        async fn non_http_url() {
            let dir = tempfile::tempdir().unwrap();
            let e = Provider::resolve_in(dir.path(), "ftp://sts.example.com/")
                .await
                .unwrap_err();
            assert!(matches!(e, crate::Error::UserError(_)));
        }
    }
}
