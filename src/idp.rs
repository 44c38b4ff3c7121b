//! Form sign-on against the identity provider (ADFS IdP-initiated sign-on page).

use crate::error::{AuthenticationError, SignOnStep};

pub struct IdpClient {
    pub sign_on_url: url::Url,
    pub session_cookie: String,
    /// Does not follow redirects, so Set-Cookie of the first response stays visible.
    cookie_http: reqwest::Client,
    http: reqwest::Client,
}

impl std::fmt::Debug for IdpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdpClient")
            .field("sign_on_url", &self.sign_on_url.as_str())
            .field("session_cookie", &self.session_cookie)
            .finish()
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "PascalCase")]
struct SignOnForm<'a> {
    user_name: &'a str,
    password: &'a str,
}

fn http_builder() -> reqwest::ClientBuilder {
    reqwest::ClientBuilder::new().user_agent(format!(
        "{}/{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    ))
}

impl IdpClient {
    pub fn new(provider: &crate::config::Provider) -> crate::Result<Self> {
        Ok(Self {
            sign_on_url: provider.url.clone(),
            session_cookie: provider.session_cookie.clone(),
            cookie_http: http_builder()
                .redirect(reqwest::redirect::Policy::none())
                .build()?,
            http: http_builder().build()?,
        })
    }

    /// Signs on with directory credentials and returns the landing page HTML, which carries the
    /// SAMLResponse form on success. Wrong credentials are not detected here.
    #[tracing::instrument(skip(self, password), fields(url = %self.sign_on_url))]
    pub async fn authenticate(
        &self,
        username: &str,
        password: &secrecy::SecretString,
    ) -> crate::Result<String> {
        use secrecy::ExposeSecret;
        let form = SignOnForm {
            user_name: username,
            password: password.expose_secret(),
        };

        let cookie = self.fetch_session_cookie(&form).await?;

        tracing::debug!(cookie_name = %self.session_cookie, "submitting sign-on form with session cookie");
        let resp = self
            .http
            .post(self.sign_on_url.clone())
            .header(reqwest::header::COOKIE, cookie)
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthenticationError::Transport {
                step: SignOnStep::SignOn,
                source: e,
            })?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(status = ?status, final_url = %resp.url(), "identity provider returned non-success status for sign-on");
        }
        let body = resp
            .text()
            .await
            .map_err(|e| AuthenticationError::Transport {
                step: SignOnStep::SignOn,
                source: e,
            })?;
        tracing::debug!(status = ?status, length = body.len(), "received sign-on response");
        Ok(body)
    }

    async fn fetch_session_cookie(&self, form: &SignOnForm<'_>) -> crate::Result<String> {
        tracing::debug!("requesting session cookie");
        let resp = self
            .cookie_http
            .post(self.sign_on_url.clone())
            .form(form)
            .send()
            .await
            .map_err(|e| AuthenticationError::Transport {
                step: SignOnStep::SessionCookie,
                source: e,
            })?;

        match find_cookie(resp.headers(), &self.session_cookie) {
            Some(c) => Ok(c),
            None => {
                tracing::error!(
                    status = ?resp.status(),
                    cookie_name = %self.session_cookie,
                    set_cookie_count = resp.headers().get_all(reqwest::header::SET_COOKIE).iter().count(),
                    "session cookie missing from identity provider response"
                );
                Err(AuthenticationError::MissingSessionCookie {
                    cookie_name: self.session_cookie.clone(),
                    status: resp.status(),
                }
                .into())
            }
        }
    }
}

/// Returns `name=value` of the first non-empty Set-Cookie named `name`.
fn find_cookie(headers: &reqwest::header::HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.trim(), v.trim()))
        .find(|(k, v)| *k == name && !v.is_empty())
        .map(|(k, v)| format!("{k}={v}"))
}
