//! Sign-on, assertion extraction and token exchange put together.
//!
//! ```text
//! IdpClient::authenticate -> assertion::extract -> Assertion::roles -> Exchanger::exchange
//! ```
//!
//! Role selection happens in between and is up to the caller: [`Federation::sign_in`] returns the
//! authorized roles, [`Federation::assume`] takes the one picked.

#[derive(Debug)]
pub struct Federation<E = crate::sts::StsExchanger> {
    idp: crate::idp::IdpClient,
    exchanger: E,
    role_attribute: Option<String>,
}

/// Outcome of a successful sign-on: the assertion and the roles it authorizes, in document order.
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub saml: crate::assertion::SamlResponse,
    pub roles: Vec<crate::role::Role>,
}

impl Federation<crate::sts::StsExchanger> {
    pub async fn from_provider(provider: &crate::config::Provider) -> crate::Result<Self> {
        provider.validate()?;
        let idp = crate::idp::IdpClient::new(provider)?;
        let exchanger = crate::sts::StsExchanger::new(&provider.sts).await;
        Ok(Self::new(idp, exchanger, provider.role_attribute.clone()))
    }
}

impl<E: crate::sts::Exchanger> Federation<E> {
    pub fn new(idp: crate::idp::IdpClient, exchanger: E, role_attribute: Option<String>) -> Self {
        Self {
            idp,
            exchanger,
            role_attribute,
        }
    }

    #[tracing::instrument(skip(self, password))]
    pub async fn sign_in(
        &self,
        username: &str,
        password: &secrecy::SecretString,
    ) -> crate::Result<SignedIn> {
        let html = self.idp.authenticate(username, password).await?;
        let saml = crate::assertion::extract(&html)?;
        let roles = saml.assertion.roles_in(self.role_attribute.as_deref())?;
        tracing::info!(roles = roles.len(), "Signed in to identity provider");
        Ok(SignedIn { saml, roles })
    }

    /// Exchanges the assertion for credentials of `role`. Any role may be passed; STS decides
    /// whether the assertion authorizes it.
    pub async fn assume(
        &self,
        signed_in: &SignedIn,
        role: &crate::role::Role,
    ) -> crate::Result<crate::credentials::TemporaryCredentials> {
        self.exchanger.exchange(role, &signed_in.saml.raw).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use wiremock::matchers::{header_exists, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Default)]
    struct EchoExchanger {
        calls: std::sync::Mutex<Vec<(crate::role::Role, String)>>,
    }

    #[async_trait::async_trait]
    impl crate::sts::Exchanger for EchoExchanger {
        async fn exchange(
            &self,
            role: &crate::role::Role,
            assertion: &crate::assertion::RawAssertion,
        ) -> crate::Result<crate::credentials::TemporaryCredentials> {
            self.calls
                .lock()
                .unwrap()
                .push((role.clone(), assertion.as_str().to_owned()));
            Ok(crate::credentials::TemporaryCredentials {
                access_key_id: format!("AKIA{}", role.name().to_uppercase()),
                secret_access_key: "secretEXAMPLE".into(),
                session_token: "tokenEXAMPLE".into(),
                expiration: chrono::DateTime::from_timestamp(1_792_155_600, 0).unwrap(),
            })
        }
    }

    fn saml_b64(values: &[&str]) -> String {
        let values: String = values
            .iter()
            .map(|v| format!("<AttributeValue>{v}</AttributeValue>"))
            .collect();
        let xml = format!(
            r#"<Response><Assertion><AttributeStatement><Attribute Name="https://aws.amazon.com/SAML/Attributes/Role">{values}</Attribute></AttributeStatement></Assertion></Response>"#
        );
        base64::engine::general_purpose::STANDARD.encode(xml)
    }

    async fn idp_server(landing: String) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header_exists("cookie"))
            .respond_with(ResponseTemplate::new(200).set_body_string(landing))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).append_header("Set-Cookie", "MSISAuth=abc; path=/adfs"),
            )
            .mount(&server)
            .await;
        server
    }

    fn federation(server: &MockServer) -> Federation<EchoExchanger> {
        let url = url::Url::parse(&format!("{}/adfs/ls/IdpInitiatedSignOn.aspx", server.uri()))
            .unwrap();
        let idp = crate::idp::IdpClient::new(&crate::config::Provider::from_url(url)).unwrap();
        Federation::new(idp, EchoExchanger::default(), None)
    }

    #[tokio::test]
    async fn test_sign_in_and_assume() {
        let blob = saml_b64(&[
            "arn:aws:iam::111:saml-provider/X,arn:aws:iam::111:role/Admin",
            "arn:aws:iam::222:saml-provider/Y,arn:aws:iam::222:role/ReadOnly",
        ]);
        let server = idp_server(format!(
            r#"<form><input type="hidden" name="SAMLResponse" value="{blob}"/></form>"#
        ))
        .await;
        let federation = federation(&server);

        let signed_in = federation
            .sign_in("alice", &"hunter2".into())
            .await
            .unwrap();
        assert_eq!(
            signed_in
                .roles
                .iter()
                .map(|r| r.arn.as_str())
                .collect::<Vec<_>>(),
            vec!["arn:aws:iam::111:role/Admin", "arn:aws:iam::222:role/ReadOnly"]
        );

        let creds = federation
            .assume(&signed_in, &signed_in.roles[1])
            .await
            .unwrap();
        assert_eq!(creds.access_key_id, "AKIAREADONLY");

        let calls = federation.exchanger.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.provider_arn, "arn:aws:iam::222:saml-provider/Y");
        assert_eq!(calls[0].1, blob);
    }

    #[tokio::test]
    async fn test_sign_in_wrong_password() {
        let server =
            idp_server(r#"<html><form><input name="UserName"/></form></html>"#.to_owned()).await;
        let federation = federation(&server);
        let e = federation
            .sign_in("alice", &"wrong".into())
            .await
            .unwrap_err();
        assert!(matches!(e, crate::Error::AssertionNotFound(_)));
        assert!(federation.exchanger.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sign_in_no_roles() {
        let blob = saml_b64(&["arn:aws:iam::111:saml-provider/X,"]);
        let server = idp_server(format!(
            r#"<input type="hidden" name="SAMLResponse" value="{blob}"/>"#
        ))
        .await;
        let e = federation(&server)
            .sign_in("alice", &"hunter2".into())
            .await
            .unwrap_err();
        assert!(matches!(e, crate::Error::NoRoles));
    }
}
