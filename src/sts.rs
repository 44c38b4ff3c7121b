//! sts:AssumeRoleWithSAML, trading the SAML assertion for temporary credentials.

use crate::error::{ExchangeError, ExchangeErrorKind};

#[async_trait::async_trait]
pub trait Exchanger: Send + Sync + std::fmt::Debug {
    /// Exchanges the assertion for credentials of `role`. The role is passed through as is; it is
    /// not checked against the assertion.
    async fn exchange(
        &self,
        role: &crate::role::Role,
        assertion: &crate::assertion::RawAssertion,
    ) -> crate::Result<crate::credentials::TemporaryCredentials>;
}

#[derive(Debug, Clone)]
pub struct StsExchanger {
    client: aws_sdk_sts::Client,
    duration_seconds: i32,
}

impl StsExchanger {
    pub async fn new(sts: &crate::config::ProviderSts) -> Self {
        // AssumeRoleWithSAML is unsigned; it is what establishes credentials in the first place.
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(sts.region.clone()))
            .retry_config(aws_config::retry::RetryConfig::disabled())
            .no_credentials();
        if let Some(url) = sts.endpoint_url.as_ref() {
            loader = loader.endpoint_url(url.as_str());
        }
        let config = loader.load().await;

        Self {
            client: aws_sdk_sts::Client::new(&config),
            duration_seconds: sts.duration_seconds,
        }
    }
}

#[async_trait::async_trait]
impl Exchanger for StsExchanger {
    #[tracing::instrument(skip(assertion))]
    async fn exchange(
        &self,
        role: &crate::role::Role,
        assertion: &crate::assertion::RawAssertion,
    ) -> crate::Result<crate::credentials::TemporaryCredentials> {
        tracing::debug!(
            role_arn = %role.arn,
            principal_arn = %role.provider_arn,
            duration_seconds = self.duration_seconds,
            "Performing AssumeRoleWithSAML"
        );

        let resp = self
            .client
            .assume_role_with_saml()
            .role_arn(&role.arn)
            .principal_arn(&role.provider_arn)
            .saml_assertion(assertion.as_str())
            .duration_seconds(self.duration_seconds)
            .send()
            .await
            .map_err(|e| sdk_error_to_exchange_error("AssumeRoleWithSAML", e))?;

        let creds = resp.credentials().ok_or_else(|| ExchangeError {
            kind: ExchangeErrorKind::Unknown,
            code: None,
            message: "STS AssumeRoleWithSAML returned empty credentials".to_owned(),
            source: None,
        })?;

        let exp = creds.expiration();
        let expiration = chrono::DateTime::from_timestamp(exp.secs(), exp.subsec_nanos())
            .ok_or_else(|| ExchangeError {
                kind: ExchangeErrorKind::Unknown,
                code: None,
                message: format!("Failed to parse expiration timestamp: {}", exp),
                source: None,
            })?;

        tracing::info!(
            role_arn = %role.arn,
            access_key_id = creds.access_key_id(),
            expiration = ?expiration,
            "AssumeRoleWithSAML completed successfully"
        );

        Ok(crate::credentials::TemporaryCredentials {
            access_key_id: creds.access_key_id().to_owned(),
            secret_access_key: creds.secret_access_key().into(),
            session_token: creds.session_token().into(),
            expiration,
        })
    }
}

fn classify(code: Option<&str>) -> ExchangeErrorKind {
    match code {
        Some("AccessDenied") | Some("IDPRejectedClaim") => ExchangeErrorKind::PermissionDenied,
        Some("ExpiredTokenException") | Some("InvalidIdentityToken") => {
            ExchangeErrorKind::Unauthenticated
        }
        Some("MalformedPolicyDocument")
        | Some("PackedPolicyTooLarge")
        | Some("RegionDisabledException")
        | Some("ValidationError") => ExchangeErrorKind::InvalidArgument,
        _ => ExchangeErrorKind::Unknown,
    }
}

/// Keeps the code and message STS returned; transport failures carry no code.
fn sdk_error_to_exchange_error<E, R>(
    context: &str,
    err: aws_sdk_sts::error::SdkError<E, R>,
) -> crate::Error
where
    E: std::marker::Send
        + std::marker::Sync
        + std::error::Error
        + aws_sdk_sts::error::ProvideErrorMetadata
        + 'static,
    R: std::marker::Send + std::marker::Sync + std::fmt::Debug + 'static,
{
    use aws_sdk_sts::error::ProvideErrorMetadata;

    let code = err.code().map(str::to_owned);
    let message = match err.message() {
        Some(m) => m.to_owned(),
        None => format!(
            "{context} failed: {}",
            aws_smithy_types::error::display::DisplayErrorContext(&err)
        ),
    };
    let kind = classify(code.as_deref());
    tracing::error!(context = context, code = ?code, message = %message, kind = %kind, "AWS STS returned error");

    ExchangeError {
        kind,
        code,
        message,
        source: Some(Box::new(err)),
    }
    .into()
}
