#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("UserError: {0}")]
    UserError(String),

    #[error("ConfigError: {0}")]
    ConfigError(String),

    #[error("AuthenticationError: {0}")]
    AuthenticationError(#[from] AuthenticationError),

    /// The sign-on landing page carried no usable SAMLResponse field. This is how the identity
    /// provider reports wrong credentials.
    #[error("AssertionNotFoundError: {0}")]
    AssertionNotFound(String),

    #[error("AssertionParseError: {0}")]
    AssertionParseError(#[from] AssertionParseError),

    #[error("NoRolesError: the assertion authorizes no roles")]
    NoRoles,

    #[error("ExchangeError: {0}")]
    ExchangeError(#[from] ExchangeError),

    #[error("PromptError: {0}")]
    PromptError(#[from] dialoguer::Error),

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    /// Failure, but we don't want to emit error to stderr/out anymore. Used in cmd
    #[error("")]
    FailureButSilentlyExit,
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOnStep {
    SessionCookie,
    SignOn,
}

impl std::fmt::Display for SignOnStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignOnStep::SessionCookie => f.write_str("session cookie request"),
            SignOnStep::SignOn => f.write_str("sign-on request"),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum AuthenticationError {
    #[error("transport error during {step}: {source}")]
    Transport {
        step: SignOnStep,
        #[source]
        source: reqwest::Error,
    },
    #[error("identity provider did not issue session cookie '{cookie_name}' (status {status})")]
    MissingSessionCookie {
        cookie_name: String,
        status: reqwest::StatusCode,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum AssertionParseError {
    #[error("SAMLResponse is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("SAMLResponse does not match the assertion schema: {0}")]
    Schema(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeErrorKind {
    InvalidArgument,
    Unauthenticated,
    PermissionDenied,
    Unknown,
}

impl std::fmt::Display for ExchangeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExchangeErrorKind::InvalidArgument => f.write_str("Invalid Argument"),
            ExchangeErrorKind::Unauthenticated => f.write_str("Unauthenticated"),
            ExchangeErrorKind::PermissionDenied => f.write_str("Permission denied"),
            ExchangeErrorKind::Unknown => f.write_str("Unknown"),
        }
    }
}

/// Rejection (or transport failure) of the token exchange. `code` and `message` are what the
/// security token service returned, untouched.
#[derive(thiserror::Error, Debug)]
#[error("{kind}: AWS STS says {}: {message}", .code.as_deref().unwrap_or("(no error code)"))]
pub struct ExchangeError {
    pub kind: ExchangeErrorKind,
    pub code: Option<String>,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}
