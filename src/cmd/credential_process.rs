#[derive(clap::Args, Debug)]
pub struct CredentialProcessArgs {
    #[command(flatten)]
    pub sign_in: crate::cmd::SignInArgs,

    /// Role to assume, by ARN or role name.
    role: String,
}

#[tokio::main]
pub async fn run(args: &CredentialProcessArgs) -> Result<(), anyhow::Error> {
    match obtain(args).await {
        Ok(creds) => {
            serde_json::to_writer(std::io::stdout(), &CredentialProcessResponse::from(&creds))?;
            Ok(())
        }
        Err(e) => {
            tracing::debug!(err = ?e, args = ?args, "Failed to obtain AWS credentials");
            let product = env!("CARGO_PKG_NAME");
            let provider = &args.sign_in.provider;
            let role = &args.role;
            eprintln!(
                ":: {product} :: ERROR when obtaining AWS credentials [{provider},{role}]: {e}"
            );
            Err(crate::Error::FailureButSilentlyExit.into())
        }
    }
}

async fn obtain(
    args: &CredentialProcessArgs,
) -> crate::Result<crate::credentials::TemporaryCredentials> {
    // Prompts still work when launched from a terminal; SDKs capture stdout only.
    let interactive = dialoguer::console::Term::stderr().is_term();
    let session = crate::cmd::sign_in(&args.sign_in, interactive).await?;
    let role = crate::role::Role::find(&session.signed_in.roles, &args.role)?;
    session.federation.assume(&session.signed_in, role).await
}

/// https://docs.aws.amazon.com/sdkref/latest/guide/feature-process-credentials.html
#[derive(Clone, Debug, serde::Serialize, zeroize::ZeroizeOnDrop)]
#[serde(rename_all = "PascalCase")]
pub struct CredentialProcessResponse {
    pub version: i64,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    #[zeroize(skip)]
    pub expiration: chrono::DateTime<chrono::Utc>,
}

impl From<&crate::credentials::TemporaryCredentials> for CredentialProcessResponse {
    fn from(creds: &crate::credentials::TemporaryCredentials) -> CredentialProcessResponse {
        use secrecy::ExposeSecret;
        CredentialProcessResponse {
            version: 1,
            access_key_id: creds.access_key_id.clone(),
            secret_access_key: creds.secret_access_key.expose_secret().to_owned(),
            session_token: creds.session_token.expose_secret().to_owned(),
            expiration: creds.expiration,
        }
    }
}
