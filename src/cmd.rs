pub mod credential_process;
pub mod list_roles;
pub mod login;

pub const PASSWORD_ENV: &str = "ADFS2AWS_PASSWORD";

#[derive(clap::Args, Debug)]
pub struct SignInArgs {
    /// Provider ID (providers.d) or IdP-initiated sign-on URL to use.
    #[arg(env = "ADFS2AWS_PROVIDER")]
    pub provider: String,

    /// Directory username, such as CORP\alice or alice@corp.example.com.
    #[arg(long, short = 'u', env = "ADFS2AWS_USERNAME")]
    pub username: Option<String>,
}

pub(crate) struct Session {
    pub provider: crate::config::Provider,
    pub federation: crate::federation::Federation,
    pub signed_in: crate::federation::SignedIn,
}

/// Resolves the provider, collects username and password, then signs in.
///
/// Without `interactive`, nothing is prompted; the username must come from the arguments or
/// provider configuration and the password from the environment.
pub(crate) async fn sign_in(args: &SignInArgs, interactive: bool) -> crate::Result<Session> {
    let provider = crate::config::Provider::resolve(&args.provider).await?;
    tracing::debug!(provider = ?provider, "Using provider");
    let federation = crate::federation::Federation::from_provider(&provider).await?;

    let username = match (args.username.as_ref(), provider.username.as_ref()) {
        (Some(u), _) => u.clone(),
        (None, Some(u)) if !interactive => u.clone(),
        (None, default) if interactive => crate::prompt::username(default.map(|x| x.as_str()))?,
        (None, _) => {
            return Err(crate::Error::UserError(
                "No username given; use --username, ADFS2AWS_USERNAME or the provider's username"
                    .to_owned(),
            ))
        }
    };

    let password: secrecy::SecretString = match std::env::var(PASSWORD_ENV) {
        Ok(p) if !p.is_empty() => p.into(),
        _ if interactive => crate::prompt::password()?,
        _ => {
            return Err(crate::Error::UserError(format!(
                "No password given; set {PASSWORD_ENV}"
            )))
        }
    };

    let signed_in = federation.sign_in(&username, &password).await?;
    Ok(Session {
        provider,
        federation,
        signed_in,
    })
}
