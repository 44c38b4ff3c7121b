#[derive(clap::Args, Debug)]
pub struct LoginArgs {
    #[command(flatten)]
    pub sign_in: crate::cmd::SignInArgs,

    /// Role to assume, by ARN or role name. Prompted when omitted.
    #[arg(long, short = 'r')]
    pub role: Option<String>,

    /// Write the credentials into the shared credentials file without asking.
    #[arg(long, overrides_with = "no_write")]
    pub write: bool,

    /// Don't write the credentials into the shared credentials file.
    #[arg(long, overrides_with = "write")]
    pub no_write: bool,

    /// Section name in the shared credentials file. Prompted when omitted.
    #[arg(long, short = 'p')]
    pub profile: Option<String>,

    /// Shared credentials file path.
    #[arg(long, env = "AWS_SHARED_CREDENTIALS_FILE")]
    pub credentials_file: Option<std::path::PathBuf>,
}

#[tokio::main]
pub async fn run(args: &LoginArgs) -> Result<(), anyhow::Error> {
    let session = crate::cmd::sign_in(&args.sign_in, true).await?;
    let roles = &session.signed_in.roles;

    let role = match args.role.as_deref() {
        Some(q) => crate::role::Role::find(roles, q)?,
        None => crate::prompt::select_role(roles)?,
    };
    tracing::debug!(role = ?role, "Assuming role");

    let creds = session.federation.assume(&session.signed_in, role).await?;
    print_credentials(role, &creds)?;

    let write = if args.no_write {
        false
    } else if args.write {
        true
    } else {
        crate::prompt::confirm("Write these credentials to the shared credentials file?", true)?
    };
    if !write {
        return Ok(());
    }

    let section = match args.profile.as_ref() {
        Some(p) => p.clone(),
        None if args.write => session
            .provider
            .profile
            .clone()
            .unwrap_or_else(|| "default".to_owned()),
        None => crate::prompt::section(session.provider.profile.as_deref().unwrap_or("default"))?,
    };
    let path = match args.credentials_file.as_ref() {
        Some(p) => p.clone(),
        None => crate::credentials_file::default_path()?,
    };
    crate::credentials_file::store(&path, &section, &creds).await?;

    let product = env!("CARGO_PKG_NAME");
    eprintln!(
        ":: {product} :: Stored credentials in [{section}] of {}",
        path.display()
    );
    Ok(())
}

fn print_credentials(
    role: &crate::role::Role,
    creds: &crate::credentials::TemporaryCredentials,
) -> Result<(), anyhow::Error> {
    use secrecy::ExposeSecret;
    use std::io::Write;

    let role_arn = &role.arn;
    let access_key_id = &creds.access_key_id;
    let secret_access_key = creds.secret_access_key.expose_secret();
    let session_token = creds.session_token.expose_secret();
    let expiration = creds.expiration.to_rfc3339();

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(
        indoc::formatdoc! {"
            Role:          {role_arn}
            Access key:    {access_key_id}
            Secret key:    {secret_access_key}
            Session token: {session_token}
            Expiration:    {expiration}
        "}
        .as_bytes(),
    )?;
    stdout.flush()?;
    Ok(())
}
