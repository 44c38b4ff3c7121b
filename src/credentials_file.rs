//! Writes temporary credentials into the AWS shared credentials file (`~/.aws/credentials`).

use secrecy::ExposeSecret;

// configparser writes its default section without a header; `[default]` is a real profile here.
const TOPLEVEL_SECTION: &str = "adfs2aws:toplevel";

pub fn default_path() -> crate::Result<std::path::PathBuf> {
    if let Some(p) = std::env::var_os("AWS_SHARED_CREDENTIALS_FILE") {
        return Ok(p.into());
    }
    match std::env::var_os("HOME") {
        Some(home) => Ok(std::path::PathBuf::from(home)
            .join(".aws")
            .join("credentials")),
        None => Err(crate::Error::ConfigError(
            "Can't determine the shared credentials file location: $HOME is not set".to_owned(),
        )),
    }
}

/// Upserts `section` with the credentials, keeping every other section and key as is.
#[tracing::instrument(skip(creds), fields(path = %path.display()))]
pub async fn store(
    path: &std::path::Path,
    section: &str,
    creds: &crate::credentials::TemporaryCredentials,
) -> crate::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    use tokio::io::AsyncWriteExt;

    if section.trim().is_empty() {
        return Err(crate::Error::UserError(
            "credentials file section must not be empty".to_owned(),
        ));
    }

    let existing = match tokio::fs::read_to_string(path).await {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };
    let data = render(existing, section, creds)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .truncate(true)
        .create(true)
        .mode(0o600)
        .open(path)
        .await?;
    // mode() only applies on creation
    file.set_permissions(std::fs::Permissions::from_mode(0o600))
        .await?;
    file.write_all(data.as_bytes()).await?;
    file.flush().await?;

    tracing::info!(section = %section, access_key_id = %creds.access_key_id, "Stored credentials");
    Ok(())
}

fn ini() -> configparser::ini::Ini {
    let mut ini = configparser::ini::Ini::new_cs();
    ini.set_default_section(TOPLEVEL_SECTION);
    // `;` and `#` are legal inside values, e.g. credential_process = sh -c "a; b"
    let no_inline_comments: &[char] = &[];
    ini.set_inline_comment_symbols(Some(no_inline_comments));
    ini
}

fn render(
    existing: String,
    section: &str,
    creds: &crate::credentials::TemporaryCredentials,
) -> crate::Result<String> {
    let mut ini = ini();
    ini.read(existing).map_err(|e| {
        crate::Error::ConfigError(format!("Can't parse shared credentials file: {e}"))
    })?;

    ini.set(
        section,
        "aws_access_key_id",
        Some(creds.access_key_id.clone()),
    );
    ini.set(
        section,
        "aws_secret_access_key",
        Some(creds.secret_access_key.expose_secret().to_owned()),
    );
    ini.set(
        section,
        "aws_session_token",
        Some(creds.session_token.expose_secret().to_owned()),
    );
    ini.set(
        section,
        "expiration",
        Some(creds.expiration.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)),
    );
    Ok(ini.pretty_writes(&configparser::ini::WriteOptions::new_with_params(
        true, 4, 1,
    )))
}
