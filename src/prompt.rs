//! Interactive prompts. Everything goes to stderr so stdout stays clean for credential output.

fn term() -> dialoguer::console::Term {
    dialoguer::console::Term::stderr()
}

pub fn username(default: Option<&str>) -> crate::Result<String> {
    let mut input = dialoguer::Input::<String>::new().with_prompt("Username");
    if let Some(d) = default {
        input = input.default(d.to_owned());
    }
    Ok(input.interact_text_on(&term())?)
}

pub fn password() -> crate::Result<secrecy::SecretString> {
    let password = dialoguer::Password::new()
        .with_prompt("Password")
        .interact_on(&term())?;
    Ok(password.into())
}

/// Asks which role to assume. A single role is returned without asking.
pub fn select_role(roles: &[crate::role::Role]) -> crate::Result<&crate::role::Role> {
    match roles {
        [] => Err(crate::Error::NoRoles),
        [only] => Ok(only),
        _ => {
            let items: Vec<String> = roles
                .iter()
                .map(|r| format!("{}  ({})", r.name(), r.arn))
                .collect();
            let idx = dialoguer::Select::new()
                .with_prompt("Role to assume")
                .items(&items)
                .default(0)
                .interact_on(&term())?;
            Ok(&roles[idx])
        }
    }
}

pub fn confirm(message: &str, default: bool) -> crate::Result<bool> {
    Ok(dialoguer::Confirm::new()
        .with_prompt(message)
        .default(default)
        .interact_on(&term())?)
}

/// Asks for the credentials file section to write to.
pub fn section(default: &str) -> crate::Result<String> {
    Ok(dialoguer::Input::<String>::new()
        .with_prompt("Profile name in the shared credentials file")
        .default(default.to_owned())
        .interact_text_on(&term())?)
}
