#[derive(clap::Args, Debug)]
pub struct ListRolesArgs {
    #[command(flatten)]
    pub sign_in: crate::cmd::SignInArgs,

    #[arg(long, short = 'o', default_value = "text")]
    output: ListRolesFormat,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ListRolesFormat {
    Text,
    Oneline,
    Json,
}
impl std::str::FromStr for ListRolesFormat {
    type Err = crate::Error;
    fn from_str(s: &str) -> Result<ListRolesFormat, crate::Error> {
        match s {
            "text" => Ok(ListRolesFormat::Text),
            "oneline" => Ok(ListRolesFormat::Oneline),
            "json" => Ok(ListRolesFormat::Json),
            _ => Err(crate::Error::UserError("unknown --output".to_owned())),
        }
    }
}

#[tokio::main]
pub async fn run(args: &ListRolesArgs) -> Result<(), anyhow::Error> {
    use tokio::io::AsyncWriteExt;

    let session = crate::cmd::sign_in(&args.sign_in, true).await?;
    let out = render(
        session.provider.id(),
        &session.signed_in.roles,
        args.output,
    )?;

    let mut stdout = tokio::io::stdout();
    stdout.write_all(out.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}

fn render(
    provider_id: &str,
    roles: &[crate::role::Role],
    format: ListRolesFormat,
) -> Result<String, crate::Error> {
    let name_width = roles.iter().map(|r| r.name().len()).max().unwrap_or(0);
    let mut out = String::new();

    match format {
        ListRolesFormat::Text => {
            out.push_str(&format!("{provider_id}\n"));
            for role in roles.iter() {
                out.push_str(&format!(
                    "    {name:<name_width$}  {arn}\n",
                    name = role.name(),
                    arn = role.arn,
                ));
            }
        }
        ListRolesFormat::Oneline => {
            let arn_width = roles.iter().map(|r| r.arn.len()).max().unwrap_or(0);
            for role in roles.iter() {
                out.push_str(&format!(
                    "{name:<name_width$}  {arn:<arn_width$}  {provider}\n",
                    name = role.name(),
                    arn = role.arn,
                    provider = role.provider_arn,
                ));
            }
        }
        ListRolesFormat::Json => {
            out.push_str(&serde_json::to_string_pretty(roles)?);
            out.push('\n');
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles() -> Vec<crate::role::Role> {
        vec![
            crate::role::Role {
                arn: "arn:aws:iam::111:role/Admin".to_owned(),
                provider_arn: "arn:aws:iam::111:saml-provider/X".to_owned(),
            },
            crate::role::Role {
                arn: "arn:aws:iam::222:role/ReadOnly".to_owned(),
                provider_arn: "arn:aws:iam::222:saml-provider/Y".to_owned(),
            },
        ]
    }

    #[test]
    fn test_render_text() {
        let out = render("corp", &roles(), ListRolesFormat::Text).unwrap();
        assert_eq!(
            out,
            "corp\n    Admin     arn:aws:iam::111:role/Admin\n    ReadOnly  arn:aws:iam::222:role/ReadOnly\n"
        );
    }

    #[test]
    fn test_render_oneline() {
        let out = render("corp", &roles(), ListRolesFormat::Oneline).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines[0],
            "Admin     arn:aws:iam::111:role/Admin     arn:aws:iam::111:saml-provider/X"
        );
        assert_eq!(
            lines[1],
            "ReadOnly  arn:aws:iam::222:role/ReadOnly  arn:aws:iam::222:saml-provider/Y"
        );
    }

    #[test]
    fn test_render_json() {
        let out = render("corp", &roles(), ListRolesFormat::Json).unwrap();
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v[1]["Arn"], "arn:aws:iam::222:role/ReadOnly");
        assert_eq!(v[1]["ProviderArn"], "arn:aws:iam::222:saml-provider/Y");
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!(
            "oneline".parse::<ListRolesFormat>().unwrap(),
            ListRolesFormat::Oneline
        );
        assert!("yaml".parse::<ListRolesFormat>().is_err());
    }
}
