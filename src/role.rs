/// An assumable IAM role paired with the SAML provider that vouches for it.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Role {
    pub arn: String,
    pub provider_arn: String,
}

impl Role {
    /// Parses one role attribute value, `"<provider-arn>,<role-arn>"`. Returns `None` when the role
    /// segment is empty or there is no comma at all.
    pub fn parse(value: &str) -> Option<Self> {
        let (first, second) = value.split_once(',')?;
        let (first, second) = (first.trim(), second.trim());

        // Some IdPs emit the pair as "<role-arn>,<provider-arn>"
        let (provider, role) = if first.contains(":role/") && second.contains(":saml-provider/")
        {
            (second, first)
        } else {
            (first, second)
        };

        if role.is_empty() {
            return None;
        }
        Some(Role {
            arn: role.to_owned(),
            provider_arn: provider.to_owned(),
        })
    }

    /// Role name part of the ARN (arn:aws:iam::123456789012:role/path/Name => Name)
    pub fn name(&self) -> &str {
        self.arn.rsplit('/').next().unwrap_or(&self.arn)
    }

    /// Finds a role by exact ARN, falling back to the role name.
    pub fn find<'a>(roles: &'a [Role], query: &str) -> crate::Result<&'a Role> {
        if let Some(r) = roles.iter().find(|r| r.arn == query) {
            return Ok(r);
        }
        let mut by_name = roles.iter().filter(|r| r.name() == query);
        match (by_name.next(), by_name.next()) {
            (Some(r), None) => Ok(r),
            (Some(_), Some(_)) => Err(crate::Error::UserError(format!(
                "Role name '{query}' is ambiguous, specify the role ARN instead"
            ))),
            (None, _) => {
                let available = roles
                    .iter()
                    .map(|r| r.arn.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                Err(crate::Error::UserError(format!(
                    "Role '{query}' not found. Available roles: {available}"
                )))
            }
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.arn)
    }
}
