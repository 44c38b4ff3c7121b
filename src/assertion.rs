//! SAML assertion extraction: sign-on HTML -> base64 SAMLResponse -> XML -> roles.
//!
//! Each stage is a separate function so it can be exercised on its own; [`extract`] chains the
//! first three.

use crate::error::AssertionParseError;

pub const SAML_RESPONSE_FIELD: &str = "SAMLResponse";

/// Base64 SAMLResponse exactly as found in the sign-on form. The token exchange needs these
/// bytes untouched, as the assertion signature is verified against them.
#[derive(Clone, PartialEq, Eq)]
pub struct RawAssertion(String);

impl RawAssertion {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for RawAssertion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("RawAssertion")
            .field(&format_args!("{} bytes", self.0.len()))
            .finish()
    }
}

impl From<String> for RawAssertion {
    fn from(s: String) -> Self {
        RawAssertion(s)
    }
}

#[derive(Debug, Clone)]
pub struct SamlResponse {
    pub raw: RawAssertion,
    pub assertion: Assertion,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assertion {
    pub statements: Vec<AttributeStatement>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeStatement {
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attribute {
    pub name: Option<String>,
    pub values: Vec<String>,
}

/// Finds the SAMLResponse in a sign-on landing page, decodes and parses it.
pub fn extract(html: &str) -> crate::Result<SamlResponse> {
    let raw = find_saml_response(html)?;
    let xml = decode(&raw)?;
    let assertion = Assertion::from_xml(&xml)?;
    tracing::trace!(assertion = ?assertion, "parsed SAML assertion");
    Ok(SamlResponse { raw, assertion })
}

pub fn find_saml_response(html: &str) -> crate::Result<RawAssertion> {
    use select::predicate::{Attr, Name, Predicate};

    let document = select::document::Document::from(html);
    let Some(input) = document
        .find(Name("input").and(Attr("name", SAML_RESPONSE_FIELD)))
        .next()
    else {
        return Err(crate::Error::AssertionNotFound(
            "sign-on response has no SAMLResponse field; credentials may be wrong".to_owned(),
        ));
    };
    match input.attr("value").map(str::trim) {
        Some(v) if !v.is_empty() => Ok(RawAssertion(v.to_owned())),
        _ => Err(crate::Error::AssertionNotFound(
            "SAMLResponse field is empty".to_owned(),
        )),
    }
}

pub fn decode(raw: &RawAssertion) -> crate::Result<Vec<u8>> {
    use base64::Engine;

    let compact: String = raw
        .as_str()
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(AssertionParseError::Encoding)?;
    Ok(decoded)
}

const PATH_ASSERTION: &[&[u8]] = &[b"Response", b"Assertion"];
const PATH_STATEMENT: &[&[u8]] = &[b"Response", b"Assertion", b"AttributeStatement"];
const PATH_ATTRIBUTE: &[&[u8]] = &[
    b"Response",
    b"Assertion",
    b"AttributeStatement",
    b"Attribute",
];
const PATH_VALUE: &[&[u8]] = &[
    b"Response",
    b"Assertion",
    b"AttributeStatement",
    b"Attribute",
    b"AttributeValue",
];

impl Assertion {
    /// Parses `Response/Assertion/AttributeStatement/Attribute/AttributeValue`. Elements are
    /// matched by local name, so `samlp:`/`saml2:` prefixes don't matter.
    pub fn from_xml(xml: &[u8]) -> Result<Self, AssertionParseError> {
        use quick_xml::events::Event;

        let mut reader = quick_xml::Reader::from_reader(xml);
        let mut builder = Builder::default();
        let mut buf = Vec::new();

        loop {
            let event = reader.read_event_into(&mut buf).map_err(|e| {
                AssertionParseError::Schema(format!(
                    "malformed XML at position {}: {}",
                    reader.buffer_position(),
                    e
                ))
            })?;
            match event {
                Event::Start(ref e) => {
                    builder.open(e)?;
                }
                Event::Empty(ref e) => {
                    builder.open(e)?;
                    builder.close();
                }
                Event::End(_) => builder.close(),
                Event::Text(ref e) => builder.text(&String::from_utf8_lossy(e.as_ref())),
                Event::CData(ref e) => builder.text(&String::from_utf8_lossy(e.as_ref())),
                Event::GeneralRef(ref e) => {
                    let name = String::from_utf8_lossy(e.as_ref());
                    let Some(resolved) = resolve_entity(&name) else {
                        return Err(AssertionParseError::Schema(format!(
                            "unknown entity reference &{name};"
                        )));
                    };
                    builder.text(&resolved);
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        builder.finish()
    }

    /// Roles from the first attribute of the first attribute statement, in document order.
    pub fn roles(&self) -> crate::Result<Vec<crate::role::Role>> {
        self.roles_in(None)
    }

    /// Like [`Assertion::roles`], but picks the attribute of the first statement by `Name` when
    /// `attribute_name` is given.
    pub fn roles_in(&self, attribute_name: Option<&str>) -> crate::Result<Vec<crate::role::Role>> {
        let attribute = self
            .statements
            .first()
            .and_then(|statement| match attribute_name {
                None => statement.attributes.first(),
                Some(n) => statement
                    .attributes
                    .iter()
                    .find(|a| a.name.as_deref() == Some(n)),
            });
        let roles: Vec<crate::role::Role> = attribute
            .map(|a| {
                a.values
                    .iter()
                    .filter_map(|v| crate::role::Role::parse(v))
                    .collect()
            })
            .unwrap_or_default();

        if roles.is_empty() {
            return Err(crate::Error::NoRoles);
        }
        Ok(roles)
    }
}

#[derive(Default)]
struct Builder {
    path: Vec<Vec<u8>>,
    seen_root: bool,
    seen_assertion: bool,
    statements: Vec<AttributeStatement>,
    value: Option<String>,
}

impl Builder {
    fn open(&mut self, e: &quick_xml::events::BytesStart) -> Result<(), AssertionParseError> {
        let name = e.local_name().as_ref().to_vec();

        if self.path.is_empty() {
            if self.seen_root {
                return Err(AssertionParseError::Schema(
                    "multiple root elements".to_owned(),
                ));
            }
            if name != b"Response" {
                return Err(AssertionParseError::Schema(format!(
                    "root element is <{}>, expected <Response>",
                    String::from_utf8_lossy(&name)
                )));
            }
            self.seen_root = true;
        }

        self.path.push(name);
        if self.at(PATH_ASSERTION) {
            self.seen_assertion = true;
        } else if self.at(PATH_STATEMENT) {
            self.statements.push(AttributeStatement::default());
        } else if self.at(PATH_ATTRIBUTE) {
            let name = e
                .attributes()
                .flatten()
                .find(|a| a.key.local_name().as_ref() == b"Name")
                .map(|a| String::from_utf8_lossy(&a.value).into_owned());
            if let Some(statement) = self.statements.last_mut() {
                statement.attributes.push(Attribute {
                    name,
                    values: Vec::new(),
                });
            }
        } else if self.at(PATH_VALUE) {
            self.value = Some(String::new());
        }
        Ok(())
    }

    fn close(&mut self) {
        if self.at(PATH_VALUE) {
            if let (Some(value), Some(attribute)) = (
                self.value.take(),
                self.statements
                    .last_mut()
                    .and_then(|s| s.attributes.last_mut()),
            ) {
                attribute.values.push(value.trim().to_owned());
            }
        }
        self.path.pop();
    }

    fn text(&mut self, s: &str) {
        if let Some(value) = self.value.as_mut() {
            value.push_str(s);
        }
    }

    fn at(&self, path: &[&[u8]]) -> bool {
        self.path.len() == path.len() && self.path.iter().zip(path).all(|(a, b)| a.as_slice() == *b)
    }

    fn finish(self) -> Result<Assertion, AssertionParseError> {
        if !self.seen_root {
            return Err(AssertionParseError::Schema("document is empty".to_owned()));
        }
        if !self.path.is_empty() {
            return Err(AssertionParseError::Schema(
                "unexpected end of document".to_owned(),
            ));
        }
        if !self.seen_assertion {
            return Err(AssertionParseError::Schema(
                "no <Assertion> in <Response>".to_owned(),
            ));
        }
        Ok(Assertion {
            statements: self.statements,
        })
    }
}

fn resolve_entity(name: &str) -> Option<String> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }
    let s = match name {
        "lt" => "<",
        "gt" => ">",
        "amp" => "&",
        "apos" => "'",
        "quot" => "\"",
        _ => return None,
    };
    Some(s.to_owned())
}
