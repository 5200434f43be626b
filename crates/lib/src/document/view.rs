//! Typed, read-only view over the named sections of a [`Document`].
//!
//! The view is lenient: a field with the wrong JSON type reads as absent.
//! Validation rules decide what absence means.

use serde_json::{Map, Value};

use super::Document;

/// Redirect fields recognized by validation, in evaluation order.
pub const REDIRECT_FIELDS: [&str; 5] = [
  "signInUrl",
  "signUpUrl",
  "afterSignInUrl",
  "afterSignUpUrl",
  "afterSignOutUrl",
];

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigView<'a> {
  /// `version`, unless absent or null.
  pub version: Option<&'a Value>,
  pub authentication: AuthenticationView<'a>,
  pub organizations: OrganizationsView<'a>,
  pub redirects: RedirectsView<'a>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthenticationView<'a> {
  pub oauth_providers: Vec<OAuthProviderView<'a>>,
  pub sign_up: SignUpView<'a>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthProviderView<'a> {
  pub name: &'a str,
  pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignUpView<'a> {
  pub mode: Option<&'a str>,
  pub verify_email_at_sign_up: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrganizationsView<'a> {
  pub enabled: bool,
  /// `None` when `roles` is absent or not an array.
  pub roles: Option<Vec<RoleView<'a>>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoleView<'a> {
  pub key: Option<&'a str>,
  pub name: Option<&'a str>,
  pub permissions: Option<&'a [Value]>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RedirectsView<'a> {
  /// Present recognized fields, in [`REDIRECT_FIELDS`] order.
  pub fields: Vec<(&'static str, &'a Value)>,
}

impl<'a> ConfigView<'a> {
  pub fn new(doc: &'a Document) -> Self {
    Self {
      version: doc.get("version").filter(|v| !v.is_null()),
      authentication: AuthenticationView::from_section(section(doc.get("authentication"))),
      organizations: OrganizationsView::from_section(section(doc.get("organizations"))),
      redirects: RedirectsView::from_section(section(doc.get("redirects"))),
    }
  }
}

impl<'a> AuthenticationView<'a> {
  fn from_section(auth: Option<&'a Map<String, Value>>) -> Self {
    let Some(auth) = auth else {
      return Self::default();
    };

    let oauth_providers = section(auth.get("oauthProviders"))
      .map(|providers| {
        providers
          .iter()
          .map(|(name, provider)| OAuthProviderView {
            name: name.as_str(),
            enabled: provider.get("enabled").and_then(Value::as_bool).unwrap_or(false),
          })
          .collect()
      })
      .unwrap_or_default();

    let sign_up = section(auth.get("signUp"))
      .map(|sign_up| SignUpView {
        mode: sign_up.get("mode").and_then(Value::as_str),
        verify_email_at_sign_up: section(sign_up.get("emailAddress"))
          .and_then(|email| email.get("verifyAtSignUp"))
          .and_then(Value::as_bool),
      })
      .unwrap_or_default();

    Self {
      oauth_providers,
      sign_up,
    }
  }

  pub fn any_oauth_enabled(&self) -> bool {
    self.oauth_providers.iter().any(|p| p.enabled)
  }
}

impl<'a> OrganizationsView<'a> {
  fn from_section(orgs: Option<&'a Map<String, Value>>) -> Self {
    let Some(orgs) = orgs else {
      return Self::default();
    };

    Self {
      enabled: orgs.get("enabled").and_then(Value::as_bool).unwrap_or(false),
      roles: orgs
        .get("roles")
        .and_then(Value::as_array)
        .map(|roles| roles.iter().map(RoleView::from_value).collect()),
    }
  }

  pub fn role_count(&self) -> usize {
    self.roles.as_ref().map_or(0, Vec::len)
  }
}

impl<'a> RoleView<'a> {
  fn from_value(role: &'a Value) -> Self {
    Self {
      key: role.get("key").and_then(Value::as_str),
      name: role.get("name").and_then(Value::as_str),
      permissions: role.get("permissions").and_then(Value::as_array).map(Vec::as_slice),
    }
  }
}

impl<'a> RedirectsView<'a> {
  fn from_section(redirects: Option<&'a Map<String, Value>>) -> Self {
    let Some(redirects) = redirects else {
      return Self::default();
    };

    Self {
      fields: REDIRECT_FIELDS
        .iter()
        .filter_map(|field| {
          redirects
            .get(*field)
            .filter(|v| !v.is_null())
            .map(|value| (*field, value))
        })
        .collect(),
    }
  }
}

fn section(value: Option<&Value>) -> Option<&Map<String, Value>> {
  value.and_then(Value::as_object)
}
