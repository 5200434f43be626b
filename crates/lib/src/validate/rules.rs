use serde_json::Value;
use url::Url;

use super::Finding;
use crate::consts::CURRENT_CONFIG_VERSION;
use crate::document::view::{AuthenticationView, ConfigView, OrganizationsView, RedirectsView};

/// Custom roles included before a paid plan is required.
const INCLUDED_ROLE_LIMIT: usize = 5;

/// Role count above which we remind about the hard limit.
const ROLE_NOTICE_THRESHOLD: usize = 10;

const ROLE_HARD_LIMIT: usize = 20;

pub(super) fn check_version(view: &ConfigView<'_>, findings: &mut Vec<Finding>) {
  if view.version.is_none() {
    findings.push(
      Finding::error("version", "Config version is required")
        .with_suggestion(format!("Add \"version\": \"{}\" to your config", CURRENT_CONFIG_VERSION)),
    );
  }
}

pub(super) fn check_authentication(auth: &AuthenticationView<'_>, findings: &mut Vec<Finding>) {
  if auth.any_oauth_enabled() && auth.sign_up.verify_email_at_sign_up != Some(true) {
    findings.push(
      Finding::warning(
        "authentication.signUp.emailAddress.verifyAtSignUp",
        "OAuth providers are enabled but email addresses are not verified at sign-up",
      )
      .with_suggestion("Set authentication.signUp.emailAddress.verifyAtSignUp to true"),
    );
  }

  if auth.sign_up.mode == Some("restricted") {
    findings.push(Finding::warning(
      "authentication.signUp.mode",
      "Restricted sign-up mode requires a Pro plan or higher",
    ));
  }
}

pub(super) fn check_organizations(orgs: &OrganizationsView<'_>, findings: &mut Vec<Finding>) {
  if orgs.enabled {
    let count = orgs.role_count();
    if count > INCLUDED_ROLE_LIMIT {
      findings.push(
        Finding::warning(
          "organizations.roles",
          format!(
            "{} custom roles configured; more than {} requires a paid plan",
            count, INCLUDED_ROLE_LIMIT
          ),
        )
        .with_suggestion("Consolidate roles or confirm your plan includes additional roles"),
      );
    }
    if count > ROLE_NOTICE_THRESHOLD {
      findings.push(Finding::info(
        "organizations.roles",
        format!(
          "{} custom roles configured; approaching the hard limit of {}",
          count, ROLE_HARD_LIMIT
        ),
      ));
    }
  }

  let Some(roles) = &orgs.roles else {
    return;
  };

  for (i, role) in roles.iter().enumerate() {
    let path = format!("organizations.roles[{}]", i);

    if is_blank(role.key) || is_blank(role.name) {
      findings.push(
        Finding::error(path.as_str(), "Role must have both a key and a name")
          .with_suggestion("Add a non-empty \"key\" and \"name\" to the role"),
      );
    }

    if role.permissions.is_some_and(<[Value]>::is_empty) {
      findings.push(Finding::warning(
        format!("{}.permissions", path),
        "Role has no permissions",
      ));
    }
  }
}

pub(super) fn check_redirects(redirects: &RedirectsView<'_>, findings: &mut Vec<Finding>) {
  for (field, value) in &redirects.fields {
    let valid = value.as_str().is_some_and(is_valid_redirect);
    if !valid {
      findings.push(
        Finding::error(
          format!("redirects.{}", field),
          format!("Invalid redirect URL: {}", value),
        )
        .with_suggestion("Use an absolute URL (https://example.com/path) or a relative path (/path)"),
      );
    }
  }
}

fn is_blank(value: Option<&str>) -> bool {
  value.is_none_or(str::is_empty)
}

fn is_valid_redirect(value: &str) -> bool {
  value.starts_with('/') || Url::parse(value).is_ok()
}
