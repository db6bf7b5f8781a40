//! Role checks shared by the HTTP gate and the registration workflow.

use crate::{
  Error, Result,
  identity::{Identity, Role},
};

/// Succeed only if `identity` holds exactly `role`.
///
/// Roles are flat: an admin does not implicitly satisfy `Role::User`.
pub fn require_role(identity: &Identity, role: Role) -> Result<&Identity> {
  if identity.role == role {
    Ok(identity)
  } else {
    Err(Error::Forbidden { identity: identity.id, required: role })
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use uuid::Uuid;

  use super::*;

  fn with_role(role: Role) -> Identity {
    Identity {
      id: Uuid::new_v4(),
      google_id: None,
      email: "a@x.com".into(),
      name: "A".into(),
      avatar: None,
      role,
      secondary_email: None,
      organization_name: None,
      phone: None,
      created_at: Utc::now(),
      updated_at: Utc::now(),
    }
  }

  #[test]
  fn exact_match_passes() {
    let admin = with_role(Role::Admin);
    assert!(require_role(&admin, Role::Admin).is_ok());
  }

  #[test]
  fn user_is_forbidden_from_admin() {
    let user = with_role(Role::User);
    assert!(matches!(
      require_role(&user, Role::Admin),
      Err(Error::Forbidden { required: Role::Admin, .. })
    ));
  }

  #[test]
  fn admin_is_not_a_superset() {
    let admin = with_role(Role::Admin);
    assert!(require_role(&admin, Role::User).is_err());
  }
}
