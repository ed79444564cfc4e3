use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account role as issued by the identity service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Prisoner,
    Partner,
    Moderator,
    Admin,
}

impl Role {
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "prisoner" => Some(Self::Prisoner),
            "partner" => Some(Self::Partner),
            "moderator" => Some(Self::Moderator),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Prisoner => "prisoner",
            Self::Partner => "partner",
            Self::Moderator => "moderator",
            Self::Admin => "admin",
        }
    }

    /// The side of a match this role can occupy, if any.
    pub fn side(&self) -> Option<Side> {
        match self {
            Self::Prisoner => Some(Side::Prisoner),
            Self::Partner => Some(Side::Partner),
            Self::Moderator | Self::Admin => None,
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self, Self::Moderator | Self::Admin)
    }
}

/// One of the two seats in a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Prisoner,
    Partner,
}

impl Side {
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "prisoner" => Some(Self::Prisoner),
            "partner" => Some(Self::Partner),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Prisoner => "prisoner",
            Self::Partner => "partner",
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Self::Prisoner => Self::Partner,
            Self::Partner => Self::Prisoner,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub photos: Vec<String>,
}

/// Name shown to the other participant: "First L." from the profile, falling
/// back to the local part of the email address.
pub fn display_name(user: &User, profile: Option<&Profile>) -> String {
    let first_name = profile
        .and_then(|profile| profile.first_name.as_deref())
        .map(str::trim)
        .filter(|name| !name.is_empty());

    let Some(first_name) = first_name else {
        return email_local_part(&user.email).to_string();
    };

    let initial = profile
        .and_then(|profile| profile.last_name.as_deref())
        .and_then(|last| last.trim().chars().next());

    match initial {
        Some(initial) => format!("{} {}.", first_name, initial.to_uppercase()),
        None => first_name.to_string(),
    }
}

fn email_local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(email: &str) -> User {
        User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            role: Role::Partner,
        }
    }

    fn profile(first: Option<&str>, last: Option<&str>) -> Profile {
        Profile {
            user_id: Uuid::new_v4(),
            first_name: first.map(str::to_string),
            last_name: last.map(str::to_string),
            photos: Vec::new(),
        }
    }

    #[test]
    fn first_name_with_last_initial() {
        let name = display_name(&user("ada@example.com"), Some(&profile(Some("Ada"), Some("lovelace"))));
        assert_eq!(name, "Ada L.");
    }

    #[test]
    fn first_name_without_last_name() {
        let name = display_name(&user("ada@example.com"), Some(&profile(Some("Ada"), None)));
        assert_eq!(name, "Ada");

        let name = display_name(&user("ada@example.com"), Some(&profile(Some("Ada"), Some("  "))));
        assert_eq!(name, "Ada");
    }

    #[test]
    fn falls_back_to_email_local_part() {
        assert_eq!(display_name(&user("grace.h@example.com"), None), "grace.h");
        assert_eq!(
            display_name(&user("grace.h@example.com"), Some(&profile(Some(" "), Some("Hopper")))),
            "grace.h"
        );
        assert_eq!(display_name(&user("no-at-sign"), None), "no-at-sign");
    }

    #[test]
    fn only_prisoner_and_partner_roles_have_sides() {
        assert_eq!(Role::Prisoner.side(), Some(Side::Prisoner));
        assert_eq!(Role::Partner.side(), Some(Side::Partner));
        assert_eq!(Role::Moderator.side(), None);
        assert!(Role::Admin.is_staff());
        assert!(!Role::Partner.is_staff());
    }
}
