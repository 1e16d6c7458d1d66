//! Role catalog and per-session role sets.
//!
//! Accounts hold zero or more roles (client, donor, staff, volunteer). The
//! storage layer returns roles as a comma-joined string from the act/role
//! join; [`RoleSet::parse_csv`] turns that into a genuine set. An empty
//! string maps to an empty set, never a one-element set of "".

use anyhow::{anyhow, Error};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The four roles an account can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Donor,
    Staff,
    Volunteer,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Client, Role::Donor, Role::Staff, Role::Volunteer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Donor => "donor",
            Role::Staff => "staff",
            Role::Volunteer => "volunteer",
        }
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Role::Client),
            "donor" => Ok(Role::Donor),
            "staff" => Ok(Role::Staff),
            "volunteer" => Ok(Role::Volunteer),
            other => Err(anyhow!("unknown role: {}", other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered, duplicate-free set of roles held by one account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(Vec<Role>);

impl RoleSet {
    pub fn new() -> Self {
        RoleSet(Vec::new())
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    pub fn insert(&mut self, role: Role) {
        if !self.0.contains(&role) {
            self.0.push(role);
            self.0.sort();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }

    /// Parse a comma-joined role string as produced by the act/role join.
    ///
    /// Empty input (or input that is all separators) yields an empty set.
    /// Tokens that are not role identifiers are rejected.
    pub fn parse_csv(csv: &str) -> Result<Self, Error> {
        let mut set = RoleSet::new();
        for token in csv.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            set.insert(token.parse()?);
        }
        Ok(set)
    }

    /// Build a set from role name strings (registration form input).
    ///
    /// A staff + volunteer combination is rejected: a supervisor cannot also
    /// be assignable as a deliverer on their own orders.
    pub fn from_names<I, S>(names: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = RoleSet::new();
        for name in names {
            set.insert(name.as_ref().parse()?);
        }
        if set.contains(Role::Staff) && set.contains(Role::Volunteer) {
            return Err(anyhow!("an account cannot hold both staff and volunteer roles"));
        }
        Ok(set)
    }

    pub fn to_csv(&self) -> String {
        self.0
            .iter()
            .map(|r| r.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_csv())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_csv_empty_string_is_empty_set() {
        let set = RoleSet::parse_csv("").unwrap();
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
    }

    #[test]
    fn parse_csv_all_separators_is_empty_set() {
        let set = RoleSet::parse_csv(",, ,").unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn parse_csv_deduplicates_and_sorts() {
        let set = RoleSet::parse_csv("volunteer,client,volunteer").unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.to_csv(), "client,volunteer");
    }

    #[test]
    fn parse_csv_rejects_unknown_role() {
        assert!(RoleSet::parse_csv("client,admin").is_err());
    }

    #[test]
    fn csv_roundtrip() {
        let set = RoleSet::parse_csv("staff,donor").unwrap();
        let back = RoleSet::parse_csv(&set.to_csv()).unwrap();
        assert_eq!(set, back);
    }

    #[test]
    fn from_names_rejects_staff_volunteer_combination() {
        assert!(RoleSet::from_names(["staff", "volunteer"]).is_err());
        assert!(RoleSet::from_names(["staff", "donor"]).is_ok());
        assert!(RoleSet::from_names(["volunteer", "client"]).is_ok());
    }

    #[test]
    fn contains_after_insert() {
        let mut set = RoleSet::new();
        assert!(!set.contains(Role::Staff));
        set.insert(Role::Staff);
        assert!(set.contains(Role::Staff));
        set.insert(Role::Staff);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn serializes_as_json_array() {
        let set = RoleSet::parse_csv("client,staff").unwrap();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["client","staff"]"#);
        let back: RoleSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }
}
