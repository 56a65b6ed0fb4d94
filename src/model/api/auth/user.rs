use std::fmt::Display;

use serde_repr::{Deserialize_repr, Serialize_repr};

/// Different privilege levels. Higher levels include the lower ones.
#[derive(
    Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize_repr, Deserialize_repr,
)]
#[repr(u8)]
pub enum Rights {
    Voter = 0,
    Admin = 1,
}

impl Display for Rights {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{}",
            match self {
                Self::Voter => "voter",
                Self::Admin => "admin",
            }
        )
    }
}

/// A role a route can demand of the requesting user.
pub trait Role {
    /// The minimum rights needed to act in this role.
    const RIGHTS: Rights;
}

/// Any signed-in user.
pub struct Voter;

impl Role for Voter {
    const RIGHTS: Rights = Rights::Voter;
}

/// A signed-in administrator.
pub struct Admin;

impl Role for Admin {
    const RIGHTS: Rights = Rights::Admin;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_outranks_voter() {
        assert!(Rights::Admin > Rights::Voter);
        assert_eq!(Rights::Admin.to_string(), "admin");
        assert_eq!(Voter::RIGHTS, Rights::Voter);
        assert_eq!(Admin::RIGHTS, Rights::Admin);
    }
}
