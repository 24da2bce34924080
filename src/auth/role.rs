use serde::{Deserialize, Serialize};

/// Fixed role enumeration with a total order:
/// `PlatformOperator > SchoolAdmin > Teacher > Parent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    PlatformOperator,
    SchoolAdmin,
    Teacher,
    Parent,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::PlatformOperator => "platform-operator",
            Role::SchoolAdmin => "school-admin",
            Role::Teacher => "teacher",
            Role::Parent => "parent",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "platform-operator" => Some(Role::PlatformOperator),
            "school-admin" => Some(Role::SchoolAdmin),
            "teacher" => Some(Role::Teacher),
            "parent" => Some(Role::Parent),
            _ => None,
        }
    }

    /// Position in the hierarchy; higher outranks lower.
    fn rank(&self) -> u8 {
        match self {
            Role::PlatformOperator => 3,
            Role::SchoolAdmin => 2,
            Role::Teacher => 1,
            Role::Parent => 0,
        }
    }

    pub fn outranks(&self, other: &Role) -> bool {
        self.rank() > other.rank()
    }

    /// Admission rule for the role guard: literal membership in the allowed
    /// set, or outranking every allowed role.
    pub fn satisfies(&self, allowed: &[Role]) -> bool {
        allowed.contains(self) || allowed.iter().all(|r| self.outranks(r))
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
