// Stage catalog - the fixed five-step approval chain and the roles
// allowed to act at each step. Compiled-in, pure, no failure modes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One named step in the fixed approval chain, in decision order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Hod,
    Divisional,
    IctDirector,
    HeadIt,
    IctOfficer,
}

/// Role an actor must hold to decide a given stage.
///
/// `DivisionalDirector` is additionally department-scoped: holding the role
/// is not enough, the actor must be the director assigned to the request's
/// department. That check lives in the transition guard, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    HeadOfDepartment,
    DivisionalDirector,
    IctDirector,
    HeadOfIt,
    IctOfficer,
}

impl Stage {
    /// All stages in decision order.
    pub const ALL: [Stage; 5] = [
        Stage::Hod,
        Stage::Divisional,
        Stage::IctDirector,
        Stage::HeadIt,
        Stage::IctOfficer,
    ];

    pub const COUNT: usize = Self::ALL.len();

    /// Zero-based position in the chain.
    pub fn index(self) -> usize {
        match self {
            Stage::Hod => 0,
            Stage::Divisional => 1,
            Stage::IctDirector => 2,
            Stage::HeadIt => 3,
            Stage::IctOfficer => 4,
        }
    }

    /// Column-friendly name, also used in derived status strings.
    pub fn name(self) -> &'static str {
        match self {
            Stage::Hod => "hod",
            Stage::Divisional => "divisional",
            Stage::IctDirector => "ict_director",
            Stage::HeadIt => "head_it",
            Stage::IctOfficer => "ict_officer",
        }
    }

    pub fn from_name(name: &str) -> Option<Stage> {
        Stage::ALL.iter().copied().find(|s| s.name() == name)
    }

    /// The stage that becomes decidable once this one is approved.
    pub fn next(self) -> Option<Stage> {
        Stage::ALL.get(self.index() + 1).copied()
    }

    /// Stages strictly before this one, in order.
    pub fn earlier(self) -> &'static [Stage] {
        &Stage::ALL[..self.index()]
    }

    /// The final stage closes with `Implemented` instead of `Approved`.
    pub fn is_terminal(self) -> bool {
        self == Stage::IctOfficer
    }

    pub fn required_role(self) -> Role {
        match self {
            Stage::Hod => Role::HeadOfDepartment,
            Stage::Divisional => Role::DivisionalDirector,
            Stage::IctDirector => Role::IctDirector,
            Stage::HeadIt => Role::HeadOfIt,
            Stage::IctOfficer => Role::IctOfficer,
        }
    }

    /// Human-readable title for notification messages.
    pub fn title(self) -> &'static str {
        match self {
            Stage::Hod => "Head of Department",
            Stage::Divisional => "Divisional Director",
            Stage::IctDirector => "ICT Director",
            Stage::HeadIt => "Head of IT",
            Stage::IctOfficer => "ICT Officer",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::HeadOfDepartment => "head_of_department",
            Role::DivisionalDirector => "divisional_director",
            Role::IctDirector => "ict_director",
            Role::HeadOfIt => "head_of_it",
            Role::IctOfficer => "ict_officer",
        };
        f.write_str(name)
    }
}
