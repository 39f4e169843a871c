//! Column role inference for tables with unpredictable header wording.
//!
//! Every role is described by a [`RoleRule`]: a list of canonical labels that
//! are matched exactly (case-sensitive) and, failing that, ordered keyword
//! tiers matched case-insensitively as substrings. Within a pass the leftmost
//! matching column wins, so resolution is stable for a given header row.

use std::fmt;

use serde::Serialize;

/// A keyword matches a label when every fragment occurs in the lowercased
/// label.
pub type Keyword = &'static [&'static str];

#[derive(Debug)]
pub struct RoleRule {
    pub exact: &'static [&'static str],
    pub tiers: &'static [&'static [Keyword]],
}

impl RoleRule {
    pub fn resolve(&self, headers: &[String]) -> Option<usize> {
        if let Some(idx) = headers
            .iter()
            .position(|label| self.exact.iter().any(|canonical| label == canonical))
        {
            return Some(idx);
        }
        let lowered: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();
        self.tiers.iter().find_map(|tier| {
            lowered
                .iter()
                .position(|label| tier.iter().any(|keyword| keyword_matches(label, keyword)))
        })
    }
}

fn keyword_matches(lowered_label: &str, keyword: Keyword) -> bool {
    keyword.iter().all(|fragment| lowered_label.contains(fragment))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum OrgAttribute {
    Position,
    Segment,
    Group,
    AreaDivision,
    DepartmentBranch,
}

impl OrgAttribute {
    pub const ALL: [OrgAttribute; 5] = [
        OrgAttribute::Position,
        OrgAttribute::Segment,
        OrgAttribute::Group,
        OrgAttribute::AreaDivision,
        OrgAttribute::DepartmentBranch,
    ];

    /// Header used for this attribute in enriched output.
    pub fn label(self) -> &'static str {
        match self {
            OrgAttribute::Position => "Position Name",
            OrgAttribute::Segment => "Segment Name",
            OrgAttribute::Group => "Group Name",
            OrgAttribute::AreaDivision => "Area/Division Name",
            OrgAttribute::DepartmentBranch => "Department/Branch",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Role {
    /// Authoritative employee number.
    Identifier,
    /// System user id that the legacy mapping table keys on.
    LegacyIdentifier,
    /// Canonical full name in a reference roster.
    Name,
    /// Name-like column of the roster being enriched.
    DisplayName,
    /// Resignation date or separation status marker.
    Resignation,
    Organizational(OrgAttribute),
}

impl Role {
    pub fn all() -> Vec<Role> {
        let mut roles = vec![
            Role::Identifier,
            Role::LegacyIdentifier,
            Role::Name,
            Role::DisplayName,
            Role::Resignation,
        ];
        roles.extend(OrgAttribute::ALL.into_iter().map(Role::Organizational));
        roles
    }

    pub fn rule(self) -> &'static RoleRule {
        match self {
            Role::Identifier => &IDENTIFIER_RULE,
            Role::LegacyIdentifier => &LEGACY_IDENTIFIER_RULE,
            Role::Name => &NAME_RULE,
            Role::DisplayName => &DISPLAY_NAME_RULE,
            Role::Resignation => &RESIGNATION_RULE,
            Role::Organizational(OrgAttribute::Position) => &POSITION_RULE,
            Role::Organizational(OrgAttribute::Segment) => &SEGMENT_RULE,
            Role::Organizational(OrgAttribute::Group) => &GROUP_RULE,
            Role::Organizational(OrgAttribute::AreaDivision) => &AREA_DIVISION_RULE,
            Role::Organizational(OrgAttribute::DepartmentBranch) => &DEPARTMENT_BRANCH_RULE,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Identifier => write!(f, "identifier"),
            Role::LegacyIdentifier => write!(f, "legacy identifier"),
            Role::Name => write!(f, "full name"),
            Role::DisplayName => write!(f, "display name"),
            Role::Resignation => write!(f, "resignation"),
            Role::Organizational(attr) => write!(f, "{}", attr.label().to_lowercase()),
        }
    }
}

static IDENTIFIER_RULE: RoleRule = RoleRule {
    exact: &["PERNR", "Pers. Number"],
    tiers: &[&[&["pernr"], &["pers. number"], &["employee", "number"]]],
};

static LEGACY_IDENTIFIER_RULE: RoleRule = RoleRule {
    exact: &["User ID"],
    tiers: &[&[
        &["user"],
        &["id"],
        &["sysid"],
        &["username"],
        &["abbreviation"],
    ]],
};

static NAME_RULE: RoleRule = RoleRule {
    exact: &["Full Name", "Fullname"],
    tiers: &[&[&["name"]]],
};

static DISPLAY_NAME_RULE: RoleRule = RoleRule {
    exact: &[],
    tiers: &[&[&["username"], &["name"]]],
};

static RESIGNATION_RULE: RoleRule = RoleRule {
    exact: &[],
    tiers: &[
        &[&["effectivity from hr separation report"]],
        &[&["effectivity", "separation"]],
        &[
            &["resignation"],
            &["date"],
            &["end"],
            &["termination"],
            &["exit"],
            &["effectivity"],
            &["separation"],
            &["report"],
        ],
    ],
};

static POSITION_RULE: RoleRule = RoleRule {
    exact: &[],
    tiers: &[&[
        &["position"],
        &["job"],
        &["title"],
        &["role"],
        &["pos. name"],
    ]],
};

static SEGMENT_RULE: RoleRule = RoleRule {
    exact: &[],
    tiers: &[&[&["segment"]]],
};

static GROUP_RULE: RoleRule = RoleRule {
    exact: &[],
    tiers: &[&[&["group"]]],
};

static AREA_DIVISION_RULE: RoleRule = RoleRule {
    exact: &[],
    tiers: &[&[&["area"], &["division"]]],
};

static DEPARTMENT_BRANCH_RULE: RoleRule = RoleRule {
    exact: &[],
    tiers: &[&[&["department"], &["branch"], &["unit"]]],
};

pub fn resolve(headers: &[String], role: Role) -> Option<usize> {
    role.rule().resolve(headers)
}

pub fn resolve_label(headers: &[String], role: Role) -> Option<&str> {
    resolve(headers, role).map(|idx| headers[idx].as_str())
}

/// Column positions for every role, resolved once per table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRoles {
    pub identifier: Option<usize>,
    pub legacy_identifier: Option<usize>,
    pub name: Option<usize>,
    pub display_name: Option<usize>,
    pub resignation: Option<usize>,
    pub organizational: [Option<usize>; 5],
}

impl TableRoles {
    pub fn resolve(headers: &[String]) -> Self {
        let mut organizational = [None; 5];
        for attr in OrgAttribute::ALL {
            organizational[attr.index()] = resolve(headers, Role::Organizational(attr));
        }
        TableRoles {
            identifier: resolve(headers, Role::Identifier),
            legacy_identifier: resolve(headers, Role::LegacyIdentifier),
            name: resolve(headers, Role::Name),
            display_name: resolve(headers, Role::DisplayName),
            resignation: resolve(headers, Role::Resignation),
            organizational,
        }
    }

    pub fn organizational(&self, attr: OrgAttribute) -> Option<usize> {
        self.organizational[attr.index()]
    }
}

pub const HEADER_VOCABULARY: &[&str] = &[
    "pernr",
    "pers. number",
    "employee number",
    "emp number",
    "full name",
    "name",
    "employee name",
    "username",
    "user id",
    "userid",
    "sysid",
    "abbreviation",
    "department",
    "position",
    "resignation",
    "date",
    "effectivity",
];

/// Counts the distinct vocabulary keywords that occur anywhere in the labels.
pub fn header_keyword_hits<S: AsRef<str>>(labels: &[S]) -> usize {
    let lowered: Vec<String> = labels.iter().map(|l| l.as_ref().to_lowercase()).collect();
    HEADER_VOCABULARY
        .iter()
        .filter(|keyword| lowered.iter().any(|label| label.contains(*keyword)))
        .count()
}

pub fn has_usable_header<S: AsRef<str>>(labels: &[S]) -> bool {
    header_keyword_hits(labels) >= 2
}
