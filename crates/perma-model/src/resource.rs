use std::fmt;

/// The kinds of records an export pulls down, in the order they are fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Users,
    Archives,
    Folders,
    VestingOrgs,
}

impl ResourceKind {
    /// API path for this resource, relative to the API root.
    pub fn endpoint(self) -> &'static str {
        match self {
            ResourceKind::Users => "/v1/user",
            ResourceKind::Archives => "/v1/user/archives/",
            ResourceKind::Folders => "/v1/user/folders/",
            ResourceKind::VestingOrgs => "/v1/user/vesting_orgs/",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ResourceKind::Users => "users",
            ResourceKind::Archives => "archives",
            ResourceKind::Folders => "folders",
            ResourceKind::VestingOrgs => "vesting_orgs",
        }
    }

    /// File name of the fixture written for this resource.
    pub fn fixture_file(self) -> String {
        format!("{}.yaml", self.name())
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
