use semver::Version;

/// Alias granularity for a pin: the plain name, `name-vN`, or
/// `name-vN.M`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Latest,
    Major,
    Minor,
}

impl Kind {
    /// The external-directory entry a pin of this kind creates for the
    /// winning version.
    pub fn alias_name(&self, name: &str, version: &Version) -> String {
        match self {
            Self::Latest => name.to_string(),
            Self::Major => format!("{name}-v{}", version.major),
            Self::Minor => format!("{name}-v{}.{}", version.major, version.minor),
        }
    }
}
