#![forbid(unsafe_code)]

/// The six entity collections. Each one is a single JSON array stored under
/// one well-known blob key inside its own named store; the store itself is
/// schema-less and never inspects record shapes beyond the array check on
/// write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CollectionKind {
    Comparisons,
    ActivityLogs,
    CustomCompanies,
    TobPlans,
    TobTemplates,
    Users,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 6] = [
        CollectionKind::Comparisons,
        CollectionKind::ActivityLogs,
        CollectionKind::CustomCompanies,
        CollectionKind::TobPlans,
        CollectionKind::TobTemplates,
        CollectionKind::Users,
    ];

    pub fn store_name(self) -> &'static str {
        match self {
            Self::Comparisons => "gmi-comparisons",
            Self::ActivityLogs => "gmi-activity-logs",
            Self::CustomCompanies => "gmi-custom-companies",
            Self::TobPlans => "gmi-tob-plans",
            Self::TobTemplates => "gmi-tob-templates",
            Self::Users => "gmi-users",
        }
    }

    pub fn blob_key(self) -> &'static str {
        match self {
            Self::Comparisons => "all-comparisons",
            Self::ActivityLogs => "all-activity-logs",
            Self::CustomCompanies => "all-custom-companies",
            Self::TobPlans => "all-tob-plans",
            Self::TobTemplates => "all-tob-templates",
            Self::Users => "all-users",
        }
    }
}
