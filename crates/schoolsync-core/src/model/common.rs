// ── Common types shared across the domain model ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// The remote collections the sync layer knows how to mirror.
///
/// The string form is the collection's path in the remote store and the
/// suffix of its cache key.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    Courses,
    Teachers,
    Notices,
    Videos,
    Messages,
    Students,
    Fees,
    Exams,
    Complaints,
    Timetable,
}

impl CollectionKind {
    pub fn path(self) -> &'static str {
        self.into()
    }

    /// Collections whose contents depend on who is signed in. These are
    /// cleared on sign-out.
    pub fn is_user_scoped(self) -> bool {
        matches!(self, Self::Messages | Self::Complaints | Self::Exams | Self::Fees)
    }
}

/// Where a store's current contents came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    /// Nothing published yet (or cleared).
    #[default]
    Empty,
    /// Cold-start placeholder read from the local cache.
    Cache,
    /// A snapshot delivered by a live subscription.
    Live,
    /// Bundled defaults substituted for an empty live snapshot.
    Fallback,
}

impl DataSource {
    /// `true` once a live subscription has published, including the
    /// fallback substituted for an empty live snapshot.
    pub fn is_live(self) -> bool {
        matches!(self, Self::Live | Self::Fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn collection_paths_are_snake_case() {
        assert_eq!(CollectionKind::Timetable.path(), "timetable");
        assert_eq!(CollectionKind::Courses.to_string(), "courses");
        assert_eq!("fees".parse::<CollectionKind>().ok(), Some(CollectionKind::Fees));
    }

    #[test]
    fn every_collection_round_trips_through_its_path() {
        for kind in CollectionKind::iter() {
            assert_eq!(kind.path().parse::<CollectionKind>().ok(), Some(kind));
        }
    }

    #[test]
    fn fallback_counts_as_live() {
        assert!(DataSource::Fallback.is_live());
        assert!(!DataSource::Cache.is_live());
    }
}
