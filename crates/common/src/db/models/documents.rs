//! JSON document columns
//!
//! Both the requirement bill and a project's progress are stored as JSON
//! objects of `commodity -> quantity`.

use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Required quantity per commodity for one station requirement.
///
/// Zero entries are kept as ingested but mean "not required"; anything that
/// leaves the service goes through [`Commodities::non_zero`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct Commodities(pub BTreeMap<String, i64>);

impl Commodities {
    /// Commodities with a positive required quantity
    pub fn required(&self) -> impl Iterator<Item = (&str, i64)> + '_ {
        self.0
            .iter()
            .filter(|(_, quantity)| **quantity > 0)
            .map(|(name, quantity)| (name.as_str(), *quantity))
    }

    /// Copy with the zero-valued entries dropped
    pub fn non_zero(&self) -> Commodities {
        Commodities(
            self.required()
                .map(|(name, quantity)| (name.to_string(), quantity))
                .collect(),
        )
    }
}

impl<K: Into<String>> FromIterator<(K, i64)> for Commodities {
    fn from_iter<T: IntoIterator<Item = (K, i64)>>(iter: T) -> Self {
        Commodities(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Remaining quantity per commodity for one project.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct Progress(pub BTreeMap<String, i64>);

impl Progress {
    /// Fresh progress for a new project: everything required is outstanding
    pub fn seeded_from(commodities: &Commodities) -> Self {
        Progress(
            commodities
                .required()
                .map(|(name, quantity)| (name.to_string(), quantity))
                .collect(),
        )
    }

    /// Remaining quantity for `commodity`, treating an absent key as fully
    /// outstanding
    pub fn remaining_for(&self, commodity: &str, required: i64) -> i64 {
        self.0.get(commodity).copied().unwrap_or(required)
    }

    pub fn get(&self, commodity: &str) -> Option<i64> {
        self.0.get(commodity).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, i64)> for Progress {
    fn from_iter<T: IntoIterator<Item = (K, i64)>>(iter: T) -> Self {
        Progress(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
