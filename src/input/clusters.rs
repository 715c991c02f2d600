// Released under MIT License.
// Copyright (c) 2024-2026 Ladislav Bartos

//! Contains the implementation of the `ClusterCount` enum.

use std::fmt;
use std::num::NonZeroUsize;

use serde::{
    de::{self, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};

use crate::errors::ConfigError;

/// Number of metastable clusters to identify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClusterCount {
    /// Use the number of clusters suggested by the largest eigenvalue-weighted gap of the spectrum.
    #[default]
    Auto,
    /// Use a fixed number of clusters.
    Fixed(NonZeroUsize),
}

impl ClusterCount {
    /// Use the number of clusters suggested by the spectrum.
    pub fn auto() -> Self {
        Self::Auto
    }

    /// Use a fixed number of clusters.
    ///
    /// ## Returns
    /// - `ClusterCount::Fixed` if `n_clusters` is positive.
    /// - `ConfigError::InvalidClusters` if `n_clusters` is zero.
    pub fn fixed(n_clusters: usize) -> Result<Self, ConfigError> {
        NonZeroUsize::new(n_clusters)
            .map(Self::Fixed)
            .ok_or(ConfigError::InvalidClusters)
    }

    /// Get the number of clusters to use given the number `suggested` by the spectrum.
    pub fn resolve(&self, suggested: usize) -> usize {
        match self {
            Self::Auto => suggested,
            Self::Fixed(n) => n.get(),
        }
    }
}

impl From<NonZeroUsize> for ClusterCount {
    fn from(value: NonZeroUsize) -> Self {
        Self::Fixed(value)
    }
}

impl fmt::Display for ClusterCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Fixed(n) => write!(f, "{}", n),
        }
    }
}

impl Serialize for ClusterCount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Auto => serializer.serialize_str("auto"),
            Self::Fixed(n) => serializer.serialize_u64(n.get() as u64),
        }
    }
}

impl<'de> Deserialize<'de> for ClusterCount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ClusterCountVisitor;

        impl<'de> Visitor<'de> for ClusterCountVisitor {
            type Value = ClusterCount;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a positive integer or 'auto'")
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                ClusterCount::fixed(v as usize).map_err(|e| E::custom(e.to_string()))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                if v < 0 {
                    return Err(E::invalid_value(de::Unexpected::Signed(v), &self));
                }

                self.visit_u64(v as u64)
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                if v.eq_ignore_ascii_case("auto") {
                    Ok(ClusterCount::Auto)
                } else {
                    Err(E::invalid_value(de::Unexpected::Str(v), &self))
                }
            }
        }

        deserializer.deserialize_any(ClusterCountVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_count_constructors() {
        assert_eq!(ClusterCount::auto(), ClusterCount::Auto);
        assert_eq!(
            ClusterCount::fixed(3).unwrap(),
            ClusterCount::Fixed(NonZeroUsize::new(3).unwrap())
        );

        match ClusterCount::fixed(0) {
            Ok(_) => panic!("Function should have failed."),
            Err(ConfigError::InvalidClusters) => (),
            Err(e) => panic!("Unexpected error type `{}` returned.", e),
        }
    }

    #[test]
    fn cluster_count_resolve() {
        assert_eq!(ClusterCount::Auto.resolve(4), 4);
        assert_eq!(ClusterCount::fixed(2).unwrap().resolve(4), 2);
    }

    #[test]
    fn cluster_count_yaml() {
        let count: ClusterCount = serde_yaml::from_str("5").unwrap();
        assert_eq!(count, ClusterCount::fixed(5).unwrap());

        let count: ClusterCount = serde_yaml::from_str("auto").unwrap();
        assert_eq!(count, ClusterCount::Auto);

        let count: ClusterCount = serde_yaml::from_str("AUTO").unwrap();
        assert_eq!(count, ClusterCount::Auto);

        assert!(serde_yaml::from_str::<ClusterCount>("0").is_err());
        assert!(serde_yaml::from_str::<ClusterCount>("-2").is_err());
        assert!(serde_yaml::from_str::<ClusterCount>("many").is_err());
    }

    #[test]
    fn cluster_count_yaml_roundtrip() {
        for count in [ClusterCount::Auto, ClusterCount::fixed(7).unwrap()] {
            let string = serde_yaml::to_string(&count).unwrap();
            let read: ClusterCount = serde_yaml::from_str(&string).unwrap();
            assert_eq!(read, count);
        }
    }
}
