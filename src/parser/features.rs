//! Named parser feature toggles.
//!
//! Features are addressed by name so callers can pass them through from
//! configuration. A name may be given with or without the `feature_`
//! prefix: `external_ges` and `feature_external_ges` are the same toggle.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A boolean capability of the underlying parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// Report local names and drop namespace declarations.
    Namespaces,
    /// Keep `xmlns` attributes when [`Feature::Namespaces`] is on.
    NamespacePrefixes,
    /// Share element and attribute names through an interning dictionary.
    StringInterning,
    /// DTD validation. Only `false` is accepted.
    Validation,
    /// Load the external DTD subset and external general entities.
    ExternalGeneralEntities,
    /// Load external parameter entities.
    ExternalParameterEntities,
}

impl Feature {
    /// Every feature, in a stable order.
    pub const ALL: [Feature; 6] = [
        Feature::Namespaces,
        Feature::NamespacePrefixes,
        Feature::StringInterning,
        Feature::Validation,
        Feature::ExternalGeneralEntities,
        Feature::ExternalParameterEntities,
    ];

    /// The canonical name, without the `feature_` prefix.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Feature::Namespaces => "namespaces",
            Feature::NamespacePrefixes => "namespace_prefixes",
            Feature::StringInterning => "string_interning",
            Feature::Validation => "validation",
            Feature::ExternalGeneralEntities => "external_ges",
            Feature::ExternalParameterEntities => "external_pes",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Feature {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bare = s.strip_prefix("feature_").unwrap_or(s);
        Feature::ALL
            .into_iter()
            .find(|feature| feature.name() == bare)
            .ok_or_else(|| Error::UnknownFeature(s.to_string()))
    }
}
