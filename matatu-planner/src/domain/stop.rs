//! Stop identifier and stop record types.

use serde::{Deserialize, Serialize};

use super::Point;

/// Error returned when parsing an invalid identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid identifier: {reason}")]
pub struct InvalidId {
    reason: &'static str,
}

pub(crate) fn validate_id(s: &str) -> Result<(), InvalidId> {
    if s.trim().is_empty() {
        return Err(InvalidId {
            reason: "must not be blank",
        });
    }
    if s.trim() != s {
        return Err(InvalidId {
            reason: "must not have surrounding whitespace",
        });
    }
    Ok(())
}

/// Declares a cheap-to-clone string identifier newtype.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $debug:literal) => {
        $(#[$meta])*
        #[derive(
            Clone, PartialEq, Eq, Hash, PartialOrd, Ord, ::serde::Serialize, ::serde::Deserialize,
        )]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(::std::sync::Arc<str>);

        impl $name {
            /// Parse an identifier. Blank or padded strings are rejected.
            pub fn parse(s: &str) -> Result<Self, $crate::domain::InvalidId> {
                $crate::domain::stop::validate_id(s)?;
                Ok(Self(::std::sync::Arc::from(s)))
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = $crate::domain::InvalidId;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::parse(&s)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0.to_string()
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, concat!($debug, "({})"), self.as_str())
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub(crate) use string_id;

string_id!(
    /// Stable identifier of a stop.
    ///
    /// # Examples
    ///
    /// ```
    /// use matatu_planner::domain::StopId;
    ///
    /// let id = StopId::parse("KENCOM").unwrap();
    /// assert_eq!(id.as_str(), "KENCOM");
    /// assert!(StopId::parse("  ").is_err());
    /// ```
    StopId,
    "StopId"
);

/// A boarding point. Immutable reference data owned by the repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub id: StopId,
    pub name: String,
    #[serde(flatten)]
    pub location: Point,
    /// County or region tag, if known.
    #[serde(default)]
    pub county: Option<String>,
}

impl Stop {
    /// Create a stop with no county tag.
    pub fn new(id: StopId, name: impl Into<String>, location: Point) -> Self {
        Self {
            id,
            name: name.into(),
            location,
            county: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_ids() {
        assert!(StopId::parse("1").is_ok());
        assert!(StopId::parse("KENCOM").is_ok());
        assert!(StopId::parse("stop 42").is_ok());
    }

    #[test]
    fn reject_blank_and_padded() {
        assert!(StopId::parse("").is_err());
        assert!(StopId::parse("   ").is_err());
        assert!(StopId::parse(" A").is_err());
        assert!(StopId::parse("A\n").is_err());
    }

    #[test]
    fn debug_and_display() {
        let id = StopId::parse("ODEON").unwrap();
        assert_eq!(format!("{id}"), "ODEON");
        assert_eq!(format!("{id:?}"), "StopId(ODEON)");
    }

    #[test]
    fn serde_roundtrip_rejects_blank() {
        let id: StopId = serde_json::from_str("\"GPO\"").unwrap();
        assert_eq!(id.as_str(), "GPO");
        assert!(serde_json::from_str::<StopId>("\"\"").is_err());
    }

    #[test]
    fn stop_flattens_location() {
        let json = r#"{"id":"GPO","name":"GPO","lat":-1.2855,"lng":36.8200}"#;
        let stop: Stop = serde_json::from_str(json).unwrap();
        assert_eq!(stop.location.lat, -1.2855);
        assert!(stop.county.is_none());
    }
}
