//! Serde helpers shared by the configuration and index record types.

/// (De)serializes a [Duration] as an integer number of milliseconds.
///
/// [Duration]: core::time::Duration
pub mod duration_ms {
    use core::time::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serializes the duration as milliseconds.
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis().try_into().unwrap_or(u64::MAX))
    }

    /// Deserializes milliseconds into a duration.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Deserializes a `u64` given as a JSON number, a decimal string or a `0x` hex string.
///
/// Chain selectors exceed the range JavaScript numbers represent exactly, so indexers commonly
/// emit them as strings.
pub mod flexible_u64 {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    /// Serializes the value as a JSON number.
    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(*value)
    }

    /// Deserializes the value.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let value = Value::deserialize(deserializer)?;
        crate::codec::parse_u64(&value)
            .ok_or_else(|| D::Error::custom(format!("expected an unsigned integer, got {value}")))
    }

    /// Deserializes an optional value.
    pub mod option {
        use serde::{de::Error, Deserialize, Deserializer, Serializer};
        use serde_json::Value;

        /// Serializes the value as a JSON number or `null`.
        pub fn serialize<S: Serializer>(
            value: &Option<u64>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(value) => serializer.serialize_some(value),
                None => serializer.serialize_none(),
            }
        }

        /// Deserializes the value, mapping `null` to `None`.
        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<u64>, D::Error> {
            match Option::<Value>::deserialize(deserializer)? {
                None | Some(Value::Null) => Ok(None),
                Some(value) => crate::codec::parse_u64(&value).map(Some).ok_or_else(|| {
                    D::Error::custom(format!("expected an unsigned integer, got {value}"))
                }),
            }
        }
    }
}
