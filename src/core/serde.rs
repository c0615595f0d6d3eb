use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::Display;
use std::time::Duration;

/// Serializes an optional Duration as seconds or null
pub fn serialize_opt_duration<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    duration.map(|d| d.as_secs_f64()).serialize(serializer)
}

/// Deserializes an optional Duration from seconds or null
pub fn deserialize_opt_duration<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<f64>::deserialize(deserializer)? {
        Some(secs) if !secs.is_finite() || secs < 0.0 => Err(serde::de::Error::custom(
            "duration must be a non-negative number of seconds",
        )),
        Some(secs) => Ok(Some(Duration::from_secs_f64(secs))),
        None => Ok(None),
    }
}

/// Serializes any Display value as its string form
pub fn serialize_display<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Display,
    S: Serializer,
{
    serializer.collect_str(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize, Deserialize)]
    struct Timeouts {
        #[serde(serialize_with = "serialize_opt_duration")]
        #[serde(deserialize_with = "deserialize_opt_duration")]
        idle: Option<Duration>,
    }

    #[test]
    fn test_optional_duration_round_trip() {
        let none = Timeouts { idle: None };
        assert_eq!(serde_json::to_string(&none).unwrap(), r#"{"idle":null}"#);

        let some = Timeouts { idle: Some(Duration::from_millis(1500)) };
        let json = serde_json::to_string(&some).unwrap();
        assert_eq!(json, r#"{"idle":1.5}"#);

        let parsed: Timeouts = serde_json::from_str(r#"{"idle":30.0}"#).unwrap();
        assert_eq!(parsed.idle, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_negative_duration_rejected() {
        assert!(serde_json::from_str::<Timeouts>(r#"{"idle":-1.0}"#).is_err());
    }

    #[test]
    fn test_display_serialization() {
        #[derive(Serialize)]
        struct Labeled {
            #[serde(serialize_with = "serialize_display")]
            addr: std::net::Ipv4Addr,
            #[serde(serialize_with = "serialize_display")]
            code: u16,
        }

        let value = Labeled {
            addr: std::net::Ipv4Addr::LOCALHOST,
            code: 7,
        };
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"{"addr":"127.0.0.1","code":"7"}"#
        );
    }
}
