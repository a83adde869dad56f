pub mod timestamp {
    use core::fmt;

    use chrono::{Local, NaiveDateTime, Timelike as _};
    use serde::{
        de::{self, Unexpected, Visitor},
        Deserializer, Serializer,
    };

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    /// The current local wall-clock time, truncated to whole seconds so that it
    /// survives a round-trip through [`FORMAT`].
    pub fn now() -> NaiveDateTime {
        let now = Local::now().naive_local();
        now.with_nanosecond(0).unwrap_or(now)
    }

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&value.format(FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TimestampVisitor;

        impl<'de> Visitor<'de> for TimestampVisitor {
            type Value = NaiveDateTime;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string in the format YYYY-MM-DD HH:MM:SS")
            }

            fn visit_str<E>(self, value: &str) -> Result<NaiveDateTime, E>
            where
                E: de::Error,
            {
                NaiveDateTime::parse_from_str(value, FORMAT).map_err(|_| {
                    de::Error::invalid_value(Unexpected::Str(value), &self)
                })
            }
        }

        deserializer.deserialize_str(TimestampVisitor)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};
    use serde::{Deserialize, Serialize};

    use super::timestamp;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Stamped {
        #[serde(with = "timestamp")]
        time: NaiveDateTime,
    }

    #[test]
    fn writes_seconds_precision() {
        let time = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(7, 5, 0)
            .unwrap();
        let json = serde_json::to_string(&Stamped { time }).unwrap();
        assert_eq!(json, r#"{"time":"2024-03-09 07:05:00"}"#);
    }

    #[test]
    fn rejects_other_formats() {
        let result = serde_json::from_str::<Stamped>(r#"{"time":"2024-03-09T07:05:00"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn now_round_trips() {
        let stamped = Stamped {
            time: timestamp::now(),
        };
        let json = serde_json::to_string(&stamped).unwrap();
        assert_eq!(serde_json::from_str::<Stamped>(&json).unwrap(), stamped);
    }
}
