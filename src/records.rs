use std::convert::TryInto;

use chrono::NaiveDate;
use serde::{self, de, Deserialize, Deserializer};

use delay_graph::delay::Delay;
use delay_graph::network;

/// IBNR number of the station an observation belongs to
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Hash, Clone, Copy)]
pub struct StationId(u64);

impl StationId {
    pub fn into_inner(self) -> network::StationId {
        self.0
    }
}

/// Number of the line section an observation belongs to
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Hash, Clone, Copy)]
pub struct SegmentId(u32);

impl SegmentId {
    pub fn into_inner(self) -> network::SegmentId {
        self.0
    }
}

/// One observation of a station on a line section
#[derive(Debug, Deserialize)]
pub struct StationSegmentRecord { // "Station or stop","Name","Coordinate Latitude","Coordinate Longitude","route_ids","Minutes of delay"
    #[serde(rename = "Station or stop")]
    pub station_id: StationId,
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "Coordinate Latitude")]
    pub latitude: f64,
    #[serde(rename = "Coordinate Longitude")]
    pub longitude: f64,
    #[serde(rename = "route_ids")]
    pub segment_id: SegmentId,
    #[serde(rename = "Minutes of delay", default, deserialize_with = "lenient_delay")]
    pub minutes_of_delay: Option<Delay>,
    // #[serde(rename = "Country")]
    // country: String,
}

/// A recorded candidate path with the total delay the recording step
/// computed for it. The total is advisory, means are recomputed from the
/// network
#[derive(Debug, Deserialize)]
pub struct CandidatePathRecord { // "Label","Path","Total Delay"
    #[serde(rename = "Label", default)]
    pub label: Option<String>,
    #[serde(rename = "Path", deserialize_with = "segment_path")]
    pub path: network::Path,
    #[serde(rename = "Total Delay", default, deserialize_with = "lenient_delay")]
    pub total_delay: Option<Delay>,
}

/// One observation of a station on a calendar day
#[derive(Debug, Deserialize)]
pub struct DatedStationRecord { // "Station or stop";"Name";"Country";"Date";"Coordinate Latitude";"Coordinate Longitude";"Minutes of delay"
    #[serde(rename = "Station or stop")]
    pub station_id: StationId,
    // #[serde(rename = "Name")]
    // name: String,
    // #[serde(rename = "Country")]
    // country: String,
    #[serde(rename = "Date", deserialize_with = "year_first_date")]
    pub date: NaiveDate,
    #[serde(rename = "Coordinate Latitude")]
    pub latitude: f64,
    #[serde(rename = "Coordinate Longitude")]
    pub longitude: f64,
    #[serde(rename = "Minutes of delay", default, deserialize_with = "lenient_delay")]
    pub minutes_of_delay: Option<Delay>,
}

/// The cleaning step writes station numbers float formatted in places,
/// eg. `80290288.0`. Whole-valued floats are accepted, anything else is
/// refused so a broken id never turns into a station
impl<'de> Deserialize<'de> for StationId {
    fn deserialize<D>(deserializer: D) -> Result<StationId, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct FloatFormattedInt;

        impl<'de> serde::de::Visitor<'de> for FloatFormattedInt {
            type Value = StationId;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("an IBNR station number, possibly float formatted")
            }

            fn visit_str<E>(self, string: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if let Ok(id) = string.trim().parse() {
                    return Ok(StationId(id));
                }
                match string.trim().parse::<f64>() {
                    Ok(float)
                        if float.fract() == 0.0 && float >= 0.0 && float <= U64_FLOAT_LIMIT =>
                    {
                        Ok(StationId(float as u64))
                    }
                    _ => Err(de::Error::invalid_value(de::Unexpected::Str(string), &self)),
                }
            }

            fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if v.fract() == 0.0 && v >= 0.0 && v <= U64_FLOAT_LIMIT {
                    Ok(StationId(v as u64))
                } else {
                    Err(de::Error::invalid_value(de::Unexpected::Float(v), &self))
                }
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(StationId(v))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(StationId(v.try_into().map_err(|e| serde::de::Error::custom(e))?))
            }
        }

        deserializer.deserialize_any(FloatFormattedInt)
    }
}

/// The `route_ids` column is written by pandas as floats, eg. `4082.0`.
/// Whole-valued floats are accepted, anything else is refused so a broken
/// id never turns into a section
impl<'de> Deserialize<'de> for SegmentId {
    fn deserialize<D>(deserializer: D) -> Result<SegmentId, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct FloatFormattedInt;

        impl<'de> serde::de::Visitor<'de> for FloatFormattedInt {
            type Value = SegmentId;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a line section number, possibly float formatted")
            }

            fn visit_str<E>(self, string: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if let Ok(id) = string.trim().parse() {
                    return Ok(SegmentId(id));
                }
                match string.trim().parse::<f64>() {
                    Ok(float)
                        if float.fract() == 0.0
                            && float >= 0.0
                            && float <= f64::from(std::u32::MAX) =>
                    {
                        Ok(SegmentId(float as u32))
                    }
                    _ => Err(de::Error::invalid_value(de::Unexpected::Str(string), &self)),
                }
            }

            fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if v.fract() == 0.0 && v >= 0.0 && v <= f64::from(std::u32::MAX) {
                    Ok(SegmentId(v as u32))
                } else {
                    Err(de::Error::invalid_value(de::Unexpected::Float(v), &self))
                }
            }

            fn visit_u32<E>(self, num: u32) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(SegmentId(num))
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(SegmentId(v.try_into().map_err(|e| serde::de::Error::custom(e))?))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(SegmentId(v.try_into().map_err(|e| serde::de::Error::custom(e))?))
            }
        }

        deserializer.deserialize_any(FloatFormattedInt)
    }
}

// 2^53, the limit below which a whole f64 is exact
const U64_FLOAT_LIMIT: f64 = 9007199254740992.0;

/// Delay readings are untrusted. Empty cells, text and non-finite numbers
/// all read as missing rather than failing the row
fn lenient_delay<'de, D>(deserializer: D) -> Result<Option<Delay>, D::Error>
where
    D: Deserializer<'de>,
{
    struct AnyMinutes;

    impl<'de> serde::de::Visitor<'de> for AnyMinutes {
        type Value = Option<Delay>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("minutes of delay in any readable form")
        }

        fn visit_str<E>(self, string: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(match string.trim().parse::<f64>() {
                Ok(v) if v.is_finite() => Some(Delay::minutes(v)),
                _ => None,
            })
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(if v.is_finite() { Some(Delay::minutes(v)) } else { None })
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Some(Delay::minutes(v as f64)))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Some(Delay::minutes(v as f64)))
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(None)
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(AnyMinutes)
}

/// Candidate paths are recorded like `6185->6107->6100`
fn segment_path<'de, D>(deserializer: D) -> Result<network::Path, D::Error>
where
    D: Deserializer<'de>,
{
    let string = String::deserialize(deserializer)?;
    string.parse().map_err(|e| serde::de::Error::custom(e))
}

/// Dates are written year first, eg. `2016-11-05`
fn year_first_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let string = String::deserialize(deserializer)?;
    NaiveDate::parse_from_str(string.trim(), "%Y-%m-%d").map_err(|e| serde::de::Error::custom(e))
}

#[cfg(test)]
mod test_station_id {
    use super::StationId;
    use serde_test::{assert_de_tokens, assert_de_tokens_error, Token};

    #[test]
    fn test_plain() {
        let id = StationId(80290288);

        assert_de_tokens(&id, &[Token::U64(80290288)]);
    }

    #[test]
    fn test_digit_string() {
        let id = StationId(80290288);

        assert_de_tokens(&id, &[Token::BorrowedStr("80290288")]);
    }

    #[test]
    fn test_float_formatted() {
        let id = StationId(80290288);

        assert_de_tokens(&id, &[Token::BorrowedStr("80290288.0")]);
    }

    #[test]
    fn test_text_is_refused() {
        assert_de_tokens_error::<StationId>(
            &[Token::BorrowedStr("Stuttgart")],
            "invalid value: string \"Stuttgart\", expected an IBNR station number, possibly float formatted",
        );
    }
}

#[cfg(test)]
mod test_segment_id {
    use super::SegmentId;
    use serde_test::{assert_de_tokens, assert_de_tokens_error, Token};

    #[test]
    fn test_plain() {
        let id = SegmentId(4082);

        assert_de_tokens(&id, &[Token::U32(4082)]);
    }

    #[test]
    fn test_max() {
        let id = SegmentId(std::u32::MAX);

        assert_de_tokens(&id, &[Token::U32(std::u32::MAX)]);
    }

    #[test]
    fn test_float_formatted() {
        let id = SegmentId(4082);

        assert_de_tokens(&id, &[Token::BorrowedStr("4082.0")]);
    }

    #[test]
    fn test_float_token() {
        let id = SegmentId(4082);

        assert_de_tokens(&id, &[Token::F64(4082.0)]);
    }

    #[test]
    fn test_fractional_is_refused() {
        assert_de_tokens_error::<SegmentId>(
            &[Token::F64(4082.5)],
            "invalid value: floating point `4082.5`, expected a line section number, possibly float formatted",
        );
    }

    #[test]
    fn test_text_is_refused() {
        assert_de_tokens_error::<SegmentId>(
            &[Token::BorrowedStr("one")],
            "invalid value: string \"one\", expected a line section number, possibly float formatted",
        );
    }
}
