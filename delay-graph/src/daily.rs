use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::delay::{self, Delay};
use crate::network::StationId;

/// Coarse service-pattern split used by the weekday / weekend figures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DayKind {
    Weekday,
    Weekend,
}

impl DayKind {
    /// Saturdays and Sundays count as weekend, all other days as weekday
    pub fn from_date(date: NaiveDate) -> DayKind {
        match date.weekday() {
            Weekday::Sat | Weekday::Sun => DayKind::Weekend,
            _ => DayKind::Weekday,
        }
    }
}

impl fmt::Display for DayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DayKind::Weekday => "weekday",
            DayKind::Weekend => "weekend",
        })
    }
}

/// A delay recorded at a station on a calendar day
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StationSample {
    pub station_id: StationId,
    pub date: NaiveDate,
    pub delay: Delay,
}

/// Per-station mean delays contrasted between weekdays and weekends.
///
/// Only stations sampled on both kinds of day are kept, so the two sides
/// describe the same set of stations.
#[derive(Debug, Clone, PartialEq)]
pub struct DaySplit {
    weekday: BTreeMap<StationId, Delay>,
    weekend: BTreeMap<StationId, Delay>,
}

impl DaySplit {
    /// Group the samples by station and kind of day and average each group
    pub fn of(samples: &[StationSample]) -> DaySplit {
        let mut grouped: BTreeMap<StationId, (Vec<Delay>, Vec<Delay>)> = BTreeMap::new();
        for sample in samples {
            let (weekday, weekend) = grouped.entry(sample.station_id).or_default();
            match DayKind::from_date(sample.date) {
                DayKind::Weekday => weekday.push(sample.delay),
                DayKind::Weekend => weekend.push(sample.delay),
            }
        }

        let mut split = DaySplit {
            weekday: BTreeMap::new(),
            weekend: BTreeMap::new(),
        };
        for (station_id, (weekdays, weekends)) in grouped {
            // a station observed on only one kind of day has nothing to
            // be compared against
            if let (Some(weekday_mean), Some(weekend_mean)) =
                (delay::mean(weekdays), delay::mean(weekends))
            {
                split.weekday.insert(station_id, weekday_mean);
                split.weekend.insert(station_id, weekend_mean);
            }
        }
        split
    }

    /// Stations appearing on both sides of the split, in id order
    pub fn stations(&self) -> impl Iterator<Item = StationId> + '_ {
        self.weekday.keys().copied()
    }

    pub fn weekday(&self) -> impl Iterator<Item = (StationId, Delay)> + '_ {
        self.weekday.iter().map(|(&id, &delay)| (id, delay))
    }

    pub fn weekend(&self) -> impl Iterator<Item = (StationId, Delay)> + '_ {
        self.weekend.iter().map(|(&id, &delay)| (id, delay))
    }

    pub fn weekday_mean(&self, station_id: StationId) -> Option<Delay> {
        self.weekday.get(&station_id).copied()
    }

    pub fn weekend_mean(&self, station_id: StationId) -> Option<Delay> {
        self.weekend.get(&station_id).copied()
    }

    pub fn len(&self) -> usize {
        self.weekday.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weekday.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn sample(station_id: StationId, on: NaiveDate, minutes: f64) -> StationSample {
        StationSample {
            station_id,
            date: on,
            delay: Delay::minutes(minutes),
        }
    }

    #[test]
    fn saturday_and_sunday_are_weekend() {
        assert_eq!(DayKind::from_date(date(2016, 11, 4)), DayKind::Weekday); // friday
        assert_eq!(DayKind::from_date(date(2016, 11, 5)), DayKind::Weekend); // saturday
        assert_eq!(DayKind::from_date(date(2016, 11, 6)), DayKind::Weekend); // sunday
        assert_eq!(DayKind::from_date(date(2016, 11, 7)), DayKind::Weekday); // monday
    }

    #[test]
    fn splits_and_averages_per_station() {
        let samples = vec![
            sample(10, date(2016, 11, 7), 2.0),
            sample(10, date(2016, 11, 8), 4.0),
            sample(10, date(2016, 11, 5), 8.0),
            sample(20, date(2016, 11, 5), 1.0),
            sample(20, date(2016, 11, 9), 7.0),
        ];

        let split = DaySplit::of(&samples);
        assert_eq!(split.len(), 2);
        assert_eq!(split.weekday_mean(10), Some(Delay::minutes(3.0)));
        assert_eq!(split.weekend_mean(10), Some(Delay::minutes(8.0)));
        assert_eq!(split.weekday_mean(20), Some(Delay::minutes(7.0)));
        assert_eq!(split.weekend_mean(20), Some(Delay::minutes(1.0)));
    }

    #[test]
    fn stations_seen_on_only_one_kind_of_day_are_dropped() {
        let samples = vec![
            sample(10, date(2016, 11, 7), 2.0),
            sample(10, date(2016, 11, 5), 3.0),
            sample(20, date(2016, 11, 7), 4.0), // weekdays only
            sample(30, date(2016, 11, 6), 5.0), // weekends only
        ];

        let split = DaySplit::of(&samples);
        let stations: Vec<StationId> = split.stations().collect();
        assert_eq!(stations, vec![10]);
        assert_eq!(split.weekday_mean(20), None);
        assert_eq!(split.weekend_mean(30), None);
    }

    #[test]
    fn both_sides_list_stations_in_the_same_order() {
        let samples = vec![
            sample(30, date(2016, 11, 7), 1.0),
            sample(30, date(2016, 11, 5), 1.0),
            sample(10, date(2016, 11, 7), 1.0),
            sample(10, date(2016, 11, 5), 1.0),
        ];

        let split = DaySplit::of(&samples);
        let weekday_ids: Vec<StationId> = split.weekday().map(|(id, _)| id).collect();
        let weekend_ids: Vec<StationId> = split.weekend().map(|(id, _)| id).collect();
        assert_eq!(weekday_ids, vec![10, 30]);
        assert_eq!(weekday_ids, weekend_ids);
    }
}
