use serde::Serialize;

use delay_graph::daily::DaySplit;
use delay_graph::delay::{self, Delay, Punctuality};
use delay_graph::network::{
    CandidateRoutes, Path, RouteLabel, RouteNetwork, SegmentId, Station, StationId,
};
use delay_graph::reliability::{self, PathStats, ReliabilityError, Selection};

/// A station marker, coloured by its punctuality
#[derive(Debug, Serialize)]
pub struct FigurePoint {
    pub station_id: StationId,
    pub name: Option<String>,
    pub location: geo::Point<f64>,
    pub mean_delay: Delay,
    pub punctuality: Punctuality,
}

/// A line section drawn through its member stations
#[derive(Debug, Serialize)]
pub struct FigureSegment {
    pub segment_id: SegmentId,
    pub stations: Vec<StationId>,
    pub mean_delay: Delay,
    pub punctuality: Punctuality,
}

/// One route drawn over the network
#[derive(Debug, Serialize)]
pub struct RouteFigure {
    pub label: RouteLabel,
    pub stats: PathStats,
    pub segments: Vec<FigureSegment>,
    pub stations: Vec<FigurePoint>,
}

/// The selected route next to the fastest connection's stations
#[derive(Debug, Serialize)]
pub struct ComparisonFigure {
    pub reliable: RouteFigure,
    pub fastest: Vec<FigurePoint>,
    pub fastest_mean_delay: Option<Delay>,
    pub rejected: Vec<(RouteLabel, ReliabilityError)>,
}

/// Per-station means on weekdays against weekends
#[derive(Debug, Serialize)]
pub struct WeekSplitFigure {
    pub weekday: Vec<FigurePoint>,
    pub weekend: Vec<FigurePoint>,
}

/// Every sampled station and segment, the all-routes overview. Stations
/// and segments without a usable delay reading have no colour and are
/// left off
#[derive(Debug, Serialize)]
pub struct NetworkFigure {
    pub stations: Vec<FigurePoint>,
    pub segments: Vec<FigureSegment>,
}

/// Draw one path. Fails like aggregation does, a path over an unknown
/// segment or without any usable delays makes no figure
pub fn route_figure(
    network: &RouteNetwork,
    label: &str,
    path: &Path,
) -> Result<RouteFigure, ReliabilityError> {
    let stats = reliability::aggregate(network, path)?;
    let mut segments = Vec::with_capacity(path.len());
    for &segment_id in path.segments() {
        let segment = network
            .get_segment(segment_id)
            .ok_or(ReliabilityError::UnknownSegment(segment_id))?;
        // segments without a usable delay count towards the stats but have
        // no colour to draw
        if let Some(mean_delay) = segment.mean_delay() {
            segments.push(FigureSegment {
                segment_id,
                stations: segment.stations().copied().collect(),
                mean_delay,
                punctuality: mean_delay.punctuality(),
            });
        }
    }
    let stations = station_points(network, network.stations_on_path(path));
    Ok(RouteFigure {
        label: label.to_owned(),
        stats,
        segments,
        stations,
    })
}

/// Pick the most reliable candidate and put it next to the stations of the
/// fastest connection
pub fn comparison_figure(
    network: &RouteNetwork,
    candidates: &CandidateRoutes,
    fastest_stations: &[StationId],
) -> Result<ComparisonFigure, ReliabilityError> {
    let Selection {
        label, rejected, ..
    } = reliability::select_best(network, candidates)?;
    let path = candidates
        .get(&label)
        .ok_or(ReliabilityError::NoCandidate)?;
    let reliable = route_figure(network, &label, path)?;
    let fastest = station_points(
        network,
        fastest_stations
            .iter()
            .filter_map(|&station_id| network.get_station(station_id)),
    );
    let fastest_mean_delay = delay::mean(fastest.iter().map(|point| point.mean_delay));
    Ok(ComparisonFigure {
        reliable,
        fastest,
        fastest_mean_delay,
        rejected,
    })
}

/// Weekday and weekend markers for the stations both the split and the
/// network know
pub fn week_split_figure(network: &RouteNetwork, split: &DaySplit) -> WeekSplitFigure {
    WeekSplitFigure {
        weekday: split_points(network, split.weekday()),
        weekend: split_points(network, split.weekend()),
    }
}

pub fn network_figure(network: &RouteNetwork) -> NetworkFigure {
    let segments = network
        .segments()
        .filter_map(|segment| {
            let mean_delay = segment.mean_delay()?;
            Some(FigureSegment {
                segment_id: segment.segment_id,
                stations: segment.stations().copied().collect(),
                mean_delay,
                punctuality: mean_delay.punctuality(),
            })
        })
        .collect();
    NetworkFigure {
        stations: station_points(network, network.stations()),
        segments,
    }
}

pub fn to_json<T: Serialize>(figure: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(figure)
}

fn station_points<'r>(
    network: &RouteNetwork,
    stations: impl IntoIterator<Item = &'r Station>,
) -> Vec<FigurePoint> {
    stations
        .into_iter()
        .filter_map(|station| {
            let mean_delay = network.station_mean_delay(station.station_id)?;
            Some(FigurePoint {
                station_id: station.station_id,
                name: station.name.clone(),
                location: station.location,
                mean_delay,
                punctuality: mean_delay.punctuality(),
            })
        })
        .collect()
}

fn split_points(
    network: &RouteNetwork,
    means: impl Iterator<Item = (StationId, Delay)>,
) -> Vec<FigurePoint> {
    means
        .filter_map(|(station_id, mean_delay)| {
            let station = network.get_station(station_id)?;
            Some(FigurePoint {
                station_id,
                name: station.name.clone(),
                location: station.location,
                mean_delay,
                punctuality: mean_delay.punctuality(),
            })
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::NaiveDate;
    use delay_graph::daily::StationSample;

    fn sample_network() -> RouteNetwork {
        let mut builder = RouteNetwork::builder();
        builder.add_station(
            80290288,
            Some("Stuttgart Hbf".to_string()),
            geo::Point::new(9.182, 48.784),
        );
        builder.add_station(
            80140137,
            Some("Mannheim Hbf".to_string()),
            geo::Point::new(8.469, 49.479),
        );
        builder.add_station(
            80107995,
            Some("Frankfurt(Main)Hbf".to_string()),
            geo::Point::new(8.663, 50.107),
        );
        builder.add_sample(4082, Some(80290288), Some(Delay::minutes(2.0)));
        builder.add_sample(4082, Some(80140137), Some(Delay::minutes(4.0)));
        builder.add_sample(3520, Some(80140137), Some(Delay::minutes(8.0)));
        builder.add_sample(3520, Some(80107995), Some(Delay::minutes(12.0)));
        builder.build()
    }

    #[test]
    fn route_figure_covers_segments_and_stations() {
        let network = sample_network();
        let path: Path = "4082->3520".parse().unwrap();

        let figure = route_figure(&network, "via mannheim", &path).unwrap();

        assert_eq!(figure.label, "via mannheim");
        assert_eq!(figure.stats.mean_delay, Delay::minutes(6.5));
        assert_eq!(figure.segments.len(), 2);
        assert_eq!(figure.segments[0].punctuality, Punctuality::OnTime);
        assert_eq!(figure.segments[1].punctuality, Punctuality::Delayed);
        let ids: Vec<StationId> = figure.stations.iter().map(|p| p.station_id).collect();
        assert_eq!(ids, vec![80290288, 80140137, 80107995]);
        // mannheim is sampled on both segments
        assert_eq!(figure.stations[1].mean_delay, Delay::minutes(6.0));
    }

    #[test]
    fn unsampled_segments_are_left_off_the_figure() {
        let mut builder = RouteNetwork::builder();
        builder.add_sample(4082, None, Some(Delay::minutes(2.0)));
        builder.add_sample(9999, None, None);
        let network = builder.build();
        let path: Path = "4082->9999".parse().unwrap();

        let figure = route_figure(&network, "sparse", &path).unwrap();

        assert_eq!(figure.stats.segment_count, 2);
        assert_eq!(figure.stats.sampled_segments, 1);
        assert_eq!(figure.segments.len(), 1);
        assert_eq!(figure.segments[0].segment_id, 4082);
    }

    #[test]
    fn route_figure_fails_over_unknown_segments() {
        let network = sample_network();
        let path: Path = "4082->77".parse().unwrap();

        match route_figure(&network, "broken", &path) {
            Err(ReliabilityError::UnknownSegment(77)) => {}
            other => panic!("expected UnknownSegment, got {:?}", other),
        }
    }

    #[test]
    fn comparison_shows_winner_fastest_stations_and_rejects() {
        let network = sample_network();
        let mut candidates = CandidateRoutes::new();
        candidates.insert("via mannheim".to_string(), "4082->3520".parse().unwrap());
        candidates.insert("ghost".to_string(), "9->8".parse().unwrap());

        // 70003 is not in the network and is left off the fastest side
        let figure =
            comparison_figure(&network, &candidates, &[80290288, 80107995, 70003]).unwrap();

        assert_eq!(figure.reliable.label, "via mannheim");
        let fastest_ids: Vec<StationId> = figure.fastest.iter().map(|p| p.station_id).collect();
        assert_eq!(fastest_ids, vec![80290288, 80107995]);
        assert_eq!(figure.fastest_mean_delay, Some(Delay::minutes(7.0)));
        assert_eq!(
            figure.rejected,
            vec![("ghost".to_string(), ReliabilityError::UnknownSegment(9))]
        );
    }

    #[test]
    fn fastest_side_averages_station_means() {
        let network = sample_network();
        let mut candidates = CandidateRoutes::new();
        candidates.insert("direct".to_string(), "4082".parse().unwrap());

        // mannheim's two readings average to 6.0 before the side-wide
        // mean, a flat mean over the three raw readings would give 14/3
        let figure = comparison_figure(&network, &candidates, &[80290288, 80140137]).unwrap();

        assert_eq!(figure.fastest_mean_delay, Some(Delay::minutes(4.0)));
    }

    #[test]
    fn week_split_markers_come_from_the_split_not_the_network() {
        let network = sample_network();
        let saturday = NaiveDate::from_ymd_opt(2016, 11, 5).unwrap();
        let monday = NaiveDate::from_ymd_opt(2016, 11, 7).unwrap();
        let samples = vec![
            StationSample {
                station_id: 80290288,
                date: monday,
                delay: Delay::minutes(1.5),
            },
            StationSample {
                station_id: 80290288,
                date: saturday,
                delay: Delay::minutes(0.5),
            },
            // 12345 was never loaded into the network
            StationSample {
                station_id: 12345,
                date: monday,
                delay: Delay::minutes(9.0),
            },
            StationSample {
                station_id: 12345,
                date: saturday,
                delay: Delay::minutes(9.0),
            },
        ];
        let split = DaySplit::of(&samples);
        assert_eq!(split.len(), 2);

        let figure = week_split_figure(&network, &split);

        assert_eq!(figure.weekday.len(), 1);
        assert_eq!(figure.weekend.len(), 1);
        assert_eq!(figure.weekday[0].station_id, 80290288);
        assert_eq!(figure.weekday[0].mean_delay, Delay::minutes(1.5));
        assert_eq!(figure.weekend[0].mean_delay, Delay::minutes(0.5));
        assert_eq!(figure.weekday[0].name.as_deref(), Some("Stuttgart Hbf"));
    }

    #[test]
    fn network_figure_covers_the_sampled_network() {
        let network = sample_network();

        let figure = network_figure(&network);

        assert_eq!(figure.stations.len(), 3);
        assert_eq!(figure.segments.len(), 2);
        // ids ascend
        assert_eq!(figure.segments[0].segment_id, 3520);
        assert_eq!(figure.segments[1].segment_id, 4082);
    }

    #[test]
    fn stations_without_a_mean_are_left_off_the_overview() {
        let mut builder = RouteNetwork::builder();
        builder.add_station(
            80290288,
            Some("Stuttgart Hbf".to_string()),
            geo::Point::new(9.182, 48.784),
        );
        // karlsruhe never got a usable reading, there is no mean to colour
        builder.add_station(
            80142281,
            Some("Karlsruhe Hbf".to_string()),
            geo::Point::new(8.402, 48.993),
        );
        builder.add_sample(4082, Some(80290288), Some(Delay::minutes(2.0)));
        builder.add_sample(4020, Some(80142281), None);
        let network = builder.build();

        let figure = network_figure(&network);

        assert_eq!(figure.stations.len(), 1);
        assert_eq!(figure.stations[0].station_id, 80290288);
        assert_eq!(figure.segments.len(), 1);
        assert_eq!(figure.segments[0].segment_id, 4082);
    }

    #[test]
    fn figures_serialize_to_json() {
        let network = sample_network();

        let json: serde_json::Value =
            serde_json::from_str(&to_json(&network_figure(&network)).unwrap()).unwrap();

        assert_eq!(json["stations"][0]["station_id"], 80107995);
        assert_eq!(json["stations"][0]["name"], "Frankfurt(Main)Hbf");
        assert_eq!(json["stations"][0]["punctuality"], "Delayed");
        assert_eq!(json["segments"][1]["mean_delay"], 3.0);
    }
}
