use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::delay::{self, Delay};

/// IBNR code of a station, eg. 8000096 for Stuttgart Hbf
pub type StationId = u64;
/// Number of a line section ("Strecke") between stations
pub type SegmentId = u32;
/// Name a candidate route is referred to by in reports
pub type RouteLabel = String;

/// A station with its position, as far as the source data knows it
#[derive(Clone, Serialize, Deserialize)]
pub struct Station {
    pub station_id: StationId,
    pub name: Option<String>,
    pub location: geo::Point<f64>,
}

impl fmt::Debug for Station {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} [{}]", name, self.station_id),
            None => write!(f, "[{}]", self.station_id),
        }
    }
}

impl PartialEq for Station {
    fn eq(&self, rhs: &Self) -> bool {
        self.station_id == rhs.station_id
    }
}

impl Eq for Station {}

impl PartialOrd for Station {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Station {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.station_id.cmp(&other.station_id)
    }
}

/// One delay observation attributed to a segment. Kept raw rather than
/// pre-averaged so means can be recomputed over any filtering
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentSample {
    /// Station the reading was taken at, when the record named one
    pub station: Option<StationId>,
    pub delay: Delay,
}

/// A section of line, its member stations and its delay observations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub segment_id: SegmentId,
    stations: Vec<StationId>,
    samples: Vec<SegmentSample>,
}

impl Segment {
    fn new(segment_id: SegmentId) -> Segment {
        Segment {
            segment_id,
            stations: Vec::new(),
            samples: Vec::new(),
        }
    }

    /// Stations observed on this segment, in the order they were first seen
    pub fn stations(&self) -> impl Iterator<Item = &StationId> {
        self.stations.iter()
    }

    /// First and last member station, once at least two are known
    pub fn endpoints(&self) -> Option<(StationId, StationId)> {
        if let &[first, .., last] = self.stations.as_slice() {
            Some((first, last))
        } else {
            None
        }
    }

    pub fn samples(&self) -> impl Iterator<Item = &SegmentSample> {
        self.samples.iter()
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Mean of the delays observed on this segment, `None` until a usable
    /// sample has been recorded
    pub fn mean_delay(&self) -> Option<Delay> {
        delay::mean(self.samples.iter().map(|sample| sample.delay))
    }
}

/// Parsed and indexed delay observations of a rail network
/// * stations and segments are looked up by their source-data ids
/// * every mean is recomputed from raw samples on demand
/// * iteration order follows the ids, so repeated runs over the same data
///   give identical output
#[derive(Serialize, Deserialize)]
pub struct RouteNetwork {
    pub(crate) stations: BTreeMap<StationId, Station>,
    pub(crate) segments: BTreeMap<SegmentId, Segment>,
    pub(crate) skipped_samples: u64,
}

impl RouteNetwork {
    pub fn builder() -> Builder {
        Builder {
            network: Self {
                stations: BTreeMap::new(),
                segments: BTreeMap::new(),
                skipped_samples: 0,
            },
        }
    }

    pub fn get_station(&self, id: StationId) -> Option<&Station> {
        self.stations.get(&id)
    }

    pub fn get_segment(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.get(&id)
    }

    pub fn stations(&self) -> impl Iterator<Item = &Station> {
        self.stations.values()
    }

    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.values()
    }

    pub fn station_count(&self) -> usize {
        self.stations.len()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Observations dropped during the build because no delay could be
    /// read from them
    pub fn skipped_samples(&self) -> u64 {
        self.skipped_samples
    }

    /// Mean of all delays observed at one station, across every segment
    /// it lies on
    pub fn station_mean_delay(&self, station_id: StationId) -> Option<Delay> {
        delay::mean(
            self.segments
                .values()
                .flat_map(|segment| segment.samples.iter())
                .filter(|sample| sample.station == Some(station_id))
                .map(|sample| sample.delay),
        )
    }

    /// Stations recorded on any segment of the path, each appearing once,
    /// in the order the segments name them
    pub fn stations_on_path(&self, path: &Path) -> Vec<&Station> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        for &segment_id in path.segments() {
            if let Some(segment) = self.segments.get(&segment_id) {
                for &station_id in segment.stations() {
                    if seen.insert(station_id) {
                        if let Some(station) = self.stations.get(&station_id) {
                            found.push(station);
                        }
                    }
                }
            }
        }
        found
    }
}

pub struct Builder {
    network: RouteNetwork,
}

impl Builder {
    pub fn add_station(
        &mut self,
        station_id: StationId,
        name: Option<String>,
        location: geo::Point<f64>,
    ) {
        self.network.stations.insert(
            station_id,
            Station {
                station_id,
                name,
                location,
            },
        );
    }

    /// Record one observation of a segment. An observation without a
    /// readable delay still marks the station as a member of the segment,
    /// but is left out of every mean and counted as skipped
    pub fn add_sample(
        &mut self,
        segment_id: SegmentId,
        station: Option<StationId>,
        delay: Option<Delay>,
    ) {
        let segment = self
            .network
            .segments
            .entry(segment_id)
            .or_insert_with(|| Segment::new(segment_id));
        if let Some(station_id) = station {
            if !segment.stations.contains(&station_id) {
                segment.stations.push(station_id);
            }
        }
        match delay {
            Some(delay) => segment.samples.push(SegmentSample { station, delay }),
            None => self.network.skipped_samples += 1,
        }
    }

    pub fn build(mut self) -> RouteNetwork {
        for segment in self.network.segments.values_mut() {
            segment.stations.shrink_to_fit();
            segment.samples.shrink_to_fit();
        }
        self.network
    }
}

/// Ordered segment ids making up one route through the network
/// # String representation
/// ```rust
/// use delay_graph::network::Path;
/// let path: Path = "6185->6107->6100".parse().unwrap();
/// assert_eq!(path.to_string(), "6185->6107->6100");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path {
    segments: Vec<SegmentId>,
}

impl Path {
    pub fn new(segments: Vec<SegmentId>) -> Path {
        Path { segments }
    }

    pub fn segments(&self) -> impl Iterator<Item = &SegmentId> {
        self.segments.iter()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl From<Vec<SegmentId>> for Path {
    fn from(segments: Vec<SegmentId>) -> Path {
        Path { segments }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment_id) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("->")?;
            }
            write!(f, "{}", segment_id)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Path {
    type Err = PathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut segments = Vec::new();
        for part in s.split("->") {
            segments.push(part.trim().parse()?);
        }
        Ok(Path { segments })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathParseError {
    InvalidSegmentId(std::num::ParseIntError),
}

impl From<std::num::ParseIntError> for PathParseError {
    fn from(err: std::num::ParseIntError) -> PathParseError {
        PathParseError::InvalidSegmentId(err)
    }
}

impl fmt::Display for PathParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathParseError::InvalidSegmentId(err) => {
                write!(f, "path should use format eg. 6185->6107: {}", err)
            }
        }
    }
}

impl std::error::Error for PathParseError {}

/// Candidate routes in the order they were recorded, keyed by label
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateRoutes {
    routes: Vec<(RouteLabel, Path)>,
}

impl CandidateRoutes {
    pub fn new() -> CandidateRoutes {
        CandidateRoutes::default()
    }

    /// Add a candidate. Re-using a label replaces that candidate's path
    /// without moving it from its original position
    pub fn insert(&mut self, label: RouteLabel, path: Path) {
        if let Some((_, existing)) = self.routes.iter_mut().find(|(l, _)| *l == label) {
            *existing = path;
        } else {
            self.routes.push((label, path));
        }
    }

    pub fn get(&self, label: &str) -> Option<&Path> {
        self.routes
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, path)| path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.routes.iter().map(|(label, path)| (label.as_str(), path))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl std::iter::FromIterator<(RouteLabel, Path)> for CandidateRoutes {
    fn from_iter<I: IntoIterator<Item = (RouteLabel, Path)>>(iter: I) -> CandidateRoutes {
        let mut routes = CandidateRoutes::new();
        for (label, path) in iter {
            routes.insert(label, path);
        }
        routes
    }
}
