use std::fmt;
use std::path::{Path, PathBuf};

use delay_graph::daily::StationSample;
use delay_graph::network::{CandidateRoutes, RouteNetwork};
use delay_graph::reliability;

use crate::records::{CandidatePathRecord, DatedStationRecord, StationSegmentRecord};

/// Directory of cleaned csv tables as written by the data preparation
pub struct TableSource {
    dir_path: PathBuf,
}

impl TableSource {
    pub fn new(dir_path: &Path) -> TableSource {
        TableSource {
            dir_path: dir_path.to_owned(),
        }
    }

    fn open_csv(
        &self,
        filename: &str,
        delimiter: u8,
    ) -> Result<csv::Reader<std::fs::File>, csv::Error> {
        let path = self.dir_path.join(filename);
        log::debug!("opening {}", path.display());
        csv::ReaderBuilder::new().delimiter(delimiter).from_path(path)
    }

    /// Read the station observations and build the route network from them
    pub fn network(&self) -> Result<RouteNetwork, LoadError> {
        let rdr = self
            .open_csv("gdf_stations.csv", b',')
            .map_err(|e| classify("gdf_stations.csv", e))?;
        read_network(rdr)
    }

    /// Read the recorded candidate paths, keeping their file order.
    /// Recorded totals are checked against the network but never trusted
    pub fn candidate_routes(&self, network: &RouteNetwork) -> Result<CandidateRoutes, LoadError> {
        let rdr = self
            .open_csv("path_delays.csv", b',')
            .map_err(|e| classify("path_delays.csv", e))?;
        read_candidate_routes(rdr, network)
    }

    /// Read the day-stamped station observations used for the weekday /
    /// weekend split
    pub fn daily_samples(&self) -> Result<Vec<StationSample>, LoadError> {
        let rdr = self
            .open_csv("data.csv", b';')
            .map_err(|e| classify("data.csv", e))?;
        read_daily_samples(rdr)
    }
}

fn read_network<R: std::io::Read>(mut rdr: csv::Reader<R>) -> Result<RouteNetwork, LoadError> {
    let mut builder = RouteNetwork::builder();
    let mut rows = 0u64;
    for result in rdr.deserialize() {
        let record: StationSegmentRecord = result.map_err(|e| classify("gdf_stations.csv", e))?;
        let station_id = record.station_id.into_inner();
        builder.add_station(
            station_id,
            record.name,
            geo::Point::new(record.longitude, record.latitude),
        );
        builder.add_sample(
            record.segment_id.into_inner(),
            Some(station_id),
            record.minutes_of_delay,
        );
        rows += 1;
    }
    let network = builder.build();
    log::info!(
        "{} stations on {} segments from {} rows, {} rows without a usable delay",
        network.station_count(),
        network.segment_count(),
        rows,
        network.skipped_samples()
    );
    Ok(network)
}

fn read_candidate_routes<R: std::io::Read>(
    mut rdr: csv::Reader<R>,
    network: &RouteNetwork,
) -> Result<CandidateRoutes, LoadError> {
    let mut routes = CandidateRoutes::new();
    for (index, result) in rdr.deserialize().enumerate() {
        let record: CandidatePathRecord = result.map_err(|e| classify("path_delays.csv", e))?;
        let label = record
            .label
            .unwrap_or_else(|| format!("path {}", index));
        if let Some(recorded) = record.total_delay {
            match reliability::aggregate(network, &record.path) {
                Ok(stats) => {
                    if (recorded.to_mins() - stats.mean_delay.to_mins()).abs() > 1e-6 {
                        log::debug!(
                            "recorded delay of {} is {} but the network gives {}",
                            label,
                            recorded,
                            stats.mean_delay
                        );
                    }
                }
                Err(err) => {
                    log::warn!("candidate {} cannot be assessed against the network: {}", label, err)
                }
            }
        }
        routes.insert(label, record.path);
    }
    log::info!("{} candidate routes", routes.len());
    Ok(routes)
}

fn read_daily_samples<R: std::io::Read>(
    mut rdr: csv::Reader<R>,
) -> Result<Vec<StationSample>, LoadError> {
    let mut samples = Vec::new();
    let mut unusable = 0u64;
    for result in rdr.deserialize() {
        let record: DatedStationRecord = result.map_err(|e| classify("data.csv", e))?;
        match record.minutes_of_delay {
            Some(delay) => samples.push(StationSample {
                station_id: record.station_id.into_inner(),
                date: record.date,
                delay,
            }),
            None => unusable += 1,
        }
    }
    if unusable > 0 {
        log::info!("{} day-stamped rows without a usable delay", unusable);
    }
    Ok(samples)
}

fn classify(table: &'static str, err: csv::Error) -> LoadError {
    match err.kind() {
        csv::ErrorKind::Deserialize { .. } => LoadError::MalformedRecord { table, source: err },
        _ => LoadError::Table { table, source: err },
    }
}

#[derive(Debug)]
pub enum LoadError {
    /// A row of the named table holds a value which cannot be understood
    MalformedRecord {
        table: &'static str,
        source: csv::Error,
    },
    /// The named table could not be read at all
    Table {
        table: &'static str,
        source: csv::Error,
    },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::MalformedRecord { table, source } => {
                write!(f, "malformed record in {}: {}", table, source)
            }
            LoadError::Table { table, source } => write!(f, "failed reading {}: {}", table, source),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::MalformedRecord { source, .. } | LoadError::Table { source, .. } => {
                Some(source)
            }
        }
    }
}
