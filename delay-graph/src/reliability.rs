use std::fmt;

use serde::Serialize;

use crate::delay::{self, Delay};
use crate::network::{CandidateRoutes, Path, RouteLabel, RouteNetwork, SegmentId};

/// Summary of the delay picture over one path
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PathStats {
    /// Mean of the member segments' mean delays
    pub mean_delay: Delay,
    /// Segments the path names
    pub segment_count: usize,
    /// Segments which contributed a mean
    pub sampled_segments: usize,
}

/// Mean delay along a path of segments.
///
/// Each member segment contributes its own mean exactly once, however
/// many raw samples it carries. Segments without a usable sample
/// contribute nothing; `PathStats` records how many counted. Fails on
/// the first segment the network has no record of.
pub fn aggregate(network: &RouteNetwork, path: &Path) -> Result<PathStats, ReliabilityError> {
    if path.is_empty() {
        return Err(ReliabilityError::EmptyPath);
    }
    let mut segment_means = Vec::with_capacity(path.len());
    for &segment_id in path.segments() {
        let segment = network
            .get_segment(segment_id)
            .ok_or(ReliabilityError::UnknownSegment(segment_id))?;
        if let Some(mean) = segment.mean_delay() {
            segment_means.push(mean);
        }
    }
    let sampled_segments = segment_means.len();
    match delay::mean(segment_means) {
        Some(mean_delay) => Ok(PathStats {
            mean_delay,
            segment_count: path.len(),
            sampled_segments,
        }),
        None => Err(ReliabilityError::NoSamples),
    }
}

/// The choice `select_best` made, along with the evidence for it
#[derive(Debug, Clone, Serialize)]
pub struct Selection {
    pub label: RouteLabel,
    pub stats: PathStats,
    /// Candidates which could not be aggregated, in recorded order
    pub rejected: Vec<(RouteLabel, ReliabilityError)>,
}

/// Scan every candidate and pick the one with the least mean delay.
///
/// Candidates are visited in recorded order and a later candidate only
/// takes over by being strictly better, so ties keep the earliest.
/// Candidates which fail to aggregate are listed next to the winner;
/// with no candidates, or none that aggregates, there is no winner and
/// the scan fails with `NoCandidate`.
pub fn select_best(
    network: &RouteNetwork,
    candidates: &CandidateRoutes,
) -> Result<Selection, ReliabilityError> {
    let mut best: Option<(RouteLabel, PathStats)> = None;
    let mut rejected = Vec::new();
    for (label, path) in candidates.iter() {
        match aggregate(network, path) {
            Ok(stats) => {
                let better = match &best {
                    None => true,
                    Some((_, best_stats)) => stats.mean_delay < best_stats.mean_delay,
                };
                if better {
                    best = Some((label.to_owned(), stats));
                }
            }
            Err(err) => rejected.push((label.to_owned(), err)),
        }
    }
    match best {
        Some((label, stats)) => Ok(Selection {
            label,
            stats,
            rejected,
        }),
        None => Err(ReliabilityError::NoCandidate),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ReliabilityError {
    /// The path names a segment the network has no record of
    UnknownSegment(SegmentId),
    /// The path names no segments at all
    EmptyPath,
    /// No segment of the path has a usable delay sample
    NoSamples,
    /// No candidate route could be aggregated
    NoCandidate,
}

impl fmt::Display for ReliabilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ReliabilityError::*;
        match self {
            UnknownSegment(id) => write!(f, "segment {} is not in the network", id),
            EmptyPath => write!(f, "path names no segments"),
            NoSamples => write!(f, "no segment of the path has a delay sample"),
            NoCandidate => write!(f, "no candidate route could be assessed"),
        }
    }
}

impl std::error::Error for ReliabilityError {}
