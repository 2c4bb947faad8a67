//! Emergency generation: severity bands, sampling, and re-sampling an existing set.

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::graph::NodeId;

/// Ambulance type / urgency level. Determines both the required-speed band and the cost
/// row looked up in the cost table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Lowest urgency band.
    Leve,
    /// Middle urgency band.
    Media,
    /// Highest urgency band.
    Grave,
}

impl Severity {
    /// All severities, lowest band first.
    pub const ALL: [Severity; 3] = [Severity::Leve, Severity::Media, Severity::Grave];
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Leve => "leve",
            Severity::Media => "media",
            Severity::Grave => "grave",
        };
        write!(f, "{s}")
    }
}

/// A required-speed interval `[lo, hi]`, in km/h.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedBand {
    /// Lower bound, inclusive.
    pub lo: f64,
    /// Upper bound, inclusive.
    pub hi: f64,
}

impl SpeedBand {
    fn sample(&self, rng: &mut StdRng) -> f64 {
        if self.lo >= self.hi {
            self.lo
        } else {
            rng.gen_range(self.lo..self.hi)
        }
    }
}

/// `[R_min, R_max]` trisected into the three severity bands, lowest band first.
#[derive(Debug, Clone, Copy)]
pub struct SeverityBands {
    /// Band for [`Severity::Leve`].
    pub leve: SpeedBand,
    /// Band for [`Severity::Media`].
    pub media: SpeedBand,
    /// Band for [`Severity::Grave`].
    pub grave: SpeedBand,
}

impl SeverityBands {
    /// Split `[r_min, r_max]` into three equal thirds.
    pub fn build(r_min: f64, r_max: f64) -> Result<Self> {
        if r_min <= 0.0 || r_max <= 0.0 || r_min >= r_max {
            return Err(Error::InvalidRange(format!(
                "required-speed range must satisfy 0 < R_min < R_max, got [{r_min}, {r_max}]"
            )));
        }
        let third = (r_max - r_min) / 3.0;
        let a = r_min;
        let b = r_min + third;
        let c = r_min + 2.0 * third;
        let d = r_max;
        Ok(SeverityBands {
            leve: SpeedBand { lo: a, hi: b },
            media: SpeedBand { lo: b, hi: c },
            grave: SpeedBand { lo: c, hi: d },
        })
    }

    /// The band for a given severity.
    pub fn of(&self, severity: Severity) -> SpeedBand {
        match severity {
            Severity::Leve => self.leve,
            Severity::Media => self.media,
            Severity::Grave => self.grave,
        }
    }
}

/// A single declared emergency. `destination_node`/`destination_lat`/`destination_lon`
/// are populated by [`crate::graph::prepare::bind_emergencies`] after generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Emergency {
    /// 1-based, unique within a scenario.
    pub id: u32,
    /// Ambulance type required.
    pub severity: Severity,
    /// Speed (km/h) this emergency's route must be able to sustain; charged against
    /// every edge's capacity.
    pub required_speed_kmh: f64,
    /// Destination node, once bound to the graph.
    pub destination_node: Option<NodeId>,
    /// Latitude of the destination node, once bound.
    pub destination_lat: Option<f64>,
    /// Longitude of the destination node, once bound.
    pub destination_lon: Option<f64>,
}

/// Produce `n` emergencies with ids `1..=n`, each drawing a severity uniformly at random
/// and a required speed uniformly within that severity's band.
pub fn generate_set(n: u32, r_min: f64, r_max: f64, seed: u64) -> Result<Vec<Emergency>> {
    let bands = SeverityBands::build(r_min, r_max)?;
    let mut rng = StdRng::seed_from_u64(seed);
    Ok((1..=n)
        .map(|id| sample_emergency(id, &bands, &mut rng))
        .collect())
}

fn sample_emergency(id: u32, bands: &SeverityBands, rng: &mut StdRng) -> Emergency {
    let severity = Severity::ALL[rng.gen_range(0..3)];
    let required_speed_kmh = bands.of(severity).sample(rng);
    Emergency {
        id,
        severity,
        required_speed_kmh,
        destination_node: None,
        destination_lat: None,
        destination_lon: None,
    }
}

/// On-disk record for one emergency, used by the persisted emergency-set artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyRecord {
    /// Identifier, matching [`Emergency::id`].
    pub id: u32,
    /// Ambulance type required.
    pub severity: Severity,
    /// Required speed, km/h.
    pub required_speed_kmh: f64,
    /// Bound destination node id, if any.
    pub destination_node: Option<u32>,
    /// Latitude of the destination, if bound.
    pub destination_lat: Option<f64>,
    /// Longitude of the destination, if bound.
    pub destination_lon: Option<f64>,
}

impl EmergencyRecord {
    /// Flatten an [`Emergency`] into its on-disk form.
    pub fn from_emergency(e: &Emergency) -> Self {
        EmergencyRecord {
            id: e.id,
            severity: e.severity,
            required_speed_kmh: e.required_speed_kmh,
            destination_node: e.destination_node.map(|n| n.index() as u32),
            destination_lat: e.destination_lat,
            destination_lon: e.destination_lon,
        }
    }

    /// Rebuild an [`Emergency`] from its on-disk form.
    pub fn to_emergency(&self) -> Emergency {
        Emergency {
            id: self.id,
            severity: self.severity,
            required_speed_kmh: self.required_speed_kmh,
            destination_node: self
                .destination_node
                .map(|id| crate::graph::NodeId::new(id as usize)),
            destination_lat: self.destination_lat,
            destination_lon: self.destination_lon,
        }
    }
}

/// Recompute severity bands from a new `(r_min, r_max)` and resample only the required
/// speed of each emergency, within its *existing* severity's new band. Severity, id, and
/// destination are left untouched.
pub fn resample_speeds(
    emergencies: &mut [Emergency],
    r_min: f64,
    r_max: f64,
    seed: u64,
) -> Result<()> {
    let bands = SeverityBands::build(r_min, r_max)?;
    let mut rng = StdRng::seed_from_u64(seed);
    for emergency in emergencies.iter_mut() {
        emergency.required_speed_kmh = bands.of(emergency.severity).sample(&mut rng);
    }
    Ok(())
}
