//! Occlusion zones and zone combinations

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use super::SkinnedMesh;

/// A named body region that worn items can hide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcclusionZone {
    pub name: String,
    /// Position in the `OZN ` list.
    pub index: u16,
    /// Whether this mesh hides the zone when worn (`ZTO `).
    pub occluded: bool,
}

/// A set of zones whose simultaneous occlusion hides a set of triangles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneCombination {
    /// Zone indices.
    pub zones: Vec<u16>,
    /// Mesh-wide triangle indices (numbered across all shader groups).
    pub triangles: BTreeSet<usize>,
}

impl ZoneCombination {
    /// Build from a colon-joined zone name list such as `face:neck`.
    /// Unknown names are dropped with a warning.
    pub fn from_name(name: &str, zones: &[OcclusionZone]) -> Self {
        let zones = name
            .split(':')
            .filter(|part| !part.is_empty())
            .filter_map(|part| {
                let found = zones.iter().find(|z| z.name == part).map(|z| z.index);
                if found.is_none() {
                    tracing::warn!("Zone combination {name:?} names unknown zone {part:?}");
                }
                found
            })
            .collect();
        Self {
            zones,
            triangles: BTreeSet::new(),
        }
    }

    /// Colon-joined zone names.
    pub fn name(&self, zones: &[OcclusionZone]) -> String {
        self.zones
            .iter()
            .map(|&i| {
                zones
                    .iter()
                    .find(|z| z.index == i)
                    .map_or_else(|| format!("#{i}"), |z| z.name.clone())
            })
            .collect::<Vec<_>>()
            .join(":")
    }
}

impl SkinnedMesh {
    /// Zone ids covering every combination that owns at least one triangle.
    pub fn fully_occluded_zone_combination(&self) -> Vec<u16> {
        let occluded: BTreeSet<u16> = self
            .zone_combinations
            .iter()
            .filter(|c| !c.triangles.is_empty())
            .flat_map(|c| c.zones.iter().copied())
            .collect();
        occluded.into_iter().collect()
    }

    /// Map mesh-wide triangle index to combination index.
    pub(crate) fn combination_by_triangle(&self) -> HashMap<usize, usize> {
        let mut map = HashMap::new();
        for (ci, combo) in self.zone_combinations.iter().enumerate() {
            for &t in &combo.triangles {
                if let Some(previous) = map.insert(t, ci) {
                    tracing::warn!(
                        "Triangle {t} is in zone combinations {previous} and {ci}; keeping {ci}"
                    );
                }
            }
        }
        map
    }

    pub fn zone_by_name(&self, name: &str) -> Option<&OcclusionZone> {
        self.zones.iter().find(|z| z.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn zones() -> Vec<OcclusionZone> {
        ["face", "neck", "chest"]
            .iter()
            .enumerate()
            .map(|(i, n)| OcclusionZone {
                name: (*n).to_string(),
                index: i as u16,
                occluded: false,
            })
            .collect()
    }

    #[test]
    fn test_face_neck_combination() {
        let zones = zones();
        let mut combo = ZoneCombination::from_name("face:neck", &zones);
        combo.triangles.extend([0, 1]);
        let empty = ZoneCombination::from_name("chest", &zones);
        let mesh = SkinnedMesh {
            zones: zones.clone(),
            zone_combinations: vec![combo.clone(), empty],
            ..SkinnedMesh::default()
        };
        assert_eq!(mesh.fully_occluded_zone_combination(), vec![0, 1]);
        assert_eq!(combo.name(&zones), "face:neck");
    }

    #[test]
    fn test_unknown_zone_name_dropped() {
        let combo = ZoneCombination::from_name("face:elbow", &zones());
        assert_eq!(combo.zones, vec![0]);
    }
}
