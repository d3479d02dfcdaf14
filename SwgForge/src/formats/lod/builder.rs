//! Distance-band construction for new LOD containers

use std::collections::BTreeMap;

use super::{LodFile, LodLevel};
use crate::formats::common::Appearance;

/// Children waiting to be turned into distance bands.
#[derive(Debug, Clone, Default)]
pub struct LodBuilder {
    name: String,
    children: Vec<(String, Option<f32>)>,
}

/// Result of [`LodBuilder::build`].
#[derive(Debug, Clone, PartialEq)]
pub struct LodPlan {
    pub lod: LodFile,
    /// `(child name, mesh reference)` in band order, so the caller knows
    /// where to write each child mesh.
    pub outputs: Vec<(String, String)>,
}

impl LodBuilder {
    /// `name` is the LOD's base name (file stem).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Add a child mesh switching in at `distance`.
    #[must_use]
    pub fn child(mut self, name: impl Into<String>, distance: Option<f32>) -> Self {
        self.children.push((name.into(), distance));
        self
    }

    /// Sort children by distance; band `i` runs from the previous child's
    /// distance to this one and references `mesh/<name>_l<i>.msh`.
    ///
    /// Children without a distance are skipped.
    pub fn build(self, appearance: Appearance) -> LodPlan {
        let mut placed: Vec<(String, f32)> = Vec::with_capacity(self.children.len());
        for (child, distance) in self.children {
            match distance {
                Some(d) => placed.push((child, d)),
                None => tracing::warn!("LOD child {child} has no distance, skipped"),
            }
        }
        placed.sort_by(|a, b| a.1.total_cmp(&b.1));

        let mut lods = BTreeMap::new();
        let mut outputs = Vec::with_capacity(placed.len());
        let mut last = 0.0;
        for (i, (child, distance)) in placed.into_iter().enumerate() {
            let reference = format!("mesh/{}_l{i}.msh", self.name);
            tracing::debug!("LOD band {i}: {child} {last} - {distance} as {reference}");
            lods.insert(
                i as i32,
                LodLevel {
                    near: last,
                    far: distance,
                    reference: reference.clone(),
                },
            );
            outputs.push((child, reference));
            last = distance;
        }

        LodPlan {
            lod: LodFile {
                appearance,
                lods,
                ..LodFile::default()
            },
            outputs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_bands_sorted_and_contiguous() {
        let plan = LodBuilder::new("hut")
            .child("far", Some(128.0))
            .child("near", Some(16.0))
            .child("mid", Some(48.0))
            .build(Appearance::default());

        let bands: Vec<(f32, f32, &str)> = plan
            .lod
            .lods
            .values()
            .map(|l| (l.near, l.far, l.reference.as_str()))
            .collect();
        assert_eq!(
            bands,
            vec![
                (0.0, 16.0, "mesh/hut_l0.msh"),
                (16.0, 48.0, "mesh/hut_l1.msh"),
                (48.0, 128.0, "mesh/hut_l2.msh"),
            ]
        );
        assert_eq!(plan.outputs[0], ("near".to_string(), "mesh/hut_l0.msh".to_string()));
    }

    #[test]
    fn test_child_without_distance_skipped() {
        let plan = LodBuilder::new("hut")
            .child("a", Some(10.0))
            .child("b", None)
            .build(Appearance::default());
        assert_eq!(plan.lod.lods.len(), 1);
        assert_eq!(plan.outputs.len(), 1);
    }
}
