use std::collections::HashMap;

use pathfinding::prelude::dijkstra;
use serde::Serialize;

use crate::error::AppError;
use crate::models::poi::PoiEdge;
use crate::models::PoiId;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PathResult {
    pub travel_time_s: u64,
    pub poi_ids: Vec<PoiId>,
}

/// Directed travel-time graph between POIs.
///
/// Edge weights are `u32` seconds; path sums are carried as `u64`.
///
/// Built once from the edge table and replaced wholesale whenever an edge changes,
/// so queries never observe a half-edited graph.
#[derive(Debug, Clone, Default)]
pub struct PoiGraph {
    adjacency: HashMap<PoiId, Vec<(PoiId, u64)>>,
}

impl PoiGraph {
    pub fn from_edges<'a>(edges: impl IntoIterator<Item = &'a PoiEdge>) -> Self {
        let mut adjacency: HashMap<PoiId, Vec<(PoiId, u64)>> = HashMap::new();
        for edge in edges {
            adjacency
                .entry(edge.from_poi)
                .or_default()
                .push((edge.to_poi, u64::from(edge.travel_time_s)));
        }

        Self { adjacency }
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(Vec::len).sum()
    }

    pub fn shortest_path(&self, from: PoiId, to: PoiId) -> Result<PathResult, AppError> {
        if from == to {
            return Ok(PathResult {
                travel_time_s: 0,
                poi_ids: vec![from],
            });
        }

        let (poi_ids, travel_time_s) = dijkstra(
            &from,
            |poi| {
                self.adjacency
                    .get(poi)
                    .map(|neighbors| neighbors.as_slice())
                    .unwrap_or(&[])
                    .iter()
                    .copied()
            },
            |poi| *poi == to,
        )
        .ok_or(AppError::UnreachablePoi { from, to })?;

        Ok(PathResult {
            travel_time_s,
            poi_ids,
        })
    }

    pub fn travel_time(&self, from: PoiId, to: PoiId) -> Result<u64, AppError> {
        self.shortest_path(from, to).map(|path| path.travel_time_s)
    }
}
