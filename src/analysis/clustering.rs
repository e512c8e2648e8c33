use crate::data::TSDataset;
use crate::error::{FoldcastError, Result};
use crate::types::TARGET_COLUMN;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Rule for the distance between a merged cluster and the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Linkage {
    Ward,
    Single,
    Average,
    Complete,
}

impl FromStr for Linkage {
    type Err = FoldcastError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ward" => Ok(Linkage::Ward),
            "single" => Ok(Linkage::Single),
            "average" => Ok(Linkage::Average),
            "complete" | "maximum" => Ok(Linkage::Complete),
            other => Err(FoldcastError::Configuration(format!(
                "Unknown linkage {}, expected one of ward, single, average, complete, maximum",
                other
            ))),
        }
    }
}

/// Agglomerative clustering of segments by Euclidean distance between
/// their target series.
#[derive(Debug, Clone)]
pub struct HierarchicalClustering {
    pub n_clusters: usize,
    pub linkage: Linkage,
}

impl HierarchicalClustering {
    pub fn new(n_clusters: usize, linkage: Linkage) -> Self {
        Self { n_clusters, linkage }
    }

    /// Cluster label per segment.
    pub fn fit_predict(&self, ts: &TSDataset) -> Result<BTreeMap<String, usize>> {
        let series = ts
            .segments()
            .iter()
            .map(|segment| ts.segment_values(segment, TARGET_COLUMN))
            .collect::<Result<Vec<_>>>()?;
        let labels = self.cluster(&series)?;
        Ok(ts.segments().iter().cloned().zip(labels).collect())
    }

    /// Labels for equally long series; missing values are skipped pairwise.
    /// Clusters are numbered by their first member.
    pub fn cluster(&self, series: &[Vec<Option<f64>>]) -> Result<Vec<usize>> {
        let n = series.len();
        if self.n_clusters == 0 || self.n_clusters > n {
            return Err(FoldcastError::Configuration(format!(
                "Cannot build {} clusters from {} series",
                self.n_clusters, n
            )));
        }

        let mut dist = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in (i + 1)..n {
                let d = euclidean(&series[i], &series[j]);
                dist[i][j] = d;
                dist[j][i] = d;
            }
        }

        let mut members: Vec<Option<Vec<usize>>> = (0..n).map(|i| Some(vec![i])).collect();
        let mut active = n;
        while active > self.n_clusters {
            let mut closest: Option<(usize, usize, f64)> = None;
            for i in 0..n {
                if members[i].is_none() {
                    continue;
                }
                for j in (i + 1)..n {
                    if members[j].is_some() && closest.map_or(true, |(_, _, d)| dist[i][j] < d) {
                        closest = Some((i, j, dist[i][j]));
                    }
                }
            }
            let Some((i, j, d_ij)) = closest else { break };

            let size_i = members[i].as_ref().map_or(0, Vec::len) as f64;
            let size_j = members[j].as_ref().map_or(0, Vec::len) as f64;
            for m in 0..n {
                let Some(other) = members[m].as_ref() else { continue };
                if m == i || m == j {
                    continue;
                }
                let size_m = other.len() as f64;
                let (d_im, d_jm) = (dist[i][m], dist[j][m]);
                let merged = match self.linkage {
                    Linkage::Single => d_im.min(d_jm),
                    Linkage::Complete => d_im.max(d_jm),
                    Linkage::Average => (size_i * d_im + size_j * d_jm) / (size_i + size_j),
                    Linkage::Ward => (((size_i + size_m) * d_im * d_im + (size_j + size_m) * d_jm * d_jm
                        - size_m * d_ij * d_ij)
                        / (size_i + size_j + size_m))
                        .max(0.0)
                        .sqrt(),
                };
                dist[i][m] = merged;
                dist[m][i] = merged;
            }

            if let Some(absorbed) = members[j].take() {
                if let Some(cluster) = members[i].as_mut() {
                    cluster.extend(absorbed);
                }
            }
            active -= 1;
        }

        let mut labels = vec![0; n];
        // slots keep their smallest member at the lowest index, so slot order is first-member order
        for (label, cluster) in members.iter().flatten().enumerate() {
            for &member in cluster {
                labels[member] = label;
            }
        }
        Ok(labels)
    }
}

fn euclidean(a: &[Option<f64>], b: &[Option<f64>]) -> f64 {
    a.iter()
        .zip(b)
        .filter_map(|(x, y)| Some((x.as_ref()? - y.as_ref()?).powi(2)))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series() -> Vec<Vec<Option<f64>>> {
        vec![
            vec![Some(0.0), Some(0.0), Some(0.0)],
            vec![Some(10.0), Some(10.0), Some(10.0)],
            vec![Some(0.5), None, Some(0.5)],
            vec![Some(10.5), Some(10.0), Some(9.5)],
        ]
    }

    #[test]
    fn test_two_groups_for_every_linkage() {
        for linkage in [Linkage::Ward, Linkage::Single, Linkage::Average, Linkage::Complete] {
            let labels = HierarchicalClustering::new(2, linkage).cluster(&series()).unwrap();
            assert_eq!(labels, vec![0, 1, 0, 1], "linkage {:?}", linkage);
        }
    }

    #[test]
    fn test_cluster_count_bounds() {
        let clustering = HierarchicalClustering::new(5, Linkage::Average);
        assert!(clustering.cluster(&series()).is_err());

        let singletons = HierarchicalClustering::new(4, Linkage::Average).cluster(&series()).unwrap();
        assert_eq!(singletons, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_linkage_names() {
        assert_eq!("maximum".parse::<Linkage>().unwrap(), Linkage::Complete);
        assert!("median".parse::<Linkage>().is_err());
    }
}
