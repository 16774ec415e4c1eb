//! KMeans clustering using linfa
//!
//! Training delegates to `linfa-clustering`; inference uses linfa-nn for
//! centroid lookup. Models can be exported to and restored from JSON.

use crate::error::{MlError, MlResult};
use linfa::traits::Fit;
use linfa::DatasetBase;
use linfa_clustering::KMeans;
use linfa_nn::{distance::L2Dist, BallTree, NearestNeighbour};
use ndarray::{Array1, Array2, ArrayView1};
use rand_xoshiro::rand_core::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
use serde::{Deserialize, Serialize};

/// Predicted cluster for one feature vector
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterAssignment {
    pub cluster_id: u32,
    /// Squared Euclidean distance to each centroid
    pub scores: Vec<f32>,
}

/// Hyperparameters for fitting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KMeansTrainer {
    pub num_clusters: usize,
    pub max_iterations: u64,
    pub tolerance: f64,
    pub n_runs: usize,
    pub seed: u64,
}

impl Default for KMeansTrainer {
    fn default() -> Self {
        Self {
            num_clusters: 3,
            max_iterations: 300,
            tolerance: 1e-4,
            n_runs: 10,
            seed: 42,
        }
    }
}

impl KMeansTrainer {
    pub fn new(num_clusters: usize) -> Self {
        Self {
            num_clusters,
            ..Self::default()
        }
    }

    /// Fit centroids over an `N x D` feature matrix
    pub fn fit(&self, features: &Array2<f64>) -> MlResult<KMeansModel> {
        if self.num_clusters == 0 {
            return Err(MlError::config("num_clusters", "must be at least 1"));
        }
        if features.nrows() < self.num_clusters {
            return Err(MlError::Training(format!(
                "{} rows cannot form {} clusters",
                features.nrows(),
                self.num_clusters
            )));
        }

        let dataset = DatasetBase::from(features.clone());
        let rng = Xoshiro256Plus::seed_from_u64(self.seed);

        let fitted = KMeans::params_with_rng(self.num_clusters, rng)
            .max_n_iterations(self.max_iterations)
            .tolerance(self.tolerance)
            .n_runs(self.n_runs)
            .fit(&dataset)
            .map_err(|e| MlError::Training(e.to_string()))?;

        tracing::info!(
            rows = features.nrows(),
            dims = features.ncols(),
            clusters = self.num_clusters,
            "fitted k-means model"
        );

        Ok(KMeansModel::from_centroids(fitted.centroids().to_owned()))
    }
}

/// Fitted KMeans model
#[derive(Debug, Clone)]
pub struct KMeansModel {
    num_clusters: usize,
    centroids: Option<Array2<f64>>,
    trained: bool,
}

/// Model data for JSON serialization
#[derive(Debug, Serialize, Deserialize)]
pub struct KMeansModelData {
    pub algorithm: String,
    pub trained: bool,
    pub num_clusters: usize,
    pub centroids: Vec<Vec<f64>>,
}

impl KMeansModel {
    /// Create an untrained model with the given number of clusters
    pub fn new(num_clusters: usize) -> Self {
        Self {
            num_clusters,
            centroids: None,
            trained: false,
        }
    }

    pub fn from_centroids(centroids: Array2<f64>) -> Self {
        Self {
            num_clusters: centroids.nrows(),
            centroids: Some(centroids),
            trained: true,
        }
    }

    pub fn is_trained(&self) -> bool {
        self.trained
    }

    pub fn num_clusters(&self) -> usize {
        self.num_clusters
    }

    /// Width of the feature vectors the model was fitted on
    pub fn dimension(&self) -> Option<usize> {
        self.centroids.as_ref().map(|c| c.ncols())
    }

    pub fn centroids(&self) -> Option<&Array2<f64>> {
        self.centroids.as_ref()
    }

    /// Assign a feature vector to its nearest centroid
    pub fn predict(&self, query: &[f64]) -> MlResult<ClusterAssignment> {
        let centroids = match (&self.centroids, self.trained) {
            (Some(c), true) => c,
            _ => return Err(MlError::NotTrained),
        };

        if query.len() != centroids.ncols() {
            return Err(MlError::config(
                "query",
                format!(
                    "expected {} features, got {}",
                    centroids.ncols(),
                    query.len()
                ),
            ));
        }

        if let Some(pos) = query.iter().position(|v| !v.is_finite()) {
            return Err(MlError::config(
                "query",
                format!("feature {} is not finite ({})", pos, query[pos]),
            ));
        }

        let query_arr = Array1::from_vec(query.to_vec());

        let ball_tree = BallTree::new()
            .from_batch(centroids, L2Dist)
            .map_err(|e| MlError::Training(format!("Failed to build BallTree from centroids: {}", e)))?;

        let neighbors = ball_tree
            .k_nearest(query_arr.view(), 1)
            .map_err(|e| MlError::Training(format!("Nearest centroid search failed: {}", e)))?;

        let nearest_cluster = neighbors
            .first()
            .map(|(_, idx)| *idx)
            .ok_or_else(|| MlError::Training("No nearest centroid found".to_string()))?;

        let scores = centroids
            .rows()
            .into_iter()
            .map(|c| squared_distance(query_arr.view(), c) as f32)
            .collect();

        Ok(ClusterAssignment {
            cluster_id: nearest_cluster as u32,
            scores,
        })
    }

    /// Save model to JSON
    pub fn to_json(&self) -> MlResult<String> {
        let centroids_vec: Vec<Vec<f64>> = self
            .centroids
            .as_ref()
            .map(|c| c.rows().into_iter().map(|r| r.to_vec()).collect())
            .unwrap_or_default();

        let data = KMeansModelData {
            algorithm: "kmeans".to_string(),
            trained: self.trained,
            num_clusters: self.num_clusters,
            centroids: centroids_vec,
        };

        serde_json::to_string_pretty(&data)
            .map_err(|e| MlError::Serialization(format!("JSON serialization failed: {}", e)))
    }

    /// Load model from JSON
    pub fn from_json(json: &str) -> MlResult<Self> {
        let data: KMeansModelData = serde_json::from_str(json)
            .map_err(|e| MlError::Serialization(format!("JSON parse failed: {}", e)))?;

        if data.algorithm != "kmeans" {
            return Err(MlError::Serialization(format!(
                "unexpected algorithm '{}'",
                data.algorithm
            )));
        }

        let mut model = Self::new(data.num_clusters);

        if !data.centroids.is_empty() {
            let dim = data.centroids[0].len();
            let n = data.centroids.len();
            if n != data.num_clusters {
                return Err(MlError::Serialization(format!(
                    "{} centroids for {} clusters",
                    n, data.num_clusters
                )));
            }
            let flat: Vec<f64> = data.centroids.into_iter().flatten().collect();

            model.centroids = Some(
                Array2::from_shape_vec((n, dim), flat)
                    .map_err(|e| MlError::Serialization(format!("Failed to restore centroids: {}", e)))?,
            );
            model.trained = data.trained;
        }

        Ok(model)
    }
}

fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_kmeans_load_and_predict() {
        // Pre-trained model with 2 clusters
        let json = r#"{
            "algorithm": "kmeans",
            "trained": true,
            "num_clusters": 2,
            "centroids": [
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0]
            ]
        }"#;

        let model = KMeansModel::from_json(json).unwrap();
        assert!(model.is_trained());

        // Query closer to first centroid
        let result = model.predict(&[0.9, 0.1, 0.0]).unwrap();
        assert_eq!(result.cluster_id, 0);
        assert_eq!(result.scores.len(), 2);

        // Query closer to second centroid
        let result = model.predict(&[0.1, 0.9, 0.0]).unwrap();
        assert_eq!(result.cluster_id, 1);
        assert!((result.scores[1] - 0.02).abs() < 1e-6);
    }

    #[test]
    fn test_kmeans_json_roundtrip() {
        let json = r#"{
            "algorithm": "kmeans",
            "trained": true,
            "num_clusters": 3,
            "centroids": [
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 1.0]
            ]
        }"#;

        let model = KMeansModel::from_json(json).unwrap();
        let exported = model.to_json().unwrap();
        let restored = KMeansModel::from_json(&exported).unwrap();

        assert!(restored.is_trained());
        assert_eq!(restored.num_clusters, 3);
        assert_eq!(restored.centroids(), model.centroids());
    }

    #[test]
    fn test_untrained_model_refuses_to_predict() {
        let model = KMeansModel::new(3);
        assert!(matches!(model.predict(&[1.0]), Err(MlError::NotTrained)));
    }

    #[test]
    fn test_query_width_must_match() {
        let model = KMeansModel::from_centroids(array![[0.0, 0.0], [5.0, 5.0]]);
        assert!(matches!(
            model.predict(&[1.0, 2.0, 3.0]),
            Err(MlError::Config { .. })
        ));
    }

    #[test]
    fn test_non_finite_query_is_config_error() {
        let model = KMeansModel::from_centroids(array![[0.0, 0.0], [5.0, 5.0]]);
        assert!(matches!(
            model.predict(&[f64::NAN, 1.0]),
            Err(MlError::Config { .. })
        ));
        assert!(matches!(
            model.predict(&[1.0, f64::INFINITY]),
            Err(MlError::Config { .. })
        ));
    }

    #[test]
    fn test_fit_separates_blobs() {
        let features = array![
            [0.0, 0.1],
            [0.2, 0.0],
            [0.1, 0.2],
            [10.0, 10.1],
            [10.2, 9.9],
            [9.9, 10.0],
            [-10.0, 5.0],
            [-10.1, 5.2],
            [-9.8, 4.9],
        ];

        let model = KMeansTrainer::new(3).fit(&features).unwrap();
        assert_eq!(model.num_clusters(), 3);
        assert_eq!(model.dimension(), Some(2));

        let first = model.predict(&[0.1, 0.1]).unwrap().cluster_id;
        let second = model.predict(&[10.0, 10.0]).unwrap().cluster_id;
        let third = model.predict(&[-10.0, 5.0]).unwrap().cluster_id;
        assert_ne!(first, second);
        assert_ne!(second, third);
        assert_ne!(first, third);

        for row in features.rows() {
            let assignment = model.predict(row.as_slice().unwrap()).unwrap();
            assert!(assignment.cluster_id < 3);
            assert_eq!(assignment.scores.len(), 3);

            let argmin = assignment
                .scores
                .iter()
                .enumerate()
                .min_by(|a, b| a.1.total_cmp(b.1))
                .map(|(i, _)| i as u32)
                .unwrap();
            assert_eq!(argmin, assignment.cluster_id);
        }
    }

    #[test]
    fn test_fit_rejects_too_few_rows() {
        let features = array![[1.0, 2.0], [3.0, 4.0]];
        assert!(matches!(
            KMeansTrainer::new(3).fit(&features),
            Err(MlError::Training(_))
        ));
        assert!(matches!(
            KMeansTrainer::new(0).fit(&features),
            Err(MlError::Config { .. })
        ));
    }
}
