pub mod bind;
pub mod cluster;
pub mod dimred;
pub mod error;
pub mod features;
pub mod pipeline;
pub mod store;

pub use cluster::{ClusterMethod, ClusterParams, ClusterRequest, ClusterResult, NOISE_LABEL};
pub use dimred::{AnalysisRequest, IsomapParams, Reduction, TsneParams, UmapParams};
pub use error::AnalysisError;
pub use features::{FeatureConfig, FeatureMatrix};
pub use pipeline::{ClusterEngine, Comparison, Embedding, Reducer};
pub use store::{Fingerprint, Point, Route, RouteId, RouteSnapshot, RouteStore};
