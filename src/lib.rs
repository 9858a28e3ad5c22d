// Library exports for alnbench
pub mod aligners;
pub mod compare;
pub mod error;
pub mod genomes;
pub mod identity;
pub mod input;
pub mod invoke;
pub mod params;
pub mod report;
pub mod runner;
pub mod sequence_length;
pub mod tabular;

pub use compare::{compare, compare_dense, MetricSet};
pub use error::BenchError;
pub use identity::IdentityProfile;
pub use params::{ParamValue, ParameterConfiguration};
pub use tabular::{AlignmentRecord, TabularFormat, TabularReader};
