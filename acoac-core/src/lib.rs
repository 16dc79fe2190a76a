/*!
Reduction pipeline for deciding reachability queries over attribute-
based administrative access control policies: parse an instance, rule
it trivially reachable or unreachable where possible, slice away what
cannot matter, and hand progressively larger rule-set under-
approximations to an external bounded model checker until a definite
verdict is reached.
*/

pub mod abstraction;
pub mod bound;
pub mod checker;
pub mod driver;
pub mod error;
pub mod format;
pub mod model;
pub mod precheck;
pub mod slicer;
pub mod symbols;

pub use driver::{compute_tightness_for_dir, Driver, DriverConfig};
pub use error::AcoacError;
pub use model::{AdministrativeAction, AnalysisResult, Instance};
