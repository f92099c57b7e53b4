//! Sector culling and quality classification.
//!
//! Given the sector tree, a camera snapshot and the model transformation, the
//! [`QualityClassifier`] produces [`WantedSectors`]: the ids to load in
//! detail and the ids to load as simple geometry. Everything else is unloaded.
//!
//! # Example
//!
//! ```ignore
//! use cadstream::culling::{ClassifierConfig, QualityClassifier};
//!
//! let classifier = QualityClassifier::new(ClassifierConfig::default().with_detailed_budget(20));
//! let wanted = classifier.determine_sectors(&tree, &camera, &model_matrix);
//! assert!(wanted.is_disjoint());
//! ```

mod classifier;
mod config;
mod wanted;

pub use classifier::QualityClassifier;
pub use config::{ClassifierConfig, DEFAULT_DETAILED_SECTOR_BUDGET};
pub use wanted::{Quality, WantedSectors};
