//! Labelsmith: rule-based weak supervision for time-series feature data.
//!
//! Analysts write small labeling rules over named features. Labelsmith
//! compiles them into labeling functions, combines their noisy votes into one
//! label per item, trains a surrogate classifier that generalises from the
//! rules to the raw features, and scores each run against gold labels so
//! successive rule sets can be compared.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use labelsmith::data::FeatureMatrix;
//! use labelsmith::labeling::{LabelSet, Labeler};
//! use labelsmith::rules::Rule;
//! use labelsmith::weak_supervision::{TieBreakPolicy, ABSTAIN};
//!
//! let fm = FeatureMatrix::new(
//!     vec!["ts-a".into(), "ts-b".into(), "ts-c".into()],
//!     vec![
//!         ("noise".into(), vec![0.05, 0.8, 0.4]),
//!         ("gaps".into(), vec![0.0, 4.0, 0.0]),
//!     ],
//! )
//! .expect("valid matrix");
//! let labels = LabelSet::new(["normal", "high noise"]).expect("two labels");
//! let rules = vec![
//!     Rule::binary("r1", "noise > 0.5", 1, 0),
//!     Rule::binary("r2", "gaps >= 1 or noise > 0.7", 1, -1),
//!     Rule::free_form("r3", "if noise < 0.1:\n\treturn NORMAL"),
//! ];
//!
//! let mut labeler = Labeler::new(rules, labels, Arc::new(fm));
//! labeler.create_labeling_functions().expect("three rules compile");
//! labeler.apply().expect("features present");
//! let estimate = labeler.predict(TieBreakPolicy::Abstain, None).expect("applied");
//! assert_eq!(estimate, &[0, 1, 0]);
//! assert_ne!(estimate[1], ABSTAIN);
//! ```
//!
//! # Modules
//!
//! - [`rules`]: rule data model, parser and normalised rendering
//! - [`labeling`]: label sets, labeling functions, label matrix, the [`labeling::Labeler`]
//! - [`weak_supervision`]: majority vote and the generative label model
//! - [`surrogate`]: closed-form, neural and end-to-end surrogate classifiers
//! - [`scoring`]: gold-label scores and cross-validation summaries
//! - [`pipeline`]: one labeling run end to end, with run history
//! - [`store`]: rules, gold labels and results persistence
//! - [`worker`]: remote training worker and its client
//! - [`config`]: TOML run configuration
//! - [`data`], [`primitives`]: feature matrix and dense matrices
//! - [`preprocessing`], [`classification`], [`nn`], [`model_selection`],
//!   [`metrics`]: the numerics behind the surrogates
//!
//! Errors are reported through [`LabelError`].

pub mod classification;
pub mod config;
pub mod data;
pub mod error;
pub mod labeling;
pub mod metrics;
pub mod model_selection;
pub mod nn;
pub mod pipeline;
pub mod preprocessing;
pub mod primitives;
pub mod rules;
pub mod scoring;
pub mod store;
pub mod surrogate;
pub mod traits;
pub mod weak_supervision;
pub mod worker;

pub use error::{LabelError, Result};
pub use primitives::Matrix;
pub use traits::{Classifier, Transformer};
