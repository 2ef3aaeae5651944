//! Statistical building blocks for trait-based community analysis.
//!
//! This crate provides the numeric primitives the rest of the workspace is
//! built on:
//!
//! - **Descriptive statistics**: mean, median, sample variance, standard deviation
//! - **Running statistics**: single-pass (Welford) accumulation for null distributions
//! - **Effect sizes**: standardized effect size (SES) and the p-values derived from it
//! - **P-value adjustment**: Holm and Benjamini-Hochberg corrections
//! - **Linear algebra**: dense row-major matrices, symmetric eigendecomposition, linear solve
//!
//! # Modules
//!
//! - [`descriptive`]: Descriptive statistics for summarizing datasets
//! - [`running`]: Online mean/variance accumulation
//! - [`effect_size`]: SES and two-tailed p-values
//! - [`adjust`]: Multiple-testing correction
//! - [`linalg`]: Dense matrix operations used by the ordination methods
//!
//! # Examples
//!
//! ## Computing descriptive statistics
//!
//! ```
//! use traitscape_stats::descriptive::DescriptiveStats;
//!
//! let values = [1.0, 2.0, 3.0, 4.0, 5.0];
//! let stats = DescriptiveStats::new(values).unwrap();
//! assert_eq!(stats.mean, 3.0);
//! assert_eq!(stats.variance, 2.5);
//! ```
//!
//! ## Standardized effect size against a null distribution
//!
//! ```
//! use traitscape_stats::{effect_size::EffectSize, running::RunningStats};
//!
//! let mut null = RunningStats::new();
//! for v in [1.0, 2.0, 3.0, 2.0, 2.0] {
//!     null.push(v);
//! }
//! let es = EffectSize::from_null(4.0, &null);
//! assert!(es.ses > 1.96);
//! assert!(es.is_significant());
//! ```

pub mod adjust;
pub mod descriptive;
pub mod effect_size;
pub mod linalg;
pub mod running;
