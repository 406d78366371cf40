// SPDX-License-Identifier: PMPL-1.0-or-later

//! vulnsift: weakly-labelled vulnerability category classifier.
//!
//! The pipeline has four stages, each reading the previous stage's artifact:
//!
//! 1. **Corpus**: walk source roots, keep plausible text files and label
//!    them with an ordered rule chain (`corpus`, `labeling`).
//! 2. **Features**: fit a TF-IDF vectorizer once and write the dense
//!    feature matrix (`features`).
//! 3. **Train**: split, fit one-vs-rest boosted trees and evaluate
//!    (`model`).
//! 4. **Classify**: replay the persisted vectorizer and classifier on one
//!    file and report the category distribution (`report`).
//!
//! Labels are heuristic and the classifier learns lexical associations; it
//! is not a static analyser.

pub mod config;
pub mod corpus;
pub mod diagnostics;
pub mod error;
pub mod features;
pub mod labeling;
pub mod model;
pub mod report;
pub mod storage;
pub mod types;

pub use config::PipelineConfig;
pub use error::PipelineError;
