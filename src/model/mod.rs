// SPDX-License-Identifier: PMPL-1.0-or-later

//! Model training and evaluation

pub mod classifier;
pub mod metrics;
pub mod split;
pub mod train;

pub use classifier::{BoostedClassifier, Classifier};
pub use metrics::{ClassificationReport, ConfusionMatrix};
pub use train::{print_outcome, train_model, train_on, TrainOutcome};
