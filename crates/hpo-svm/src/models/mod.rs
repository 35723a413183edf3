pub mod classifier_trait;
pub mod factory;
pub mod kernel;
pub(crate) mod smo;
pub mod svm;
