use crate::arm::HyperParams;
use crate::config::SolverConfig;
use crate::models::classifier_trait::ClassifierModel;
use crate::models::kernel::Kernel;
use crate::models::svm::SvcClassifier;

/// Build an unfitted classifier from typed hyperparameters.
pub fn build_model(params: &HyperParams, solver: &SolverConfig) -> Box<dyn ClassifierModel> {
    match params.kernel {
        Kernel::Rbf { gamma } => {
            log::info!("[hpo-svm::models] SVC(kernel=rbf, C={}, gamma={})", params.c, gamma);
        }
        Kernel::Poly {
            gamma,
            coef0,
            degree,
        } => {
            log::info!(
                "[hpo-svm::models] SVC(kernel=poly, C={}, gamma={}, coef0={}, degree={})",
                params.c,
                gamma,
                coef0,
                degree
            );
        }
        Kernel::Sigmoid { gamma, coef0 } => {
            log::info!(
                "[hpo-svm::models] SVC(kernel=sigmoid, C={}, gamma={}, coef0={})",
                params.c,
                gamma,
                coef0
            );
        }
    }
    Box::new(SvcClassifier::new(params.kernel, params.c, solver.clone()))
}
