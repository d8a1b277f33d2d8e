use super::QuestionnaireStatus;
use crate::core::deploy::DeploymentStatus;

/// Legal explicit status updates. RUNNING is never a legal target here: it is
/// only entered through `status_after_deployment`.
pub fn can_transition(from: QuestionnaireStatus, to: QuestionnaireStatus) -> bool {
    if to == QuestionnaireStatus::Running {
        return false;
    }
    if from == to {
        return true;
    }
    match from {
        QuestionnaireStatus::NotStarted | QuestionnaireStatus::Running => matches!(
            to,
            QuestionnaireStatus::Stopped | QuestionnaireStatus::Complete
        ),
        QuestionnaireStatus::Stopped | QuestionnaireStatus::Complete => false,
    }
}

/// Status a questionnaire holds after a deployment attempt. Only a successful
/// deployment moves it, and terminal states are never left.
pub fn status_after_deployment(
    current: QuestionnaireStatus,
    outcome: DeploymentStatus,
) -> QuestionnaireStatus {
    match (current, outcome) {
        (QuestionnaireStatus::NotStarted | QuestionnaireStatus::Running, DeploymentStatus::Success) => {
            QuestionnaireStatus::Running
        }
        _ => current,
    }
}
