//! CompleteTrialTaskHandler - Records one trial prerequisite.

use std::sync::Arc;

use crate::domain::foundation::{EventId, Timestamp, UserId};
use crate::domain::subscription::{
    Subscription, SubscriptionError, TrialPhase, TrialPolicy, TrialTask, TrialTaskCompleted,
};
use crate::ports::{EventPublisher, SubscriptionRepository};

use super::support::{load_or_create, publish};

/// Upper bound on shares reported in one call.
pub const MAX_SHARES_PER_CALL: u32 = 100;

#[derive(Debug, Clone)]
pub struct CompleteTrialTaskCommand {
    pub user_id: UserId,
    pub task: TrialTask,
    pub now: Timestamp,
}

#[derive(Debug, Clone)]
pub struct CompleteTrialTaskResult {
    pub subscription: Subscription,
    pub phase: TrialPhase,
    /// Prerequisites still outstanding after this task.
    pub missing: Vec<String>,
}

/// Applies a trial task through the repository's atomic update, so two
/// concurrent completions for the same user both land.
pub struct CompleteTrialTaskHandler {
    repository: Arc<dyn SubscriptionRepository>,
    event_publisher: Arc<dyn EventPublisher>,
    policy: TrialPolicy,
}

impl CompleteTrialTaskHandler {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        event_publisher: Arc<dyn EventPublisher>,
        policy: TrialPolicy,
    ) -> Self {
        Self {
            repository,
            event_publisher,
            policy,
        }
    }

    pub async fn handle(
        &self,
        cmd: CompleteTrialTaskCommand,
    ) -> Result<CompleteTrialTaskResult, SubscriptionError> {
        if let TrialTask::Share { count } = cmd.task {
            if count == 0 || count > MAX_SHARES_PER_CALL {
                return Err(SubscriptionError::validation(
                    "count",
                    format!("must be between 1 and {}", MAX_SHARES_PER_CALL),
                ));
            }
        }

        let before = load_or_create(
            self.repository.as_ref(),
            self.event_publisher.as_ref(),
            &cmd.user_id,
            cmd.now,
        )
        .await?;

        let subscription = self
            .repository
            .apply_trial_task(&cmd.user_id, cmd.task, cmd.now)
            .await?;

        if subscription.trial_tasks != before.trial_tasks {
            let event = TrialTaskCompleted {
                event_id: EventId::new(),
                subscription_id: subscription.id,
                user_id: cmd.user_id.clone(),
                task: cmd.task.name().to_string(),
                progress: subscription.trial_tasks,
                completed_at: cmd.now,
            };
            publish(self.event_publisher.as_ref(), &event, &cmd.user_id).await?;
        }

        Ok(CompleteTrialTaskResult {
            phase: subscription.trial_phase(cmd.now, &self.policy),
            missing: subscription.trial_tasks.missing(&self.policy),
            subscription,
        })
    }
}
