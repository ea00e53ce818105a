use crate::domain_model::*;
use crate::domain_port::{StoreError, UserStore};

/// A batch of updates addressed to one user document.
#[derive(Debug, Clone)]
pub struct PairStep {
    pub user: UserId,
    pub updates: Vec<UserUpdate>,
}

impl PairStep {
    pub fn new(user: UserId, updates: Vec<UserUpdate>) -> Self {
        PairStep { user, updates }
    }
}

#[derive(Debug)]
pub enum SagaOutcome {
    Committed,
    /// The second step failed and the first was undone.
    RolledBack(StoreError),
    /// The second step failed and so did the undo of the first. The pair is
    /// left in whatever state the first step produced.
    Stranded {
        step2: StoreError,
        compensation: StoreError,
    },
}

/// Two single-document updates that have to land together.
///
/// The first step is applied, then the second. If the second fails, the first
/// is undone with updates derived from the pre-image of the first document.
/// The pre-image is read before the first step, so a concurrent writer on the
/// same document between the read and the undo can be overwritten; such pairs
/// are left for reconciliation.
pub struct PairSaga {
    first: PairStep,
    second: Option<PairStep>,
}

impl PairSaga {
    pub fn new(first: PairStep, second: Option<PairStep>) -> Self {
        PairSaga { first, second }
    }

    /// Fails without side effects when the first step fails.
    pub async fn run(
        self,
        store: &dyn UserStore,
        first_pre_image: &User,
    ) -> Result<SagaOutcome, StoreError> {
        let compensation = compensation_for(first_pre_image, &self.first.updates);

        store
            .update_by_id(self.first.user, &self.first.updates)
            .await?;

        let Some(second) = self.second else {
            return Ok(SagaOutcome::Committed);
        };

        let step2 = match store.update_by_id(second.user, &second.updates).await {
            Ok(_) => {
                tracing::debug!(first = %self.first.user, second = %second.user, "saga committed");
                return Ok(SagaOutcome::Committed);
            }
            Err(e) => e,
        };
        tracing::warn!(
            first = %self.first.user,
            second = %second.user,
            "second step failed, compensating: {step2}"
        );

        if compensation.is_empty() {
            return Ok(SagaOutcome::RolledBack(step2));
        }

        match store.update_by_id(self.first.user, &compensation).await {
            Ok(_) => Ok(SagaOutcome::RolledBack(step2)),
            Err(compensation) => Ok(SagaOutcome::Stranded {
                step2,
                compensation,
            }),
        }
    }
}

/// Updates that restore `pre_image`'s membership for every value touched by
/// `updates`, in reverse order of application.
pub fn compensation_for(pre_image: &User, updates: &[UserUpdate]) -> Vec<UserUpdate> {
    let mut simulated = pre_image.clone();
    let mut undo = Vec::new();
    for update in updates {
        let (field, id) = update.target();
        let was_present = list_of(&simulated, field).contains(&id);
        if let Some(inverse) = update.inverse(was_present) {
            undo.push(inverse);
        }
        update.apply(&mut simulated);
    }
    undo.reverse();
    undo
}
