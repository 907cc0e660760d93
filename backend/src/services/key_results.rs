//! Key results. Every mutation needs the objective's owner or a team admin.

use tracing::{info, instrument};

use super::{conflict_or, path_id, Services};
use crate::errors::{AppError, RepoContext};
use crate::models::{
    Actor, CreateKeyResultRequest, KeyResult, KeyResultChanges, Okr, UpdateKeyResultRequest,
    UpdateProgressRequest,
};
use crate::policy::Action;
use crate::validation::{self, MAX_KEY_RESULTS};

impl Services {
    /// Load a key result with its objective and check the caller may
    /// modify them.
    async fn modifiable_key_result(
        &self,
        actor: &Actor,
        key_result_id: &str,
    ) -> Result<(KeyResult, Okr), AppError> {
        let key_result = self.load_key_result(key_result_id).await?;
        let okr = self.load_okr(&key_result.okr_id).await?;
        self.authorize(actor, &okr.team_id, Action::ModifyOkr(&okr))
            .await?;
        Ok((key_result, okr))
    }

    #[instrument(skip_all, fields(user_id = %actor.user_id, okr_id = %okr_id))]
    pub async fn create_key_result(
        &self,
        actor: &Actor,
        okr_id: &str,
        request: CreateKeyResultRequest,
    ) -> Result<KeyResult, AppError> {
        let okr_id = path_id("OKR id", okr_id)?;
        let new_key_result = validation::key_result(&request)?;
        let okr = self.load_okr(&okr_id).await?;
        self.authorize(actor, &okr.team_id, Action::ModifyOkr(&okr))
            .await?;

        let at_cap = format!(
            "An OKR cannot have more than {} key results",
            MAX_KEY_RESULTS
        );
        let key_result = conflict_or(
            self.repos
                .key_results
                .create_key_result(&okr.id, new_key_result, MAX_KEY_RESULTS)
                .await,
            &at_cap,
            "Failed to create key result",
        )?;
        info!(key_result_id = %key_result.id, "Created key result");
        Ok(key_result)
    }

    pub async fn list_key_results(&self, actor: &Actor, okr_id: &str) -> Result<Vec<KeyResult>, AppError> {
        let okr_id = path_id("OKR id", okr_id)?;
        let okr = self.load_okr(&okr_id).await?;
        self.authorize(actor, &okr.team_id, Action::View).await?;
        self.repos
            .key_results
            .list_key_results(&okr.id)
            .await
            .context("Failed to list key results")
    }

    #[instrument(skip_all, fields(user_id = %actor.user_id, key_result_id = %key_result_id))]
    pub async fn update_key_result(
        &self,
        actor: &Actor,
        key_result_id: &str,
        request: UpdateKeyResultRequest,
    ) -> Result<KeyResult, AppError> {
        let key_result_id = path_id("Key result id", key_result_id)?;
        let changes = validation::update_key_result(&request)?;
        self.modifiable_key_result(actor, &key_result_id).await?;
        self.write_key_result(&key_result_id, &changes).await
    }

    /// Values above the target are kept as is.
    #[instrument(skip_all, fields(user_id = %actor.user_id, key_result_id = %key_result_id))]
    pub async fn update_key_result_progress(
        &self,
        actor: &Actor,
        key_result_id: &str,
        request: UpdateProgressRequest,
    ) -> Result<KeyResult, AppError> {
        let key_result_id = path_id("Key result id", key_result_id)?;
        let current_value = validation::progress(request.current_value)?;
        self.modifiable_key_result(actor, &key_result_id).await?;

        let changes = KeyResultChanges {
            current_value: Some(current_value),
            ..KeyResultChanges::default()
        };
        self.write_key_result(&key_result_id, &changes).await
    }

    async fn write_key_result(
        &self,
        key_result_id: &str,
        changes: &KeyResultChanges,
    ) -> Result<KeyResult, AppError> {
        let key_result = self
            .repos
            .key_results
            .update_key_result(key_result_id, changes)
            .await
            .context("Failed to update key result")?
            .ok_or_else(|| AppError::not_found("Key result"))?;
        info!(current_value = key_result.current_value, "Updated key result");
        Ok(key_result)
    }

    #[instrument(skip_all, fields(user_id = %actor.user_id, key_result_id = %key_result_id))]
    pub async fn delete_key_result(&self, actor: &Actor, key_result_id: &str) -> Result<(), AppError> {
        let key_result_id = path_id("Key result id", key_result_id)?;
        self.modifiable_key_result(actor, &key_result_id).await?;
        self.repos
            .key_results
            .delete_key_result(&key_result_id)
            .await
            .context("Failed to delete key result")?;
        info!("Deleted key result");
        Ok(())
    }
}
