//! Objectives.

use tracing::{debug, info, instrument};

use super::{path_id, Services};
use crate::errors::{AppError, RepoContext};
use crate::models::{
    Actor, CreateOkrRequest, Okr, OkrListParams, OkrType, OkrWithKeyResults, Page,
    UpdateOkrRequest,
};
use crate::policy::Action;
use crate::validation::{self, MAX_KEY_RESULTS};

impl Services {
    /// Writes the objective, then each key result in order. A failed key
    /// result write leaves the objective and the earlier key results behind.
    #[instrument(skip_all, fields(user_id = %actor.user_id, team_id = %request.team_id))]
    pub async fn create_okr(
        &self,
        actor: &Actor,
        request: CreateOkrRequest,
    ) -> Result<OkrWithKeyResults, AppError> {
        let mut draft = validation::create_okr(&request)?;
        let team_id = draft.okr.team_id.clone();
        self.load_team(&team_id).await?;
        self.authorize(actor, &team_id, Action::CreateOkr(draft.okr.okr_type))
            .await?;

        match draft.okr.okr_type {
            OkrType::Personal => {
                if draft
                    .okr
                    .owner_id
                    .as_deref()
                    .is_some_and(|owner| owner != actor.user_id)
                {
                    return Err(AppError::Validation(
                        "Personal OKRs are owned by their creator".to_string(),
                    ));
                }
                draft.okr.owner_id = Some(actor.user_id.clone());
            }
            OkrType::Team => {
                if let Some(owner) = draft.okr.owner_id.as_deref() {
                    if self.role_in(&team_id, owner).await?.is_none() {
                        return Err(AppError::Validation(
                            "OKR owner must be a member of the team".to_string(),
                        ));
                    }
                }
            }
        }

        let okr = self
            .repos
            .okrs
            .create_okr(draft.okr)
            .await
            .context("Failed to create OKR")?;

        let mut key_results = Vec::with_capacity(draft.key_results.len());
        for key_result in draft.key_results {
            let created = self
                .repos
                .key_results
                .create_key_result(&okr.id, key_result, MAX_KEY_RESULTS)
                .await
                .context("Failed to create key result")?;
            key_results.push(created);
        }

        info!(okr_id = %okr.id, okr_type = okr.okr_type.as_str(), "Created OKR");
        Ok(OkrWithKeyResults { okr, key_results })
    }

    pub async fn get_okr(&self, actor: &Actor, okr_id: &str) -> Result<OkrWithKeyResults, AppError> {
        let okr_id = path_id("OKR id", okr_id)?;
        let okr = self.load_okr(&okr_id).await?;
        self.authorize(actor, &okr.team_id, Action::View).await?;

        let key_results = self
            .repos
            .key_results
            .list_key_results(&okr.id)
            .await
            .context("Failed to list key results")?;
        Ok(OkrWithKeyResults { okr, key_results })
    }

    pub async fn list_okrs(
        &self,
        actor: &Actor,
        team_id: &str,
        params: &OkrListParams,
    ) -> Result<Page<Okr>, AppError> {
        let team_id = path_id("Team id", team_id)?;
        let (filter, pagination) = validation::okr_filter(&team_id, params)?;
        let team = self.load_team(&team_id).await?;
        self.authorize(actor, &team.id, Action::View).await?;

        let page = self
            .repos
            .okrs
            .list_okrs(&filter, &pagination)
            .await
            .context("Failed to list OKRs")?;
        debug!(team_id = %team.id, total = page.total, "Listed OKRs");
        Ok(page)
    }

    #[instrument(skip_all, fields(user_id = %actor.user_id, okr_id = %okr_id))]
    pub async fn update_okr(
        &self,
        actor: &Actor,
        okr_id: &str,
        request: UpdateOkrRequest,
    ) -> Result<Okr, AppError> {
        let okr_id = path_id("OKR id", okr_id)?;
        let changes = validation::update_okr(&request)?;
        let okr = self.load_okr(&okr_id).await?;
        self.authorize(actor, &okr.team_id, Action::ModifyOkr(&okr))
            .await?;

        let updated = self
            .repos
            .okrs
            .update_okr(&okr_id, &changes)
            .await
            .context("Failed to update OKR")?
            .ok_or_else(|| AppError::not_found("OKR"))?;
        info!("Updated OKR");
        Ok(updated)
    }

    /// Key results and reviews go with it.
    #[instrument(skip_all, fields(user_id = %actor.user_id, okr_id = %okr_id))]
    pub async fn delete_okr(&self, actor: &Actor, okr_id: &str) -> Result<(), AppError> {
        let okr_id = path_id("OKR id", okr_id)?;
        let okr = self.load_okr(&okr_id).await?;
        self.authorize(actor, &okr.team_id, Action::ModifyOkr(&okr))
            .await?;

        self.repos
            .okrs
            .delete_okr(&okr_id)
            .await
            .context("Failed to delete OKR")?;
        info!("Deleted OKR");
        Ok(())
    }
}
