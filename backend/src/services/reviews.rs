//! Reviews of objectives.

use tracing::{info, instrument};

use super::{path_id, Services};
use crate::errors::{AppError, RepoContext};
use crate::models::{
    Actor, CreateReviewRequest, NewReview, Page, PaginationParams, Review, UpdateReviewRequest,
};
use crate::policy::{self, Action, Subject};
use crate::validation;

impl Services {
    /// Only the owner of the objective or a team admin may review it.
    #[instrument(skip_all, fields(user_id = %actor.user_id, okr_id = %okr_id))]
    pub async fn create_review(
        &self,
        actor: &Actor,
        okr_id: &str,
        request: CreateReviewRequest,
    ) -> Result<Review, AppError> {
        let okr_id = path_id("OKR id", okr_id)?;
        let (review_type, content) = validation::create_review(&request)?;
        let okr = self.load_okr(&okr_id).await?;
        self.authorize(actor, &okr.team_id, Action::ReviewOkr(&okr))
            .await?;

        let review = self
            .repos
            .reviews
            .create_review(NewReview {
                okr_id: okr.id,
                review_type,
                content,
                reviewer_id: actor.user_id.clone(),
            })
            .await
            .context("Failed to create review")?;
        info!(review_id = %review.id, "Created review");
        Ok(review)
    }

    pub async fn list_reviews(
        &self,
        actor: &Actor,
        okr_id: &str,
        params: &PaginationParams,
    ) -> Result<Page<Review>, AppError> {
        let okr_id = path_id("OKR id", okr_id)?;
        let pagination = validation::pagination(params)?;
        let okr = self.load_okr(&okr_id).await?;
        self.authorize(actor, &okr.team_id, Action::View).await?;
        self.repos
            .reviews
            .list_reviews(&okr.id, &pagination)
            .await
            .context("Failed to list reviews")
    }

    /// The reviewer's team role plays no part here, so no membership lookup.
    async fn own_review(&self, actor: &Actor, review_id: &str) -> Result<Review, AppError> {
        let review = self.load_review(review_id).await?;
        policy::authorize(
            &Subject::new(&actor.user_id, None),
            Action::ModifyReview(&review),
        )
        .into_result()?;
        Ok(review)
    }

    #[instrument(skip_all, fields(user_id = %actor.user_id, review_id = %review_id))]
    pub async fn update_review(
        &self,
        actor: &Actor,
        review_id: &str,
        request: UpdateReviewRequest,
    ) -> Result<Review, AppError> {
        let review_id = path_id("Review id", review_id)?;
        let changes = validation::update_review(&request)?;
        self.own_review(actor, &review_id).await?;

        let review = self
            .repos
            .reviews
            .update_review(&review_id, &changes)
            .await
            .context("Failed to update review")?
            .ok_or_else(|| AppError::not_found("Review"))?;
        info!("Updated review");
        Ok(review)
    }

    #[instrument(skip_all, fields(user_id = %actor.user_id, review_id = %review_id))]
    pub async fn delete_review(&self, actor: &Actor, review_id: &str) -> Result<(), AppError> {
        let review_id = path_id("Review id", review_id)?;
        self.own_review(actor, &review_id).await?;
        self.repos
            .reviews
            .delete_review(&review_id)
            .await
            .context("Failed to delete review")?;
        info!("Deleted review");
        Ok(())
    }
}
