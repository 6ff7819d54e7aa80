use chrono::Utc;
use log::info;
use thiserror::Error;

use pathway_core::Generator;

use crate::{
    check_course_limit, courses::snapshot, util::random_string, CollabEvent, CourseData, Database,
    DatabaseError, LimitDecision, MarketplaceCourseData, NewCourse, NewMarketplaceCourse,
    PlatformContext, PrimaryKey,
};

#[derive(Debug, Error)]
pub enum MarketplaceError {
    /// The acting user doesn't own the course being published
    #[error("Only the course owner may publish it")]
    NotOwner,
    /// Importing counts as a course creation, and the quota is exhausted
    #[error("Course creation limit reached")]
    LimitExceeded(LimitDecision),
    /// Something else went wrong with the database
    #[error(transparent)]
    Db(#[from] DatabaseError),
}

pub struct MarketplaceManager<G, Db> {
    context: PlatformContext<G, Db>,
}

impl<G, Db> MarketplaceManager<G, Db>
where
    G: Generator,
    Db: Database,
{
    pub fn new(context: &PlatformContext<G, Db>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Publishes a snapshot of an owned course under a category. Publishing
    /// the same course twice is a conflict.
    pub async fn publish(
        &self,
        user_id: PrimaryKey,
        course_id: PrimaryKey,
        category: &str,
    ) -> Result<MarketplaceCourseData, MarketplaceError> {
        let course = self.context.database.course_by_id(course_id).await?;

        if course.user_id != user_id {
            return Err(MarketplaceError::NotOwner);
        }

        let listing = self
            .context
            .database
            .create_marketplace_course(NewMarketplaceCourse {
                course_id,
                publisher_id: user_id,
                category: category.to_string(),
                snapshot: snapshot(&course),
            })
            .await?;

        info!(
            "User {user_id} published \"{}\" under {category}",
            listing.title
        );

        self.context.emit(CollabEvent::ListingPublished {
            title: listing.title.clone(),
            category: listing.category.clone(),
        });

        Ok(listing)
    }

    pub async fn listing_by_id(
        &self,
        listing_id: PrimaryKey,
    ) -> Result<MarketplaceCourseData, DatabaseError> {
        self.context.database.marketplace_course_by_id(listing_id).await
    }

    pub async fn list(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<MarketplaceCourseData>, DatabaseError> {
        self.context.database.list_marketplace_courses(category).await
    }

    /// Flips the user's like on a listing.
    pub async fn toggle_like(
        &self,
        user_id: PrimaryKey,
        listing_id: PrimaryKey,
    ) -> Result<MarketplaceCourseData, DatabaseError> {
        self.context
            .database
            .toggle_marketplace_like(listing_id, user_id)
            .await
    }

    /// Copies a published snapshot into the user's own courses. Counts
    /// against the course creation quota like a generation does.
    pub async fn import(
        &self,
        user_id: PrimaryKey,
        listing_id: PrimaryKey,
    ) -> Result<CourseData, MarketplaceError> {
        let db = &self.context.database;

        let user = db.user_by_id(user_id).await?;
        let times = db.course_creation_times(user_id).await?;

        let decision = check_course_limit(user.tier(), &times, Utc::now());
        if !decision.allowed {
            return Err(MarketplaceError::LimitExceeded(decision));
        }

        let listing = db.marketplace_course_by_id(listing_id).await?;

        let course = db
            .create_course(NewCourse {
                slug: format!(
                    "{}-{}",
                    crate::courses::slugify(&listing.title),
                    random_string(6).to_lowercase()
                ),
                user_id,
                mode: pathway_core::CourseMode::Solo.to_string(),
                public: false,
                content: listing.snapshot.clone(),
            })
            .await?;

        db.record_course_creation(user_id, Utc::now()).await?;

        info!("User {user_id} imported \"{}\"", listing.title);

        Ok(course)
    }
}
