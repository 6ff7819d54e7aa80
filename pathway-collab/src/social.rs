use log::info;
use thiserror::Error;

use pathway_core::Generator;

use crate::{
    courses::snapshot, util::random_string, CollabEvent, CourseData, Database, DatabaseError,
    FriendRequestData, NewCourse, NewFriendRequest, NewInvitation, NewNotification,
    NotificationData, NotificationKind, NotificationStatus, PlatformContext, PrimaryKey, UserData,
};

#[derive(Debug, Error)]
pub enum SocialError {
    /// Users can't befriend themselves
    #[error("You can't send a friend request to yourself")]
    SelfRequest,
    /// The two users are already friends
    #[error("You are already friends")]
    AlreadyFriends,
    /// A pending request between the two users already exists
    #[error("A friend request is already pending")]
    RequestPending,
    /// The acting user isn't the one the resource addresses
    #[error("This isn't yours to act on")]
    NotAddressee,
    /// Courses can only be shared with friends
    #[error("You can only share courses with friends")]
    NotFriends,
    /// The invitation was already accepted or declined
    #[error("The invitation was already used")]
    InvitationConsumed,
    /// Something else went wrong with the database
    #[error(transparent)]
    Db(#[from] DatabaseError),
}

pub struct SocialManager<G, Db> {
    context: PlatformContext<G, Db>,
}

impl<G, Db> SocialManager<G, Db>
where
    G: Generator,
    Db: Database,
{
    pub fn new(context: &PlatformContext<G, Db>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Sends a friend request to another user, by username.
    pub async fn send_friend_request(
        &self,
        sender_id: PrimaryKey,
        recipient_username: &str,
    ) -> Result<FriendRequestData, SocialError> {
        let db = &self.context.database;

        let recipient = db.user_by_username(recipient_username).await?;

        if recipient.id == sender_id {
            return Err(SocialError::SelfRequest);
        }

        if db.friendship_exists(sender_id, recipient.id).await? {
            return Err(SocialError::AlreadyFriends);
        }

        // A pending request in either direction blocks a new one
        for (a, b) in [(sender_id, recipient.id), (recipient.id, sender_id)] {
            match db.pending_friend_request(a, b).await {
                Ok(_) => return Err(SocialError::RequestPending),
                Err(DatabaseError::NotFound { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }

        let request = db
            .create_friend_request(NewFriendRequest {
                sender_id,
                recipient_id: recipient.id,
            })
            .await?;

        let notification = db
            .create_notification(NewNotification {
                user_id: recipient.id,
                kind: NotificationKind::FriendRequest,
                actor_id: sender_id,
                course_id: None,
            })
            .await?;

        self.emit_notification(notification);

        Ok(request)
    }

    /// Accepts a pending request addressed to `user_id`. The friendship pair,
    /// both notifications, and the request resolve in one transaction.
    pub async fn accept_friend_request(
        &self,
        user_id: PrimaryKey,
        request_id: PrimaryKey,
    ) -> Result<(), SocialError> {
        let db = &self.context.database;

        let request = db.friend_request_by_id(request_id).await?;

        if request.recipient_id != user_id {
            return Err(SocialError::NotAddressee);
        }

        let notification = db.accept_friend_request(request_id).await?;

        info!(
            "Users {} and {} are now friends",
            request.sender_id, request.recipient_id
        );

        self.emit_notification(notification);

        Ok(())
    }

    /// Declines a pending request addressed to `user_id`.
    pub async fn decline_friend_request(
        &self,
        user_id: PrimaryKey,
        request_id: PrimaryKey,
    ) -> Result<(), SocialError> {
        let db = &self.context.database;

        let request = db.friend_request_by_id(request_id).await?;

        if request.recipient_id != user_id {
            return Err(SocialError::NotAddressee);
        }

        db.decline_friend_request(request_id).await?;

        Ok(())
    }

    pub async fn list_friends(&self, user_id: PrimaryKey) -> Result<Vec<UserData>, DatabaseError> {
        self.context.database.list_friends(user_id).await
    }

    pub async fn remove_friend(
        &self,
        user_id: PrimaryKey,
        friend_id: PrimaryKey,
    ) -> Result<(), DatabaseError> {
        self.context.database.delete_friendship(user_id, friend_id).await
    }

    pub async fn list_notifications(
        &self,
        user_id: PrimaryKey,
    ) -> Result<Vec<NotificationData>, DatabaseError> {
        self.context.database.list_notifications(user_id).await
    }

    pub async fn mark_notification_read(
        &self,
        user_id: PrimaryKey,
        notification_id: PrimaryKey,
    ) -> Result<(), SocialError> {
        let notification = self
            .context
            .database
            .notification_by_id(notification_id)
            .await?;

        if notification.user_id != user_id {
            return Err(SocialError::NotAddressee);
        }

        self.context
            .database
            .set_notification_status(notification_id, NotificationStatus::Read)
            .await?;

        Ok(())
    }

    pub async fn mark_all_notifications_read(
        &self,
        user_id: PrimaryKey,
    ) -> Result<(), DatabaseError> {
        self.context.database.mark_all_notifications_read(user_id).await
    }

    /// Shares a course with a friend, creating an invitation plus its
    /// `course-shared` notification.
    pub async fn share_course(
        &self,
        owner_id: PrimaryKey,
        course_id: PrimaryKey,
        friend_id: PrimaryKey,
    ) -> Result<(), SocialError> {
        let db = &self.context.database;

        let course = db.course_by_id(course_id).await?;

        if course.user_id != owner_id {
            return Err(SocialError::NotAddressee);
        }

        if !db.friendship_exists(owner_id, friend_id).await? {
            return Err(SocialError::NotFriends);
        }

        let notification = db
            .create_notification(NewNotification {
                user_id: friend_id,
                kind: NotificationKind::CourseShared,
                actor_id: owner_id,
                course_id: Some(course_id),
            })
            .await?;

        db.create_invitation(NewInvitation {
            course_id,
            inviter_id: owner_id,
            invitee_id: friend_id,
            notification_id: notification.id,
        })
        .await?;

        info!(
            "User {owner_id} shared course \"{}\" with user {friend_id}",
            course.title
        );

        self.emit_notification(notification);

        Ok(())
    }

    /// Accepts a course invitation: the invitee gets their own copy, and the
    /// invitation resolves, all in one transaction.
    pub async fn accept_invitation(
        &self,
        user_id: PrimaryKey,
        invitation_id: PrimaryKey,
    ) -> Result<CourseData, SocialError> {
        let db = &self.context.database;

        let invitation = db.invitation_by_id(invitation_id).await?;

        if invitation.invitee_id != user_id {
            return Err(SocialError::NotAddressee);
        }

        if invitation.consumed {
            return Err(SocialError::InvitationConsumed);
        }

        let original = db.course_by_id(invitation.course_id).await?;

        let copy = NewCourse {
            slug: format!("{}-{}", original.slug, random_string(6).to_lowercase()),
            user_id,
            mode: original.mode.clone(),
            public: false,
            content: snapshot(&original),
        };

        let course = db.accept_invitation(invitation_id, copy).await?;

        Ok(course)
    }

    /// Declines a course invitation.
    pub async fn decline_invitation(
        &self,
        user_id: PrimaryKey,
        invitation_id: PrimaryKey,
    ) -> Result<(), SocialError> {
        let db = &self.context.database;

        let invitation = db.invitation_by_id(invitation_id).await?;

        if invitation.invitee_id != user_id {
            return Err(SocialError::NotAddressee);
        }

        if invitation.consumed {
            return Err(SocialError::InvitationConsumed);
        }

        db.decline_invitation(invitation_id).await?;

        Ok(())
    }

    fn emit_notification(&self, notification: NotificationData) {
        self.context.emit(CollabEvent::NotificationCreated {
            user_id: notification.user_id,
            notification,
        });
    }
}
