//! Plan tiers and quota decisions. Everything here is a pure computation
//! over caller-supplied history; reading the history and applying the
//! subsequent increment is the caller's job, and nothing guards the gap
//! between the two.

use chrono::{DateTime, Duration, Utc};

use crate::UserData;

/// The subscription statuses under which a paid plan actually counts.
const ACTIVE_STATUSES: [&str; 2] = ["active", "trialing"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanTier {
    Free,
    Premium,
}

impl PlanTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Premium => "premium",
        }
    }

    /// The rolling window and cap for course creation.
    fn course_window(&self) -> (u32, Duration) {
        match self {
            Self::Free => (5, Duration::days(7)),
            Self::Premium => (10, Duration::hours(1)),
        }
    }

    /// The lifetime whiteboard cap. Not time-windowed.
    fn whiteboard_cap(&self) -> u32 {
        match self {
            Self::Free => 3,
            Self::Premium => 20,
        }
    }
}

impl UserData {
    /// The tier quotas are checked against. A stored premium plan only
    /// counts while its subscription status is in good standing.
    pub fn tier(&self) -> PlanTier {
        let paid = self.plan == PlanTier::Premium.as_str();
        let standing = self
            .subscription_status
            .as_deref()
            .map(|s| ACTIVE_STATUSES.contains(&s))
            .unwrap_or(false);

        if paid && standing {
            PlanTier::Premium
        } else {
            PlanTier::Free
        }
    }
}

/// A snapshot decision about a metered action.
#[derive(Debug, Clone, PartialEq)]
pub struct LimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub limit: u32,
    /// When the window next frees a slot. Only set while the limit is hit.
    pub next_reset: Option<DateTime<Utc>>,
}

/// Decides whether a user may create a course right now, given their past
/// creation instants.
pub fn check_course_limit(
    tier: PlanTier,
    timestamps: &[DateTime<Utc>],
    now: DateTime<Utc>,
) -> LimitDecision {
    let (limit, window) = tier.course_window();
    let window_start = now - window;

    let in_window: Vec<_> = timestamps.iter().filter(|t| **t > window_start).collect();
    let used = in_window.len() as u32;
    let remaining = limit.saturating_sub(used);
    let allowed = used < limit;

    let next_reset = if allowed {
        None
    } else {
        in_window.iter().min().map(|oldest| **oldest + window)
    };

    LimitDecision {
        allowed,
        remaining,
        limit,
        next_reset,
    }
}

/// Decides whether a user may create another whiteboard, given their
/// lifetime total.
pub fn check_whiteboard_limit(tier: PlanTier, total: i32) -> LimitDecision {
    let limit = tier.whiteboard_cap();
    let used = total.max(0) as u32;

    LimitDecision {
        allowed: used < limit,
        remaining: limit.saturating_sub(used),
        limit,
        next_reset: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        "2025-06-15T12:00:00Z".parse().unwrap()
    }

    fn days_ago(days: i64) -> DateTime<Utc> {
        now() - Duration::days(days)
    }

    #[test]
    fn a_free_user_below_the_cap_is_allowed() {
        let timestamps = vec![days_ago(1), days_ago(2), days_ago(3)];
        let decision = check_course_limit(PlanTier::Free, &timestamps, now());

        assert!(decision.allowed);
        assert_eq!(decision.remaining, 2);
        assert_eq!(decision.limit, 5);
        assert_eq!(decision.next_reset, None);
    }

    #[test]
    fn a_free_user_at_the_cap_is_denied_with_a_reset_time() {
        let timestamps: Vec<_> = (1..=5).map(days_ago).collect();
        let decision = check_course_limit(PlanTier::Free, &timestamps, now());

        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
        assert_eq!(decision.next_reset, Some(days_ago(5) + Duration::days(7)));
    }

    #[test]
    fn six_creations_over_six_days_deny_a_free_user() {
        let timestamps: Vec<_> = (1..=6).map(days_ago).collect();
        let decision = check_course_limit(PlanTier::Free, &timestamps, now());

        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
    }

    #[test]
    fn timestamps_outside_the_window_do_not_count() {
        let timestamps = vec![days_ago(8), days_ago(30), days_ago(1)];
        let decision = check_course_limit(PlanTier::Free, &timestamps, now());

        assert!(decision.allowed);
        assert_eq!(decision.remaining, 4);
    }

    #[test]
    fn premium_uses_a_one_hour_window_with_a_cap_of_ten() {
        let mut timestamps: Vec<_> = (0..10).map(|i| now() - Duration::minutes(i * 5)).collect();
        // A day-old creation is irrelevant on premium
        timestamps.push(days_ago(1));

        let denied = check_course_limit(PlanTier::Premium, &timestamps, now());
        assert!(!denied.allowed);
        assert_eq!(denied.limit, 10);

        let fresh = check_course_limit(PlanTier::Premium, &[days_ago(1)], now());
        assert!(fresh.allowed);
        assert_eq!(fresh.remaining, 10);
    }

    #[test]
    fn whiteboard_caps_are_lifetime_totals() {
        let free = check_whiteboard_limit(PlanTier::Free, 3);
        assert!(!free.allowed);
        assert_eq!(free.remaining, 0);
        assert_eq!(free.limit, 3);

        let premium = check_whiteboard_limit(PlanTier::Premium, 3);
        assert!(premium.allowed);
        assert_eq!(premium.remaining, 17);
        assert_eq!(premium.limit, 20);
    }

    fn user_with(plan: &str, status: Option<&str>) -> UserData {
        UserData {
            id: 1,
            username: "ada".to_string(),
            password: String::new(),
            display_name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            photo_url: None,
            plan: plan.to_string(),
            customer_id: None,
            subscription_id: None,
            subscription_status: status.map(str::to_string),
            current_period_end: None,
            cancel_at_period_end: false,
            whiteboards_created: 0,
            created_at: now(),
        }
    }

    #[test]
    fn a_lapsed_premium_plan_degrades_to_free() {
        assert_eq!(user_with("premium", Some("active")).tier(), PlanTier::Premium);
        assert_eq!(user_with("premium", Some("trialing")).tier(), PlanTier::Premium);
        assert_eq!(user_with("premium", Some("past_due")).tier(), PlanTier::Free);
        assert_eq!(user_with("premium", None).tier(), PlanTier::Free);
        assert_eq!(user_with("free", Some("active")).tier(), PlanTier::Free);
    }
}
