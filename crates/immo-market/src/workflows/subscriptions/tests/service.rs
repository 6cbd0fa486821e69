use std::sync::Arc;

use chrono::{Duration, Utc};

use super::common::*;
use crate::auth::AccessError;
use crate::store::RepositoryError;
use crate::workflows::accounts::domain::Role;
use crate::workflows::accounts::repository::UserDirectory;
use crate::workflows::notifications::domain::NotificationKind;
use crate::workflows::notifications::repository::NotificationStore;
use crate::workflows::subscriptions::domain::{
    PaymentStatus, RequestStatus, SubscriptionPlan, SubscriptionRequestId,
};
use crate::workflows::subscriptions::repository::{RequestFilter, SubscriptionStore};
use crate::workflows::subscriptions::{ReviewError, SubmissionError, SubscriptionService};

#[test]
fn submit_inserts_one_pending_request_at_plan_price() {
    for plan in SubscriptionPlan::ALL {
        let fixture = fixture();
        let draft = fixture
            .service
            .prepare(&principal(&fixture.agent), plan)
            .expect("profile complete");
        let request = fixture.service.confirm(draft).expect("request stored");

        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.payment_status, PaymentStatus::Pending);
        assert_eq!(request.amount, plan.price());
        assert_eq!(request.plan, plan);
        assert_eq!(
            fixture
                .store
                .requests_newest_first()
                .expect("list succeeds")
                .len(),
            1
        );
    }
}

#[test]
fn incomplete_profile_is_refused_without_touching_the_store() {
    let store = Arc::new(RecordingStore::default());
    let mut incomplete = profile("Awa", "awa@immo.test", "Medina");
    incomplete.phone.clear();
    let account = register(&*store, Role::Demarcheur, incomplete);
    let service = SubscriptionService::new(store.clone());

    match service.prepare(&principal(&account), SubscriptionPlan::Basic) {
        Err(SubmissionError::IncompleteProfile { missing }) => assert_eq!(missing, vec!["phone"]),
        other => panic!("expected incomplete profile, got {other:?}"),
    }
    assert_eq!(store.insert_count(), 0);
}

#[test]
fn store_failures_surface_their_classification() {
    for error in [
        RepositoryError::PermissionDenied,
        RepositoryError::Unavailable("offline".to_string()),
        RepositoryError::AlreadyExists,
    ] {
        let store = Arc::new(FailingStore::new(error.clone()));
        let account = register(
            &*store,
            Role::Demarcheur,
            profile("Awa", "awa@immo.test", "Medina"),
        );
        let service = SubscriptionService::new(store);
        let draft = service
            .prepare(&principal(&account), SubscriptionPlan::Premium)
            .expect("profile complete");

        match service.confirm(draft) {
            Err(SubmissionError::Repository(actual)) => assert_eq!(actual, error),
            other => panic!("expected repository error, got {other:?}"),
        }
    }
}

#[test]
fn approve_grants_thirty_days_and_notifies_once() {
    for plan in SubscriptionPlan::ALL {
        let fixture = fixture();
        let draft = fixture
            .service
            .prepare(&principal(&fixture.agent), plan)
            .expect("draft");
        let request = fixture.service.confirm(draft).expect("stored");

        let receipt = fixture
            .service
            .approve(&principal(&fixture.admin), &request.id)
            .expect("approval commits");
        assert_eq!(receipt.request.status, RequestStatus::Approved);
        assert_eq!(receipt.request.payment_status, PaymentStatus::Confirmed);
        assert_eq!(receipt.request.reviewed_by, Some(fixture.admin.id.clone()));

        let user = fixture
            .store
            .fetch_user(&fixture.agent.id)
            .expect("fetch")
            .expect("user present");
        let grant = user.subscription.expect("grant written");
        assert_eq!(grant.plan, plan);
        assert_eq!(grant.ends_at - grant.starts_at, Duration::days(30));

        let notifications = fixture
            .store
            .notifications_for(&fixture.agent.id, false)
            .expect("query");
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].kind, NotificationKind::SubscriptionCreated);
        assert!(!notifications[0].read);
    }
}

#[test]
fn reject_leaves_user_untouched_and_silent() {
    let fixture = fixture();
    let draft = fixture
        .service
        .prepare(&principal(&fixture.agent), SubscriptionPlan::Basic)
        .expect("draft");
    let request = fixture.service.confirm(draft).expect("stored");

    let receipt = fixture
        .service
        .reject(&principal(&fixture.admin), &request.id)
        .expect("rejection commits");
    assert_eq!(receipt.request.status, RequestStatus::Rejected);
    assert_eq!(receipt.request.payment_status, PaymentStatus::Pending);
    assert!(receipt.notification.is_none());

    let user = fixture
        .store
        .fetch_user(&fixture.agent.id)
        .expect("fetch")
        .expect("present");
    assert!(user.subscription.is_none());
    assert!(fixture
        .store
        .notifications_for(&fixture.agent.id, false)
        .expect("query")
        .is_empty());
}

#[test]
fn reviewed_requests_cannot_be_reviewed_again() {
    let fixture = fixture();
    let draft = fixture
        .service
        .prepare(&principal(&fixture.agent), SubscriptionPlan::Premium)
        .expect("draft");
    let request = fixture.service.confirm(draft).expect("stored");
    let admin = principal(&fixture.admin);

    fixture.service.approve(&admin, &request.id).expect("first approval");

    match fixture.service.approve(&admin, &request.id) {
        Err(ReviewError::AlreadyReviewed(RequestStatus::Approved)) => {}
        other => panic!("expected already reviewed, got {other:?}"),
    }
    match fixture.service.reject(&admin, &request.id) {
        Err(ReviewError::AlreadyReviewed(RequestStatus::Approved)) => {}
        other => panic!("expected already reviewed, got {other:?}"),
    }

    let entries = fixture
        .service
        .review_queue(&admin, &RequestFilter::default())
        .expect("queue loads");
    assert!(!entries[0].can_approve);
    assert!(!entries[0].can_reject);
    assert_eq!(
        fixture
            .store
            .notifications_for(&fixture.agent.id, false)
            .expect("query")
            .len(),
        1
    );
}

#[test]
fn concurrent_approvals_commit_exactly_once() {
    let fixture = fixture();
    let second_admin = register(
        &*fixture.store,
        Role::Admin,
        profile("Cheikh", "cheikh@immo.test", "Fann"),
    );
    let draft = fixture
        .service
        .prepare(&principal(&fixture.agent), SubscriptionPlan::Basic)
        .expect("draft");
    let request = fixture.service.confirm(draft).expect("stored");

    let service = Arc::new(SubscriptionService::new(fixture.store.clone()));
    let reviewers = [principal(&fixture.admin), principal(&second_admin)];
    let outcomes: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = reviewers
            .iter()
            .cycle()
            .take(8)
            .map(|reviewer| {
                let service = service.clone();
                let id = request.id.clone();
                scope.spawn(move || service.approve(reviewer, &id))
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("thread completes"))
            .collect()
    });

    let applied = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    assert_eq!(applied, 1);
    assert!(outcomes.iter().all(|outcome| matches!(
        outcome,
        Ok(_) | Err(ReviewError::AlreadyReviewed(RequestStatus::Approved))
    )));
    assert_eq!(
        fixture
            .store
            .notifications_for(&fixture.agent.id, false)
            .expect("query")
            .len(),
        1
    );
}

#[test]
fn review_actions_require_admin_role() {
    let fixture = fixture();
    let draft = fixture
        .service
        .prepare(&principal(&fixture.agent), SubscriptionPlan::Basic)
        .expect("draft");
    let request = fixture.service.confirm(draft).expect("stored");

    match fixture.service.approve(&principal(&fixture.agent), &request.id) {
        Err(ReviewError::Access(AccessError::Forbidden { .. })) => {}
        other => panic!("expected forbidden, got {other:?}"),
    }
    match fixture
        .service
        .review_queue(&principal(&fixture.agent), &RequestFilter::default())
    {
        Err(ReviewError::Access(AccessError::Forbidden { .. })) => {}
        other => panic!("expected forbidden, got {other:?}"),
    }
    let stored = fixture
        .store
        .fetch_request(&request.id)
        .expect("fetch")
        .expect("present");
    assert_eq!(stored.status, RequestStatus::Pending);
}

#[test]
fn unknown_request_is_not_found() {
    let fixture = fixture();
    let missing = SubscriptionRequestId("req-999999".to_string());
    match fixture.service.approve(&principal(&fixture.admin), &missing) {
        Err(ReviewError::NotFound(id)) => assert_eq!(id, missing),
        other => panic!("expected not found, got {other:?}"),
    }
}

#[test]
fn review_queue_filters_case_insensitively_newest_first() {
    let fixture = fixture();
    let other = register(
        &*fixture.store,
        Role::Demarcheur,
        profile("Mariama Ba", "mariama@immo.test", "Almadies"),
    );
    for account in [&fixture.agent, &other] {
        let draft = fixture
            .service
            .prepare(&principal(account), SubscriptionPlan::Basic)
            .expect("draft");
        fixture.service.confirm(draft).expect("stored");
    }
    let admin = principal(&fixture.admin);

    let all = fixture
        .service
        .review_queue(&admin, &RequestFilter::default())
        .expect("queue");
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].request.applicant.name, "Mariama Ba");
    assert!(all.iter().all(|entry| entry.can_approve && entry.can_reject));

    let by_zone = fixture
        .service
        .review_queue(&admin, &RequestFilter::search("ALMADIES"))
        .expect("queue");
    assert_eq!(by_zone.len(), 1);
    assert_eq!(by_zone[0].request.applicant.user_id, other.id);

    let by_email = fixture
        .service
        .review_queue(&admin, &RequestFilter::search("ibrahima@"))
        .expect("queue");
    assert_eq!(by_email.len(), 1);

    let approved_only = fixture
        .service
        .review_queue(
            &admin,
            &RequestFilter {
                search: None,
                status: Some(RequestStatus::Approved),
            },
        )
        .expect("queue");
    assert!(approved_only.is_empty());
}

#[test]
fn snapshot_is_not_rewritten_by_later_profile_edits() {
    let fixture = fixture();
    let draft = fixture
        .service
        .prepare(&principal(&fixture.agent), SubscriptionPlan::Trial)
        .expect("draft");
    let request = fixture.service.confirm(draft).expect("stored");

    let mut edited = fixture.agent.profile.clone();
    edited.name = "Ibrahima Sow Jr".to_string();
    edited.zone = "Yoff".to_string();
    fixture
        .store
        .update_profile(&fixture.agent.id, edited, Utc::now())
        .expect("profile updates");

    let stored = fixture
        .store
        .fetch_request(&request.id)
        .expect("fetch")
        .expect("present");
    assert_eq!(stored.applicant.name, "Ibrahima Sow");
    assert_eq!(stored.applicant.zone, "Parcelles Assainies");
    assert_eq!(stored.applicant.email, fixture.agent.profile.email);
}

#[test]
fn export_lists_filtered_requests_as_csv() {
    let fixture = fixture();
    let draft = fixture
        .service
        .prepare(&principal(&fixture.agent), SubscriptionPlan::Premium)
        .expect("draft");
    fixture.service.confirm(draft).expect("stored");

    let csv = fixture
        .service
        .export_csv(&principal(&fixture.admin), &RequestFilter::default())
        .expect("export renders");
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("id,created_at,name,email,phone,zone,country,plan,amount,currency,status,payment_status")
    );
    let row = lines.next().expect("one data row");
    assert!(row.contains("Ibrahima Sow"));
    assert!(row.contains("premium,25000,XOF,pending,pending"));
    assert!(lines.next().is_none());
}
