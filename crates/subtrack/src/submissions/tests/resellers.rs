use super::common::*;
use std::sync::Arc;

use crate::submissions::domain::{ResellerId, ResellerUpdate};
use crate::submissions::SubmissionError;

fn second_reseller() -> ResellerId {
    ResellerId("reseller-002".to_string())
}

#[test]
fn directory_lists_seeded_resellers_by_id() {
    let (service, _) = build_service(at(2024, 1, 1));

    let resellers = service.list_resellers().expect("list resellers");

    let ids: Vec<_> = resellers.iter().map(|r| r.id.0.as_str()).collect();
    assert_eq!(ids, vec!["reseller-001", "reseller-002"]);
    assert!(resellers.iter().all(|r| !r.banned));
}

#[test]
fn unknown_reseller_is_not_found() {
    let (service, _) = build_service(at(2024, 1, 1));
    let missing = ResellerId("reseller-404".to_string());

    assert!(matches!(
        service.get_reseller(&missing),
        Err(SubmissionError::NotFound { entity: "reseller", .. })
    ));
    assert!(matches!(
        service.set_reseller_banned(&missing, true),
        Err(SubmissionError::NotFound { entity: "reseller", .. })
    ));
    assert!(matches!(
        service.update_reseller_info(&missing, ResellerUpdate::default()),
        Err(SubmissionError::NotFound { entity: "reseller", .. })
    ));
    assert!(matches!(
        service.delete_reseller(&missing),
        Err(SubmissionError::NotFound { entity: "reseller", .. })
    ));
}

#[test]
fn ban_and_reinstate_keep_submissions() {
    let repository = Arc::new(MemoryRepository::default());
    let resellers = Arc::new(MemoryResellers::seeded(at(2024, 1, 1)));
    let service = service_with(repository.clone(), resellers.clone(), at(2024, 2, 1));
    let filed = service.create(new_submission()).expect("create succeeds");

    let banned = service
        .set_reseller_banned(&reseller_id(), true)
        .expect("ban succeeds");
    assert!(banned.banned);
    assert_eq!(banned.updated_at, at(2024, 2, 1));
    assert_eq!(repository.stored(&filed.id), filed);

    let reinstated = service
        .set_reseller_banned(&reseller_id(), false)
        .expect("unban succeeds");
    assert!(!reinstated.banned);
    assert_eq!(resellers.stored(&reseller_id()), Some(reinstated));
}

#[test]
fn update_info_trims_and_keeps_filed_names() {
    let repository = Arc::new(MemoryRepository::default());
    let resellers = Arc::new(MemoryResellers::seeded(at(2024, 1, 1)));
    let service = service_with(repository.clone(), resellers, at(2024, 3, 1));
    let filed = service.create(new_submission()).expect("create succeeds");

    let updated = service
        .update_reseller_info(
            &reseller_id(),
            ResellerUpdate {
                name: Some("  North Desk ".to_string()),
                email: Some(" north@example.com ".to_string()),
                phone: None,
            },
        )
        .expect("update succeeds");

    assert_eq!(updated.name, "North Desk");
    assert_eq!(updated.email, "north@example.com");
    assert_eq!(updated.phone, "01700000001");
    assert_eq!(updated.updated_at, at(2024, 3, 1));
    assert_eq!(repository.stored(&filed.id).reseller_name, "Reseller One");

    let next = service.create(new_submission()).expect("create succeeds");
    assert_eq!(next.reseller_name, "North Desk");
}

#[test]
fn update_info_reports_every_invalid_field() {
    let resellers = Arc::new(MemoryResellers::seeded(at(2024, 1, 1)));
    let service = service_with(
        Arc::new(MemoryRepository::default()),
        resellers.clone(),
        at(2024, 3, 1),
    );
    let before = resellers.stored(&reseller_id());

    let outcome = service.update_reseller_info(
        &reseller_id(),
        ResellerUpdate {
            name: Some("   ".to_string()),
            email: Some("not-an-email".to_string()),
            phone: Some("".to_string()),
        },
    );

    match outcome {
        Err(SubmissionError::Validation(fields)) => {
            assert_eq!(fields.get("name"), Some(&["Name cannot be blank.".to_string()][..]));
            assert!(fields.get("email").is_some());
            assert!(fields.get("phone").is_some());
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(resellers.stored(&reseller_id()), before);
}

#[test]
fn delete_removes_reseller_and_only_their_submissions() {
    let repository = Arc::new(MemoryRepository::default());
    let resellers = Arc::new(MemoryResellers::seeded(at(2024, 1, 1)));
    let service = service_with(repository.clone(), resellers.clone(), at(2024, 2, 1));

    service.create(new_submission()).expect("first");
    service.create_active(new_submission()).expect("second");
    let mut other = new_submission();
    other.reseller_id = second_reseller();
    let kept = service.create(other).expect("other reseller");

    let removed = service.delete_reseller(&reseller_id()).expect("delete");

    assert_eq!(removed, 2);
    assert!(resellers.stored(&reseller_id()).is_none());
    let remaining = service.list_all().expect("list all");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, kept.id);

    assert!(matches!(
        service.create(new_submission()),
        Err(SubmissionError::NotFound { entity: "reseller", .. })
    ));
}
