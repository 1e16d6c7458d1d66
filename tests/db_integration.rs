//! Storage-layer integration tests against a real PostgreSQL instance.
//!
//! Gated on `TEST_DATABASE_URL`; run single-threaded:
//!
//! ```bash
//! TEST_DATABASE_URL=postgres://... cargo test --test db_integration -- --test-threads=1
//! ```

mod common;

use welcomehome::db::{self, AddItemOutcome, NewDonatedItem, NewItem, NewPiece, StatusUpdate};
use welcomehome::lifecycle::DeliveryStatus;

macro_rules! require_db {
    () => {
        if !common::has_test_db() {
            eprintln!("Skipping: TEST_DATABASE_URL not set");
            return;
        }
    };
}

fn chair(description: &str) -> NewDonatedItem<'_> {
    NewDonatedItem {
        item: NewItem {
            i_description: description,
            color: None,
            is_new: true,
            has_pieces: false,
            material: None,
            main_category: "Furniture",
            sub_category: "Chair",
        },
        pieces: vec![],
    }
}

#[tokio::test]
async fn duplicate_registration_leaves_no_partial_rows() {
    require_db!();
    let db = common::setup_test_db().await;
    common::register_account(&db, "alice", "pw", &["client"]).await;

    let role_set = welcomehome::roles::RoleSet::from_names(["donor"]).unwrap();
    let dup = db::NewPerson {
        username: "alice",
        password: "other-hash",
        fname: "Other",
        lname: "Person",
        email: "other@example.org",
        phones: &["+14155552671".to_string()],
        roles: &role_set,
    };
    let err = db.register_person(&dup).await.unwrap_err();
    assert!(db::is_unique_violation(&err));

    // No phone row and no donor role slipped in before the rollback.
    assert!(db.get_phones("alice").await.unwrap().is_empty());
    let person = db.get_person_with_roles("alice").await.unwrap().unwrap();
    assert_eq!(person.roles, "client");
}

#[tokio::test]
async fn empty_role_string_parses_to_empty_set() {
    require_db!();
    let db = common::setup_test_db().await;
    common::register_account(&db, "norole", "pw", &[]).await;

    let person = db.get_person_with_roles("norole").await.unwrap().unwrap();
    assert_eq!(person.roles, "");
    assert!(person.role_set().unwrap().is_empty());
}

#[tokio::test]
async fn add_item_reports_holding_order_on_conflict() {
    require_db!();
    let db = common::setup_test_db().await;
    common::register_account(&db, "bob", "pw", &["staff"]).await;
    common::register_account(&db, "alice", "pw", &["client"]).await;
    common::register_account(&db, "dana", "pw", &["donor"]).await;

    let recorded = db.record_donation("dana", &[chair("Stool")]).await.unwrap();
    let item_id = recorded[0].item_id;

    let first = db.start_order("alice", "bob", None).await.unwrap();
    let second = db.start_order("alice", "bob", None).await.unwrap();

    assert_eq!(
        db.add_item_to_order(first, item_id).await.unwrap(),
        AddItemOutcome::Added
    );
    assert_eq!(
        db.add_item_to_order(second, item_id).await.unwrap(),
        AddItemOutcome::AlreadyInOrder(first)
    );
    assert_eq!(
        db.add_item_to_order(first, item_id).await.unwrap(),
        AddItemOutcome::AlreadyInOrder(first)
    );
}

#[tokio::test]
async fn record_donation_rolls_back_whole_batch_on_bad_category() {
    require_db!();
    let db = common::setup_test_db().await;
    common::register_account(&db, "dana", "pw", &["donor"]).await;

    let bad = NewDonatedItem {
        item: NewItem {
            i_description: "Unknowable",
            color: None,
            is_new: true,
            has_pieces: false,
            material: None,
            main_category: "Furniture",
            sub_category: "Nonsense",
        },
        pieces: vec![],
    };
    let result = db.record_donation("dana", &[chair("Good chair"), bad]).await;
    assert!(result.is_err());
    assert_eq!(db.count_items().await.unwrap(), 0);
}

#[tokio::test]
async fn record_donation_auto_creates_locations() {
    require_db!();
    let db = common::setup_test_db().await;
    common::register_account(&db, "dana", "pw", &["donor"]).await;

    let item = NewDonatedItem {
        item: NewItem {
            i_description: "Sectional couch",
            color: Some("grey"),
            is_new: false,
            has_pieces: true,
            material: Some("fabric"),
            main_category: "Furniture",
            sub_category: "Couch",
        },
        pieces: vec![NewPiece {
            p_description: "Left section",
            length: Some(120),
            width: Some(90),
            height: Some(80),
            room_num: 9,
            shelf_num: 9,
            p_notes: None,
        }],
    };
    let recorded = db.record_donation("dana", &[item]).await.unwrap();
    let pieces = db.get_item_locations(recorded[0].item_id).await.unwrap();
    assert_eq!(pieces.len(), 1);
    assert_eq!(pieces[0].room_num, Some(9));
    assert_eq!(pieces[0].shelf, Some("Shelf-9".to_string()));
}

#[tokio::test]
async fn prepare_order_relocates_every_piece() {
    require_db!();
    let db = common::setup_test_db().await;
    common::register_account(&db, "bob", "pw", &["staff"]).await;
    common::register_account(&db, "alice", "pw", &["client"]).await;
    common::register_account(&db, "dana", "pw", &["donor"]).await;

    let item = NewDonatedItem {
        item: NewItem {
            i_description: "Bunk bed",
            color: None,
            is_new: true,
            has_pieces: true,
            material: Some("pine"),
            main_category: "Furniture",
            sub_category: "Bed",
        },
        pieces: vec![
            NewPiece {
                p_description: "Frame",
                length: None,
                width: None,
                height: None,
                room_num: 1,
                shelf_num: 1,
                p_notes: None,
            },
            NewPiece {
                p_description: "Ladder",
                length: None,
                width: None,
                height: None,
                room_num: 2,
                shelf_num: 1,
                p_notes: None,
            },
        ],
    };
    let recorded = db.record_donation("dana", &[item]).await.unwrap();
    let item_id = recorded[0].item_id;

    let order_id = db.start_order("alice", "bob", None).await.unwrap();
    db.add_item_to_order(order_id, item_id).await.unwrap();
    db.prepare_order(order_id).await.unwrap();

    let pieces = db.get_order_items(order_id).await.unwrap();
    assert_eq!(pieces.len(), 2);
    for piece in &pieces {
        assert_eq!(piece.room_num, Some(4));
        assert_eq!(piece.shelf_num, Some(3));
    }

    let locations = db.get_item_locations(item_id).await.unwrap();
    assert!(locations
        .iter()
        .all(|p| p.shelf.as_deref() == Some("Holding")));
}

#[tokio::test]
async fn status_updates_skip_unauthorized_actors() {
    require_db!();
    let db = common::setup_test_db().await;
    common::register_account(&db, "bob", "pw", &["staff"]).await;
    common::register_account(&db, "alice", "pw", &["client"]).await;
    common::register_account(&db, "dana", "pw", &["donor"]).await;
    common::register_account(&db, "vick", "pw", &["volunteer"]).await;

    let recorded = db.record_donation("dana", &[chair("Rocker")]).await.unwrap();
    let item_id = recorded[0].item_id;
    let order_id = db.start_order("alice", "bob", None).await.unwrap();
    db.add_item_to_order(order_id, item_id).await.unwrap();

    // Assign vick to the item directly, the way a supervisor would.
    sqlx::query(
        "INSERT INTO delivered (username, order_id, item_id, status, date)
         VALUES ($1, $2, $3, 'Pending', NOW())",
    )
    .bind("vick")
    .bind(order_id)
    .bind(item_id)
    .execute(db.pool())
    .await
    .unwrap();

    // An unrelated volunteer cannot touch the item.
    common::register_account(&db, "mallory", "pw", &["volunteer"]).await;
    let applied = db
        .update_item_statuses(
            order_id,
            "mallory",
            &[StatusUpdate {
                item_id,
                status: DeliveryStatus::Delivered,
            }],
        )
        .await
        .unwrap();
    assert_eq!(applied, 0);

    // The assigned volunteer can.
    let applied = db
        .update_item_statuses(
            order_id,
            "vick",
            &[StatusUpdate {
                item_id,
                status: DeliveryStatus::InProgress,
            }],
        )
        .await
        .unwrap();
    assert_eq!(applied, 1);

    // So can the supervisor.
    let applied = db
        .update_item_statuses(
            order_id,
            "bob",
            &[StatusUpdate {
                item_id,
                status: DeliveryStatus::Delivered,
            }],
        )
        .await
        .unwrap();
    assert_eq!(applied, 1);

    // An unknown order applies nothing and still succeeds.
    let applied = db
        .update_item_statuses(
            999_999,
            "bob",
            &[StatusUpdate {
                item_id,
                status: DeliveryStatus::Delivered,
            }],
        )
        .await
        .unwrap();
    assert_eq!(applied, 0);
}

#[tokio::test]
async fn projections_share_one_status_derivation() {
    require_db!();
    let db = common::setup_test_db().await;
    common::register_account(&db, "bob", "pw", &["staff"]).await;
    common::register_account(&db, "alice", "pw", &["client"]).await;
    common::register_account(&db, "dana", "pw", &["donor"]).await;
    common::register_account(&db, "vick", "pw", &["volunteer"]).await;

    let recorded = db.record_donation("dana", &[chair("Footstool")]).await.unwrap();
    let item_id = recorded[0].item_id;
    let order_id = db.start_order("alice", "bob", None).await.unwrap();
    db.add_item_to_order(order_id, item_id).await.unwrap();

    // One Pending assignment alongside the initial InProgress row: every
    // view must read Pending.
    sqlx::query(
        "INSERT INTO delivered (username, order_id, item_id, status, date)
         VALUES ('vick', $1, $2, 'Pending', NOW())",
    )
    .bind(order_id)
    .bind(item_id)
    .execute(db.pool())
    .await
    .unwrap();

    let client_view = db.client_orders("alice").await.unwrap();
    let staff_view = db.staff_orders().await.unwrap();
    let volunteer_view = db.volunteer_orders("vick").await.unwrap();
    let donor_view = db.donor_orders("dana").await.unwrap();

    assert_eq!(client_view[0].status, DeliveryStatus::Pending);
    assert_eq!(staff_view[0].status, DeliveryStatus::Pending);
    assert_eq!(volunteer_view[0].status, DeliveryStatus::Pending);
    assert_eq!(donor_view[0].status, DeliveryStatus::Pending);

    // Flip everything to Delivered: all views agree again.
    sqlx::query("UPDATE delivered SET status = 'Delivered' WHERE order_id = $1")
        .bind(order_id)
        .execute(db.pool())
        .await
        .unwrap();

    assert_eq!(
        db.client_orders("alice").await.unwrap()[0].status,
        DeliveryStatus::Delivered
    );
    assert_eq!(
        db.staff_orders().await.unwrap()[0].status,
        DeliveryStatus::Delivered
    );
}

#[tokio::test]
async fn start_order_writes_initial_supervisor_assignment() {
    require_db!();
    let db = common::setup_test_db().await;
    common::register_account(&db, "bob", "pw", &["staff"]).await;
    common::register_account(&db, "alice", "pw", &["client"]).await;

    let order_id = db.start_order("alice", "bob", None).await.unwrap();

    // The initial delivered row attributes the start to the supervisor.
    let (username, status): (String, String) = sqlx::query_as(
        "SELECT username, status FROM delivered WHERE order_id = $1",
    )
    .bind(order_id)
    .fetch_one(db.pool())
    .await
    .unwrap();
    assert_eq!(username, "bob");
    assert_eq!(status, "InProgress");
}
