//! Integration tests for `SqliteStore` against an in-memory database.

use std::sync::Arc;

use chrono::{DateTime, TimeZone as _, Utc};
use uuid::Uuid;
use xpecto_core::{
  Error as CoreError,
  catalog::{Exhibition, Session},
  identity::{Identity, NewIdentity, ProfileCompletion, Role},
  pricing::PricingPolicy,
  registration::{PaymentStatus, PaymentUpdate, RegistrationOutcome, Tier},
  store::{ProfileStore, RegistrationLedger, Repository},
  workflow::RegistrationWorkflow,
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn new_identity(email: &str, google_id: Option<&str>) -> NewIdentity {
  NewIdentity {
    google_id:     google_id.map(str::to_owned),
    email:         email.to_owned(),
    name:          "Asha".into(),
    avatar:        None,
    role:          Role::User,
    password_hash: None,
  }
}

async fn identity(s: &SqliteStore, email: &str, role: Role) -> Identity {
  let created = s
    .create_identity(new_identity(email, None))
    .await
    .unwrap()
    .unwrap();
  if role == Role::User {
    return created;
  }
  s.set_role(email, role).await.unwrap().unwrap()
}

fn workflow(s: &SqliteStore) -> RegistrationWorkflow<SqliteStore> {
  RegistrationWorkflow::new(Arc::new(s.clone()), PricingPolicy::default())
}

fn january() -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2026, 1, 10, 10, 0, 0).unwrap()
}

fn march() -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap()
}

// ─── Identities ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_identity() {
  let s = store().await;

  let created = s
    .create_identity(new_identity("a@x.com", Some("g-1")))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(created.role, Role::User);

  let fetched = s.get_identity(created.id).await.unwrap().unwrap();
  assert_eq!(fetched, created);

  let by_email = s.find_identity_by_email("a@x.com").await.unwrap().unwrap();
  assert_eq!(by_email.id, created.id);
}

#[tokio::test]
async fn get_identity_missing_returns_none() {
  let s = store().await;
  assert!(s.get_identity(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_email_or_google_id_is_not_created() {
  let s = store().await;
  s.create_identity(new_identity("a@x.com", Some("g-1")))
    .await
    .unwrap()
    .unwrap();

  let dup_email = s
    .create_identity(new_identity("a@x.com", Some("g-2")))
    .await
    .unwrap();
  assert!(dup_email.is_none());

  let dup_google = s
    .create_identity(new_identity("b@x.com", Some("g-1")))
    .await
    .unwrap();
  assert!(dup_google.is_none());
  assert!(s.find_identity_by_email("b@x.com").await.unwrap().is_none());
}

#[tokio::test]
async fn provider_lookup_prefers_google_id() {
  let s = store().await;
  let by_google = s
    .create_identity(new_identity("old@x.com", Some("g-1")))
    .await
    .unwrap()
    .unwrap();
  s.create_identity(new_identity("new@x.com", None))
    .await
    .unwrap()
    .unwrap();

  let found = s
    .find_identity_for_provider("g-1", "new@x.com")
    .await
    .unwrap()
    .unwrap();
  assert_eq!(found.id, by_google.id);

  let by_email = s
    .find_identity_for_provider("g-unknown", "new@x.com")
    .await
    .unwrap()
    .unwrap();
  assert_eq!(by_email.email, "new@x.com");
}

fn completion() -> ProfileCompletion {
  ProfileCompletion::new(Some("A@Uni.edu"), Some("Uni"), Some("999")).unwrap()
}

#[tokio::test]
async fn link_provider_backfills_once() {
  let s = store().await;
  let identity = identity(&s, "a@x.com", Role::User).await;

  let linked = s
    .link_provider(identity.id, "g-9", Some("https://img/a.png"))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(linked.google_id.as_deref(), Some("g-9"));
  assert_eq!(linked.avatar.as_deref(), Some("https://img/a.png"));
  assert_eq!(linked.role, Role::User);
  assert!(linked.updated_at >= linked.created_at);

  // A stored google_id is kept; an absent avatar keeps the old one.
  let again = s.link_provider(identity.id, "g-other", None).await.unwrap().unwrap();
  assert_eq!(again.google_id.as_deref(), Some("g-9"));
  assert_eq!(again.avatar.as_deref(), Some("https://img/a.png"));

  let via_google = s
    .find_identity_for_provider("g-9", "nobody@x.com")
    .await
    .unwrap()
    .unwrap();
  assert_eq!(via_google.id, identity.id);
}

#[tokio::test]
async fn complete_profile_writes_only_completion_fields() {
  let s = store().await;
  let identity = identity(&s, "a@x.com", Role::User).await;

  let saved = s.complete_profile(identity.id, &completion()).await.unwrap().unwrap();
  assert_eq!(saved.secondary_email.as_deref(), Some("a@uni.edu"));
  assert_eq!(saved.organization_name.as_deref(), Some("Uni"));
  assert_eq!(saved.phone.as_deref(), Some("999"));
  assert_eq!(saved.name, identity.name);
  assert_eq!(saved.role, Role::User);

  assert!(
    s.complete_profile(Uuid::new_v4(), &completion())
      .await
      .unwrap()
      .is_none()
  );
}

#[tokio::test]
async fn profile_writes_do_not_clobber_each_other() {
  let s = store().await;
  let first = identity(&s, "a@x.com", Role::User).await;
  let second = identity(&s, "b@x.com", Role::User).await;

  // Completion first, then a sign-in that links Google.
  s.complete_profile(first.id, &completion()).await.unwrap();
  s.link_provider(first.id, "g-1", Some("https://img/1.png")).await.unwrap();
  let stored = s.get_identity(first.id).await.unwrap().unwrap();
  assert_eq!(stored.google_id.as_deref(), Some("g-1"));
  assert_eq!(stored.secondary_email.as_deref(), Some("a@uni.edu"));

  // Link first, then complete.
  s.link_provider(second.id, "g-2", None).await.unwrap();
  s.complete_profile(second.id, &completion()).await.unwrap();
  let stored = s.get_identity(second.id).await.unwrap().unwrap();
  assert_eq!(stored.google_id.as_deref(), Some("g-2"));
  assert_eq!(stored.phone.as_deref(), Some("999"));

  // Both at once.
  let third = identity(&s, "c@x.com", Role::User).await;
  let c = completion();
  let (linked, completed) = tokio::join!(
    s.link_provider(third.id, "g-3", None),
    s.complete_profile(third.id, &c),
  );
  linked.unwrap().unwrap();
  completed.unwrap().unwrap();
  let stored = s.get_identity(third.id).await.unwrap().unwrap();
  assert_eq!(stored.google_id.as_deref(), Some("g-3"));
  assert_eq!(stored.organization_name.as_deref(), Some("Uni"));
}

#[tokio::test]
async fn set_role_unknown_email_returns_none() {
  let s = store().await;
  assert!(s.set_role("ghost@x.com", Role::Admin).await.unwrap().is_none());
}

#[tokio::test]
async fn password_hash_only_for_local_accounts() {
  let s = store().await;
  let mut input = new_identity("local@x.com", None);
  input.password_hash = Some("$argon2id$stub".into());
  let local = s.create_identity(input).await.unwrap().unwrap();
  let google = s
    .create_identity(new_identity("g@x.com", Some("g-1")))
    .await
    .unwrap()
    .unwrap();

  assert_eq!(
    s.password_hash(local.id).await.unwrap().as_deref(),
    Some("$argon2id$stub")
  );
  assert!(s.password_hash(google.id).await.unwrap().is_none());
}

// ─── Registrations ───────────────────────────────────────────────────────────

#[tokio::test]
async fn first_registration_is_early_bird_and_pending() {
  let s = store().await;
  let u = identity(&s, "u@x.com", Role::User).await;

  let outcome = workflow(&s).register(&u, january()).await.unwrap();
  let RegistrationOutcome::Created(r) = outcome else {
    panic!("expected a new registration");
  };
  assert_eq!(r.tier, Tier::EarlyBird);
  assert_eq!(r.amount, 2299);
  assert_eq!(r.payment_status, PaymentStatus::Pending);
  assert!(!r.payment_verified);
  assert_eq!(r.contact.email, "u@x.com");

  let stored = s.get_registration(r.id).await.unwrap().unwrap();
  assert_eq!(stored, r);
}

#[tokio::test]
async fn registration_after_cutoff_is_regular() {
  let s = store().await;
  let u = identity(&s, "u@x.com", Role::User).await;

  let r = workflow(&s).register(&u, march()).await.unwrap().into_registration();
  assert_eq!(r.tier, Tier::Regular);
  assert_eq!(r.amount, 2499);
}

#[tokio::test]
async fn second_registration_returns_existing() {
  let s = store().await;
  let wf = workflow(&s);
  let u = identity(&s, "u@x.com", Role::User).await;

  let first = wf.register(&u, january()).await.unwrap();
  let second = wf.register(&u, march()).await.unwrap();

  assert!(!first.is_existing());
  assert!(second.is_existing());
  assert_eq!(second.registration(), first.registration());
  assert_eq!(s.list_registrations().await.unwrap().len(), 1);
}

#[tokio::test]
async fn concurrent_registrations_create_exactly_one() {
  let s = store().await;
  let wf = Arc::new(workflow(&s));
  let u = identity(&s, "u@x.com", Role::User).await;

  let tasks: Vec<_> = (0..8)
    .map(|_| {
      let wf = wf.clone();
      let u = u.clone();
      tokio::spawn(async move { wf.register(&u, january()).await })
    })
    .collect();

  let mut outcomes = Vec::new();
  for task in tasks {
    outcomes.push(task.await.unwrap().unwrap());
  }

  let created = outcomes.iter().filter(|o| !o.is_existing()).count();
  assert_eq!(created, 1);
  let id = outcomes[0].registration().id;
  assert!(outcomes.iter().all(|o| o.registration().id == id));
  assert_eq!(s.list_registrations().await.unwrap().len(), 1);
}

#[tokio::test]
async fn failed_registration_allows_a_new_one() {
  let s = store().await;
  let wf = workflow(&s);
  let admin = identity(&s, "admin@x.com", Role::Admin).await;
  let u = identity(&s, "u@x.com", Role::User).await;

  let first = wf.register(&u, january()).await.unwrap().into_registration();
  wf.update_payment_status(&admin, first.id, PaymentUpdate {
    payment_status: Some(PaymentStatus::Failed),
    ..Default::default()
  })
  .await
  .unwrap();

  let second = wf.register(&u, march()).await.unwrap();
  assert!(!second.is_existing());
  assert_ne!(second.registration().id, first.id);

  let latest = wf.latest_for(&u).await.unwrap().unwrap();
  assert_eq!(latest.id, second.registration().id);
  assert_eq!(latest.tier, Tier::Regular);
}

#[tokio::test]
async fn reactivation_is_blocked_by_an_active_registration() {
  let s = store().await;
  let wf = workflow(&s);
  let admin = identity(&s, "admin@x.com", Role::Admin).await;
  let u = identity(&s, "u@x.com", Role::User).await;

  let first = wf.register(&u, january()).await.unwrap().into_registration();
  wf.update_payment_status(&admin, first.id, PaymentUpdate {
    payment_status: Some(PaymentStatus::Failed),
    ..Default::default()
  })
  .await
  .unwrap();
  let second = wf.register(&u, march()).await.unwrap().into_registration();

  let err = wf
    .update_payment_status(&admin, first.id, PaymentUpdate {
      payment_status: Some(PaymentStatus::Pending),
      notes:          Some("retry".into()),
      ..Default::default()
    })
    .await
    .unwrap_err();
  assert!(
    matches!(&err, CoreError::ActiveRegistrationExists(active) if active.id == second.id),
    "{err:?}"
  );

  // The refused update wrote nothing.
  let unchanged = s.get_registration(first.id).await.unwrap().unwrap();
  assert_eq!(unchanged.payment_status, PaymentStatus::Failed);
  assert!(unchanged.notes.is_none());

  // Once the newer one fails too, the old one can come back.
  wf.update_payment_status(&admin, second.id, PaymentUpdate {
    payment_status: Some(PaymentStatus::Failed),
    ..Default::default()
  })
  .await
  .unwrap();
  let revived = wf
    .update_payment_status(&admin, first.id, PaymentUpdate {
      payment_status: Some(PaymentStatus::Pending),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(revived.payment_status, PaymentStatus::Pending);
}

#[tokio::test]
async fn latest_for_without_registration_is_none() {
  let s = store().await;
  let u = identity(&s, "u@x.com", Role::User).await;
  assert!(workflow(&s).latest_for(&u).await.unwrap().is_none());
}

#[tokio::test]
async fn non_admin_cannot_update_payment() {
  let s = store().await;
  let wf = workflow(&s);
  let u = identity(&s, "u@x.com", Role::User).await;
  let r = wf.register(&u, january()).await.unwrap().into_registration();

  let err = wf
    .update_payment_status(&u, r.id, PaymentUpdate {
      payment_status: Some(PaymentStatus::Completed),
      ..Default::default()
    })
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::Forbidden { required: Role::Admin, .. }));

  let stored = s.get_registration(r.id).await.unwrap().unwrap();
  assert_eq!(stored, r);
}

#[tokio::test]
async fn admin_update_keeps_absent_fields() {
  let s = store().await;
  let wf = workflow(&s);
  let admin = identity(&s, "admin@x.com", Role::Admin).await;
  let u = identity(&s, "u@x.com", Role::User).await;
  let r = wf.register(&u, january()).await.unwrap().into_registration();

  let updated = wf
    .update_payment_status(&admin, r.id, PaymentUpdate {
      payment_status:   Some(PaymentStatus::Completed),
      payment_verified: Some(true),
      transaction_id:   Some("TXN-1".into()),
      notes:            None,
    })
    .await
    .unwrap();
  assert_eq!(updated.payment_status, PaymentStatus::Completed);
  assert!(updated.payment_verified);
  assert_eq!(updated.transaction_id.as_deref(), Some("TXN-1"));

  let again = wf
    .update_payment_status(&admin, r.id, PaymentUpdate {
      notes: Some("checked".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(again.transaction_id.as_deref(), Some("TXN-1"));
  assert_eq!(again.notes.as_deref(), Some("checked"));
  assert_eq!(again.tier, r.tier);
  assert_eq!(again.amount, r.amount);
}

#[tokio::test]
async fn update_unknown_registration_is_not_found() {
  let s = store().await;
  let admin = identity(&s, "admin@x.com", Role::Admin).await;
  let missing = Uuid::new_v4();

  let err = workflow(&s)
    .update_payment_status(&admin, missing, PaymentUpdate::default())
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::RegistrationNotFound(id) if id == missing));
}

#[tokio::test]
async fn listing_is_newest_first_with_owner() {
  let s = store().await;
  let wf = workflow(&s);
  let admin = identity(&s, "admin@x.com", Role::Admin).await;
  let a = identity(&s, "a@x.com", Role::User).await;
  let b = identity(&s, "b@x.com", Role::User).await;

  wf.register(&a, january()).await.unwrap();
  wf.register(&b, march()).await.unwrap();

  let listing = wf.list(&admin).await.unwrap();
  assert_eq!(listing.len(), 2);
  assert_eq!(listing[0].registration.owner_id, b.id);
  assert_eq!(listing[0].owner.as_ref().unwrap().email, "b@x.com");
  assert_eq!(listing[1].registration.owner_id, a.id);

  assert!(wf.list(&a).await.is_err());
}

#[tokio::test]
async fn stats_group_by_status() {
  let s = store().await;
  let wf = workflow(&s);
  let admin = identity(&s, "admin@x.com", Role::Admin).await;

  let mut ids = Vec::new();
  for email in ["a@x.com", "b@x.com", "c@x.com"] {
    let u = identity(&s, email, Role::User).await;
    ids.push(wf.register(&u, january()).await.unwrap().registration().id);
  }
  wf.update_payment_status(&admin, ids[0], PaymentUpdate {
    payment_status:   Some(PaymentStatus::Completed),
    payment_verified: Some(true),
    ..Default::default()
  })
  .await
  .unwrap();

  let stats = wf.stats(&admin).await.unwrap();
  assert_eq!(stats.total_count, 3);
  assert_eq!(stats.verified_count, 1);

  let pending = stats.bucket(PaymentStatus::Pending).unwrap();
  assert_eq!(pending.count, 2);
  assert_eq!(pending.total_amount, 4598);

  let completed = stats.bucket(PaymentStatus::Completed).unwrap();
  assert_eq!(completed.count, 1);
  assert_eq!(completed.total_amount, 2299);

  assert!(stats.bucket(PaymentStatus::Failed).is_none());
}

#[tokio::test]
async fn stats_on_empty_store() {
  let s = store().await;
  let admin = identity(&s, "admin@x.com", Role::Admin).await;

  let stats = workflow(&s).stats(&admin).await.unwrap();
  assert_eq!(stats.total_count, 0);
  assert_eq!(stats.verified_count, 0);
  assert!(stats.per_status.is_empty());
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

fn exhibition(title: &str) -> Exhibition {
  Exhibition {
    title:       title.into(),
    description: "Demo".into(),
    venue:       Some("Hall B".into()),
    club_name:   None,
    date:        None,
    image:       vec![],
    company:     None,
  }
}

#[tokio::test]
async fn catalog_crud() {
  let s = store().await;

  let first = s.create(exhibition("Robots")).await.unwrap();
  let second = s.create(exhibition("Drones")).await.unwrap();

  let all = <SqliteStore as Repository<Exhibition>>::list(&s).await.unwrap();
  assert_eq!(all.len(), 2);
  assert_eq!(all[0].id, second.id);

  let updated = s
    .update(first.id, exhibition("Robots v2"))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(updated.data.title, "Robots v2");
  assert_eq!(updated.created_at, first.created_at);

  assert!(<SqliteStore as Repository<Exhibition>>::delete(&s, first.id).await.unwrap());
  assert!(!<SqliteStore as Repository<Exhibition>>::delete(&s, first.id).await.unwrap());
  assert!(
    <SqliteStore as Repository<Exhibition>>::get(&s, first.id)
      .await
      .unwrap()
      .is_none()
  );
}

#[tokio::test]
async fn catalog_kinds_are_separate() {
  let s = store().await;
  let e = s.create(exhibition("Robots")).await.unwrap();

  let sessions = <SqliteStore as Repository<Session>>::list(&s).await.unwrap();
  assert!(sessions.is_empty());
  assert!(
    <SqliteStore as Repository<Session>>::get(&s, e.id)
      .await
      .unwrap()
      .is_none()
  );
}
