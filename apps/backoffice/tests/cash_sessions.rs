//! End-to-end cash session tests against an in-memory store.

use caja_backoffice::commands::{caja, register};
use caja_backoffice::state::{CajaAction, CajaScreen, ConfigState, DbState, Role, UserContext};
use caja_backoffice::{CashSessionManager, ErrorCode, ManagerError};
use caja_core::reconciliation::ReconciliationStatus;
use caja_core::{CoreError, Money, MovementKind, Register, SessionState};
use caja_db::{Database, DbConfig};
use tokio::sync::broadcast::error::TryRecvError;
use uuid::Uuid;

const BRANCH: &str = "branch-1";

struct Fixture {
    db: DbState,
    caja_1: Register,
    caja_2: Register,
    caja_3: Register,
}

impl Fixture {
    async fn new() -> Self {
        let database = Database::new(DbConfig::in_memory()).await.unwrap();
        let db = DbState::new(database);
        let manager = db.manager();

        let caja_1 = manager.create_register(BRANCH, "Caja 1").await.unwrap();
        let caja_2 = manager.create_register(BRANCH, "Caja 2").await.unwrap();
        let caja_3 = manager.create_register(BRANCH, "Caja 3").await.unwrap();

        Fixture {
            db,
            caja_1,
            caja_2,
            caja_3,
        }
    }

    fn manager(&self) -> &CashSessionManager {
        self.db.manager()
    }
}

fn operator() -> UserContext {
    UserContext::new(Uuid::new_v4().to_string(), BRANCH, Role::Operator)
}

fn admin() -> UserContext {
    UserContext::new(Uuid::new_v4().to_string(), BRANCH, Role::Admin)
}

fn rule(err: ManagerError) -> CoreError {
    match err {
        ManagerError::Rule(e) => e,
        ManagerError::Store(e) => panic!("expected a rule error, got store error: {e}"),
    }
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn scenario_full_lifecycle() {
    let fx = Fixture::new().await;
    let a = operator();
    let b = operator();
    let m = fx.manager();

    // 1. A opens Caja 1 with 10000
    let session = m
        .open_session(&fx.caja_1.id, &a.user_id, Money::from_minor(10_000), None)
        .await
        .unwrap();
    assert_eq!(session.state, SessionState::Open);
    assert_eq!(session.closing_balance, None);
    assert_eq!(session.closed_at, None);
    assert_eq!(session.branch_id, BRANCH);

    // 2. A cannot open Caja 2 while holding Caja 1
    let err = m
        .open_session(&fx.caja_2.id, &a.user_id, Money::zero(), None)
        .await
        .unwrap_err();
    assert!(matches!(rule(err), CoreError::OperatorHasOpenSession { .. }));

    // 3. B cannot open Caja 1 while A holds it
    let err = m
        .open_session(&fx.caja_1.id, &b.user_id, Money::zero(), None)
        .await
        .unwrap_err();
    assert!(matches!(rule(err), CoreError::RegisterInUse { .. }));

    // 4. A closes with 15000
    let closed = m
        .close_session(&session.id, Money::from_minor(15_000), None)
        .await
        .unwrap();
    assert_eq!(closed.state, SessionState::Closed);
    assert_eq!(closed.closing_balance, Some(15_000));
    assert!(closed.closed_at.is_some());

    // 6. Closing again is rejected and the row stays as it was
    let err = m
        .close_session(&session.id, Money::from_minor(1), Some("again"))
        .await
        .unwrap_err();
    assert!(matches!(rule(err), CoreError::SessionAlreadyClosed(_)));

    let stored = m.get_session(&session.id).await.unwrap().unwrap();
    assert_eq!(stored, closed);
}

#[tokio::test]
async fn scenario_admin_force_closes_abandoned_session() {
    let fx = Fixture::new().await;
    let screen = CajaScreen::new();
    let abandoned_by = operator();

    let session = fx
        .manager()
        .open_session(&fx.caja_3.id, &abandoned_by.user_id, Money::from_minor(5_000), None)
        .await
        .unwrap();

    let closed = caja::force_close_register(
        &fx.db,
        &screen,
        &admin(),
        session.id.clone(),
        "shift ended, no checkout".to_string(),
    )
    .await
    .unwrap();

    assert_eq!(closed.state, SessionState::Closed);
    assert!(closed.force_closed);
    assert!(closed.closed_at.is_some());
    assert!(closed
        .notes
        .as_deref()
        .unwrap()
        .contains("[ADMIN FORCE CLOSE] shift ended, no checkout"));
    // No operator count: the system's expected balance stands in
    assert_eq!(closed.closing_balance, Some(5_000));

    let rec = fx.manager().reconcile(&session.id).await.unwrap();
    assert_eq!(rec.status, ReconciliationStatus::Unverified);

    // The operator is free to open again
    fx.manager()
        .open_session(&fx.caja_3.id, &abandoned_by.user_id, Money::zero(), None)
        .await
        .unwrap();
}

// =============================================================================
// Properties
// =============================================================================

#[tokio::test]
async fn open_then_get_active_returns_same_session() {
    let fx = Fixture::new().await;
    let a = operator();

    let session = fx
        .manager()
        .open_session(&fx.caja_1.id, &a.user_id, Money::from_minor(1_000), Some("turno mañana"))
        .await
        .unwrap();

    let active = fx
        .manager()
        .get_active_session_for_user(&a.user_id)
        .await
        .unwrap();
    assert_eq!(active, Some(session));

    let nobody = fx
        .manager()
        .get_active_session_for_user(&Uuid::new_v4().to_string())
        .await
        .unwrap();
    assert_eq!(nobody, None);
}

#[tokio::test]
async fn negative_opening_balance_writes_nothing() {
    let fx = Fixture::new().await;
    let a = operator();
    let mut changes = fx.db.inner().changes().subscribe();

    let err = fx
        .manager()
        .open_session(&fx.caja_1.id, &a.user_id, Money::from_minor(-1), None)
        .await
        .unwrap_err();

    assert!(matches!(rule(err), CoreError::Validation(_)));
    assert!(matches!(changes.try_recv(), Err(TryRecvError::Empty)));
    assert!(fx.manager().list_open_sessions(BRANCH).await.unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_opens_on_one_register_admit_exactly_one() {
    let fx = Fixture::new().await;
    let a = operator();
    let b = operator();
    let m = fx.manager();

    let (first, second) = tokio::join!(
        m.open_session(&fx.caja_1.id, &a.user_id, Money::zero(), None),
        m.open_session(&fx.caja_1.id, &b.user_id, Money::zero(), None),
    );

    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);

    let loser = results.into_iter().find_map(Result::err).unwrap();
    assert!(matches!(rule(loser), CoreError::RegisterInUse { .. }));
    assert_eq!(m.list_open_sessions(BRANCH).await.unwrap().len(), 1);
}

#[tokio::test]
async fn concurrent_opens_by_one_operator_admit_exactly_one() {
    let fx = Fixture::new().await;
    let a = operator();
    let m = fx.manager();

    let (first, second) = tokio::join!(
        m.open_session(&fx.caja_1.id, &a.user_id, Money::zero(), None),
        m.open_session(&fx.caja_2.id, &a.user_id, Money::zero(), None),
    );

    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);

    let loser = results.into_iter().find_map(Result::err).unwrap();
    assert!(matches!(rule(loser), CoreError::OperatorHasOpenSession { .. }));
}

#[tokio::test]
async fn stored_sessions_keep_state_invariants() {
    let fx = Fixture::new().await;
    let m = fx.manager();

    let s1 = m
        .open_session(&fx.caja_1.id, &operator().user_id, Money::from_minor(100), None)
        .await
        .unwrap();
    let s2 = m
        .open_session(&fx.caja_2.id, &operator().user_id, Money::from_minor(200), None)
        .await
        .unwrap();
    m.close_session(&s1.id, Money::from_minor(300), None).await.unwrap();
    m.force_close_session(&s2.id, "cierre de turno").await.unwrap();
    m.open_session(&fx.caja_1.id, &operator().user_id, Money::zero(), None)
        .await
        .unwrap();

    let mut all = m.list_open_sessions(BRANCH).await.unwrap();
    all.extend(m.list_session_history(BRANCH, 200).await.unwrap());
    assert_eq!(all.len(), 3);

    for session in &all {
        session.check_invariants().unwrap();
        assert_eq!(session.closed_at.is_none(), session.state == SessionState::Open);
        assert_eq!(
            session.closing_balance.is_some(),
            session.state == SessionState::Closed
        );
    }

    // Opening balances never move
    assert_eq!(m.get_session(&s1.id).await.unwrap().unwrap().opening_balance, 100);
    assert_eq!(m.get_session(&s2.id).await.unwrap().unwrap().opening_balance, 200);
}

// =============================================================================
// Movements and reconciliation
// =============================================================================

#[tokio::test]
async fn summary_reports_short_drawer() {
    let fx = Fixture::new().await;
    let screen = CajaScreen::new();
    let config = ConfigState::default();
    let a = operator();

    let session = caja::open_register(&fx.db, &screen, &a, fx.caja_1.id.clone(), 10_000, None)
        .await
        .unwrap();
    caja::record_cash_movement(&fx.db, &screen, &a, session.id.clone(), MovementKind::CashSale, 7_500, None)
        .await
        .unwrap();
    caja::record_cash_movement(&fx.db, &screen, &a, session.id.clone(), MovementKind::CashRefund, 500, None)
        .await
        .unwrap();
    caja::close_register(&fx.db, &screen, &a, session.id.clone(), 16_000, Some("faltan 1000".into()))
        .await
        .unwrap();

    let summary = caja::get_session_summary(&fx.db, &config, &a, session.id.clone())
        .await
        .unwrap();

    assert_eq!(summary.movements.len(), 2);
    assert_eq!(summary.reconciliation.expected, Money::from_minor(17_000));
    assert_eq!(summary.reconciliation.status, ReconciliationStatus::Short);
    assert_eq!(summary.expected_display, "$17.000");
    assert_eq!(summary.declared_display.as_deref(), Some("$16.000"));
    assert_eq!(summary.difference_display.as_deref(), Some("-$1.000"));
}

// =============================================================================
// Commands and view state
// =============================================================================

#[tokio::test]
async fn open_and_close_update_the_screen() {
    let fx = Fixture::new().await;
    let screen = CajaScreen::new();
    let a = operator();

    let session = caja::open_register(&fx.db, &screen, &a, fx.caja_1.id.clone(), 10_000, None)
        .await
        .unwrap();

    let view = screen.snapshot();
    assert_eq!(view.my_session.as_ref().map(|s| s.id.as_str()), Some(session.id.as_str()));
    assert_eq!(view.open_sessions.len(), 1);
    assert!(view.pending.is_empty());
    assert!(view.last_error.is_none());

    caja::close_register(&fx.db, &screen, &a, session.id.clone(), 10_000, None)
        .await
        .unwrap();

    let view = screen.snapshot();
    assert!(view.my_session.is_none());
    assert!(view.open_sessions.is_empty());
}

#[tokio::test]
async fn failed_command_is_kept_as_last_error() {
    let fx = Fixture::new().await;
    let screen = CajaScreen::new();

    caja::open_register(&fx.db, &screen, &operator(), fx.caja_1.id.clone(), 0, None)
        .await
        .unwrap();

    let err = caja::open_register(&fx.db, &screen, &operator(), fx.caja_1.id.clone(), 0, None)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::RegisterInUse);
    assert_eq!(screen.snapshot().last_error, Some(err));

    caja::refresh_open_sessions(&fx.db, &screen, &operator())
        .await
        .unwrap();
    assert!(screen.snapshot().last_error.is_none());
}

#[tokio::test]
async fn double_submit_is_busy_and_writes_nothing() {
    let fx = Fixture::new().await;
    let screen = CajaScreen::new();
    let a = operator();

    let in_flight = screen.begin(CajaAction::Open).unwrap();
    let err = caja::open_register(&fx.db, &screen, &a, fx.caja_1.id.clone(), 0, None)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::Busy);
    assert!(fx.manager().get_active_session_for_user(&a.user_id).await.unwrap().is_none());

    drop(in_flight);
    caja::open_register(&fx.db, &screen, &a, fx.caja_1.id.clone(), 0, None)
        .await
        .unwrap();
}

#[tokio::test]
async fn only_owner_or_admin_may_close() {
    let fx = Fixture::new().await;
    let screen = CajaScreen::new();
    let owner = operator();

    let session = caja::open_register(&fx.db, &screen, &owner, fx.caja_1.id.clone(), 0, None)
        .await
        .unwrap();

    let err = caja::close_register(&fx.db, &screen, &operator(), session.id.clone(), 0, None)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::Forbidden);

    let err = caja::force_close_register(&fx.db, &screen, &owner, session.id.clone(), "x".into())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::Forbidden);

    caja::close_register(&fx.db, &screen, &admin(), session.id.clone(), 0, None)
        .await
        .unwrap();
}

#[tokio::test]
async fn sessions_of_other_branches_are_hidden() {
    let fx = Fixture::new().await;
    let screen = CajaScreen::new();
    let a = operator();

    let session = caja::open_register(&fx.db, &screen, &a, fx.caja_1.id.clone(), 0, None)
        .await
        .unwrap();

    let outsider = UserContext::new(Uuid::new_v4().to_string(), "branch-2", Role::Admin);
    let err = caja::force_close_register(&fx.db, &screen, &outsider, session.id, "x".into())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::Forbidden);

    let listed = caja::refresh_open_sessions(&fx.db, &CajaScreen::new(), &outsider)
        .await
        .unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn registers_of_other_branches_cannot_be_opened() {
    let fx = Fixture::new().await;
    let screen = CajaScreen::new();
    let a = operator();
    let foreign = fx.manager().create_register("branch-2", "Caja Norte").await.unwrap();

    let err = caja::open_register(&fx.db, &screen, &a, foreign.id.clone(), 5_000, None)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::Forbidden);
    assert_eq!(screen.snapshot().last_error, Some(err));

    assert!(fx.manager().get_active_session_for_user(&a.user_id).await.unwrap().is_none());
    assert!(fx.manager().list_open_sessions("branch-2").await.unwrap().is_empty());

    // A missing register is still reported by the manager.
    let err = caja::open_register(&fx.db, &screen, &a, Uuid::new_v4().to_string(), 0, None)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
}

#[tokio::test]
async fn register_administration() {
    let fx = Fixture::new().await;
    let boss = admin();
    let clerk = operator();

    let err = register::create_register(&fx.db, &clerk, "Caja 9".into())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::Forbidden);

    let created = register::create_register(&fx.db, &boss, "Caja 9".into())
        .await
        .unwrap();
    let err = register::create_register(&fx.db, &boss, "Caja 9".into())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ValidationError);

    let names: Vec<_> = register::list_registers(&fx.db, &clerk)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(names, vec!["Caja 1", "Caja 2", "Caja 3", "Caja 9"]);

    register::set_register_active(&fx.db, &boss, created.id.clone(), false)
        .await
        .unwrap();
    let err = caja::open_register(&fx.db, &CajaScreen::new(), &clerk, created.id, 0, None)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidState);
}

#[tokio::test]
async fn register_activation_checks_id_and_branch() {
    let fx = Fixture::new().await;
    let boss = admin();

    let err = register::set_register_active(&fx.db, &boss, "not-a-uuid".into(), false)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ValidationError);

    let err = register::set_register_active(&fx.db, &boss, Uuid::new_v4().to_string(), false)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);

    let foreign = fx.manager().create_register("branch-2", "Caja Norte").await.unwrap();
    let err = register::set_register_active(&fx.db, &boss, foreign.id.clone(), false)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::Forbidden);
    assert!(fx.manager().get_register(&foreign.id).await.unwrap().unwrap().is_active);
}

#[tokio::test]
async fn history_uses_configured_limit() {
    let fx = Fixture::new().await;
    let config = ConfigState {
        history_limit: 2,
        ..ConfigState::default()
    };
    let a = operator();

    for _ in 0..3 {
        let s = fx
            .manager()
            .open_session(&fx.caja_1.id, &a.user_id, Money::zero(), None)
            .await
            .unwrap();
        fx.manager().close_session(&s.id, Money::zero(), None).await.unwrap();
    }

    let page = caja::list_session_history(&fx.db, &config, &a, None).await.unwrap();
    assert_eq!(page.len(), 2);
    let all = caja::list_session_history(&fx.db, &config, &a, Some(10)).await.unwrap();
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn watcher_sees_changes_from_commands() {
    let fx = Fixture::new().await;
    let mut feed = fx.manager().watch_open_sessions(BRANCH).unwrap();
    let screen = CajaScreen::new();
    let a = operator();

    let session = caja::open_register(&fx.db, &screen, &a, fx.caja_2.id.clone(), 0, None)
        .await
        .unwrap();
    let open = feed.next().await.unwrap().unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].id, session.id);
}
