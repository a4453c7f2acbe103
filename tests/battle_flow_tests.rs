mod utils;

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use packattack::battle::repository::BattleRepository;
use packattack::battle::types::BattleCreateRequest;
use packattack::{AppError, BattleMode, BattleStatus, WalletRepository};

use utils::setup::{seeded_box, test_app};

const LONG_GRACE: Duration = Duration::from_secs(30 * 60);

#[tokio::test]
async fn test_pack_opening_end_to_end() {
    let app = test_app(21, LONG_GRACE, vec![("alice", 1000)]);
    let box_id = seeded_box(&app, 3, 100, &[("common", 3.0, 5), ("rare", 1.0, 50)]).await;

    let pulls = app.pulls.open_pack("alice", &box_id).await.unwrap();
    assert_eq!(pulls.len(), 3);
    assert_eq!(app.wallet.balance("alice").await.unwrap(), 900);

    // Sell everything back; balance grows by exactly the snapshot values
    let expected: i64 = pulls.iter().map(|p| p.coin_value).sum();
    for pull in &pulls {
        app.pulls.sell_pull("alice", &pull.id).await.unwrap();
    }
    assert_eq!(app.wallet.balance("alice").await.unwrap(), 900 + expected);
    assert!(app.pulls.list_pulls("alice").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_battle_flow_winner_takes_pot() {
    let app = test_app(3, LONG_GRACE, vec![("alice", 500), ("bob", 500)]);
    // Single-value pool keeps totals equal; the tie-break decides
    let box_id = seeded_box(&app, 1, 100, &[("card", 1.0, 10)]).await;

    let battle = app
        .battles
        .create_battle(BattleCreateRequest {
            box_id,
            mode: BattleMode::Normal,
            max_participants: 2,
            entry_fee: 150,
            rounds: 2,
        })
        .await
        .unwrap();

    app.battles.join(&battle.id, "alice").await.unwrap();
    app.battles.join(&battle.id, "bob").await.unwrap();
    app.battles.mark_ready(&battle.id, "alice").await.unwrap();
    app.battles.mark_ready(&battle.id, "bob").await.unwrap();

    let settlement = app.battles.start(&battle.id).await.unwrap();

    // Earliest joiner wins the tie and the whole 300-coin pot
    assert_eq!(settlement.winner.as_deref(), Some("alice"));
    assert_eq!(app.wallet.balance("alice").await.unwrap(), 650);
    assert_eq!(app.wallet.balance("bob").await.unwrap(), 350);

    let details = app.battles.get_details(&battle.id).await.unwrap();
    assert_eq!(details.battle.status, BattleStatus::Finished);
    // participants x rounds battle pulls
    assert_eq!(details.pulls.len(), 4);
    for round in 1..=2u32 {
        assert_eq!(details.pulls.iter().filter(|p| p.round == round).count(), 2);
    }
}

#[tokio::test]
async fn test_share_battle_conserves_total_coins() {
    let balances = vec![("a", 1000), ("b", 1000), ("c", 1000)];
    let app = test_app(17, Duration::from_secs(0), balances);
    let box_id = seeded_box(
        &app,
        1,
        50,
        &[("common", 5.0, 10), ("rare", 1.0, 100), ("epic", 0.2, 500)],
    )
    .await;

    let battle = app
        .battles
        .create_battle(BattleCreateRequest {
            box_id,
            mode: BattleMode::Share,
            max_participants: 3,
            entry_fee: 200,
            rounds: 3,
        })
        .await
        .unwrap();

    for user in ["a", "b", "c"] {
        app.battles.join(&battle.id, user).await.unwrap();
    }

    // Grace period is zero, so auto-start picks the lobby up immediately
    assert_eq!(app.battles.auto_start().await.unwrap(), 1);

    let settlement = app
        .battles
        .get_details(&battle.id)
        .await
        .map(|d| d.battle)
        .unwrap();
    assert_eq!(settlement.status, BattleStatus::Finished);

    // Every entry coin came back out of the pot: the system total is
    // unchanged no matter how the proportional split rounded
    let mut total = 0;
    for user in ["a", "b", "c"] {
        total += app.wallet.balance(user).await.unwrap();
    }
    assert_eq!(total, 3000);
}

#[tokio::test]
async fn test_concurrent_joins_admit_exactly_max_participants() {
    let users: Vec<String> = (0..8).map(|i| format!("user-{}", i)).collect();
    let balances: Vec<(&str, i64)> = users.iter().map(|u| (u.as_str(), 500)).collect();
    let app = test_app(5, LONG_GRACE, balances);
    let box_id = seeded_box(&app, 1, 50, &[("card", 1.0, 10)]).await;

    let battle = app
        .battles
        .create_battle(BattleCreateRequest {
            box_id,
            mode: BattleMode::Normal,
            max_participants: 4,
            entry_fee: 100,
            rounds: 1,
        })
        .await
        .unwrap();

    // 2 x capacity concurrent joins
    let handles = users
        .iter()
        .map(|user| {
            let battles = Arc::clone(&app.battles);
            let battle_id = battle.id.clone();
            let user = user.clone();
            tokio::spawn(async move { battles.join(&battle_id, &user).await })
        })
        .collect::<Vec<_>>();

    let results = join_all(handles).await;
    let outcomes: Vec<Result<_, AppError>> = results.into_iter().map(|r| r.unwrap()).collect();

    let successes = outcomes.iter().filter(|r| r.is_ok()).count();
    let capacity_losses = outcomes
        .iter()
        .filter(|r| matches!(r, Err(AppError::Capacity(_))))
        .count();

    assert_eq!(successes, 4);
    assert_eq!(capacity_losses, 4);

    let details = app.battles.get_details(&battle.id).await.unwrap();
    assert_eq!(details.participants.len(), 4);
    assert_eq!(details.battle.total_prize, 400);

    // Exactly the four admitted users were debited
    let mut debited = 0;
    for user in &users {
        if app.wallet.balance(user).await.unwrap() == 400 {
            debited += 1;
        }
    }
    assert_eq!(debited, 4);
}

#[tokio::test]
async fn test_concurrent_resolves_settle_once() {
    let app = test_app(
        9,
        Duration::from_secs(0),
        vec![("alice", 500), ("bob", 500)],
    );
    let box_id = seeded_box(&app, 1, 50, &[("card", 1.0, 10)]).await;

    let battle = app
        .battles
        .create_battle(BattleCreateRequest {
            box_id,
            mode: BattleMode::Normal,
            max_participants: 2,
            entry_fee: 100,
            rounds: 1,
        })
        .await
        .unwrap();
    app.battles.join(&battle.id, "alice").await.unwrap();
    app.battles.join(&battle.id, "bob").await.unwrap();

    // Put the battle IN_PROGRESS with its round recorded, leaving
    // settlement to the racing resolvers below
    assert!(app.battle_repository.try_start(&battle.id).await.unwrap());
    let pull = app
        .pulls
        .draw_for_battle("alice", &app.catalog.get_snapshot(&battle.box_id).await.unwrap())
        .await
        .unwrap();
    let bob_pull = app
        .pulls
        .draw_for_battle("bob", &app.catalog.get_snapshot(&battle.box_id).await.unwrap())
        .await
        .unwrap();
    app.battle_repository
        .record_round_pulls(
            &battle.id,
            1,
            &[
                packattack::battle::BattlePullModel::from_pull(&battle.id, 1, &pull),
                packattack::battle::BattlePullModel::from_pull(&battle.id, 1, &bob_pull),
            ],
        )
        .await
        .unwrap();

    let handles = (0..4)
        .map(|_| {
            let battles = Arc::clone(&app.battles);
            let battle_id = battle.id.clone();
            tokio::spawn(async move { battles.resolve(&battle_id).await })
        })
        .collect::<Vec<_>>();

    let results = join_all(handles).await;
    let outcomes: Vec<Result<_, AppError>> = results.into_iter().map(|r| r.unwrap()).collect();

    let successes = outcomes.iter().filter(|r| r.is_ok()).count();
    let state_errors = outcomes
        .iter()
        .filter(|r| matches!(r, Err(AppError::State(_))))
        .count();
    assert_eq!(successes, 1);
    assert_eq!(state_errors, 3);

    // The 200-coin pot was paid exactly once: totals add back to 1000
    let total = app.wallet.balance("alice").await.unwrap()
        + app.wallet.balance("bob").await.unwrap();
    assert_eq!(total, 1000);
}

#[tokio::test]
async fn test_cancel_refunds_and_blocks_restart() {
    let app = test_app(2, LONG_GRACE, vec![("alice", 500), ("bob", 500)]);
    let box_id = seeded_box(&app, 1, 50, &[("card", 1.0, 10)]).await;

    let battle = app
        .battles
        .create_battle(BattleCreateRequest {
            box_id,
            mode: BattleMode::Jackpot,
            max_participants: 2,
            entry_fee: 250,
            rounds: 1,
        })
        .await
        .unwrap();
    app.battles.join(&battle.id, "alice").await.unwrap();
    app.battles.join(&battle.id, "bob").await.unwrap();
    assert_eq!(app.wallet.balance("alice").await.unwrap(), 250);

    app.battles.cancel(&battle.id).await.unwrap();
    assert_eq!(app.wallet.balance("alice").await.unwrap(), 500);
    assert_eq!(app.wallet.balance("bob").await.unwrap(), 500);

    // Terminal: neither start nor join may touch the battle again
    let start = app.battles.start(&battle.id).await;
    assert!(matches!(start.unwrap_err(), AppError::State(_)));
    let join = app.battles.join(&battle.id, "alice").await;
    assert!(matches!(join.unwrap_err(), AppError::State(_)));
}

#[tokio::test]
async fn test_event_stream_reports_battle_lifecycle() {
    let app = test_app(8, Duration::from_secs(0), vec![("alice", 500), ("bob", 500)]);
    let box_id = seeded_box(&app, 1, 50, &[("card", 1.0, 10)]).await;

    let battle = app
        .battles
        .create_battle(BattleCreateRequest {
            box_id,
            mode: BattleMode::Normal,
            max_participants: 2,
            entry_fee: 100,
            rounds: 2,
        })
        .await
        .unwrap();

    let mut receiver = app.event_bus.subscribe(&battle.id).await;

    app.battles.join(&battle.id, "alice").await.unwrap();
    app.battles.join(&battle.id, "bob").await.unwrap();
    app.battles.start(&battle.id).await.unwrap();

    let mut seen = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        seen.push(event.event_type());
    }

    assert_eq!(
        seen,
        vec![
            "participant_joined",
            "participant_joined",
            "battle_started",
            "round_completed",
            "round_completed",
            "battle_finished",
        ]
    );
}

#[tokio::test]
async fn test_insufficient_funds_never_partially_applies() {
    let app = test_app(4, LONG_GRACE, vec![("alice", 100)]);
    let box_id = seeded_box(&app, 2, 120, &[("card", 1.0, 10)]).await;

    // Pack open fails before anything is persisted or charged
    let result = app.pulls.open_pack("alice", &box_id).await;
    assert!(matches!(result.unwrap_err(), AppError::InsufficientFunds(_)));
    assert_eq!(app.wallet.balance("alice").await.unwrap(), 100);
    assert!(app.pulls.list_pulls("alice").await.unwrap().is_empty());

    // Battle join fails and leaves no participant behind
    let battle = app
        .battles
        .create_battle(BattleCreateRequest {
            box_id,
            mode: BattleMode::Normal,
            max_participants: 2,
            entry_fee: 500,
            rounds: 1,
        })
        .await
        .unwrap();
    let result = app.battles.join(&battle.id, "alice").await;
    assert!(matches!(result.unwrap_err(), AppError::InsufficientFunds(_)));

    let details = app.battles.get_details(&battle.id).await.unwrap();
    assert!(details.participants.is_empty());
    assert_eq!(details.battle.total_prize, 0);
}
