use std::{sync::Arc, time::SystemTime};

use pong_tracker_back::{
    dao::{
        models::{Hand, NewMatchEntity, ShotRef, Side},
        score_gateway::in_memory::{GatewayOp, InMemoryScoreGateway, InjectedFailure},
    },
    scoring::{EngineError, MatchTracker, ScoringEngine, ScoringEvent},
};

fn shot(id: &str, hand: Hand) -> ShotRef {
    ShotRef {
        shot_id: id.into(),
        hand,
        lucky: false,
    }
}

async fn point(tracker: &mut MatchTracker, winner: Side) -> Vec<ScoringEvent> {
    tracker.select_point_winner(winner).unwrap();
    tracker
        .select_other_shot(shot("push", Hand::Backhand))
        .await
        .unwrap();
    tracker
        .select_winning_shot(shot("loop", Hand::Forehand))
        .await
        .unwrap()
}

#[tokio::test]
async fn best_of_three_with_deuce_and_late_join() {
    let gateway = InMemoryScoreGateway::new();
    let mut tracker = MatchTracker::start(
        Arc::new(gateway.clone()),
        NewMatchEntity {
            opponent_name: "Dimitrij Ovtcharov".into(),
            date: SystemTime::now(),
            notes: "club league".into(),
            initial_server: Side::Opponent,
            best_of: 3,
        },
    )
    .await
    .unwrap();
    let match_id = tracker.match_id();

    // Set 1 goes to deuce and the opponent takes it 12-10.
    for _ in 0..10 {
        point(&mut tracker, Side::Player).await;
        point(&mut tracker, Side::Opponent).await;
    }
    assert_eq!(tracker.current_server(), Side::Opponent);
    point(&mut tracker, Side::Opponent).await;
    assert_eq!(tracker.current_server(), Side::Player);
    let events = point(&mut tracker, Side::Opponent).await;
    assert!(events.contains(&ScoringEvent::SetStarted { set_number: 2 }));
    assert_eq!(tracker.snapshot().match_score, "0-1");

    // Set 2 is served first by the player.
    assert_eq!(tracker.current_server(), Side::Player);
    for _ in 0..11 {
        point(&mut tracker, Side::Player).await;
    }
    assert_eq!(tracker.snapshot().match_score, "1-1");
    assert_eq!(tracker.snapshot().current_set_number, 3);

    // A store outage in the decider is recovered by retrying.
    gateway.fail_next(GatewayOp::UpdateSet, InjectedFailure::Transport);
    tracker.select_point_winner(Side::Player).unwrap();
    tracker
        .select_winning_shot(shot("smash", Hand::Forehand))
        .await
        .unwrap();
    let err = tracker
        .select_other_shot(shot("lob", Hand::Backhand))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Persistence(_)));
    tracker.retry_commit().await.unwrap();

    // Late join from another process sees the same match.
    let resumed = MatchTracker::resume(Arc::new(gateway.clone()), match_id)
        .await
        .unwrap();
    let here = tracker.snapshot();
    let there = resumed.snapshot();
    assert_eq!(there.match_score, here.match_score);
    assert_eq!(there.current_set_number, 3);
    assert_eq!(there.sets, here.sets);
    assert_eq!(resumed.current_server(), tracker.current_server());

    for _ in 0..10 {
        point(&mut tracker, Side::Player).await;
    }
    let snapshot = tracker.snapshot();
    assert!(snapshot.match_complete);
    assert_eq!(snapshot.match_score, "2-1");
    assert_eq!(gateway.match_of(match_id).unwrap().match_score, "2-1");

    for set in gateway.sets_of(match_id) {
        let stored_points = gateway.points_of(set.id).len() as u32;
        assert_eq!(set.player_score + set.opponent_score, stored_points);
    }
}
