use std::sync::Arc;

use chrono::Duration;
use timer_sync::{
    clock::{Clock, ManualClock},
    config::RemovalMode,
    engine::EngineEvent,
    error::{EngineError, ValidationError},
    services::InMemoryBackend,
    state::{AdjustOutcome, AppState, ClearOutcome, DismissedStore, TimerRequest},
};

fn setup() -> (Arc<AppState>, Arc<InMemoryBackend>, ManualClock) {
    setup_with(|backend| backend, RemovalMode::Delete)
}

fn setup_with(
    configure: impl FnOnce(InMemoryBackend) -> InMemoryBackend,
    removal: RemovalMode,
) -> (Arc<AppState>, Arc<InMemoryBackend>, ManualClock) {
    let clock = ManualClock::default();
    let shared: Arc<dyn Clock> = Arc::new(clock.clone());
    let backend = Arc::new(configure(InMemoryBackend::new(Arc::clone(&shared))));
    let state = AppState::new(backend.clone(), shared, 0, "127.0.0.1".to_string())
        .with_removal(removal);
    (Arc::new(state), backend, clock)
}

fn timer(name: &str, duration: &str) -> TimerRequest {
    TimerRequest {
        name: name.to_string(),
        duration: duration.to_string(),
        ..TimerRequest::default()
    }
}

fn remaining(state: &AppState, id: i64) -> i64 {
    state
        .lock_engine()
        .unwrap()
        .timer(id)
        .map(|t| t.remaining_seconds)
        .unwrap()
}

#[tokio::test]
async fn tea_counts_down_to_finished() {
    let (state, _backend, clock) = setup();
    let created = state.create_timer(timer("Tea", "5")).await.unwrap().unwrap();
    assert_eq!(created.remaining_seconds, 300);
    assert_eq!(remaining(&state, created.id), 300);

    for _ in 0..300 {
        clock.advance_secs(1);
        state.tick().unwrap();
    }

    let engine = state.lock_engine().unwrap();
    let tea = engine.timer(created.id).unwrap();
    assert!(tea.is_finished());
    assert_eq!(timer_sync::duration::format_remaining(tea.remaining_seconds), "Finished");
    drop(engine);
    assert_eq!(state.select_all().unwrap(), 0);
}

#[tokio::test]
async fn expiry_event_fires_once() {
    let (state, _backend, clock) = setup();
    let mut events = state.subscribe().unwrap();
    let created = state.create_timer(timer("Eggs", "1")).await.unwrap().unwrap();

    for _ in 0..5 {
        clock.advance_secs(30);
        state.tick().unwrap();
    }

    let mut expiries = 0;
    while let Ok(event) = events.try_recv() {
        if let EngineEvent::Expired { id, .. } = event {
            assert_eq!(id, created.id);
            expiries += 1;
        }
    }
    assert_eq!(expiries, 1);
}

#[tokio::test]
async fn adjust_extends_every_selected_timer_and_clears_selection() {
    let (state, _backend, clock) = setup();
    let a = state.create_timer(timer("A", "10")).await.unwrap().unwrap();
    let b = state.create_timer(timer("B", "0d0h20m")).await.unwrap().unwrap();
    clock.advance_secs(30);
    state.tick().unwrap();
    let (before_a, before_b) = (remaining(&state, a.id), remaining(&state, b.id));

    assert_eq!(state.select_all().unwrap(), 2);
    let outcome = state.adjust_selected("+15").await.unwrap();
    assert_eq!(outcome, AdjustOutcome::Adjusted { timers: 2, minutes: 15 });

    assert_eq!(remaining(&state, a.id), before_a + 900);
    assert_eq!(remaining(&state, b.id), before_b + 900);
    assert!(state.get_selected().unwrap().is_empty());
}

#[tokio::test]
async fn reduction_can_finish_a_timer() {
    let (state, _backend, _clock) = setup();
    let a = state.create_timer(timer("A", "10")).await.unwrap().unwrap();
    let b = state.create_timer(timer("B", "20")).await.unwrap().unwrap();
    state.select_all().unwrap();

    state.adjust_selected("-10").await.unwrap();

    let engine = state.lock_engine().unwrap();
    assert!(engine.timer(a.id).unwrap().is_finished());
    assert_eq!(engine.timer(b.id).unwrap().remaining_seconds, 600);
}

#[tokio::test]
async fn adjust_with_empty_selection_sends_nothing() {
    let (state, backend, _clock) = setup();
    state.create_timer(timer("A", "10")).await.unwrap();
    backend.set_offline(true);
    assert_eq!(
        state.adjust_selected("5").await.unwrap(),
        AdjustOutcome::NothingSelected
    );
}

#[tokio::test]
async fn invalid_input_is_rejected_before_any_call() {
    let (state, backend, _clock) = setup();
    backend.set_offline(true);

    let err = state.create_timer(timer("  ", "5")).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(ValidationError::EmptyName)));
    let err = state.create_timer(timer("Tea", " ")).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(ValidationError::EmptyDuration)));
    let err = state.adjust_selected("lots").await.unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn failed_calls_leave_local_state_untouched() {
    let (state, backend, _clock) = setup();
    let a = state.create_timer(timer("A", "10")).await.unwrap().unwrap();
    state.select_all().unwrap();
    backend.set_offline(true);

    assert!(matches!(
        state.create_timer(timer("B", "5")).await,
        Err(EngineError::Backend(_))
    ));
    assert!(state.adjust_selected("+5").await.is_err());
    assert!(state.delete_timer(a.id).await.is_err());

    assert_eq!(state.get_timers().unwrap().len(), 1);
    assert_eq!(remaining(&state, a.id), 600);
    assert_eq!(state.get_selected().unwrap(), vec![a.id]);
}

#[tokio::test]
async fn clear_finished_asks_for_confirmation() {
    let (state, _backend, clock) = setup();
    assert_eq!(state.clear_finished(false).await.unwrap(), ClearOutcome::NothingFinished);

    state.create_timer(timer("A", "1")).await.unwrap();
    clock.advance_secs(60);
    state.tick().unwrap();

    assert_eq!(
        state.clear_finished(false).await.unwrap(),
        ClearOutcome::NeedsConfirmation { count: 1 }
    );
    assert_eq!(state.get_timers().unwrap().len(), 1);
}

#[tokio::test]
async fn one_failed_clear_does_not_block_the_others() {
    let (state, backend, clock) = setup();
    let a = state.create_timer(timer("A", "1")).await.unwrap().unwrap();
    let b = state.create_timer(timer("B", "1")).await.unwrap().unwrap();
    let c = state.create_timer(timer("C", "60")).await.unwrap().unwrap();
    clock.advance_secs(60);
    state.tick().unwrap();
    backend.fail_timer(b.id);

    let outcome = state.clear_finished(true).await.unwrap();
    let ClearOutcome::Cleared { cleared, failed } = outcome else {
        panic!("expected timers to be cleared");
    };
    assert_eq!(cleared, vec![a.id]);
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].0, b.id);

    let ids: Vec<i64> = state.get_timers().unwrap().iter().map(|t| t.id).collect();
    assert!(ids.contains(&b.id));
    assert!(ids.contains(&c.id));
    assert!(!ids.contains(&a.id));
}

#[tokio::test]
async fn clear_mode_keeps_timers_in_backend_storage() {
    let (state, backend, clock) = setup_with(|b| b, RemovalMode::Clear);
    let a = state.create_timer(timer("A", "1")).await.unwrap().unwrap();
    clock.advance_secs(60);
    state.tick().unwrap();

    state.clear_finished(true).await.unwrap();
    assert!(state.get_timers().unwrap().is_empty());
    assert_eq!(backend.stored_ids(), vec![a.id]);
}

#[tokio::test]
async fn dismissed_timers_stay_hidden_across_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dismissed.json");
    let clock = ManualClock::default();
    let shared: Arc<dyn Clock> = Arc::new(clock.clone());
    let backend = Arc::new(InMemoryBackend::new(Arc::clone(&shared)));

    let state = AppState::new(backend.clone(), Arc::clone(&shared), 0, String::new())
        .with_removal(RemovalMode::Dismiss)
        .with_dismissed_store(DismissedStore::new(&path));
    let a = state.create_timer(timer("A", "1")).await.unwrap().unwrap();
    clock.advance_secs(60);
    state.tick().unwrap();
    state.clear_finished(true).await.unwrap();
    assert!(state.get_timers().unwrap().is_empty());
    assert_eq!(backend.stored_ids(), vec![a.id]);

    let next_session = AppState::new(backend, shared, 0, String::new())
        .with_dismissed_store(DismissedStore::new(&path));
    next_session.resync().await.unwrap();
    assert!(next_session.get_timers().unwrap().is_empty());
}

#[tokio::test]
async fn repeating_timer_comes_back_as_a_new_timer() {
    let (state, _backend, clock) = setup();
    let request = TimerRequest {
        is_repeating: true,
        ..timer("Stretch", "1")
    };
    let first = state.create_timer(request).await.unwrap().unwrap();

    clock.advance_secs(60);
    let report = state.tick().unwrap();
    assert!(report.resync_needed);
    assert!(state.lock_engine().unwrap().needs_repeat_followup());

    state.resync().await.unwrap();
    let engine = state.lock_engine().unwrap();
    assert!(engine.timer(first.id).unwrap().is_finished());
    let fresh: Vec<_> = engine
        .timers()
        .into_iter()
        .filter(|t| t.id != first.id && t.name == "Stretch")
        .collect();
    assert_eq!(fresh.len(), 1);
    assert_eq!(fresh[0].remaining_seconds, 60);
    assert!(!engine.needs_repeat_followup());
}

#[tokio::test]
async fn delayed_regeneration_is_followed_up() {
    let (state, _backend, clock) =
        setup_with(|b| b.with_regeneration_delay(Duration::seconds(5)), RemovalMode::Delete);
    let request = TimerRequest {
        is_repeating: true,
        ..timer("Water", "1")
    };
    state.create_timer(request).await.unwrap();
    clock.advance_secs(60);
    state.tick().unwrap();

    state.resync().await.unwrap();
    assert_eq!(state.get_timers().unwrap().len(), 1);
    assert!(state.lock_engine().unwrap().needs_repeat_followup());

    clock.advance_secs(5);
    state.resync().await.unwrap();
    assert_eq!(state.get_timers().unwrap().len(), 2);
    assert!(!state.lock_engine().unwrap().needs_repeat_followup());
}

#[tokio::test]
async fn busy_control_rejects_duplicate_submission() {
    let (state, _backend, _clock) = setup();
    let a = state.create_timer(timer("A", "10")).await.unwrap().unwrap();
    state.toggle(a.id).unwrap();

    let guard = state.begin("adjust time").unwrap();
    assert!(state.is_busy("adjust time"));
    assert!(matches!(
        state.adjust_selected("+1").await,
        Err(EngineError::Busy("adjust time"))
    ));
    drop(guard);

    assert!(!state.is_busy("adjust time"));
    assert!(state.adjust_selected("+1").await.is_ok());
}

#[tokio::test]
async fn templates_start_timers() {
    let (state, _backend, _clock) = setup();
    let templates = state
        .create_template("Pasta", "0 0 9", Some("Kitchen".to_string()))
        .await
        .unwrap();
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[0].duration, "0d0h9m");

    let created = state.start_template(templates[0].id).await.unwrap().unwrap();
    assert_eq!(created.remaining_seconds, 540);
    assert_eq!(created.category, "Kitchen");

    assert!(matches!(
        state.start_template(99).await,
        Err(EngineError::Validation(ValidationError::UnknownTemplate(99)))
    ));

    let remaining = state.delete_template(templates[0].id).await.unwrap();
    assert!(remaining.is_empty());
}

#[tokio::test]
async fn screenshot_failure_surfaces_detail() {
    let (state, _backend, _clock) = setup();
    let err = state
        .upload_screenshot("builder.png", vec![0x89, 0x50])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("screenshot ingestion"));
    assert!(state.get_timers().unwrap().is_empty());
}
