use super::*;
use crate::player::TICK_STEP;
use shared::domain::RatingDimension;

fn controller() -> FlowController {
    FlowController::new(ConditionAssigner::seeded(7))
}

fn demographics() -> DemographicsForm {
    DemographicsForm {
        participant_id: "p-100".into(),
        age: "22".into(),
        gender: "male".into(),
        ai_familiarity: "very familiar".into(),
    }
}

fn ratings() -> RatingsForm {
    RatingsForm::new()
        .select("likability", "6")
        .select("visual", "5")
        .select("mannerisms", "7")
        .select("voice", "4")
}

fn awareness() -> AwarenessForm {
    AwarenessForm {
        influence_question: "a little".into(),
        awareness_text: "the instructor seemed cheerful".into(),
        noticed_condition: "yes".into(),
    }
}

fn play_through(flow: &mut FlowController) {
    let generation = flow.start_playback().expect("start").generation;
    loop {
        let update = flow.tick_playback(generation, TICK_STEP).expect("tick");
        if update.complete {
            break;
        }
    }
}

fn run_to_rating(flow: &mut FlowController) {
    flow.give_consent(true).expect("consent");
    flow.submit_demographics(&demographics()).expect("demographics");
    play_through(flow);
    flow.continue_to_rating().expect("continue");
}

#[test]
fn walks_screens_in_required_order() {
    let mut flow = controller();
    let mut visited = vec![flow.screen()];

    visited.push(flow.give_consent(true).expect("consent"));
    visited.push(flow.submit_demographics(&demographics()).expect("demographics"));
    play_through(&mut flow);
    visited.push(flow.continue_to_rating().expect("continue"));
    visited.push(flow.submit_ratings(&ratings()).expect("ratings"));
    flow.submit_awareness(&awareness()).expect("awareness");
    visited.push(flow.screen());

    assert_eq!(visited, Screen::ORDER);
    assert!(flow.record().is_complete());
}

#[test]
fn consent_must_be_affirmative() {
    let mut flow = controller();
    let err = flow.give_consent(false).expect_err("declined");
    assert_eq!(err, FlowError::Validation(ValidationError::ConsentNotGiven));
    assert!(err.is_validation());
    assert_eq!(flow.screen(), Screen::Consent);
}

#[test]
fn actions_on_the_wrong_screen_change_nothing() {
    let mut flow = controller();
    let err = flow.submit_ratings(&ratings()).expect_err("too early");
    assert_eq!(
        err,
        FlowError::WrongScreen {
            expected: Screen::Rating,
            actual: Screen::Consent,
        }
    );
    assert!(flow.record().ratings.is_empty());
    assert_eq!(flow.screen(), Screen::Consent);
    assert!(flow.start_playback().is_err());
}

#[test]
fn incomplete_ratings_do_not_transition() {
    let mut flow = controller();
    run_to_rating(&mut flow);

    let partial = RatingsForm::new()
        .select("likability", "6")
        .select("visual", "5")
        .select("mannerisms", "7");
    let err = flow.submit_ratings(&partial).expect_err("voice missing");
    assert_eq!(
        err,
        FlowError::Validation(ValidationError::MissingRating(RatingDimension::Voice))
    );
    assert_eq!(flow.screen(), Screen::Rating);
    assert!(flow.record().ratings.is_empty());

    assert_eq!(flow.submit_ratings(&ratings()), Ok(Screen::Awareness));
}

#[test]
fn continue_waits_for_full_playback() {
    let mut flow = controller();
    flow.give_consent(true).expect("consent");
    flow.submit_demographics(&demographics()).expect("demographics");

    assert_eq!(flow.continue_to_rating(), Err(FlowError::PlaybackNotStarted));

    let generation = flow.start_playback().expect("start").generation;
    flow.tick_playback(generation, Duration::from_secs(29))
        .expect("tick");
    assert_eq!(flow.continue_to_rating(), Err(FlowError::PlaybackIncomplete));

    let update = flow.tick_playback(generation, Duration::from_secs(1)).expect("tick");
    assert!(update.complete);
    assert_eq!(flow.continue_to_rating(), Ok(Screen::Rating));
    assert!(flow.playback().is_none());
}

#[test]
fn replaying_invalidates_the_previous_playback() {
    let mut flow = controller();
    flow.give_consent(true).expect("consent");
    flow.submit_demographics(&demographics()).expect("demographics");

    let first = flow.start_playback().expect("first start").generation;
    flow.tick_playback(first, Duration::from_secs(10)).expect("tick");

    let restarted = flow.start_playback().expect("second start");
    assert_ne!(restarted.generation, first);
    assert_eq!(restarted.fired.len(), 1);
    assert_eq!(flow.playback().map(|p| p.elapsed()), Some(Duration::ZERO));

    let err = flow
        .tick_playback(first, TICK_STEP)
        .expect_err("stale tick");
    assert!(matches!(err, FlowError::StalePlayback { .. }));
    assert_eq!(flow.playback().map(|p| p.elapsed()), Some(Duration::ZERO));

    let mut seen = restarted.fired.clone();
    loop {
        let update = flow
            .tick_playback(restarted.generation, TICK_STEP)
            .expect("tick");
        seen.extend(update.fired);
        if update.complete {
            break;
        }
    }
    assert_eq!(seen.as_slice(), crate::player::script_for(flow.condition()));
}

#[test]
fn notes_are_only_taken_during_the_video() {
    let mut flow = controller();
    assert!(flow.record_notes("too soon").is_err());
    flow.give_consent(true).expect("consent");
    flow.submit_demographics(&demographics()).expect("demographics");
    flow.record_notes("classical conditioning = paired stimuli")
        .expect("notes");
    assert_eq!(flow.record().notes, "classical conditioning = paired stimuli");
}

#[test]
fn condition_never_changes_within_a_session() {
    let mut flow = controller();
    let condition = flow.condition();
    run_to_rating(&mut flow);
    flow.submit_ratings(&ratings()).expect("ratings");
    let record = flow.submit_awareness(&awareness()).expect("awareness");
    assert_eq!(record.condition, condition);
    assert_eq!(flow.condition(), condition);
}

#[test]
fn debrief_is_terminal() {
    let mut flow = controller();
    run_to_rating(&mut flow);
    flow.submit_ratings(&ratings()).expect("ratings");
    flow.submit_awareness(&awareness()).expect("awareness");

    assert!(flow.give_consent(true).is_err());
    assert!(flow.submit_awareness(&awareness()).is_err());
    assert_eq!(flow.screen(), Screen::Debrief);
}

#[test]
fn restart_redraws_condition_and_clears_answers() {
    let mut expected = ConditionAssigner::seeded(7);
    let first_draw = expected.assign();
    let second_draw = expected.assign();

    let mut flow = controller();
    assert_eq!(flow.condition(), first_draw);
    run_to_rating(&mut flow);
    flow.submit_ratings(&ratings()).expect("ratings");

    let condition = flow.restart();
    assert_eq!(condition, second_draw);
    assert_eq!(flow.screen(), Screen::Consent);
    let record = flow.record();
    assert!(record.demographics.is_none());
    assert!(record.ratings.is_empty());
    assert!(record.awareness.is_none());
    assert!(record.end_time.is_none());
    assert_eq!(record.participant_id, shared::domain::ANONYMOUS_PARTICIPANT);
}

#[test]
fn restart_discards_running_playback() {
    let mut flow = controller();
    flow.give_consent(true).expect("consent");
    flow.submit_demographics(&demographics()).expect("demographics");
    let generation = flow.start_playback().expect("start").generation;

    flow.restart();
    assert!(flow.playback().is_none());
    assert!(matches!(
        flow.tick_playback(generation, TICK_STEP),
        Err(FlowError::StalePlayback { .. })
    ));
}
