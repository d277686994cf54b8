use dermscan_shared::model::Phase;
use dermscan_shared::{
    DiagnosisResult, ErrorKind, Event, FailureInfo, ImageAsset, Model, RequestState,
    SubmissionId, Transition,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Step {
    Select(u8),
    Cancel,
    Submit(u8),
    Finish { submission: u8, ok: bool },
    Reset,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (0u8..4).prop_map(Step::Select),
        Just(Step::Cancel),
        (0u8..4).prop_map(Step::Submit),
        (0u8..4, any::<bool>()).prop_map(|(submission, ok)| Step::Finish { submission, ok }),
        Just(Step::Reset),
    ]
}

fn asset(n: u8) -> ImageAsset {
    ImageAsset::new(format!("file:///cache/{n}.jpg"), "image/jpeg", format!("{n}.jpg")).unwrap()
}

fn event(step: &Step) -> Event {
    match step {
        Step::Select(n) => Event::ImageSelected(asset(*n)),
        Step::Cancel => Event::SelectionCancelled,
        Step::Submit(n) => Event::SubmitRequested {
            submission: SubmissionId::new(format!("s{n}")),
        },
        Step::Finish { submission, ok } => Event::SubmissionFinished {
            submission: SubmissionId::new(format!("s{submission}")),
            outcome: if *ok {
                Ok(DiagnosisResult {
                    diagnostic_text: "A".into(),
                    description_text: "B".into(),
                    report_text: "C".into(),
                })
            } else {
                Err(FailureInfo::new(ErrorKind::NetworkFailure, "down"))
            },
        },
        Step::Reset => Event::ResetRequested,
    }
}

fn check_shape(model: &Model) {
    let state = model.state();
    assert_eq!(model.result().is_some(), state == RequestState::Success);
    assert_eq!(model.failure().is_some(), state == RequestState::Failed);
    assert_eq!(model.image().is_none(), state == RequestState::Idle);
    match model.phase() {
        Phase::Submitting { submission, .. } => assert_eq!(model.in_flight(), Some(submission)),
        _ => assert!(!model.is_in_flight()),
    }
}

proptest! {
    #[test]
    fn every_reachable_state_is_well_formed(steps in prop::collection::vec(step(), 0..40)) {
        let mut model = Model::new();
        for step in &steps {
            let before = model.clone();
            match model.apply(event(step)) {
                Ok(Transition::StartSubmission(asset)) => {
                    prop_assert_eq!(Some(&asset), before.image());
                    prop_assert_eq!(model.state(), RequestState::Submitting);
                }
                Ok(Transition::Unchanged) | Err(_) => prop_assert_eq!(&model, &before),
                Ok(_) => {}
            }
            check_shape(&model);
        }
    }

    #[test]
    fn submitting_rejects_new_selection_and_submission(
        steps in prop::collection::vec(step(), 0..20),
        n in 0u8..4,
    ) {
        let mut model = Model::new();
        for step in &steps {
            let _ = model.apply(event(step));
        }
        if model.state() == RequestState::Submitting {
            let before = model.clone();
            prop_assert!(model.apply(Event::ImageSelected(asset(n))).is_err());
            prop_assert!(model.apply(event(&Step::Submit(n))).is_err());
            prop_assert_eq!(model, before);
        }
    }

    #[test]
    fn selection_outside_submitting_holds_only_the_asset(
        steps in prop::collection::vec(step(), 0..20),
        n in 0u8..4,
    ) {
        let mut model = Model::new();
        for step in &steps {
            let _ = model.apply(event(step));
        }
        prop_assume!(model.state() != RequestState::Submitting);

        model.apply(Event::ImageSelected(asset(n))).unwrap();
        prop_assert_eq!(model.state(), RequestState::ImageSelected);
        prop_assert_eq!(model.image(), Some(&asset(n)));
        prop_assert!(model.result().is_none());
        prop_assert!(model.failure().is_none());
    }

    #[test]
    fn reset_is_idempotent(steps in prop::collection::vec(step(), 0..30)) {
        let mut model = Model::new();
        for step in &steps {
            let _ = model.apply(event(step));
        }
        model.apply(Event::ResetRequested).unwrap();
        let once = model.clone();
        prop_assert_eq!(model.apply(Event::ResetRequested).unwrap(), Transition::Unchanged);
        prop_assert_eq!(&model, &once);
        prop_assert_eq!(model.state(), RequestState::Idle);
        prop_assert!(model.image().is_none());
    }

    #[test]
    fn at_most_one_submission_in_flight(steps in prop::collection::vec(step(), 0..40)) {
        let mut model = Model::new();
        for step in &steps {
            let in_flight = model.in_flight().cloned();
            let result = model.apply(event(step));
            if let Ok(Transition::StartSubmission(_)) = result {
                prop_assert!(in_flight.is_none());
            }
            if let (Some(pending), Step::Finish { .. }) = (&in_flight, step) {
                let finished = matches!(result, Ok(Transition::Changed));
                let matched = event_submission(step) == Some(pending.clone());
                prop_assert_eq!(finished, matched);
            }
        }
    }

    #[test]
    fn reset_abandons_the_pending_submission(steps in prop::collection::vec(step(), 0..30)) {
        let mut model = Model::new();
        for step in &steps {
            let _ = model.apply(event(step));
        }
        let stale = model.in_flight().cloned();
        model.apply(Event::ResetRequested).unwrap();
        prop_assert!(!model.is_in_flight());

        if let Some(stale) = stale {
            let before = model.clone();
            let t = model.apply(Event::SubmissionFinished {
                submission: stale,
                outcome: Err(FailureInfo::new(ErrorKind::NetworkFailure, "late")),
            });
            prop_assert_eq!(t, Ok(Transition::Unchanged));
            prop_assert_eq!(model, before);
        }
    }
}

fn event_submission(step: &Step) -> Option<SubmissionId> {
    match event(step) {
        Event::SubmissionFinished { submission, .. } => Some(submission),
        _ => None,
    }
}
