mod common;

use common::{steps, MockFactory, MockTrainer, RecordingSink, AD};
use grasp_metrics::GeometricMatchEvaluator;
use training::{CrossValidation, EpochRunner, ExecutionContext, MseGraspLoss, TrainingError};

fn runner() -> EpochRunner<AD> {
    let eval: GeometricMatchEvaluator = Default::default();
    EpochRunner::new(ExecutionContext::default(), eval)
}

fn plan(num_folds: usize, epochs: usize) -> CrossValidation {
    CrossValidation {
        num_folds,
        epochs,
        start_epoch: 0,
        epoch_print_freq: 1,
        evaluate_only: false,
    }
}

#[test]
fn five_folds_run_in_order_with_fresh_models() {
    let mut factory = MockFactory::new(&[2, 2, 1], &[2]);
    let mut trainer = MockTrainer::new();
    let mut sink = RecordingSink::default();
    let report = plan(5, 2)
        .run(&runner(), &mut factory, &mut trainer, &MseGraspLoss, &mut sink)
        .unwrap();

    let order: Vec<usize> = (0..5).collect();
    assert_eq!(factory.built, order);
    assert_eq!(trainer.initialised, order);
    assert_eq!(trainer.finished, order);
    assert_eq!(sink.ready, order);
    assert_eq!(sink.complete, order);
    // 5 folds x 2 epochs x 3 training batches; validation adds none
    assert_eq!(steps(&trainer.log), 30);
    assert_eq!(report.folds.len(), 5);
    assert!(report.folds.iter().all(|f| f.epochs.len() == 2));
    assert_eq!(report.mean_val_accuracy, 1.0);
}

#[test]
fn evaluate_only_never_steps_the_optimizer() {
    let mut factory = MockFactory::new(&[2, 2], &[3, 1]);
    let mut trainer = MockTrainer::new();
    let mut sink = RecordingSink::default();
    let cv = CrossValidation {
        evaluate_only: true,
        ..plan(3, 10)
    };
    let report = cv
        .run(&runner(), &mut factory, &mut trainer, &MseGraspLoss, &mut sink)
        .unwrap();
    assert_eq!(steps(&trainer.log), 0);
    assert_eq!(sink.epochs.len(), 3);
    assert!(sink.epochs.iter().all(|e| e.train.is_none() && e.val.samples == 4));
    assert_eq!(report.folds.len(), 3);
}

#[test]
fn epoch_range_and_print_frequency() {
    let mut factory = MockFactory::new(&[1], &[1]);
    let mut trainer = MockTrainer::new();
    let mut sink = RecordingSink::default();
    let cv = CrossValidation {
        num_folds: 1,
        epochs: 7,
        start_epoch: 2,
        epoch_print_freq: 2,
        evaluate_only: false,
    };
    let report = cv
        .run(&runner(), &mut factory, &mut trainer, &MseGraspLoss, &mut sink)
        .unwrap();
    let ran: Vec<usize> = report.folds[0].epochs.iter().map(|e| e.epoch).collect();
    assert_eq!(ran, vec![2, 3, 4, 5, 6]);
    let printed: Vec<usize> = sink.epochs.iter().map(|e| e.epoch).collect();
    assert_eq!(printed, vec![3, 5, 6]);
}

#[test]
fn invalid_plans_fail_before_any_fold() {
    for cv in [plan(0, 3), plan(2, 0)] {
        let mut factory = MockFactory::new(&[1], &[1]);
        let mut trainer = MockTrainer::new();
        let err = cv
            .run(
                &runner(),
                &mut factory,
                &mut trainer,
                &MseGraspLoss,
                &mut RecordingSink::default(),
            )
            .unwrap_err();
        assert!(matches!(err, TrainingError::Config(_)));
        assert!(factory.built.is_empty());
    }
}
