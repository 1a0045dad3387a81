use sgld_structs::config::{DataSettings, LearningRateSettings, TrainingSettings};
use sgld_utils::dejsonify;

#[test]
fn test_defaults_from_empty_json() {
    let settings: TrainingSettings = dejsonify("{}").unwrap();
    assert_eq!(settings, TrainingSettings::default());
    assert_eq!(settings.num_units, 200);
    assert_eq!(settings.weight_decay, 1.0);
    assert_eq!(settings.num_batches, vec![7]);
    assert_eq!(settings.data.num_points, 400);
    assert_eq!(settings.data.margin, 75);
    assert_eq!(settings.query_grid.num_points, 200);
    assert!(settings.validate().is_ok());
}

#[test]
fn test_epochs() {
    let settings = TrainingSettings::default();
    assert_eq!(settings.epochs().unwrap(), 100 * 100 + 3000);

    let settings: TrainingSettings =
        dejsonify(r#"{"num_epochs": 40, "mix_epochs": 5, "burnin_epochs": 10}"#).unwrap();
    assert_eq!(settings.epochs().unwrap(), 40);
    assert_eq!(*settings.num_epochs(), 40);
}

#[test]
fn test_partial_overrides() {
    let settings: TrainingSettings = dejsonify(
        r#"{
            "seed": "abc",
            "learning_rate": {"start": 1e-3, "end": 1e-4},
            "data": {"num_points": 50, "margin": 5}
        }"#,
    )
    .unwrap();
    assert_eq!(settings.seed, "abc");
    assert_eq!(
        settings.learning_rate,
        LearningRateSettings {
            start: 1e-3,
            end: 1e-4
        }
    );
    assert_eq!(settings.data.num_points, 50);
    assert_eq!(settings.data.noise_std, 0.3);
    assert_eq!(settings.data.num_train_points(), 40);
    assert!(settings.validate().is_ok());
}

#[test]
fn test_validate_rejects_invalid_settings() {
    let mut settings = TrainingSettings::default();
    settings.mix_epochs = 0;
    assert!(settings.validate().is_err());

    let mut settings = TrainingSettings::default();
    settings.num_batches = vec![];
    assert!(settings.validate().is_err());

    let mut settings = TrainingSettings::default();
    settings.num_batches = vec![3, 0];
    assert!(settings.validate().is_err());

    let mut settings = TrainingSettings::default();
    settings.learning_rate.start = 0.0;
    assert!(settings.validate().is_err());

    let mut settings = TrainingSettings::default();
    settings.weight_decay = -1.0;
    assert!(settings.validate().is_err());

    let mut settings = TrainingSettings::default();
    settings.data = DataSettings {
        num_points: 100,
        margin: 50,
        ..DataSettings::default()
    };
    assert!(settings.validate().is_err());

    let mut settings = TrainingSettings::default();
    settings.data.noise_std = 0.0;
    assert!(settings.validate().is_err());
}

#[test]
fn test_epoch_overflow() {
    let settings: TrainingSettings = dejsonify(r#"{"num_nets": 18446744073709551615}"#).unwrap();
    assert!(settings.epochs().is_err());
    assert!(settings.validate().is_err());

    let settings: TrainingSettings = dejsonify(
        r#"{"num_nets": 1, "mix_epochs": 1, "burnin_epochs": 18446744073709551615}"#,
    )
    .unwrap();
    assert!(settings.validate().is_err());

    let settings: TrainingSettings =
        dejsonify(r#"{"num_nets": 18446744073709551615, "num_epochs": 50}"#).unwrap();
    assert_eq!(settings.epochs().unwrap(), 50);
}
