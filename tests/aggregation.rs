//! End-to-end aggregation checks

use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use dairy_ration::db::{migrations, Database};
use dairy_ration::models::{
    CoefficientSet, FeedCategory, FeedComposition, FeedEntry, NutrientIntakeTable, Ration,
    SelectionFlags, KP_FORAGE, USE_DNDF_IV,
};
use dairy_ration::nutrition::rules::{
    CP_INTAKE_KG, CRUDE_PROTEIN, DIGESTIBLE_NDF, NDF_DIGESTIBILITY_BASE, RUP_INTAKE_KG,
};
use dairy_ration::nutrition::{FeedLibrary, IntakeError, NutrientAggregator};

fn random_feed(rng: &mut StdRng, name: String) -> FeedComposition {
    let a = rng.gen_range(10.0..50.0);
    let b = rng.gen_range(10.0..(90.0 - a));
    FeedComposition {
        name,
        category: match rng.gen_range(0..4) {
            0 => FeedCategory::FattyAcidSupplement,
            1 => FeedCategory::FatSupplement,
            _ => FeedCategory::Other("Concentrate".to_string()),
        },
        dm_pct: rng.gen_range(20.0..95.0),
        concentrate_pct: rng.gen_range(0.0..=100.0),
        crude_protein_pct: rng.gen_range(2.0..50.0),
        rup_base_pct_cp: rng.gen_range(10.0..70.0),
        npn_pct_cp: rng.gen_range(0.0..a),
        protein_a_pct_cp: a,
        protein_b_pct_cp: b,
        protein_c_pct_cp: 100.0 - a - b,
        kd_rup: rng.gen_range(1.0..20.0),
        rup_digestibility_pct: rng.gen_range(50.0..95.0),
        ndf_pct: rng.gen_range(5.0..70.0),
        adf_pct: rng.gen_range(2.0..40.0),
        lignin_pct: rng.gen_range(0.0..5.0),
        ndf_digestibility_48h: if rng.gen_bool(0.5) {
            Some(rng.gen_range(20.0..80.0))
        } else {
            None
        },
        starch_pct: rng.gen_range(0.0..70.0),
        starch_digestibility_pct: rng.gen_range(70.0..99.0),
        crude_fat_pct: rng.gen_range(1.0..10.0),
        fatty_acid_pct: rng.gen_range(0.5..8.0),
        fa_digestibility_pct: rng.gen_range(50.0..90.0),
        c160_pct_fa: rng.gen_range(5.0..40.0),
        c183_pct_fa: rng.gen_range(0.0..50.0),
        ash_pct: rng.gen_range(1.0..12.0),
    }
}

/// Random ration and a library that covers it
fn random_case(rng: &mut StdRng) -> (Ration, FeedLibrary) {
    let count = rng.gen_range(1..8);
    let feeds: Vec<FeedComposition> = (0..count)
        .map(|i| random_feed(rng, format!("Feed {}", i)))
        .collect();

    let shares: Vec<f64> = (0..count).map(|_| rng.gen_range(1.0..10.0)).collect();
    let total: f64 = shares.iter().sum();
    let dmi = rng.gen_range(10.0..30.0);

    let entries = feeds
        .iter()
        .zip(&shares)
        .map(|(feed, share)| {
            let dm_pct = share / total * 100.0;
            FeedEntry::new(feed.name.clone(), dm_pct, dm_pct / 100.0 * dmi)
        })
        .collect();

    (Ration::new(entries).unwrap(), feeds.into_iter().collect())
}

fn flags(value: i64) -> SelectionFlags {
    SelectionFlags::new().with(USE_DNDF_IV, value)
}

fn run(ration: &Ration, library: &FeedLibrary, flag: i64) -> NutrientIntakeTable {
    NutrientAggregator::default()
        .run(ration, library, &CoefficientSet::nasem_defaults(), &flags(flag))
        .unwrap()
}

#[test]
fn test_diet_row_is_sum_of_feed_rows() {
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for case in 0..50 {
        let (ration, library) = random_case(&mut rng);
        let table = run(&ration, &library, case % 3);
        let diet = table.diet().unwrap();

        assert_eq!(table.rows().len(), ration.len() + 1);
        for (name, total) in &diet.components {
            let expected: f64 = table.feed_rows().map(|r| r.component(name).unwrap().kg_per_day).sum();
            assert_relative_eq!(total.kg_per_day, expected, epsilon = 1e-9, max_relative = 1e-12);
        }
        for (name, total) in &diet.quantities {
            let expected: f64 = table.feed_rows().map(|r| r.quantity(name).unwrap()).sum();
            assert_relative_eq!(*total, expected, epsilon = 1e-9, max_relative = 1e-12);
        }
        assert_relative_eq!(diet.entry.intake_kg, ration.total_intake_kg(), epsilon = 1e-9);
        assert_relative_eq!(diet.entry.dm_pct, 100.0, epsilon = 1e-9);
    }
}

#[test]
fn test_rdp_is_cp_minus_rup_on_diet() {
    let mut rng = StdRng::seed_from_u64(42);

    for _ in 0..20 {
        let (ration, library) = random_case(&mut rng);
        let table = run(&ration, &library, 0);
        let diet = table.diet().unwrap();
        let summary = table.summary().unwrap();

        let cp = diet.quantity(CP_INTAKE_KG).unwrap();
        let rup = diet.quantity(RUP_INTAKE_KG).unwrap();
        assert_eq!(summary.rdp_kg, Some(cp - rup));
        assert_eq!(summary.cp_intake_kg, Some(cp));
        assert_eq!(summary.dm_intake_kg, diet.entry.intake_kg);
    }
}

#[test]
fn test_reaggregation_is_idempotent() {
    let mut rng = StdRng::seed_from_u64(7);
    let (ration, library) = random_case(&mut rng);
    let aggregator = NutrientAggregator::default();
    let coefficients = CoefficientSet::nasem_defaults();

    let first = aggregator.run(&ration, &library, &coefficients, &flags(1)).unwrap();
    let second = aggregator
        .aggregate(first.clone(), &library, &coefficients, &flags(1))
        .unwrap();

    assert_eq!(first.diet(), second.diet());
    assert_eq!(first, second);
}

#[test]
fn test_worked_example() {
    let library: FeedLibrary = vec![
        FeedComposition {
            name: "Alfalfa".to_string(),
            crude_protein_pct: 18.0,
            ..Default::default()
        },
        FeedComposition {
            name: "Corn grain".to_string(),
            concentrate_pct: 100.0,
            crude_protein_pct: 9.0,
            ..Default::default()
        },
    ]
    .into_iter()
    .collect();
    let ration = Ration::new(vec![
        FeedEntry::new("Alfalfa", 50.0, 5.0),
        FeedEntry::new("Corn grain", 50.0, 5.0),
    ])
    .unwrap();

    let table = run(&ration, &library, 0);
    let cp = table.row("Alfalfa").unwrap().component(CRUDE_PROTEIN).unwrap();
    assert_relative_eq!(cp.value, 0.18, epsilon = 1e-12);
    assert_relative_eq!(cp.pct_of_diet, 0.09, epsilon = 1e-12);
    assert_relative_eq!(cp.kg_per_day, 0.9, epsilon = 1e-12);
}

#[test]
fn test_selection_changes_ndf_digestibility() {
    let library: FeedLibrary = vec![FeedComposition {
        name: "Corn silage".to_string(),
        concentrate_pct: 40.0,
        ndf_pct: 40.0,
        lignin_pct: 3.0,
        ndf_digestibility_48h: Some(55.0),
        ..Default::default()
    }]
    .into_iter()
    .collect();
    let ration = Ration::new(vec![FeedEntry::new("Corn silage", 100.0, 20.0)]).unwrap();

    let in_vitro = run(&ration, &library, 1);
    let row = in_vitro.row("Corn silage").unwrap();
    assert_relative_eq!(row.quantity(NDF_DIGESTIBILITY_BASE).unwrap(), 45.55, epsilon = 1e-12);
    assert_relative_eq!(
        row.component(DIGESTIBLE_NDF).unwrap().kg_per_day,
        0.4555 * 0.40 * 20.0,
        epsilon = 1e-12
    );

    let lignin = run(&ration, &library, 0);
    let base = lignin.row("Corn silage").unwrap().quantity(NDF_DIGESTIBILITY_BASE).unwrap();
    assert!((base - 45.55).abs() > 1.0);
}

#[test]
fn test_zero_ndf_and_lignin_stays_finite() {
    let library: FeedLibrary = vec![FeedComposition {
        name: "Urea".to_string(),
        concentrate_pct: 100.0,
        ..Default::default()
    }]
    .into_iter()
    .collect();
    let ration = Ration::new(vec![FeedEntry::new("Urea", 1.0, 0.2)]).unwrap();

    let table = run(&ration, &library, 0);
    let dndf = table.row("Urea").unwrap().component(DIGESTIBLE_NDF).unwrap();
    assert!(dndf.is_finite());
}

#[test]
fn test_unknown_feedstuff() {
    let mut rng = StdRng::seed_from_u64(1);
    let (_, library) = random_case(&mut rng);
    let ration = Ration::new(vec![FeedEntry::new("Moon rocks", 100.0, 20.0)]).unwrap();

    let err = NutrientAggregator::default()
        .run(&ration, &library, &CoefficientSet::nasem_defaults(), &flags(0))
        .unwrap_err();
    assert!(matches!(err, IntakeError::UnknownFeedstuff { ref name } if name == "Moon rocks"));
}

#[test]
fn test_missing_coefficient_is_named() {
    let mut rng = StdRng::seed_from_u64(2);
    let (ration, library) = random_case(&mut rng);
    let coefficients: CoefficientSet = CoefficientSet::nasem_defaults()
        .iter()
        .filter(|(name, _)| *name != KP_FORAGE)
        .map(|(name, value)| (name.to_string(), value))
        .collect();

    let err = NutrientAggregator::default()
        .run(&ration, &library, &coefficients, &flags(0))
        .unwrap_err();
    match err {
        IntakeError::MissingCoefficients { names } => assert_eq!(names, vec!["KpFor".to_string()]),
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn test_selection_flag_errors() {
    let mut rng = StdRng::seed_from_u64(3);
    let (ration, library) = random_case(&mut rng);
    let aggregator = NutrientAggregator::default();
    let coefficients = CoefficientSet::nasem_defaults();

    let err = aggregator.run(&ration, &library, &coefficients, &flags(3)).unwrap_err();
    match err {
        IntakeError::InvalidSelectionFlag { flag, value, allowed } => {
            assert_eq!(flag, USE_DNDF_IV);
            assert_eq!(value, 3);
            assert_eq!(allowed, vec![0, 1, 2]);
        }
        other => panic!("unexpected: {:?}", other),
    }

    let err = aggregator
        .run(&ration, &library, &coefficients, &SelectionFlags::new())
        .unwrap_err();
    assert!(matches!(err, IntakeError::MissingSelectionFlag { .. }));

    let err = aggregator
        .run(&ration, &library, &CoefficientSet::default(), &SelectionFlags::new())
        .unwrap_err();
    assert!(matches!(err, IntakeError::Validation(ref errors) if errors.len() == 2));
}

#[test]
fn test_feed_library_database_round_trip() {
    let database = Database::in_memory().unwrap();
    let mut rng = StdRng::seed_from_u64(11);
    let (ration, library) = random_case(&mut rng);

    database
        .with_conn(|conn| {
            migrations::run_migrations(conn)?;
            for name in ration.feedstuff_names() {
                let feed = dairy_ration::nutrition::FeedCompositionProvider::lookup(&library, name)
                    .unwrap()
                    .unwrap();
                FeedComposition::create(conn, &feed)?;
            }
            Ok(())
        })
        .unwrap();

    let from_memory = run(&ration, &library, 2);
    let from_db = NutrientAggregator::default()
        .run(&ration, &database, &CoefficientSet::nasem_defaults(), &flags(2))
        .unwrap();
    assert_eq!(from_memory.diet(), from_db.diet());
    assert_eq!(from_memory.columns(), from_db.columns());
}

#[test]
fn test_database_reports_first_unknown_in_ration_order() {
    let database = Database::in_memory().unwrap();
    database
        .with_conn(|conn| {
            migrations::run_migrations(conn)?;
            FeedComposition::create(
                conn,
                &FeedComposition {
                    name: "Alfalfa".to_string(),
                    crude_protein_pct: 18.0,
                    ..Default::default()
                },
            )?;
            Ok(())
        })
        .unwrap();

    // "Barley" sorts before "Wheat" but comes after it in the ration
    let ration = Ration::new(vec![
        FeedEntry::new("Alfalfa", 50.0, 10.0),
        FeedEntry::new("Wheat", 25.0, 5.0),
        FeedEntry::new("Barley", 25.0, 5.0),
    ])
    .unwrap();

    let err = NutrientAggregator::default()
        .run(&ration, &database, &CoefficientSet::nasem_defaults(), &flags(0))
        .unwrap_err();
    assert!(matches!(err, IntakeError::UnknownFeedstuff { ref name } if name == "Wheat"));
}
