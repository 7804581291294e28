use std::collections::{HashMap, HashSet};

use hmis_core::frame_utils::{int_values, key_values};
use hmis_core::pivot_by_stage;
use hmis_model::StageSpec;
use polars::prelude::{DataFrame, NamedFrom, Series};
use proptest::prelude::*;

fn stages() -> StageSpec {
    StageSpec {
        collection_stage_column: "stage".to_string(),
        entry_stage_val: 1,
        exit_stage_val: 3,
        update_stage_val: 2,
        annual_assessment_stage_val: 5,
        post_exit_stage_val: 6,
    }
}

fn rows() -> impl Strategy<Value = Vec<(i64, i64, i64)>> {
    prop::collection::vec((0i64..8, prop::sample::select(vec![1i64, 2, 3, 5, 6, 9]), any::<i64>()), 0..40)
}

proptest! {
    #[test]
    fn entry_ids_appear_once_and_exit_rows_never_fall_back(rows in rows()) {
        let df = DataFrame::new(vec![
            Series::new("id".into(), rows.iter().map(|r| r.0).collect::<Vec<_>>()).into(),
            Series::new("stage".into(), rows.iter().map(|r| r.1).collect::<Vec<_>>()).into(),
            Series::new("v".into(), rows.iter().map(|r| r.2).collect::<Vec<_>>()).into(),
        ])
        .unwrap();
        let out = pivot_by_stage(&df, &stages(), "id", &["v".to_string()]).unwrap();

        let ids: Vec<String> = key_values(&out, "id").unwrap().into_iter().flatten().collect();
        let unique: HashSet<&String> = ids.iter().collect();
        prop_assert_eq!(unique.len(), ids.len());

        let mut last_exit: HashMap<String, i64> = HashMap::new();
        for (id, stage, value) in &rows {
            if *stage == 1 {
                prop_assert!(ids.contains(&id.to_string()));
            }
            if *stage == 3 {
                last_exit.insert(id.to_string(), *value);
            }
        }
        let exits = int_values(&out, "v_exit").unwrap();
        for (id, exit) in ids.iter().zip(exits) {
            if let Some(expected) = last_exit.get(id) {
                prop_assert_eq!(exit, Some(*expected));
            }
        }
    }
}
