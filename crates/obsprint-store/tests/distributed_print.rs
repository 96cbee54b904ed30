//! End-to-end print runs over worker threads.
//!
//! Each test splits a dataset across a `ThreadGroup`, runs the printer on
//! every rank, and compares what the ranks wrote.

use obsprint_kernel::{
    Column, FilterPrinter, PrintError, PrintParameters, SelectAll, SelectionPredicate, ThreadGroup,
    Variable, VariablePrintParameters,
};
use obsprint_store::{Dataset, FieldData, FieldMask, MemoryStore, Partition};
use std::collections::BTreeSet;
use std::io::Cursor;
use std::thread;

fn trim_lines(text: &str) -> String {
    text.lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim_end()
        .to_string()
}

fn run_workers(
    stores: &[MemoryStore],
    params: &PrintParameters,
    predicate: &(dyn SelectionPredicate + Sync),
) -> Vec<Result<String, PrintError>> {
    let groups = ThreadGroup::new(stores.len());
    thread::scope(|scope| {
        let handles: Vec<_> = stores
            .iter()
            .zip(groups)
            .map(|(store, group)| {
                scope.spawn(move || -> Result<String, PrintError> {
                    let mut out = Vec::new();
                    FilterPrinter::new(params, store, &group).run(predicate, &mut out)?;
                    Ok(trim_lines(&String::from_utf8_lossy(&out)))
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("worker thread"))
            .collect()
    })
}

fn outputs(results: Vec<Result<String, PrintError>>) -> Vec<String> {
    results
        .into_iter()
        .map(|result| result.expect("print run"))
        .collect()
}

fn flat(rows: Vec<usize>, field: &str, values: Vec<f32>) -> MemoryStore {
    MemoryStore::new(rows)
        .with(field, FieldData::Flat(Column::Float(values)))
        .expect("store")
}

fn narrow(variables: Vec<VariablePrintParameters>) -> PrintParameters {
    PrintParameters {
        variables,
        column_width: 4,
        float_precision: 1,
        max_text_width: 200,
        ..PrintParameters::default()
    }
}

#[test]
fn two_workers_print_rows_in_original_order() {
    let stores = [
        flat(vec![2, 4], "ObsValue/x", vec![20.0, 40.0]),
        flat(vec![1, 3], "ObsValue/x", vec![10.0, 30.0]),
    ];
    let params = PrintParameters {
        print_rank0: false,
        ..narrow(vec![VariablePrintParameters::new("ObsValue/x")])
    };

    let texts = outputs(run_workers(&stores, &params, &SelectAll));
    let table = [
        "  Location |    1 |    2 |    3 |    4 |",
        "-----------+------+------+------+------+-",
        "ObsValue/x | 10.0 | 20.0 | 30.0 | 40.0 |",
    ]
    .join("\n");
    assert!(texts[0].ends_with(&table), "rank 0 wrote:\n{}", texts[0]);
    assert_eq!(texts[0], texts[1]);
}

#[test]
fn print_rank0_keeps_only_rank_zero_rows() {
    let stores = [
        flat(vec![2, 4], "ObsValue/x", vec![20.0, 40.0]),
        flat(vec![1, 3], "ObsValue/x", vec![10.0, 30.0]),
    ];
    let params = narrow(vec![VariablePrintParameters::new("ObsValue/x")]);

    let texts = outputs(run_workers(&stores, &params, &SelectAll));
    let table = [
        "  Location |    2 |    4 |",
        "-----------+------+------+-",
        "ObsValue/x | 20.0 | 40.0 |",
    ]
    .join("\n");
    assert!(texts[0].ends_with(&table), "rank 0 wrote:\n{}", texts[0]);
}

const DATASET: &str = r#"
{"group":"MetaData","name":"station","type":"string","values":["a","b","c","d","e"]}
{"group":"ObsValue","name":"bt_4","type":"float","values":[1,2,3,4,null]}
{"group":"ObsValue","name":"bt_5","type":"float","values":[5,6,7,8,9]}
{"group":"GeoVaLs","name":"air_temperature","type":"float","levels":[[10,11,12,13,14],[20,21,22,23,24]]}
"#;

#[test]
fn replicated_output_matches_a_single_worker() {
    let dataset = Dataset::read(Cursor::new(DATASET)).expect("dataset");
    let excluded = BTreeSet::from([1]);
    let params = narrow(vec![
        VariablePrintParameters::new("MetaData/station"),
        VariablePrintParameters::new("ObsValue/bt").with_channels("4-5"),
        VariablePrintParameters::new("GeoVaLs/air_temperature").with_levels([0, 1, 7]),
    ]);

    let single = dataset
        .partition(1, &excluded, Partition::RoundRobin)
        .expect("single");
    let replicated = dataset
        .partition(3, &excluded, Partition::Replicated)
        .expect("replicated");

    let expected = outputs(run_workers(&single, &params, &SelectAll)).remove(0);
    let texts = outputs(run_workers(&replicated, &params, &SelectAll));
    assert_eq!(texts[0], expected);
    assert!(expected.contains("GeoVaLs/air_temperature (level 7) not present in filter data"));
    assert!(expected.contains("   Location |    0 |    2 |    3 |    4 |"));
}

#[test]
fn channel_missing_on_one_worker_is_skipped_everywhere() {
    let worker0 = MemoryStore::new(vec![0])
        .with("ObsValue/bt_4", FieldData::Flat(Column::Float(vec![1.0])))
        .and_then(|s| s.with("ObsValue/bt_5", FieldData::Flat(Column::Float(vec![2.0]))))
        .expect("worker 0");
    let worker1 = MemoryStore::new(vec![1])
        .with("ObsValue/bt_4", FieldData::Flat(Column::Float(vec![3.0])))
        .and_then(|s| s.with("MetaData/extra", FieldData::Flat(Column::Integer(vec![7]))))
        .expect("worker 1");
    let params = PrintParameters {
        print_rank0: false,
        ..narrow(vec![
            VariablePrintParameters::new("ObsValue/bt").with_channels("4,5"),
            VariablePrintParameters::new("MetaData/extra"),
        ])
    };

    let texts = outputs(run_workers(&[worker0, worker1], &params, &SelectAll));
    for text in &texts {
        assert!(text.contains("ObsValue/bt_5 not present in filter data"));
        assert!(text.contains("MetaData/extra not present in filter data"));
        assert!(text.ends_with("ObsValue/bt_4 |  1.0 |  3.0 |"), "wrote:\n{text}");
    }
}

#[test]
fn inconsistent_types_fail_on_every_worker() {
    let worker0 = flat(vec![0], "ObsValue/x", vec![1.0]);
    let worker1 = MemoryStore::new(vec![1])
        .with("ObsValue/x", FieldData::Flat(Column::Integer(vec![1])))
        .expect("worker 1");
    let params = narrow(vec![VariablePrintParameters::new("ObsValue/x")]);

    for result in run_workers(&[worker0, worker1], &params, &SelectAll) {
        assert!(matches!(
            result,
            Err(PrintError::InconsistentSchema { ref field, .. }) if field == "ObsValue/x"
        ));
    }
}

#[test]
fn field_mask_selects_rows_across_workers() {
    let text = r#"
{"group":"ObsValue","name":"x","type":"float","values":[0,1,2,3]}
{"group":"QC","name":"pass","type":"bool","values":[true,false,false,true]}
"#;
    let dataset = Dataset::read(Cursor::new(text)).expect("dataset");
    let stores = dataset
        .partition(2, &BTreeSet::new(), Partition::Contiguous)
        .expect("partition");
    let params = PrintParameters {
        print_rank0: false,
        ..narrow(vec![VariablePrintParameters::new("ObsValue/x")])
    };
    let mask = FieldMask::new(Variable::new("QC", "pass"));

    let texts = outputs(run_workers(&stores, &params, &mask));
    assert!(texts[0].ends_with("ObsValue/x |  0.0 |  3.0 |"), "wrote:\n{}", texts[0]);
}

#[test]
fn skip_derived_prints_the_plain_copy_whatever_its_type() {
    let store = |rows: Vec<usize>, values: Vec<f32>| {
        let derived = values.iter().map(|&v| v as i32).collect();
        MemoryStore::new(rows)
            .with("ObsValue/x", FieldData::Flat(Column::Float(values)))
            .and_then(|s| s.with("DerivedObsValue/x", FieldData::Flat(Column::Integer(derived))))
            .expect("store")
    };
    let stores = [store(vec![0], vec![1.5]), store(vec![1], vec![2.5])];
    let params = PrintParameters {
        print_rank0: false,
        skip_derived: true,
        ..narrow(vec![VariablePrintParameters::new("ObsValue/x")])
    };

    let texts = outputs(run_workers(&stores, &params, &SelectAll));
    assert!(texts[0].ends_with("ObsValue/x |  1.5 |  2.5 |"), "wrote:\n{}", texts[0]);

    let derived = PrintParameters {
        skip_derived: false,
        ..params
    };
    let texts = outputs(run_workers(&stores, &derived, &SelectAll));
    assert!(texts[0].ends_with("ObsValue/x |    1 |    2 |"), "wrote:\n{}", texts[0]);
}
