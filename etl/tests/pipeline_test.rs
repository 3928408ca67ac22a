use std::io::Write;
use std::sync::Arc;

use etl::consumer::{Consumer, SharedConsumer, TransformConsumer};
use etl::error::ErrorKind;
use etl::extractor::{IteratorExtractor, ReaderExtractor};
use etl::lookup::InMemoryLookup;
use etl::metrics::{
    RECORDS_CONSUMED, RECORDS_EXTRACTED, RECORDS_TRANSFORMED, RecordingMetrics, WORK_FAILED,
};
use etl::pipeline::Pipeline;
use etl::test_utils::consumer::MemoryConsumer;
use etl::test_utils::shapes::{Contact, Person};
use etl::transformer::{FilterTransformer, MapTransformer, contains_filter};
use etl_config::shared::{ExecutorConfig, PipelineConfig};
use etl_telemetry::init_test_tracing;
use tempfile::NamedTempFile;

fn config(executor: ExecutorConfig) -> PipelineConfig {
    PipelineConfig {
        name: "contacts".to_string(),
        executor,
    }
}

fn contacts_file(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
    file.flush().unwrap();

    file
}

#[test]
fn json_lines_flow_through_transforms_into_the_consumer() {
    init_test_tracing();
    let file = contacts_file(&[
        r#"{"name": "ada", "email": "ada@example.com"}"#,
        "",
        r#"{"name": "bob", "email": "bob@example.com"}"#,
        r#"{"name": "eve", "email": "eve@example.com"}"#,
    ]);

    let allowed = InMemoryLookup::from_keys(["ada".to_string(), "eve".to_string()]);
    let memory = MemoryConsumer::new();
    let consumer = TransformConsumer::new(
        MapTransformer::new(|person: Person| Person {
            name: person.name.map(|name| name.to_uppercase()),
            ..person
        }),
        memory.clone(),
    );
    let consumer = TransformConsumer::new(
        FilterTransformer::new(
            |person: &Person, allowed: &InMemoryLookup<String, String>| {
                person
                    .name
                    .as_ref()
                    .is_some_and(|name| contains_filter(name, allowed))
            },
            allowed,
        ),
        consumer,
    );

    let metrics = RecordingMetrics::new();
    let extracted = Pipeline::new(
        config(ExecutorConfig::WorkerPool { workers: 2 }),
        ReaderExtractor::<Contact, _, _>::from_path(file.path()),
        consumer,
    )
    .unwrap()
    .with_metrics(Arc::new(metrics.clone()))
    .run()
    .unwrap();

    assert_eq!(extracted, 3);
    let mut contacts = memory.shapes::<Contact>();
    contacts.sort_by(|a, b| a.name.cmp(&b.name));
    assert_eq!(
        contacts,
        vec![
            Contact {
                name: Some("ADA".to_string()),
                email: Some("ada@example.com".to_string()),
            },
            Contact {
                name: Some("EVE".to_string()),
                email: Some("eve@example.com".to_string()),
            },
        ]
    );
    assert_eq!(metrics.count(RECORDS_EXTRACTED), 3.0);
    assert_eq!(metrics.count(RECORDS_CONSUMED), 3.0);
    // Both stages count their outputs: two records pass the filter and two leave the map.
    assert_eq!(metrics.count(RECORDS_TRANSFORMED), 4.0);
}

#[test]
fn unparseable_line_fails_the_run_after_earlier_records() {
    init_test_tracing();
    let file = contacts_file(&[
        r#"{"name": "ada", "email": "ada@example.com"}"#,
        "not json",
    ]);
    let memory = MemoryConsumer::new();

    let err = Pipeline::new(
        config(ExecutorConfig::Immediate),
        ReaderExtractor::<Contact, _, _>::from_path(file.path()),
        memory.clone(),
    )
    .unwrap()
    .run()
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::BackingFailure);
    assert!(err.detail().unwrap_or_default().contains("line 2"));
    assert_eq!(memory.records().len(), 1);
    assert_eq!(memory.close_calls(), 1);
}

#[test]
fn missing_source_file_fails_on_open() {
    init_test_tracing();
    let dir = tempfile::tempdir().unwrap();
    let memory = MemoryConsumer::new();

    let err = Pipeline::new(
        config(ExecutorConfig::Immediate),
        ReaderExtractor::<Contact, _, _>::from_path(dir.path().join("missing.jsonl")),
        memory.clone(),
    )
    .unwrap()
    .run()
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::BackingFailure);
    assert_eq!(memory.open_calls(), 0);
}

#[test]
fn shared_consumer_is_opened_once_across_pipelines() {
    init_test_tracing();
    let memory = MemoryConsumer::new();
    let shared = Arc::new(SharedConsumer::new(memory.clone()));
    let metrics = RecordingMetrics::new();
    shared.open(&metrics).unwrap();

    for batch in 0..3 {
        let people: Vec<Person> = (0..2)
            .map(|i| Person {
                name: Some(format!("person-{batch}-{i}")),
                age: Some(i),
            })
            .collect();

        Pipeline::new(
            config(ExecutorConfig::Immediate),
            IteratorExtractor::from_values(people),
            shared.clone(),
        )
        .unwrap()
        .run()
        .unwrap();

        assert_eq!(shared.open_count(), 1);
    }

    assert_eq!(memory.close_calls(), 0);
    shared.close().unwrap();

    assert_eq!(memory.open_calls(), 1);
    assert_eq!(memory.close_calls(), 1);
    assert_eq!(memory.records().len(), 6);
}

#[test]
fn worker_pool_run_contains_consumer_failures() {
    init_test_tracing();
    let memory = MemoryConsumer::failing_every(3);
    let metrics = RecordingMetrics::new();
    let people: Vec<Person> = (0..30)
        .map(|i| Person {
            name: Some(format!("person-{i}")),
            age: Some(i),
        })
        .collect();

    let extracted = Pipeline::new(
        config(ExecutorConfig::WorkerPool { workers: 3 }),
        IteratorExtractor::from_values(people),
        memory.clone(),
    )
    .unwrap()
    .with_metrics(Arc::new(metrics.clone()))
    .run()
    .unwrap();

    assert_eq!(extracted, 30);
    assert_eq!(memory.records().len(), 20);
    assert_eq!(metrics.count(WORK_FAILED), 10.0);
    assert_eq!(metrics.count(RECORDS_CONSUMED), 20.0);
}
