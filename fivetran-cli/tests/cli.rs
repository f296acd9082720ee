use fivetran_test_utils::{
    empty_schema, parse_output, record_line, schema_line, state_line, to_input, RecordBuilder,
};
use predicates::prelude::*;
use serde_json::{json, Value};
use std::error::Error;
use std::fs;

fn mapper() -> Result<assert_cmd::Command, Box<dyn Error>> {
    let mut cmd = assert_cmd::Command::cargo_bin("mapper-fivetran")?;
    cmd.env_remove("RUST_LOG");
    Ok(cmd)
}

fn nested_stream() -> String {
    let schema = json!({
        "type": "object",
        "properties": {
            "id": {"type": "integer"},
            "owner": {"type": "object", "properties": {"firstName": {"type": "string"}}}
        }
    });
    to_input(&[
        schema_line("pets", schema.as_object().unwrap(), &["id"]),
        record_line(
            "pets",
            &RecordBuilder::new()
                .int("id", 1)
                .object("owner", json!({"firstName": "Ada"}))
                .build(),
        ),
    ])
}

#[test]
fn maps_stdin_to_stdout() -> Result<(), Box<dyn Error>> {
    let input = to_input(&[
        schema_line("animals", &empty_schema(), &[]),
        record_line("animals", &RecordBuilder::new().string("name", "Otis").build()),
        state_line(json!({"bookmarks": {}})),
    ]);

    let output = mapper()?
        .write_stdin(input)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let messages = parse_output(&output);

    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0]["key_properties"], json!(["_fivetran_id"]));
    assert_eq!(
        messages[1]["record"]["_fivetran_id"],
        "1ea277da8b005934929326188bbb5efb"
    );
    assert_eq!(messages[2], json!({"type": "STATE", "value": {"bookmarks": {}}}));
    Ok(())
}

#[test]
fn reads_input_file() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let input_path = dir.path().join("input.jsonl");
    fs::write(&input_path, nested_stream())?;

    let output = mapper()?
        .args(["--input", input_path.to_str().unwrap()])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let messages = parse_output(&output);
    assert_eq!(messages[1]["record"]["owner_first_name"], "Ada");
    Ok(())
}

#[test]
fn config_file_disables_flattening() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let config_path = dir.path().join("config.json");
    fs::write(&config_path, r#"{"flattening_enabled": false}"#)?;

    let output = mapper()?
        .args(["--config", config_path.to_str().unwrap()])
        .write_stdin(nested_stream())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let messages = parse_output(&output);
    assert_eq!(messages[1]["record"]["owner"], json!({"firstName": "Ada"}));
    Ok(())
}

#[test]
fn env_config_sets_max_depth() -> Result<(), Box<dyn Error>> {
    let output = mapper()?
        .args(["--config", "ENV"])
        .env("MAPPER_FIVETRAN_FLATTENING_MAX_DEPTH", "0")
        .write_stdin(nested_stream())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let messages = parse_output(&output);
    assert_eq!(messages[1]["record"]["owner"], "{\"firstName\":\"Ada\"}");
    Ok(())
}

#[test]
fn invalid_config_fails() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let config_path = dir.path().join("config.json");
    fs::write(&config_path, r#"{"flattening_max_depth": "deep"}"#)?;

    mapper()?
        .args(["--config", config_path.to_str().unwrap()])
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration"));
    Ok(())
}

#[test]
fn record_before_schema_exits_nonzero() -> Result<(), Box<dyn Error>> {
    mapper()?
        .write_stdin(record_line("animals", &RecordBuilder::new().build()))
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "Error: Stream 'animals' received a record before its schema",
        ));
    Ok(())
}

#[test]
fn malformed_line_exits_nonzero() -> Result<(), Box<dyn Error>> {
    mapper()?
        .write_stdin("{\"type\": \"RECORD\", \"stream\": \"animals\"}\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing required record key(s)"));
    Ok(())
}

#[test]
fn empty_input_produces_no_output() -> Result<(), Box<dyn Error>> {
    mapper()?
        .write_stdin("\n\n")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
    Ok(())
}

#[test]
fn about_json() -> Result<(), Box<dyn Error>> {
    let output = mapper()?
        .arg("--about")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let about: Value = serde_json::from_slice(&output)?;
    assert_eq!(about["name"], "mapper-fivetran");
    assert_eq!(about["capabilities"], json!(["flattening"]));
    Ok(())
}

#[test]
fn about_markdown() -> Result<(), Box<dyn Error>> {
    mapper()?
        .args(["--about", "--format", "markdown"])
        .assert()
        .success()
        .stdout(predicate::str::contains("## Settings"))
        .stdout(predicate::str::contains("flattening_enabled"));
    Ok(())
}
