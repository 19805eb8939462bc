//! Orchestration for a single batch: validate, edit, run, record.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, instrument};

use crate::core::flags::{FlagInputs, flag_slice, organize_flags};
use crate::core::lengths::{is_boolean_list, validate_lengths};
use crate::core::shape::{check_structural_consistency, is_vacuous_nested_list};
use crate::core::types::{BatchOutputs, FileGroups, OrganizedFlags, output_key};
use crate::error::BatchError;
use crate::io::agent::EditAgent;
use crate::io::runner::{RunRequest, ScriptRunner};

/// Caller-supplied description of one batch.
///
/// File lists and flag lists stay untyped until [`validate_batch`] has checked
/// their shape and element types. Flag lists may be flat (one entry per file)
/// or pre-nested (one sublist per directory).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub directory_paths: Vec<String>,
    pub files_by_directory: Value,
    pub record_output_flag: Value,
    #[serde(default)]
    pub test_file_names: Option<Value>,
    #[serde(default)]
    pub run_tests_flag: Option<Value>,
    #[serde(default)]
    pub record_test_output_values: Option<Value>,
    /// Instruction batch per directory, parallel-indexed to `directory_paths`.
    #[serde(default)]
    pub instructions: Vec<Vec<String>>,
    #[serde(default)]
    pub model: Option<String>,
}

/// Orchestration switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecuteOptions {
    /// Log the failure before returning it.
    pub verbose: bool,
}

/// A batch whose lists passed every structural check, in typed form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedBatch {
    pub directory_paths: Vec<String>,
    pub files_by_directory: FileGroups,
    pub test_file_names: Option<FileGroups>,
    pub flags: OrganizedFlags,
}

/// Run every input check in a fixed order and redistribute the flags.
///
/// The first failing check is returned; later checks do not run.
pub fn validate_batch(request: &BatchRequest) -> Result<ValidatedBatch, BatchError> {
    let record_flags = flatten_flag_input(&request.record_output_flag);
    let run_flags = request.run_tests_flag.as_ref().map(flatten_flag_input);
    let record_test_flags = request
        .record_test_output_values
        .as_ref()
        .map(flatten_flag_input);

    if request.directory_paths.is_empty()
        || request.directory_paths.iter().any(|path| path.is_empty())
    {
        return Err(BatchError::invalid(
            "directory_paths cannot be empty and must contain valid paths",
        ));
    }

    if !is_boolean_list(&record_flags) {
        return Err(BatchError::invalid(
            "record_output_flag must contain boolean values",
        ));
    }

    let check = validate_lengths(&request.files_by_directory, &record_flags, None);
    if check.is_violation() {
        return Err(BatchError::invalid(format!(
            "Mismatch in the lengths of files_by_directory and record_output_flag: {}",
            check.describe()
        )));
    }
    check_nested_split(
        &request.record_output_flag,
        &request.files_by_directory,
        "record_output_flag",
    )?;

    if let (Some(run_flags), Some(test_files)) = (&run_flags, &request.test_file_names) {
        if !is_boolean_list(run_flags) {
            return Err(BatchError::invalid(
                "run_tests_flag must contain boolean values",
            ));
        }
        if record_test_flags
            .as_ref()
            .is_some_and(|flags| !is_boolean_list(flags))
        {
            return Err(BatchError::invalid(
                "record_test_output_values must contain boolean values",
            ));
        }
        let check = validate_lengths(test_files, run_flags, record_test_flags.as_ref());
        if check.is_violation() {
            return Err(BatchError::invalid(format!(
                "Mismatch in the lengths of test_file_names, run_tests_flag, or record_test_output_values: {}",
                check.describe()
            )));
        }
        for (label, flags) in [
            ("run_tests_flag", request.run_tests_flag.as_ref()),
            ("record_test_output_values", request.record_test_output_values.as_ref()),
        ] {
            if let Some(flags) = flags {
                check_nested_split(flags, test_files, label)?;
            }
        }
    }

    let directories = Value::from(request.directory_paths.clone());
    if !check_structural_consistency(
        &request.files_by_directory,
        request.test_file_names.as_ref(),
        &directories,
    ) {
        return Err(BatchError::invalid(
            "Invalid list structure or lengths between nested lists and directory_paths",
        ));
    }

    if is_vacuous_nested_list(&request.files_by_directory)
        || request
            .test_file_names
            .as_ref()
            .is_some_and(is_vacuous_nested_list)
    {
        return Err(BatchError::invalid(
            "Files by directory list or test file names list is a nested empty list",
        ));
    }

    let files_by_directory = to_groups(&request.files_by_directory, "files_by_directory")?;
    let test_file_names = request
        .test_file_names
        .as_ref()
        .map(|value| to_groups(value, "test_file_names"))
        .transpose()?;
    let record = to_flags(&record_flags, "record_output_flag")?;
    let run = run_flags
        .as_ref()
        .map(|value| to_flags(value, "run_tests_flag"))
        .transpose()?;
    let record_tests = record_test_flags
        .as_ref()
        .map(|value| to_flags(value, "record_test_output_values"))
        .transpose()?;

    let flags = organize_flags(&FlagInputs {
        directory_paths: &request.directory_paths,
        files_by_directory: Some(&files_by_directory),
        record_output_flag: Some(&record),
        test_file_names: test_file_names.as_deref(),
        run_tests_flag: run.as_deref(),
        record_test_output_values: record_tests.as_deref(),
    })?;

    Ok(ValidatedBatch {
        directory_paths: request.directory_paths.clone(),
        files_by_directory,
        test_file_names,
        flags,
    })
}

/// Validate the batch, apply instructions through `agent`, then run and record
/// scripts and tests through `runner`.
///
/// Any failure aborts the remaining work and is returned unchanged; with
/// `options.verbose` it is also logged.
pub fn execute<A: EditAgent, R: ScriptRunner>(
    request: &BatchRequest,
    agent: &A,
    runner: &R,
    options: ExecuteOptions,
) -> Result<BatchOutputs> {
    let result = run_batch(request, agent, runner);
    if let Err(err) = &result {
        if options.verbose {
            error!(err = %format!("{err:#}"), "batch failed");
        } else {
            debug!(err = %format!("{err:#}"), "batch failed");
        }
    }
    result
}

#[instrument(skip_all, fields(directories = request.directory_paths.len()))]
fn run_batch<A: EditAgent, R: ScriptRunner>(
    request: &BatchRequest,
    agent: &A,
    runner: &R,
) -> Result<BatchOutputs> {
    let batch = validate_batch(request)?;
    let model = resolve_model(request, &batch)?;
    debug!(flags = ?batch.flags, "flags organized");

    let mut outputs = BatchOutputs::default();
    for (index, directory) in batch.directory_paths.iter().enumerate() {
        let dir = Path::new(directory);
        let files = batch
            .files_by_directory
            .get(index)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let tests = batch
            .test_file_names
            .as_ref()
            .and_then(|groups| groups.get(index))
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        if let Some(instructions) = request.instructions.get(index)
            && !files.is_empty()
            && !instructions.is_empty()
        {
            info!(directory, files = files.len(), "applying instructions");
            agent
                .apply_instructions(dir, files, model, instructions)
                .with_context(|| format!("edit files in {directory}"))?;
        }

        let record_flags = flag_slice(batch.flags.record_output_flag.as_ref(), index);
        let run_flags = flag_slice(batch.flags.run_tests_flag.as_ref(), index);
        let record_test_flags =
            flag_slice(batch.flags.record_test_output_values.as_ref(), index);
        let any_set = [record_flags, run_flags, record_test_flags]
            .iter()
            .any(|flags| flags.contains(&true));
        if !any_set {
            debug!(directory, "no flags set, skipping execution");
            continue;
        }

        for (file, &record) in files.iter().zip(record_flags) {
            if !record {
                continue;
            }
            info!(directory, file, "running script");
            let request = RunRequest {
                script_path: Some(dir.join(file)),
                record_output: true,
                ..RunRequest::default()
            };
            let record = runner.run_and_record(&request)?;
            outputs
                .script_outputs
                .insert(output_key(directory, file), record.script);
        }

        for ((test, &run), &record) in tests.iter().zip(run_flags).zip(record_test_flags) {
            if !run && !record {
                continue;
            }
            info!(directory, test, run, record, "running test file");
            let path = dir.join(test);
            let request = RunRequest {
                test_file_paths: vec![path.clone()],
                record_test_output: record,
                run_tests: run,
                ..RunRequest::default()
            };
            let mut result = runner.run_and_record(&request)?;
            let output = result.tests.remove(&path).unwrap_or_default();
            outputs
                .test_outputs
                .insert(output_key(directory, test), output);
        }
    }

    info!(
        scripts = outputs.script_outputs.len(),
        tests = outputs.test_outputs.len(),
        "batch complete"
    );
    Ok(outputs)
}

fn resolve_model<'a>(request: &'a BatchRequest, batch: &ValidatedBatch) -> Result<&'a str> {
    let needs_agent = request
        .instructions
        .iter()
        .zip(&batch.files_by_directory)
        .any(|(instructions, files)| !instructions.is_empty() && !files.is_empty());
    match request.model.as_deref() {
        Some(model) if !model.trim().is_empty() => Ok(model),
        _ if needs_agent => {
            Err(BatchError::invalid("a model is required to apply instructions").into())
        }
        _ => Ok(""),
    }
}

/// Flatten a pre-nested flag list (one sublist per directory) into a flat one.
///
/// Anything that is not a non-empty list of lists is returned as-is and left
/// for the type checks to judge.
fn flatten_flag_input(value: &Value) -> Value {
    match pre_nested(value) {
        Some(sublists) => Value::Array(
            sublists
                .iter()
                .filter_map(Value::as_array)
                .flatten()
                .cloned()
                .collect(),
        ),
        None => value.clone(),
    }
}

/// The sublists of `value` if it is a non-empty list of lists.
fn pre_nested(value: &Value) -> Option<&Vec<Value>> {
    value
        .as_array()
        .filter(|items| !items.is_empty() && items.iter().all(Value::is_array))
}

/// Reject a pre-nested flag list whose per-directory lengths differ from
/// `groups`. Flat input and non-list groups are left to the other checks.
fn check_nested_split(flags: &Value, groups: &Value, label: &str) -> Result<(), BatchError> {
    let (Some(flag_lists), Some(groups)) = (pre_nested(flags), groups.as_array()) else {
        return Ok(());
    };
    let sublist_len = |items: &[Value], index: usize| {
        items
            .get(index)
            .and_then(Value::as_array)
            .map(Vec::len)
            .unwrap_or(0)
    };
    for index in 0..flag_lists.len().max(groups.len()) {
        let flags_here = sublist_len(flag_lists, index);
        let files_here = sublist_len(groups, index);
        if flags_here != files_here {
            return Err(BatchError::invalid(format!(
                "{label} has {flags_here} flags for directory {index}, expected {files_here}"
            )));
        }
    }
    Ok(())
}

fn to_groups(value: &Value, label: &str) -> Result<FileGroups, BatchError> {
    serde_json::from_value(value.clone()).map_err(|err| {
        BatchError::invalid(format!(
            "{label} must be a list of lists of strings: {err}"
        ))
    })
}

fn to_flags(value: &Value, label: &str) -> Result<Vec<bool>, BatchError> {
    serde_json::from_value(value.clone())
        .map_err(|err| BatchError::invalid(format!("{label} must contain boolean values: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::RunOutput;
    use crate::error::classify;
    use crate::test_support::{RecordingAgent, ScriptedRunner};
    use serde_json::json;

    fn request(files: Value, record: Value) -> BatchRequest {
        BatchRequest {
            directory_paths: vec!["dir1".to_string(), "dir2".to_string()],
            files_by_directory: files,
            record_output_flag: record,
            ..BatchRequest::default()
        }
    }

    fn invalid_message(request: &BatchRequest) -> String {
        match validate_batch(request) {
            Err(BatchError::InvalidArgument(message)) => message,
            other => panic!("expected invalid argument, got {other:?}"),
        }
    }

    #[test]
    fn empty_directory_list_is_rejected_first() {
        let mut req = request(json!("garbage"), json!("garbage"));
        req.directory_paths.clear();
        assert!(invalid_message(&req).contains("directory_paths cannot be empty"));
    }

    #[test]
    fn blank_directory_path_is_rejected() {
        let mut req = request(json!([["a.py"], ["b.py"]]), json!([true, true]));
        req.directory_paths[1] = String::new();
        assert!(invalid_message(&req).contains("directory_paths"));
    }

    #[test]
    fn non_boolean_record_flag_is_rejected() {
        let req = request(json!([["a.py"], ["b.py"]]), json!([true, "True"]));
        assert!(invalid_message(&req).contains("record_output_flag must contain boolean"));
    }

    #[test]
    fn record_flag_length_mismatch_is_rejected() {
        let req = request(json!([["a.py", "b.py"], ["c.py"]]), json!([true, true]));
        let message = invalid_message(&req);
        assert!(message.contains("Mismatch in the lengths of files_by_directory"));
        assert!(message.contains("expected 3 flags, got 2"));
    }

    #[test]
    fn non_string_file_name_is_rejected() {
        let req = request(json!([["a.py", 2], ["c.py"]]), json!([true, true, true]));
        assert!(invalid_message(&req).contains("Mismatch in the lengths"));
    }

    #[test]
    fn test_flag_mismatch_is_rejected() {
        let mut req = request(json!([["a.py"], ["b.py"]]), json!([true, true]));
        req.test_file_names = Some(json!([["test_a.py"], ["test_b.py"]]));
        req.run_tests_flag = Some(json!([true]));
        req.record_test_output_values = Some(json!([true, true]));
        assert!(invalid_message(&req).contains("test_file_names, run_tests_flag"));
    }

    #[test]
    fn non_boolean_run_flag_is_rejected() {
        let mut req = request(json!([["a.py"], ["b.py"]]), json!([true, true]));
        req.test_file_names = Some(json!([["test_a.py"], ["test_b.py"]]));
        req.run_tests_flag = Some(json!([1, 0]));
        req.record_test_output_values = Some(json!([true, true]));
        assert!(invalid_message(&req).contains("run_tests_flag must contain boolean"));
    }

    #[test]
    fn more_groups_than_directories_is_rejected() {
        let req = request(json!([["a.py"], ["b.py"], ["c.py"]]), json!([true, true, true]));
        assert!(invalid_message(&req).contains("Invalid list structure"));
    }

    #[test]
    fn vacuous_files_are_rejected() {
        let req = request(json!([[], []]), json!([]));
        assert!(invalid_message(&req).contains("nested empty list"));
    }

    #[test]
    fn vacuous_tests_are_rejected() {
        let mut req = request(json!([["a.py"], []]), json!([true]));
        req.test_file_names = Some(json!([[]]));
        req.run_tests_flag = Some(json!([]));
        req.record_test_output_values = Some(json!([]));
        assert!(invalid_message(&req).contains("nested empty list"));
    }

    #[test]
    fn run_flag_without_tests_fails_coupling() {
        let mut req = request(json!([["a.py"], ["b.py"]]), json!([true, true]));
        req.run_tests_flag = Some(json!([true]));
        assert!(invalid_message(&req).contains("must all be provided"));
    }

    #[test]
    fn pre_nested_flags_are_flattened() {
        let mut req = request(json!([["a.py", "b.py"], ["c.py"]]), json!([[true, false], [true]]));
        req.test_file_names = Some(json!([["test_a.py"], []]));
        req.run_tests_flag = Some(json!([[true], []]));
        req.record_test_output_values = Some(json!([false]));

        let batch = validate_batch(&req).expect("validate");
        assert_eq!(
            batch.flags.record_output_flag,
            Some(vec![vec![true, false], vec![true]])
        );
        assert_eq!(batch.flags.run_tests_flag, Some(vec![vec![true], vec![]]));
    }

    #[test]
    fn validation_failure_spawns_nothing() {
        let req = request(json!([["a.py"], ["b.py"]]), json!([true]));
        let agent = RecordingAgent::default();
        let runner = ScriptedRunner::echo();

        let err = execute(&req, &agent, &runner, ExecuteOptions { verbose: true }).unwrap_err();
        assert!(classify(&err).is_some_and(BatchError::is_invalid_argument));
        assert!(agent.calls().is_empty());
        assert!(runner.requests().is_empty());
    }

    #[test]
    fn records_scripts_with_composite_keys() {
        let req = request(
            json!([["file1.py", "file2.py"], ["file3.py"]]),
            json!([true, false, true]),
        );
        let agent = RecordingAgent::default();
        let runner = ScriptedRunner::echo();

        let outputs = execute(&req, &agent, &runner, ExecuteOptions::default()).expect("execute");

        let keys: Vec<&str> = outputs.script_outputs.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["dir1-file1.py", "dir2-file3.py"]);
        assert_eq!(
            outputs.script_outputs["dir1-file1.py"],
            RunOutput::new("Output from dir1/file1.py", "")
        );
        assert!(outputs.test_outputs.is_empty());
        assert_eq!(runner.requests().len(), 2);
    }

    #[test]
    fn agent_called_only_for_directories_with_files_and_instructions() {
        let mut req = request(json!([["file1.py"], []]), json!([false]));
        req.directory_paths.push("dir3".to_string());
        req.instructions = vec![
            vec!["add a function".to_string()],
            vec!["ignored: no files".to_string()],
            vec!["ignored: no group".to_string()],
        ];
        req.model = Some("model-x".to_string());
        let agent = RecordingAgent::default();
        let runner = ScriptedRunner::echo();

        let outputs = execute(&req, &agent, &runner, ExecuteOptions::default()).expect("execute");

        let calls = agent.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].directory, Path::new("dir1"));
        assert_eq!(calls[0].model, "model-x");
        assert_eq!(calls[0].instructions, vec!["add a function".to_string()]);
        assert_eq!(outputs, BatchOutputs::default());
        assert!(runner.requests().is_empty());
    }

    #[test]
    fn instructions_without_model_are_rejected() {
        let mut req = request(json!([["file1.py"], []]), json!([false]));
        req.instructions = vec![vec!["add a function".to_string()]];
        let agent = RecordingAgent::default();
        let err = execute(&req, &agent, &ScriptedRunner::echo(), ExecuteOptions::default())
            .unwrap_err();
        assert!(err.to_string().contains("model"));
        assert!(agent.calls().is_empty());
    }

    #[test]
    fn tests_run_when_run_or_record_flag_set() {
        let mut req = request(
            json!([["file1.py", "file2.py"], ["file3.py"]]),
            json!([true, false, false]),
        );
        req.test_file_names = Some(json!([["test_file1.py", "test_file2.py"], ["test_file3.py"]]));
        req.run_tests_flag = Some(json!([true, false, false]));
        req.record_test_output_values = Some(json!([true, true, false]));
        let runner = ScriptedRunner::echo();

        let outputs = execute(&req, &RecordingAgent::default(), &runner, ExecuteOptions::default())
            .expect("execute");

        assert_eq!(
            outputs.test_outputs.keys().collect::<Vec<_>>(),
            vec!["dir1-test_file1.py", "dir1-test_file2.py"]
        );
        assert_eq!(
            outputs.test_outputs["dir1-test_file1.py"],
            RunOutput::new("Test output from dir1/test_file1.py", "")
        );
        // test_file2.py is requested with run_tests=false; its entry is stored empty.
        assert_eq!(outputs.test_outputs["dir1-test_file2.py"], RunOutput::default());
        let test_requests: Vec<_> = runner
            .requests()
            .into_iter()
            .filter(|request| !request.test_file_paths.is_empty())
            .collect();
        assert_eq!(test_requests.len(), 2);
        assert!(!test_requests[1].run_tests);
        assert!(test_requests[1].record_test_output);
    }

    #[test]
    fn runner_failure_aborts_remaining_work() {
        let req = request(json!([["file1.py"], ["file2.py"]]), json!([true, true]));
        let runner = ScriptedRunner::failing_on("file1.py");

        let err = execute(&req, &RecordingAgent::default(), &runner, ExecuteOptions::default())
            .unwrap_err();
        assert!(matches!(classify(&err), Some(BatchError::Process { .. })));
        assert_eq!(runner.requests().len(), 1);
    }

    #[test]
    fn record_only_test_is_stored_with_empty_output() {
        let mut req = request(json!([["a.py"], []]), json!([false]));
        req.test_file_names = Some(json!([["test_a.py"]]));
        req.run_tests_flag = Some(json!([false]));
        req.record_test_output_values = Some(json!([true]));

        let outputs = execute(
            &req,
            &RecordingAgent::default(),
            &ScriptedRunner::echo(),
            ExecuteOptions::default(),
        )
        .expect("execute");

        assert_eq!(outputs.test_outputs.len(), 1);
        assert_eq!(outputs.test_outputs["dir1-test_a.py"], RunOutput::default());
    }

    #[test]
    fn pre_nested_record_flags_with_wrong_split_are_rejected() {
        // Right total (3) but split 1/2 against groups of 2/1.
        let req = request(
            json!([["a.py", "b.py"], ["c.py"]]),
            json!([[true], [false, false]]),
        );
        let message = invalid_message(&req);
        assert!(message.contains("record_output_flag"), "{message}");
        assert!(message.contains("directory 0"), "{message}");
    }

    #[test]
    fn pre_nested_test_flags_with_wrong_split_are_rejected() {
        let mut req = request(json!([["a.py"], ["b.py"]]), json!([true, true]));
        req.test_file_names = Some(json!([["test_a.py"], ["test_b.py", "test_c.py"]]));
        req.run_tests_flag = Some(json!([true, false, true]));
        req.record_test_output_values = Some(json!([[true, false], [true]]));
        let message = invalid_message(&req);
        assert!(message.contains("record_test_output_values"), "{message}");
    }

    #[test]
    fn pre_nested_split_may_omit_trailing_empty_directories() {
        let req = request(json!([["a.py", "b.py"], []]), json!([[true, false]]));
        let batch = validate_batch(&req).expect("validate");
        assert_eq!(
            batch.flags.record_output_flag,
            Some(vec![vec![true, false], vec![]])
        );
    }

    #[test]
    fn flatten_leaves_flat_and_malformed_input_alone() {
        assert_eq!(flatten_flag_input(&json!([true, false])), json!([true, false]));
        assert_eq!(flatten_flag_input(&json!([])), json!([]));
        assert_eq!(
            flatten_flag_input(&json!([[true], false])),
            json!([[true], false])
        );
        assert_eq!(
            flatten_flag_input(&json!([[true], [false, true]])),
            json!([true, false, true])
        );
    }
}
