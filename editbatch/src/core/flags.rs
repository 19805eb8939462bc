//! Redistribution of flat per-file flags into per-directory groups.

use crate::core::types::{NestedFlags, OrganizedFlags, leaf_count};
use crate::error::BatchError;

/// Typed inputs for [`organize_flags`].
///
/// `files_by_directory` pairs with `record_output_flag`; `test_file_names`
/// pairs with `run_tests_flag` and `record_test_output_values`. Each pairing
/// is either fully present or fully absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlagInputs<'a> {
    pub directory_paths: &'a [String],
    pub files_by_directory: Option<&'a [Vec<String>]>,
    pub record_output_flag: Option<&'a [bool]>,
    pub test_file_names: Option<&'a [Vec<String>]>,
    pub run_tests_flag: Option<&'a [bool]>,
    pub record_test_output_values: Option<&'a [bool]>,
}

/// Reshape flat flag lists so each nested group mirrors its file group.
///
/// Directories drive the walk. A directory without a sublist on one side
/// (group absent, or fewer sublists than directories) contributes zero flags
/// on that side. Every precondition failure is an
/// [`BatchError::InvalidArgument`]; no partial result is returned.
pub fn organize_flags(inputs: &FlagInputs<'_>) -> Result<OrganizedFlags, BatchError> {
    check_coupling(inputs)?;
    check_coverage(inputs)?;
    check_parity(inputs)?;

    let files = inputs.files_by_directory;
    let tests = inputs.test_file_names;
    let mut record = inputs.record_output_flag.map(|_| NestedFlags::new());
    let mut run = inputs.run_tests_flag.map(|_| NestedFlags::new());
    let mut record_tests = inputs.record_test_output_values.map(|_| NestedFlags::new());

    let mut file_index = 0;
    let mut test_index = 0;
    for index in 0..inputs.directory_paths.len() {
        if let (Some(groups), Some(flags), Some(out)) =
            (files, inputs.record_output_flag, record.as_mut())
            && let Some(group) = groups.get(index)
        {
            out.push(flags[file_index..file_index + group.len()].to_vec());
            file_index += group.len();
        }

        if let Some(group) = tests.and_then(|groups| groups.get(index)) {
            let span = test_index..test_index + group.len();
            if let (Some(flags), Some(out)) = (inputs.run_tests_flag, run.as_mut()) {
                out.push(flags[span.clone()].to_vec());
            }
            if let (Some(flags), Some(out)) =
                (inputs.record_test_output_values, record_tests.as_mut())
            {
                out.push(flags[span].to_vec());
            }
            test_index += group.len();
        }
    }

    Ok(OrganizedFlags {
        record_output_flag: record,
        run_tests_flag: run,
        record_test_output_values: record_tests,
    })
}

/// Flags for directory `index`, or an empty slice when the group or the
/// directory entry is absent.
pub fn flag_slice(groups: Option<&NestedFlags>, index: usize) -> &[bool] {
    groups
        .and_then(|groups| groups.get(index))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn check_coupling(inputs: &FlagInputs<'_>) -> Result<(), BatchError> {
    let files_present = inputs.files_by_directory.is_some();
    if files_present != inputs.record_output_flag.is_some() {
        return Err(BatchError::invalid(
            "files_by_directory and record_output_flag must both be provided or both be omitted",
        ));
    }

    let tests_present = inputs.test_file_names.is_some();
    if tests_present != inputs.run_tests_flag.is_some()
        || tests_present != inputs.record_test_output_values.is_some()
    {
        return Err(BatchError::invalid(
            "test_file_names, run_tests_flag and record_test_output_values must all be provided or all be omitted",
        ));
    }

    if !files_present && !tests_present {
        return Err(BatchError::invalid(
            "at least one of files_by_directory or test_file_names must be provided",
        ));
    }
    Ok(())
}

fn check_coverage(inputs: &FlagInputs<'_>) -> Result<(), BatchError> {
    let directories = inputs.directory_paths.len();
    for (label, groups) in [
        ("files_by_directory", inputs.files_by_directory),
        ("test_file_names", inputs.test_file_names),
    ] {
        if let Some(groups) = groups
            && groups.len() > directories
        {
            return Err(BatchError::invalid(format!(
                "{label} has {} groups but only {directories} directories were given",
                groups.len()
            )));
        }
    }
    Ok(())
}

fn check_parity(inputs: &FlagInputs<'_>) -> Result<(), BatchError> {
    if let (Some(files), Some(flags)) = (inputs.files_by_directory, inputs.record_output_flag) {
        let total = leaf_count(files);
        if flags.len() != total {
            return Err(BatchError::invalid(format!(
                "record_output_flag has {} entries but files_by_directory lists {total} files",
                flags.len()
            )));
        }
    }

    if let (Some(tests), Some(run), Some(record)) = (
        inputs.test_file_names,
        inputs.run_tests_flag,
        inputs.record_test_output_values,
    ) {
        let total = leaf_count(tests);
        if run.len() != total || record.len() != total {
            return Err(BatchError::invalid(format!(
                "run_tests_flag has {} and record_test_output_values has {} entries but test_file_names lists {total} files",
                run.len(),
                record.len()
            )));
        }
    }
    Ok(())
}
