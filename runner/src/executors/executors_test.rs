use super::{
    parse_job_id, render_command_line, Executor, ExecutorError, Executors, SbatchExecutor,
    SubmissionCommand, SubmissionRequest,
};
use std::{
    ffi::OsString,
    fs,
    io,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
};
use tempfile::TempDir;

fn request() -> SubmissionRequest {
    SubmissionRequest::new(
        "twil",
        Path::new("/d/sub-A/f1.nii.gz"),
        &["309".to_string(), "300".to_string()],
    )
}

/// fake submission command that logs its arguments and exits with `status`
fn fake_sbatch(dir: &Path, status: i32) -> PathBuf {
    let path = dir.join("sbatch");
    let log = dir.join("calls.log");

    fs::write(
        &path,
        format!(
            "#!/bin/sh\necho \"$@\" >> '{}'\necho \"Submitted batch job 4711\"\nexit {status}\n",
            log.display()
        ),
    )
    .unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();

    path
}

#[test]
pub fn request_arguments_are_ordered() {
    let args = request()
        .args()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect::<Vec<_>>();

    assert_eq!(args, vec!["twil", "/d/sub-A/f1.nii.gz", "309", "300"]);
}

#[test]
pub fn argv_prefixes_program_and_script() {
    let command = SubmissionCommand::new(PathBuf::from("sbatch"), PathBuf::from("/h/main6.sh"));

    assert_eq!(
        render_command_line(&command.argv(&request())),
        "sbatch /h/main6.sh twil /d/sub-A/f1.nii.gz 309 300"
    );
}

#[test]
pub fn command_line_quoting() {
    let argv = ["sbatch", "my job.sh", "it's", ""].map(OsString::from);

    assert_eq!(
        render_command_line(&argv),
        r"sbatch 'my job.sh' 'it'\''s' ''"
    );
}

#[test]
pub fn job_id_from_acknowledgement() {
    assert_eq!(parse_job_id("Submitted batch job 12345\n"), Some(12345));
    assert_eq!(
        parse_job_id("sbatch: warning: something\nSubmitted batch job 7 on cluster x\n"),
        Some(7)
    );
    assert_eq!(parse_job_id("12345;cluster\n"), None);
    assert_eq!(parse_job_id(""), None);
}

#[test]
pub fn spawn_failures_map_to_shell_codes() {
    let not_found = ExecutorError::Spawn(io::Error::from(io::ErrorKind::NotFound));
    let denied = ExecutorError::Spawn(io::Error::from(io::ErrorKind::PermissionDenied));

    assert_eq!(not_found.status(), 127);
    assert_eq!(denied.status(), 126);
    assert_eq!(ExecutorError::Status(3).status(), 3);
}

#[test]
pub fn sbatch_passes_arguments_and_reports_job() {
    let temp = TempDir::new().unwrap();
    let program = fake_sbatch(temp.path(), 0);
    let mut executor = SbatchExecutor::new(SubmissionCommand::new(
        program,
        PathBuf::from("/h/main6.sh"),
    ));

    assert_eq!(executor.submit(&request()).unwrap(), Some(4711));
    assert_eq!(
        fs::read_to_string(temp.path().join("calls.log")).unwrap(),
        "/h/main6.sh twil /d/sub-A/f1.nii.gz 309 300\n"
    );
}

#[test]
pub fn sbatch_failure_carries_status() {
    let temp = TempDir::new().unwrap();
    let program = fake_sbatch(temp.path(), 3);
    let mut executor = SbatchExecutor::new(SubmissionCommand::new(
        program,
        PathBuf::from("/h/main6.sh"),
    ));

    let error = executor.submit(&request()).unwrap_err();
    assert!(matches!(error, ExecutorError::Status(3)));
}

#[test]
pub fn missing_sbatch_is_127() {
    let temp = TempDir::new().unwrap();
    let mut executor = SbatchExecutor::new(SubmissionCommand::new(
        temp.path().join("no-sbatch"),
        PathBuf::from("/h/main6.sh"),
    ));

    assert_eq!(executor.submit(&request()).unwrap_err().status(), 127);
}

#[test]
pub fn dry_run_never_spawns() {
    let command = SubmissionCommand::new(PathBuf::from("/nonexistent/sbatch"), PathBuf::from("job.sh"));
    let mut executor = Executors::load(command.clone(), true);

    assert!(matches!(executor, Executors::DryRun(_)));
    assert_eq!(executor.submit(&request()).unwrap(), None);
    assert_eq!(executor.command_line(&request()), command.argv(&request()));
    assert!(matches!(Executors::load(command, false), Executors::Sbatch(_)));
}
