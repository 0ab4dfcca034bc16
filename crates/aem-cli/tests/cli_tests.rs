use aem_cli::{exit, run, Cli};
use clap::Parser;

fn cli(dir: &std::path::Path, args: &[&str]) -> Cli {
    let download_dir = dir.join("files");
    let state_dir = dir.join("state");
    let mut argv = vec!["aemflow".to_string(),
                        "--download-dir".to_string(),
                        download_dir.display().to_string(),
                        "--state-dir".to_string(),
                        state_dir.display().to_string(),
                        "--state-store".to_string(),
                        "file".to_string()];
    argv.extend(args.iter().map(|a| a.to_string()));
    Cli::parse_from(argv)
}

#[tokio::test]
async fn resolve_local_file_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("site.all-1.0.zip");
    std::fs::write(&local, b"zip").unwrap();
    let code = run(&cli(dir.path(), &["resolve", local.to_str().unwrap()])).await.unwrap();
    assert_eq!(code, exit::OK);
}

#[tokio::test]
async fn resolve_missing_file_fails_with_resolve_code() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.zip");
    let code = run(&cli(dir.path(), &["resolve", missing.to_str().unwrap()])).await.unwrap();
    assert_eq!(code, exit::RESOLVE_FAILED);
}

#[tokio::test]
async fn await_with_no_matching_instances_is_ok() {
    let dir = tempfile::tempdir().unwrap();
    let code = run(&cli(dir.path(), &["await-up", "--filter", "no-such-*"])).await.unwrap();
    assert_eq!(code, exit::OK);
}

#[tokio::test]
async fn missing_plan_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let plan = dir.path().join("plan.json");
    let err = run(&cli(dir.path(), &["provision", plan.to_str().unwrap()])).await.unwrap_err();
    assert_eq!(exit::code_for(&err), exit::USAGE);
}
