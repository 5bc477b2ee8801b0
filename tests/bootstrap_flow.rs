mod common;

use std::fs;

use common::{Checkout, FakeRunner, session};
use surf_bootstrap::BootstrapError;
use surf_bootstrap::bootstrap::run_install;
use surf_bootstrap::config::SeedOutcome;
use surf_bootstrap::input::ScriptedInput;
use surf_bootstrap::provision::ProvisionOutcome;

#[test]
fn fresh_checkout_gets_one_env_file_and_one_environment() {
    let checkout = Checkout::new();
    let mut runner = FakeRunner::healthy();
    let mut input = ScriptedInput::new(["n", "claude-key", ""]);

    let summary = run_install(&mut runner, &mut input, &checkout.settings(), session()).unwrap();

    assert_eq!(summary.provision, ProvisionOutcome::Created);
    assert_eq!(summary.configuration.seed, SeedOutcome::FromTemplate);
    assert_eq!(summary.manifest.len(), 5);
    assert_eq!(
        checkout.listing(),
        vec![".env", ".env.example", "requirements.txt", "run_mac_app.py", "supersurf_env"]
    );
    assert_eq!(runner.venv_creations(), 1);
    assert_eq!(runner.pip_installs().len(), 2);

    let env_file = checkout.env_file();
    assert!(env_file.contains("\nUSE_OPENAI_API=false\n"));
    assert!(env_file.contains("\nANTHROPIC_API_KEY=claude-key\n"));
    assert!(env_file.contains("\nGEMINI_API_KEY=your_gemini_api_key_here\n"));
}

#[test]
fn environment_is_created_with_the_validated_interpreter() {
    let checkout = Checkout::new();
    let mut runner = FakeRunner::healthy();

    run_install(&mut runner, &mut ScriptedInput::default(), &checkout.settings(), session())
        .unwrap();

    let creation = &runner.runs[0];
    assert_eq!(creation.program, "python3");
    assert_eq!(creation.args[..2], ["-m", "venv"]);

    let python = checkout.venv().canonicalize().unwrap().join("bin/python");
    for pip in runner.pip_installs() {
        assert_eq!(pip.program, python.to_string_lossy());
    }
}

#[test]
fn second_run_with_same_answers_changes_nothing() {
    let checkout = Checkout::new();
    let answers = ["y", "sk-test1234567890abcdef", "claude-key", "gemini-key"];

    run_install(
        &mut FakeRunner::healthy(),
        &mut ScriptedInput::new(answers),
        &checkout.settings(),
        session(),
    )
    .unwrap();
    let first = checkout.env_file();

    let mut runner = FakeRunner::healthy();
    let mut input = ScriptedInput::new(answers);
    let summary = run_install(&mut runner, &mut input, &checkout.settings(), session()).unwrap();

    assert_eq!(checkout.env_file(), first);
    assert_eq!(summary.provision, ProvisionOutcome::Reused);
    assert_eq!(summary.configuration.seed, SeedOutcome::Existing);
    assert!(summary.configuration.updated.is_empty());
    assert_eq!(runner.venv_creations(), 0);
    // Only the feature question is asked again
    assert_eq!(input.prompts().len(), 1);
}

#[test]
fn placeholder_key_is_replaced_by_a_single_line() {
    let checkout = Checkout::new();
    let mut input = ScriptedInput::new(["y", "sk-test123", "", ""]);

    run_install(&mut FakeRunner::healthy(), &mut input, &checkout.settings(), session()).unwrap();

    let env_file = checkout.env_file();
    let lines: Vec<&str> = env_file
        .lines()
        .filter(|l| l.starts_with("OPENAI_API_KEY"))
        .collect();
    assert_eq!(lines, vec!["OPENAI_API_KEY=sk-test123"]);
    assert!(env_file.contains("USE_OPENAI_API=true"));
}

#[test]
fn declining_the_paid_api_records_the_choice_without_asking_for_a_key() {
    let checkout = Checkout::new();
    let mut input = ScriptedInput::new(["no", "", ""]);

    run_install(&mut FakeRunner::healthy(), &mut input, &checkout.settings(), session()).unwrap();

    assert!(checkout.env_file().contains("USE_OPENAI_API=false"));
    assert!(input.prompts().iter().all(|p| !p.contains("OPENAI_API_KEY")));
}

#[test]
fn unknown_keys_and_comments_survive() {
    let checkout = Checkout::new();
    fs::write(
        checkout.root().join(".env"),
        "# mine\nCUSTOM_THING = 'keep'\n\nANTHROPIC_API_KEY=your_anthropic_api_key_here\n",
    )
    .unwrap();

    let mut input = ScriptedInput::new(["n", "claude-key", ""]);
    run_install(&mut FakeRunner::healthy(), &mut input, &checkout.settings(), session()).unwrap();

    assert_eq!(
        checkout.env_file(),
        "# mine\nCUSTOM_THING = 'keep'\n\nANTHROPIC_API_KEY=claude-key\nUSE_OPENAI_API=false\n"
    );
}

#[test]
fn old_interpreter_stops_before_touching_the_project() {
    let checkout = Checkout::new();
    let before = checkout.listing();
    let mut runner = FakeRunner::healthy();
    runner.tools.insert("python3".into(), "Python 3.7.9".into());
    let mut input = ScriptedInput::new(["y", "sk-test123"]);

    let err = run_install(&mut runner, &mut input, &checkout.settings(), session()).unwrap_err();

    assert!(matches!(err, BootstrapError::Environment { .. }));
    assert_eq!(err.exit_code(), 1);
    assert_eq!(checkout.listing(), before);
    assert!(runner.runs.is_empty());
    assert!(input.prompts().is_empty());
}

#[test]
fn missing_ffmpeg_is_reported_but_not_fatal() {
    let checkout = Checkout::new();
    let mut runner = FakeRunner::healthy();
    runner.tools.remove("ffmpeg");

    let summary = run_install(
        &mut runner,
        &mut ScriptedInput::default(),
        &checkout.settings(),
        session(),
    )
    .unwrap();

    assert!(summary.validation.warnings().contains(&"FFmpeg"));
}

#[test]
fn failed_dependency_install_names_the_manifest_and_skips_configuration() {
    let checkout = Checkout::new();
    let mut runner = FakeRunner::healthy();
    runner.pip_exit = 1;

    let err = run_install(
        &mut runner,
        &mut ScriptedInput::default(),
        &checkout.settings(),
        session(),
    )
    .unwrap_err();

    match &err {
        BootstrapError::Installation { manifest, .. } => {
            assert_eq!(manifest, &checkout.root().join("requirements.txt"))
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!checkout.root().join(".env").exists());
}

#[test]
fn missing_template_creates_empty_env_file_and_continues() {
    let checkout = Checkout::new();
    fs::remove_file(checkout.root().join(".env.example")).unwrap();

    let summary = run_install(
        &mut FakeRunner::healthy(),
        &mut ScriptedInput::new(["n", "", ""]),
        &checkout.settings(),
        session(),
    )
    .unwrap();

    assert_eq!(summary.configuration.seed, SeedOutcome::Empty);
    assert_eq!(checkout.env_file(), "USE_OPENAI_API=false\n");
}
