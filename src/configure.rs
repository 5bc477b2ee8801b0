//! Interactive first-run configuration of the env file.

use std::path::Path;

use tracing::{debug, info};

use crate::config::keys::{self, format_bool};
use crate::config::{EnvDocument, SeedOutcome, ensure_config_file, needs_prompt, parse_bool};
use crate::error::Result;
use crate::input::InputProvider;
use crate::settings::{CredentialPrompt, FeatureGate};
use crate::ui;

/// What a configuration pass did, key by key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigureOutcome {
    pub seed: SeedOutcome,
    /// Keys written during this pass (flags included)
    pub updated: Vec<String>,
    /// Credentials left unset: declined gate or empty answer
    pub skipped: Vec<String>,
    /// Credentials that already held a real value
    pub already_set: Vec<String>,
}

impl ConfigureOutcome {
    fn new(seed: SeedOutcome) -> Self {
        Self {
            seed,
            updated: Vec::new(),
            skipped: Vec::new(),
            already_set: Vec::new(),
        }
    }
}

/// Seed the config file if needed, then walk the credential checklist.
///
/// Every change is saved as soon as it is made, so an interrupted run keeps
/// the answers given so far.
pub fn configure<I: InputProvider + ?Sized>(
    input: &mut I,
    config_path: &Path,
    template_path: &Path,
    credentials: &[CredentialPrompt],
) -> Result<ConfigureOutcome> {
    let seed = ensure_config_file(config_path, template_path)?;
    let mut doc = EnvDocument::load(config_path)?;
    let mut outcome = ConfigureOutcome::new(seed);

    for credential in credentials {
        if let Some(gate) = &credential.gate {
            let enabled = ask_gate(input, &doc, gate)?;
            if doc.upsert(&gate.flag_key, format_bool(enabled)) {
                doc.save(config_path)?;
                outcome.updated.push(gate.flag_key.clone());
            }
            if !enabled {
                debug!(key = %credential.key, flag = %gate.flag_key, "feature disabled, not asking");
                outcome.skipped.push(credential.key.clone());
                continue;
            }
        }

        if let Some(satisfied_by) = satisfied(&doc, credential) {
            debug!(key = %credential.key, satisfied_by, "already configured");
            outcome.already_set.push(credential.key.clone());
            continue;
        }

        match ask_credential(input, credential)? {
            Some(value) => {
                doc.upsert(&credential.key, &value);
                doc.save(config_path)?;
                info!(key = %credential.key, path = %config_path.display(), "credential saved");
                ui::success(format!("{} saved", credential.key));
                outcome.updated.push(credential.key.clone());
            }
            None => {
                ui::info(format!(
                    "Skipped {}; add it to {} later",
                    credential.key,
                    config_path.display()
                ));
                outcome.skipped.push(credential.key.clone());
            }
        }
    }

    Ok(outcome)
}

fn ask_gate<I: InputProvider + ?Sized>(
    input: &mut I,
    doc: &EnvDocument,
    gate: &FeatureGate,
) -> Result<bool> {
    // A previous answer becomes the default for this one
    let default = doc
        .get(&gate.flag_key)
        .and_then(parse_bool)
        .unwrap_or(gate.default);
    input.confirm(&gate.question, default)
}

/// The key (this one or an alternate) holding a real value, if any
fn satisfied<'a>(doc: &EnvDocument, credential: &'a CredentialPrompt) -> Option<&'a str> {
    std::iter::once(&credential.key)
        .chain(credential.alternates.iter())
        .find(|key| !needs_prompt(key, doc.get(key)))
        .map(String::as_str)
}

fn ask_credential<I: InputProvider + ?Sized>(
    input: &mut I,
    credential: &CredentialPrompt,
) -> Result<Option<String>> {
    ui::heading(&credential.key);
    ui::detail(&credential.explanation);
    if let Some(link) = &credential.link {
        ui::detail(format!("Get one at {}", link));
    }

    let prompt = format!("Enter your {} (leave empty to skip): ", credential.key);
    let Some(answer) = input.read_line(&prompt)? else {
        return Ok(None);
    };
    let answer = answer.trim();
    if answer.is_empty() {
        return Ok(None);
    }

    if credential.key == keys::OPENAI_API_KEY && !looks_like_openai_key(answer) {
        ui::warning("That does not look like an OpenAI key (expected `sk-...`); saving it anyway");
    }
    Ok(Some(answer.to_string()))
}

fn looks_like_openai_key(value: &str) -> bool {
    value.starts_with("sk-") && value.len() >= 20
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ScriptedInput;
    use crate::settings::Settings;
    use std::fs;

    const TEMPLATE: &str = "\
# SuperSurf configuration
USE_OPENAI_API=false
OPENAI_API_KEY=your_openai_api_key_here
ANTHROPIC_API_KEY=your_anthropic_api_key_here
GEMINI_API_KEY=your_gemini_api_key_here
WHISPER_MODEL=base
";

    struct Project {
        dir: tempfile::TempDir,
    }

    impl Project {
        fn new(template: Option<&str>) -> Self {
            let dir = tempfile::tempdir().unwrap();
            if let Some(text) = template {
                fs::write(dir.path().join(".env.example"), text).unwrap();
            }
            Self { dir }
        }

        fn config(&self) -> std::path::PathBuf {
            self.dir.path().join(".env")
        }

        fn run(&self, input: &mut ScriptedInput) -> ConfigureOutcome {
            configure(
                input,
                &self.config(),
                &self.dir.path().join(".env.example"),
                &Settings::new(self.dir.path()).credentials,
            )
            .unwrap()
        }

        fn text(&self) -> String {
            fs::read_to_string(self.config()).unwrap()
        }
    }

    #[test]
    fn placeholder_is_replaced_in_place() {
        let project = Project::new(Some(TEMPLATE));
        let mut input = ScriptedInput::new(["y", "sk-test123", "", ""]);

        let outcome = project.run(&mut input);

        assert_eq!(outcome.seed, SeedOutcome::FromTemplate);
        let text = project.text();
        assert_eq!(text.matches("OPENAI_API_KEY=").count(), 1);
        assert!(text.contains("\nOPENAI_API_KEY=sk-test123\n"));
        assert!(text.contains("\nUSE_OPENAI_API=true\n"));
        assert!(text.starts_with("# SuperSurf configuration\n"));
        assert_eq!(outcome.updated, vec!["USE_OPENAI_API", "OPENAI_API_KEY"]);
        assert_eq!(outcome.skipped, vec!["ANTHROPIC_API_KEY", "GEMINI_API_KEY"]);
    }

    #[test]
    fn declining_the_gate_never_asks_for_the_key() {
        let project = Project::new(Some(TEMPLATE));
        let mut input = ScriptedInput::new(["n", "", ""]);

        let outcome = project.run(&mut input);

        assert!(project.text().contains("USE_OPENAI_API=false\n"));
        assert!(project.text().contains("OPENAI_API_KEY=your_openai_api_key_here\n"));
        assert!(input.prompts().iter().all(|p| !p.contains("OPENAI_API_KEY")));
        assert!(outcome.skipped.contains(&"OPENAI_API_KEY".to_string()));
        // Flag already said false, so nothing was rewritten for it
        assert!(!outcome.updated.contains(&"USE_OPENAI_API".to_string()));
    }

    #[test]
    fn flag_is_written_even_when_absent_from_template() {
        let project = Project::new(Some("GEMINI_API_KEY=g-real\n"));
        let mut input = ScriptedInput::new(["", ""]);

        project.run(&mut input);

        let text = project.text();
        assert!(text.starts_with("GEMINI_API_KEY=g-real\n"));
        assert!(text.contains("USE_OPENAI_API=false\n"));
    }

    #[test]
    fn second_run_with_same_answers_changes_nothing() {
        let project = Project::new(Some(TEMPLATE));
        project.run(&mut ScriptedInput::new([
            "y",
            "sk-test1234567890abcdef",
            "anthropic-key",
            "gemini-key",
        ]));
        let first = project.text();

        let mut input = ScriptedInput::new(["y"]);
        let outcome = project.run(&mut input);

        assert_eq!(project.text(), first);
        assert!(outcome.updated.is_empty());
        assert_eq!(
            outcome.already_set,
            vec!["OPENAI_API_KEY", "ANTHROPIC_API_KEY", "GEMINI_API_KEY"]
        );
        assert_eq!(input.prompts().len(), 1);
    }

    #[test]
    fn google_key_satisfies_gemini() {
        let project = Project::new(Some("GOOGLE_API_KEY=real-google\n"));
        let mut input = ScriptedInput::new(["n", ""]);

        let outcome = project.run(&mut input);

        assert!(outcome.already_set.contains(&"GEMINI_API_KEY".to_string()));
        assert!(input.prompts().iter().all(|p| !p.contains("GEMINI_API_KEY")));
    }

    #[test]
    fn empty_answer_leaves_file_untouched() {
        let project = Project::new(None);
        fs::write(project.config(), "USE_OPENAI_API=false\n# keep me\n").unwrap();

        let outcome = project.run(&mut ScriptedInput::new(["", "", ""]));

        assert_eq!(outcome.seed, SeedOutcome::Existing);
        assert_eq!(project.text(), "USE_OPENAI_API=false\n# keep me\n");
    }

    #[test]
    fn missing_template_still_collects_answers() {
        let project = Project::new(None);
        let outcome = project.run(&mut ScriptedInput::new(["n", "claude-key", ""]));

        assert_eq!(outcome.seed, SeedOutcome::Empty);
        assert_eq!(
            project.text(),
            "USE_OPENAI_API=false\nANTHROPIC_API_KEY=claude-key\n"
        );
    }

    #[test]
    fn openai_key_shape() {
        assert!(looks_like_openai_key("sk-proj-abcdefghijklmnop"));
        assert!(!looks_like_openai_key("sk-short"));
        assert!(!looks_like_openai_key("not-a-key-but-quite-long"));
    }
}
