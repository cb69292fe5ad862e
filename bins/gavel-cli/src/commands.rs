// CLI commands: thin file-based drivers for the engine's two call
// shapes. Responses are printed as JSON so the output can be piped.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::info;

use gavel_common::config::JudgeSettings;
use gavel_common::types::{Language, RunRequest, SubmitRequest, TestCase};
use gavel_engine::config::LanguageProfileManager;
use gavel_engine::JudgeService;

pub fn build_service(languages: Option<&Path>) -> Result<JudgeService> {
    let settings = JudgeSettings::from_env();
    let profiles = match languages {
        Some(path) => LanguageProfileManager::load(path)?,
        None => LanguageProfileManager::builtin(),
    };

    info!(
        compile_deadline_ms = settings.compile_deadline_ms,
        run_deadline_ms = settings.run_deadline_ms,
        work_dir = %settings.work_dir.display(),
        languages = ?profiles.list_languages(),
        "Judge configured"
    );

    Ok(JudgeService::new(settings, profiles))
}

pub async fn run(
    service: &JudgeService,
    language: &str,
    source: &Path,
    stdin: Option<&Path>,
) -> Result<()> {
    let language: Language = language.parse()?;
    let code = fs::read_to_string(source)
        .with_context(|| format!("Failed to read source file {}", source.display()))?;
    let stdin = match stdin {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read stdin file {}", path.display()))?,
        None => String::new(),
    };

    let response = service
        .run(RunRequest {
            language,
            code,
            stdin,
        })
        .await;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

pub async fn judge(
    service: &JudgeService,
    language: &str,
    source: &Path,
    tests: &Path,
) -> Result<()> {
    let language: Language = language.parse()?;
    let code = fs::read_to_string(source)
        .with_context(|| format!("Failed to read source file {}", source.display()))?;
    let tests_json = fs::read_to_string(tests)
        .with_context(|| format!("Failed to read test-case file {}", tests.display()))?;
    let test_cases: Vec<TestCase> = serde_json::from_str(&tests_json)
        .with_context(|| format!("Failed to parse test cases in {}", tests.display()))?;

    let response = service
        .submit(SubmitRequest {
            language,
            code,
            test_cases,
        })
        .await?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
