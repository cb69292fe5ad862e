// Language profile management. Each supported language is described by a
// data-driven profile: how to name the source file, whether a compile step
// exists, and which diagnostic markers classify its failures. Built-in
// profiles cover the closed language set; a languages.json file can
// override toolchain paths without rebuilding.

use anyhow::{bail, Context, Result};
use gavel_common::types::Language;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// One toolchain invocation. `program` and `args` may contain the
/// placeholders `{source}`, `{binary}` and `{dir}`, expanded per job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Expand placeholders against a staged job's paths.
    pub fn expand(&self, source: &str, binary: &str, dir: &str) -> (String, Vec<String>) {
        let fill = |s: &str| {
            s.replace("{source}", source)
                .replace("{binary}", binary)
                .replace("{dir}", dir)
        };
        (fill(&self.program), self.args.iter().map(|a| fill(a)).collect())
    }
}

/// Compile/run/classify strategy for one language family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageProfile {
    pub language: Language,
    pub source_extension: String,
    /// Fixed entry-point filename the toolchain mandates (`Main.java`).
    /// Staging renames the generated file to this name.
    #[serde(default)]
    pub entrypoint: Option<String>,
    /// Absent for interpreted languages.
    #[serde(default)]
    pub compile: Option<CommandSpec>,
    pub run: CommandSpec,
    /// Substring marking fatal compile diagnostics. `None` means any
    /// non-empty compile stderr is fatal (warnings included).
    #[serde(default)]
    pub compile_error_marker: Option<String>,
    /// Substring in run-step stderr that reclassifies the failure as a
    /// Compilation Error. Only meaningful for interpreted languages,
    /// where no separate compile step exists.
    #[serde(default)]
    pub syntax_error_marker: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ProfilesJson {
    languages: Vec<LanguageProfile>,
}

/// Holds the profile for every supported language.
#[derive(Debug, Clone)]
pub struct LanguageProfileManager {
    profiles: HashMap<Language, LanguageProfile>,
}

impl LanguageProfileManager {
    /// Built-in profiles for the host toolchains.
    pub fn builtin() -> Self {
        let profiles = [
            LanguageProfile {
                language: Language::Cpp,
                source_extension: "cpp".to_string(),
                entrypoint: None,
                compile: Some(CommandSpec::new(
                    "g++",
                    &["{source}", "-O2", "-o", "{binary}"],
                )),
                run: CommandSpec::new("{binary}", &[]),
                compile_error_marker: Some("error:".to_string()),
                syntax_error_marker: None,
            },
            LanguageProfile {
                language: Language::Java,
                source_extension: "java".to_string(),
                entrypoint: Some("Main.java".to_string()),
                compile: Some(CommandSpec::new("javac", &["{source}"])),
                run: CommandSpec::new("java", &["-cp", "{dir}", "Main"]),
                compile_error_marker: None,
                syntax_error_marker: None,
            },
            LanguageProfile {
                language: Language::Python,
                source_extension: "py".to_string(),
                entrypoint: None,
                compile: None,
                run: CommandSpec::new("python3", &["{source}"]),
                compile_error_marker: None,
                syntax_error_marker: Some("SyntaxError".to_string()),
            },
        ];

        Self {
            profiles: profiles
                .into_iter()
                .map(|p| (p.language, p))
                .collect(),
        }
    }

    /// Built-in profiles with overrides applied from a languages.json
    /// file. Languages missing from the file keep their built-ins.
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            bail!(
                "language profile file not found: {}",
                config_path.display()
            );
        }

        let content = fs::read_to_string(config_path)
            .context("Failed to read language profile file")?;
        let parsed: ProfilesJson = serde_json::from_str(&content)
            .context("Failed to parse language profile file")?;

        let mut manager = Self::builtin();
        for profile in parsed.languages {
            manager.profiles.insert(profile.language, profile);
        }
        Ok(manager)
    }

    pub fn get(&self, language: Language) -> Result<&LanguageProfile> {
        self.profiles
            .get(&language)
            .ok_or_else(|| anyhow::anyhow!("no profile configured for language: {}", language))
    }

    pub fn list_languages(&self) -> Vec<Language> {
        self.profiles.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_profiles_cover_all_languages() {
        let manager = LanguageProfileManager::builtin();
        for lang in [Language::Cpp, Language::Java, Language::Python] {
            assert!(manager.get(lang).is_ok(), "missing profile for {}", lang);
            assert!(manager.list_languages().contains(&lang));
        }
        assert_eq!(manager.list_languages().len(), 3);
    }

    #[test]
    fn test_builtin_shapes() {
        let manager = LanguageProfileManager::builtin();

        let cpp = manager.get(Language::Cpp).unwrap();
        assert!(cpp.compile.is_some());
        assert_eq!(cpp.compile_error_marker.as_deref(), Some("error:"));

        let java = manager.get(Language::Java).unwrap();
        assert_eq!(java.entrypoint.as_deref(), Some("Main.java"));
        assert!(java.compile_error_marker.is_none());

        let python = manager.get(Language::Python).unwrap();
        assert!(python.compile.is_none());
        assert_eq!(python.syntax_error_marker.as_deref(), Some("SyntaxError"));
    }

    #[test]
    fn test_command_expansion() {
        let spec = CommandSpec::new("g++", &["{source}", "-O2", "-o", "{binary}"]);
        let (program, args) = spec.expand("/w/j/j.cpp", "/w/j/j", "/w/j");
        assert_eq!(program, "g++");
        assert_eq!(args, vec!["/w/j/j.cpp", "-O2", "-o", "/w/j/j"]);

        let run = CommandSpec::new("{binary}", &[]);
        let (program, args) = run.expand("/w/j/j.cpp", "/w/j/j", "/w/j");
        assert_eq!(program, "/w/j/j");
        assert!(args.is_empty());
    }

    #[test]
    fn test_load_overrides_builtin() {
        let dir = std::env::temp_dir().join(format!("gavel-cfg-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("languages.json");
        fs::write(
            &path,
            r#"{
                "languages": [
                    {
                        "language": "python",
                        "source_extension": "py",
                        "run": { "program": "/usr/local/bin/python3.12", "args": ["{source}"] },
                        "syntax_error_marker": "SyntaxError"
                    }
                ]
            }"#,
        )
        .unwrap();

        let manager = LanguageProfileManager::load(&path).unwrap();
        let python = manager.get(Language::Python).unwrap();
        assert_eq!(python.run.program, "/usr/local/bin/python3.12");
        // Untouched languages keep the built-in profile.
        assert_eq!(manager.get(Language::Cpp).unwrap().run.program, "{binary}");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_missing_file() {
        let result = LanguageProfileManager::load(Path::new("/nonexistent/languages.json"));
        assert!(result.is_err());
    }
}
