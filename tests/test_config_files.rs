//! The shipped config files load and agree with the built-in defaults.

use std::fs;
use std::path::{Path, PathBuf};

use angika_guide::chat::{DEFAULT_FALLBACK, DEFAULT_PLACEHOLDER, DEFAULT_WELCOME, Persona};
use angika_guide::config;

fn config_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("config")
}

#[test]
fn default_toml_loads() {
    let cfg = config::load_from(&config_dir().join("default.toml"), None, None).unwrap();
    assert_eq!(cfg.llm.provider, "gemini");
    assert_eq!(cfg.llm.gemini.model, "gemini-3-flash-preview");
    assert_eq!(cfg.guide.welcome, DEFAULT_WELCOME);
    assert_eq!(cfg.guide.placeholder, DEFAULT_PLACEHOLDER);
    assert_eq!(cfg.guide.fallback, DEFAULT_FALLBACK);
    assert!(cfg.guide.persona_file.is_none());
    assert!(!cfg.comms.http.enabled);
}

#[test]
fn persona_prompt_matches_builtin() {
    let text = fs::read_to_string(config_dir().join("prompts/persona.md")).unwrap();
    assert_eq!(text.trim(), Persona::angika().system_instruction());
}

#[test]
fn persona_prompt_lists_four_steps() {
    let text = fs::read_to_string(config_dir().join("prompts/persona.md")).unwrap();
    for step in ["1. Emotional Check-ins.", "2. Warm-up.", "3. Theme-based Expression.", "4. Reflection."] {
        assert!(text.contains(step), "persona.md should contain '{step}'");
    }
}

#[test]
fn blank_fallback_and_placeholder_fail_to_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("angika.toml");
    fs::write(&path, "[guide]\nfallback = \"\"\nplaceholder = \"\"\n").unwrap();

    let msg = config::load_from(&path, None, None).unwrap_err().to_string();
    assert!(msg.contains("must not be blank"), "{msg}");
}
