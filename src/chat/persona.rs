//! The guide's persona, rendered into the session's system instruction.

use std::fs;
use std::path::Path;

use tracing::{debug, warn};

/// Identity, tone and method the remote model is steered with.
#[derive(Debug, Clone)]
pub struct Persona {
    pub name: String,
    pub meaning: String,
    pub tone: String,
    /// `(colour, what it stands for)` pairs.
    pub colors: Vec<(String, String)>,
    /// Session methodology, in order.
    pub methodology: Vec<String>,
    pub mission: String,
    pub style: String,
}

impl Persona {
    /// The built-in Angika persona.
    pub fn angika() -> Self {
        Self {
            name: "Angika".into(),
            meaning: "Bodily expression/Language of the body".into(),
            tone: "Intellectual, empathetic, poetic, grounded.".into(),
            colors: vec![
                ("Red".into(), "Passion/Energy".into()),
                ("Black".into(), "Depth".into()),
                ("White".into(), "Clarity".into()),
            ],
            methodology: vec![
                "Emotional Check-ins.".into(),
                "Warm-up.".into(),
                "Theme-based Expression.".into(),
                "Reflection.".into(),
            ],
            mission: "To show that movement is a language beyond words.".into(),
            style: "Keep responses concise, elegant, and supportive. \
                    Use metaphors related to dance, flow, and grounding."
                .into(),
        }
    }

    pub fn system_instruction(&self) -> String {
        let colors = self
            .colors
            .iter()
            .map(|(c, m)| format!("{c} ({m})"))
            .collect::<Vec<_>>()
            .join(", ");
        let steps = self
            .methodology
            .iter()
            .enumerate()
            .map(|(i, s)| format!("{}. {s}", i + 1))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "You are '{name}', a digital embodiment of a social impact initiative that uses dance \
             for storytelling and mental health regulation.\n\n\
             Core Identity:\n\
             - Name: {name} (Meaning: {meaning}).\n\
             - Tone: {tone}\n\
             - Colors: {colors}.\n\n\
             Methodology to explain if asked:\n{steps}\n\n\
             Mission: {mission}\n\n\
             {style}",
            name = self.name,
            meaning = self.meaning,
            tone = self.tone,
            mission = self.mission,
            style = self.style,
        )
    }
}

impl Default for Persona {
    fn default() -> Self {
        Self::angika()
    }
}

/// Resolve the system instruction: the trimmed contents of `persona_file`
/// when it exists and is non-empty, otherwise the built-in persona.
pub fn load_instruction(persona_file: Option<&Path>) -> String {
    let Some(path) = persona_file else {
        return Persona::angika().system_instruction();
    };

    match fs::read_to_string(path) {
        Ok(text) if !text.trim().is_empty() => {
            debug!(path = %path.display(), "persona loaded from file");
            text.trim().to_string()
        }
        Ok(_) => {
            warn!(path = %path.display(), "persona file is empty, using built-in persona");
            Persona::angika().system_instruction()
        }
        Err(e) => {
            warn!(path = %path.display(), "cannot read persona file ({e}), using built-in persona");
            Persona::angika().system_instruction()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn instruction_carries_identity_method_and_mission() {
        let text = Persona::angika().system_instruction();
        assert!(text.starts_with("You are 'Angika'"));
        assert!(text.contains("Tone: Intellectual, empathetic, poetic, grounded."));
        assert!(text.contains("Red (Passion/Energy), Black (Depth), White (Clarity)"));
        assert!(text.contains("1. Emotional Check-ins.\n2. Warm-up.\n3. Theme-based Expression.\n4. Reflection."));
        assert!(text.contains("Mission: To show that movement is a language beyond words."));
        assert!(text.ends_with("dance, flow, and grounding."));
    }

    #[test]
    fn file_overrides_builtin() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "  You are a calm guide.  ").unwrap();
        assert_eq!(load_instruction(Some(f.path())), "You are a calm guide.");
    }

    #[test]
    fn empty_or_missing_file_falls_back() {
        let f = tempfile::NamedTempFile::new().unwrap();
        let builtin = Persona::default().system_instruction();
        assert_eq!(load_instruction(Some(f.path())), builtin);
        assert_eq!(load_instruction(Some(Path::new("/nonexistent/persona.md"))), builtin);
        assert_eq!(load_instruction(None), builtin);
    }
}
