use serde::{Deserialize, Serialize};

/// Narration text, either generated or edited by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrationScript {
    text: String,
}

impl NarrationScript {
    pub fn new<S: Into<String>>(text: S) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Seconds needed to read the script aloud at `words_per_minute`, scaled by `speed`
    pub fn estimated_duration(&self, words_per_minute: f64, speed: f64) -> f64 {
        if words_per_minute <= 0.0 || speed <= 0.0 {
            return f64::INFINITY;
        }
        self.word_count() as f64 / words_per_minute * 60.0 / speed
    }
}

/// Largest number of words that fits in `duration` seconds at `words_per_minute`
pub fn word_budget(duration: f64, words_per_minute: f64) -> usize {
    (duration * words_per_minute / 60.0).floor().max(0.0) as usize
}

/// Session-scoped holder of the current draft
#[derive(Debug, Default)]
pub struct ScriptEditor {
    current: Option<NarrationScript>,
}

impl ScriptEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&NarrationScript> {
        self.current.as_ref()
    }

    pub fn text(&self) -> &str {
        self.current.as_ref().map(NarrationScript::text).unwrap_or("")
    }

    /// Replace the draft with user-edited text
    pub fn replace<S: Into<String>>(&mut self, text: S) {
        self.current = Some(NarrationScript::new(text));
    }

    /// Install a freshly generated draft
    pub fn load(&mut self, script: NarrationScript) {
        self.current = Some(script);
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    /// A script may advance to synthesis only when it has non-whitespace content
    pub fn is_ready(&self) -> bool {
        self.current.as_ref().is_some_and(|s| !s.is_empty())
    }
}
