//! Narration playback over a single speech-synthesis slot.
//!
//! The platform allows only one active utterance at a time, so
//! [`NarrationController`] owns the single synthesizer handle and runs
//! an explicit `{Idle, Speaking, Paused}` state machine over it:
//! `speak` always preempts, `pause`/`resume` are valid only in their
//! respective states, and `stop` cancels unconditionally.

use crate::engine::TriggerEvent;

/// Platform text-to-speech seam.
///
/// Implementations wrap whatever speech output the host provides. The
/// controller guarantees `speak` is never called with an utterance
/// still considered active on its side (it cancels first).
pub trait SpeechSynthesizer {
    /// Starts speaking `text` in the given BCP-47 language tag.
    fn speak(&mut self, text: &str, language: &str);
    /// Pauses the current utterance.
    fn pause(&mut self);
    /// Resumes a paused utterance.
    fn resume(&mut self);
    /// Cancels any in-flight utterance.
    fn cancel(&mut self);
}

/// Synthesizer for headless use: logs narration instead of speaking.
#[derive(Debug, Default)]
pub struct TracingSynthesizer;

impl SpeechSynthesizer for TracingSynthesizer {
    fn speak(&mut self, text: &str, language: &str) {
        tracing::info!(language, text, "narration");
    }

    fn pause(&mut self) {
        tracing::debug!("narration paused");
    }

    fn resume(&mut self) {
        tracing::debug!("narration resumed");
    }

    fn cancel(&mut self) {
        tracing::debug!("narration cancelled");
    }
}

/// Playback state of the single narration slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrationState {
    /// Nothing is playing.
    Idle,
    /// An utterance is in flight.
    Speaking,
    /// An utterance is paused mid-flight.
    Paused,
}

/// Drives one [`SpeechSynthesizer`] with play/pause/stop semantics.
///
/// The synthesis language is set before each `speak` from the guide's
/// current language; changing it mid-utterance does not affect the
/// utterance in flight.
#[derive(Debug)]
pub struct NarrationController<S: SpeechSynthesizer> {
    synthesizer: S,
    state: NarrationState,
    language: String,
}

impl<S: SpeechSynthesizer> NarrationController<S> {
    /// Creates a controller in the `Idle` state.
    pub fn new(synthesizer: S, language: impl Into<String>) -> Self {
        Self {
            synthesizer,
            state: NarrationState::Idle,
            language: language.into(),
        }
    }

    /// Current playback state.
    #[must_use]
    pub const fn state(&self) -> NarrationState {
        self.state
    }

    /// Sets the language for subsequent `speak` calls only.
    pub fn set_language(&mut self, language: impl Into<String>) {
        self.language = language.into();
    }

    /// Starts a new utterance, preempting any in-flight one.
    pub fn speak(&mut self, text: &str) {
        if self.state != NarrationState::Idle {
            self.synthesizer.cancel();
        }
        self.synthesizer.speak(text, &self.language);
        self.state = NarrationState::Speaking;
    }

    /// Speaks a proximity trigger's narration in its resolved language.
    pub fn speak_trigger(&mut self, event: &TriggerEvent) {
        self.set_language(event.language.clone());
        self.speak(&event.narration);
    }

    /// Pauses the current utterance. No-op unless speaking.
    pub fn pause(&mut self) {
        if self.state == NarrationState::Speaking {
            self.synthesizer.pause();
            self.state = NarrationState::Paused;
        }
    }

    /// Resumes a paused utterance. No-op unless paused.
    pub fn resume(&mut self) {
        if self.state == NarrationState::Paused {
            self.synthesizer.resume();
            self.state = NarrationState::Speaking;
        }
    }

    /// Cancels any in-flight utterance and returns to `Idle`.
    pub fn stop(&mut self) {
        if self.state != NarrationState::Idle {
            self.synthesizer.cancel();
        }
        self.state = NarrationState::Idle;
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    /// Records synthesizer calls for assertion.
    #[derive(Debug, Default)]
    struct RecordingSynthesizer {
        calls: Vec<String>,
    }

    impl SpeechSynthesizer for RecordingSynthesizer {
        fn speak(&mut self, text: &str, language: &str) {
            self.calls.push(format!("speak[{language}]:{text}"));
        }

        fn pause(&mut self) {
            self.calls.push("pause".to_string());
        }

        fn resume(&mut self) {
            self.calls.push("resume".to_string());
        }

        fn cancel(&mut self) {
            self.calls.push("cancel".to_string());
        }
    }

    fn make_controller() -> NarrationController<RecordingSynthesizer> {
        NarrationController::new(RecordingSynthesizer::default(), "en")
    }

    #[test]
    fn speak_from_idle_does_not_cancel_first() {
        let mut ctrl = make_controller();
        ctrl.speak("hello");
        assert_eq!(ctrl.state(), NarrationState::Speaking);
        assert_eq!(ctrl.synthesizer.calls, vec!["speak[en]:hello"]);
    }

    #[test]
    fn speak_preempts_inflight_utterance() {
        let mut ctrl = make_controller();
        ctrl.speak("first");
        ctrl.speak("second");
        assert_eq!(
            ctrl.synthesizer.calls,
            vec!["speak[en]:first", "cancel", "speak[en]:second"]
        );
        assert_eq!(ctrl.state(), NarrationState::Speaking);
    }

    #[test]
    fn pause_resume_cycle() {
        let mut ctrl = make_controller();
        ctrl.speak("hello");
        ctrl.pause();
        assert_eq!(ctrl.state(), NarrationState::Paused);
        ctrl.resume();
        assert_eq!(ctrl.state(), NarrationState::Speaking);
    }

    #[test]
    fn pause_is_noop_unless_speaking() {
        let mut ctrl = make_controller();
        ctrl.pause();
        assert_eq!(ctrl.state(), NarrationState::Idle);
        assert!(ctrl.synthesizer.calls.is_empty());

        ctrl.speak("hello");
        ctrl.pause();
        ctrl.pause(); // second pause: no-op
        assert_eq!(
            ctrl.synthesizer.calls,
            vec!["speak[en]:hello", "pause"]
        );
    }

    #[test]
    fn resume_is_noop_unless_paused() {
        let mut ctrl = make_controller();
        ctrl.resume();
        assert_eq!(ctrl.state(), NarrationState::Idle);

        ctrl.speak("hello");
        ctrl.resume(); // speaking, not paused: no-op
        assert_eq!(ctrl.synthesizer.calls, vec!["speak[en]:hello"]);
    }

    #[test]
    fn stop_cancels_from_any_state() {
        let mut ctrl = make_controller();
        ctrl.stop(); // idle: no cancel call
        assert!(ctrl.synthesizer.calls.is_empty());

        ctrl.speak("hello");
        ctrl.stop();
        assert_eq!(ctrl.state(), NarrationState::Idle);

        ctrl.speak("again");
        ctrl.pause();
        ctrl.stop();
        assert_eq!(ctrl.state(), NarrationState::Idle);
    }

    #[test]
    fn language_change_applies_to_next_utterance_only() {
        let mut ctrl = make_controller();
        ctrl.speak("hello");
        ctrl.set_language("es");
        // The in-flight utterance was started with "en"; only the next
        // speak call picks up "es".
        ctrl.speak("hola");
        assert_eq!(
            ctrl.synthesizer.calls,
            vec!["speak[en]:hello", "cancel", "speak[es]:hola"]
        );
    }
}
