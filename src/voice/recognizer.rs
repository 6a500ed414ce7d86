//! Speech-recognition collaborator interfaces.
//!
//! The acoustic engine and audio capture are external; the core only
//! consumes recognized text. Frames arrive at roughly 100 ms cadence and
//! recognition must never be blocked by a slow-executing command.

use crate::logging::now_ms;
use async_trait::async_trait;

/// One captured audio buffer (16-bit PCM samples)
#[derive(Debug, Clone, Default)]
pub struct AudioFrame {
    pub samples: Vec<i16>,
}

/// A finalized recognition result
#[derive(Debug, Clone)]
pub struct RecognizedText {
    pub text: String,
    pub recognized_at_ms: u64,
}

impl RecognizedText {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            recognized_at_ms: now_ms(),
        }
    }
}

/// Audio capture collaborator. `None` means the device has closed.
#[async_trait]
pub trait AudioSource: Send {
    async fn next_frame(&mut self) -> Option<AudioFrame>;
}

/// Acoustic recognition collaborator. Returns text only when an
/// utterance has been finalized.
pub trait SpeechRecognizer: Send {
    fn feed(&mut self, frame: &AudioFrame) -> Option<RecognizedText>;
}

/// Emits silent frames at the capture cadence; stands in for the real
/// microphone when running against the simulated vehicle. The noise
/// toggle only affects this collaborator, never the core.
pub struct SilentAudioSource {
    interval: tokio::time::Interval,
    frame_len: usize,
    noise_injection: bool,
}

impl SilentAudioSource {
    pub fn new(cadence: std::time::Duration, noise_injection: bool) -> Self {
        Self {
            interval: tokio::time::interval(cadence),
            frame_len: 1600, // 100 ms of 16 kHz mono
            noise_injection,
        }
    }
}

#[async_trait]
impl AudioSource for SilentAudioSource {
    async fn next_frame(&mut self) -> Option<AudioFrame> {
        self.interval.tick().await;
        let mut samples = vec![0i16; self.frame_len];
        if self.noise_injection {
            // Deterministic low-level dither, enough to exercise the path
            for (i, s) in samples.iter_mut().enumerate() {
                *s = (i.wrapping_mul(2654435761) % 7) as i16 - 3;
            }
        }
        Some(AudioFrame { samples })
    }
}

/// Treats lines typed on stdin as finalized recognition results.
///
/// Stands in for the acoustic engine when running against the simulated
/// vehicle: the audio frames still flow at capture cadence, but the
/// "recognized" text comes from the operator console.
pub struct ConsoleRecognizer {
    lines: std::sync::mpsc::Receiver<String>,
}

impl ConsoleRecognizer {
    pub fn new() -> Self {
        let (tx, rx) = std::sync::mpsc::channel();
        // Blocking stdin read stays off the async runtime
        std::thread::spawn(move || {
            use std::io::BufRead;
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) if !line.trim().is_empty() => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(_) => break,
                }
            }
        });
        Self { lines: rx }
    }
}

impl Default for ConsoleRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechRecognizer for ConsoleRecognizer {
    fn feed(&mut self, _frame: &AudioFrame) -> Option<RecognizedText> {
        self.lines.try_recv().ok().map(RecognizedText::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Plays back a fixed script of utterances, one per frame fed
    struct ScriptedRecognizer {
        script: std::collections::VecDeque<String>,
    }

    impl ScriptedRecognizer {
        fn new(utterances: impl IntoIterator<Item = impl Into<String>>) -> Self {
            Self {
                script: utterances.into_iter().map(Into::into).collect(),
            }
        }
    }

    impl SpeechRecognizer for ScriptedRecognizer {
        fn feed(&mut self, _frame: &AudioFrame) -> Option<RecognizedText> {
            self.script.pop_front().map(RecognizedText::new)
        }
    }

    #[test]
    fn test_scripted_recognizer_plays_in_order() {
        let mut rec = ScriptedRecognizer::new(["arm", "takeoff"]);
        let frame = AudioFrame::default();
        assert_eq!(rec.feed(&frame).unwrap().text, "arm");
        assert_eq!(rec.feed(&frame).unwrap().text, "takeoff");
        assert!(rec.feed(&frame).is_none());
    }
}
