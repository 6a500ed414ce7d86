//! Voice pipeline: number/unit resolution, command grammar parsing, and
//! the speech-recognition collaborator interfaces.

pub mod number;
pub mod parser;
pub mod recognizer;

pub use number::{resolve_magnitude, Quantity};
pub use parser::parse_utterance;
pub use recognizer::{AudioFrame, AudioSource, RecognizedText, SpeechRecognizer};
