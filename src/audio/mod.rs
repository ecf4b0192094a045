mod player;

pub use player::{AudioOutput, AudioPlayer};
