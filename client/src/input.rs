//! Input adapter
//!
//! The UI layer owns actual key/touch handling; the core only consumes one
//! [`InputSample`] per tick through this trait.

use shared::InputSample;

pub trait InputSource {
    fn sample(&mut self) -> InputSample;
}

/// Always-idle input, for headless runs.
#[derive(Debug, Default)]
pub struct NullInput;

impl InputSource for NullInput {
    fn sample(&mut self) -> InputSample {
        InputSample::idle()
    }
}

/// Replays a fixed sequence of samples, then idles. Used by tests to drive
/// deterministic movement.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    samples: Vec<InputSample>,
    cursor: usize,
}

impl ScriptedInput {
    pub fn new(samples: Vec<InputSample>) -> Self {
        Self { samples, cursor: 0 }
    }
}

impl InputSource for ScriptedInput {
    fn sample(&mut self) -> InputSample {
        match self.samples.get(self.cursor) {
            Some(sample) => {
                self.cursor += 1;
                *sample
            }
            None => InputSample::idle(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_input_is_idle() {
        let mut input = NullInput;
        assert_eq!(input.sample(), InputSample::idle());
    }

    #[test]
    fn test_scripted_input_replays_then_idles() {
        let forward = InputSample {
            forward: true,
            ..Default::default()
        };
        let mut input = ScriptedInput::new(vec![forward, forward]);
        assert_eq!(input.sample(), forward);
        assert_eq!(input.sample(), forward);
        assert_eq!(input.sample(), InputSample::idle());
        assert_eq!(input.sample(), InputSample::idle());
    }
}
