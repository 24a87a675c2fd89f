//! Named on/off waveforms shared by the visual and acoustic sub-actions
//! (spec.md §4.5). Grounded in the re-architecture note that the source's
//! `_do_pattern` helper (positional-argument callables) should become a
//! small actuator capability abstraction of `{ on(), off() }` closures.

use std::thread::sleep;
use std::time::Duration;

use crate::error::DeviceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    P1,
    P2,
    P3,
    P4,
}

impl Pattern {
    pub fn parse(name: &str) -> Option<Pattern> {
        match name {
            "p1" => Some(Pattern::P1),
            "p2" => Some(Pattern::P2),
            "p3" => Some(Pattern::P3),
            "p4" => Some(Pattern::P4),
            _ => None,
        }
    }
}

/// An actuator capable of switching on and off, nothing more. The buzzer
/// and the LED both implement this for the purposes of running a named
/// pattern; the LED's "on" closure additionally captures which color to
/// switch to. Fallible: a GPIO write can fail mid-pattern, and that failure
/// must propagate so the request processor can report it (spec.md §4.5
/// step 4).
pub trait PatternActuator {
    fn on(&mut self) -> Result<(), DeviceError>;
    fn off(&mut self) -> Result<(), DeviceError>;
}

/// Run `pattern` against `actuator`, holding whatever guard the caller
/// already acquired for its entire duration (spec.md §4.5: "patterns hold
/// the actuator's guard for their entire duration"). Aborts on the first
/// actuator failure.
pub fn run_pattern(actuator: &mut dyn PatternActuator, pattern: Pattern) -> Result<(), DeviceError> {
    match pattern {
        Pattern::P1 => {
            actuator.on()?;
            sleep(Duration::from_millis(500));
            actuator.off()?;
        }
        Pattern::P2 => {
            for _ in 0..2 {
                actuator.on()?;
                sleep(Duration::from_millis(500));
                actuator.off()?;
                sleep(Duration::from_millis(250));
            }
        }
        Pattern::P3 => {
            for _ in 0..3 {
                actuator.on()?;
                sleep(Duration::from_millis(500));
                actuator.off()?;
                sleep(Duration::from_millis(250));
            }
        }
        Pattern::P4 => {
            for _ in 0..4 {
                actuator.on()?;
                sleep(Duration::from_millis(125));
                actuator.off()?;
                sleep(Duration::from_millis(125));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<bool>,
    }

    impl PatternActuator for Recorder {
        fn on(&mut self) -> Result<(), DeviceError> {
            self.calls.push(true);
            Ok(())
        }
        fn off(&mut self) -> Result<(), DeviceError> {
            self.calls.push(false);
            Ok(())
        }
    }

    #[test]
    fn parses_known_pattern_names() {
        assert_eq!(Pattern::parse("p3"), Some(Pattern::P3));
        assert_eq!(Pattern::parse("p9"), None);
    }

    #[test]
    fn p1_is_a_single_on_off() {
        let mut rec = Recorder::default();
        run_pattern(&mut rec, Pattern::P1).unwrap();
        assert_eq!(rec.calls, vec![true, false]);
    }

    #[test]
    fn p4_toggles_four_times() {
        let mut rec = Recorder::default();
        run_pattern(&mut rec, Pattern::P4).unwrap();
        assert_eq!(rec.calls, vec![true, false, true, false, true, false, true, false]);
    }

    struct FailingActuator;
    impl PatternActuator for FailingActuator {
        fn on(&mut self) -> Result<(), DeviceError> {
            Err(DeviceError::Gpio("stuck line".into()))
        }
        fn off(&mut self) -> Result<(), DeviceError> {
            Ok(())
        }
    }

    #[test]
    fn failure_aborts_the_pattern() {
        assert!(run_pattern(&mut FailingActuator, Pattern::P2).is_err());
    }
}
