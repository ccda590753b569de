//! Mixture pump valve: follows the operator command, nothing else.
//!
//! Not covered by watchdogs or lockout.

use dosa_traits::DigitalIo;

use crate::valve::ValveOutput;

/// Drive the mixture valve to `commanded` if it is not already there.
/// Returns true when the pin was written.
pub fn drive_mixture<I: DigitalIo + ?Sized>(commanded: bool, valve: &mut ValveOutput, io: &mut I) -> bool {
    if valve.is_open() == commanded {
        return false;
    }
    valve.drive(io, commanded);
    tracing::debug!(open = commanded, "mixture valve");
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MemoryIo;
    use crate::valve::ValveRole;
    use dosa_traits::PinId;

    #[test]
    fn follows_command_and_writes_on_change_only() {
        let mut io = MemoryIo::new();
        let mut valve = ValveOutput::new(ValveRole::Mixture, PinId(3));
        assert!(!drive_mixture(false, &mut valve, &mut io));
        assert!(drive_mixture(true, &mut valve, &mut io));
        assert!(!drive_mixture(true, &mut valve, &mut io));
        assert!(drive_mixture(false, &mut valve, &mut io));
        assert_eq!(io.write_count(PinId(3)), 2);
        assert_eq!(io.level(PinId(3)), Some(false));
    }
}
