use std::collections::HashMap;

use dosa_traits::{DigitalIo, PinId};
use rppal::gpio::{Gpio, InputPin, OutputPin};

use crate::error::{HwError, Result};

/// Raspberry Pi GPIO backend.
///
/// Outputs are claimed driven low, inputs with the internal pull-up.
/// Unset pins (0) are skipped; touching a pin that was not claimed is
/// logged and ignored.
pub struct GpioIo {
    outputs: HashMap<PinId, OutputPin>,
    inputs: HashMap<PinId, InputPin>,
}

impl GpioIo {
    pub fn new(outputs: &[PinId], inputs: &[PinId]) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let claim = |pin: PinId| {
            gpio.get(pin.0).map_err(|e| HwError::PinUnavailable {
                pin: pin.0,
                reason: e.to_string(),
            })
        };

        let mut out = HashMap::new();
        for &pin in outputs.iter().filter(|p| !p.is_unset()) {
            out.insert(pin, claim(pin)?.into_output_low());
        }
        let mut inp = HashMap::new();
        for &pin in inputs.iter().filter(|p| !p.is_unset()) {
            inp.insert(pin, claim(pin)?.into_input_pullup());
        }
        tracing::info!(outputs = out.len(), inputs = inp.len(), "gpio claimed");
        Ok(Self {
            outputs: out,
            inputs: inp,
        })
    }
}

impl DigitalIo for GpioIo {
    fn read(&mut self, pin: PinId) -> bool {
        match self.inputs.get(&pin) {
            Some(p) => p.is_high(),
            None => {
                tracing::warn!(pin = pin.0, "read from unclaimed pin");
                true
            }
        }
    }

    fn write(&mut self, pin: PinId, level: bool) {
        match self.outputs.get_mut(&pin) {
            Some(p) if level => p.set_high(),
            Some(p) => p.set_low(),
            None => tracing::warn!(pin = pin.0, level, "write to unclaimed pin"),
        }
    }
}
