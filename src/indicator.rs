use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::thread;
use std::time::Duration;

const PI_BLASTER_PATH: &str = "/dev/pi-blaster";
const HOLD_MS: u64 = 200;


/// Signals that a packet went out.
pub trait Indicator {
    fn blink(&mut self);
}


impl<I: Indicator + ?Sized> Indicator for Box<I> {
    fn blink(&mut self) {
        (**self).blink()
    }
}


pub struct NullIndicator;


impl Indicator for NullIndicator {
    fn blink(&mut self) {}
}


/**
 * Raises a GPIO pin through the pi-blaster daemon and holds it high for a moment.
 */
pub struct PiBlasterIndicator<W: Write> {
    pin: u8,
    hold: Duration,
    blaster: W,
}


impl PiBlasterIndicator<File> {
    pub fn new(pin: u8) -> io::Result<PiBlasterIndicator<File>> {
        let blaster = OpenOptions::new().write(true).open(PI_BLASTER_PATH)?;
        Ok(PiBlasterIndicator::with_writer(pin, Duration::from_millis(HOLD_MS), blaster))
    }
}


impl<W: Write> PiBlasterIndicator<W> {
    pub fn with_writer(pin: u8, hold: Duration, blaster: W) -> PiBlasterIndicator<W> {
        PiBlasterIndicator {
            pin: pin,
            hold: hold,
            blaster: blaster,
        }
    }

    fn set(&mut self, level: u8) -> io::Result<()> {
        let message = format!("{}={}\n", self.pin, level);
        self.blaster.write_all(message.as_bytes())?;
        self.blaster.flush()
    }
}


impl<W: Write> Indicator for PiBlasterIndicator<W> {
    fn blink(&mut self) {
        match self.set(1) {
            Ok(_) => (),
            Err(err) => {
                error!("Unable to raise indicator pin {}: {}", self.pin, err);
                return;
            }
        }
        // Blocks the control loop, the same as a busy wait would
        thread::sleep(self.hold);
        match self.set(0) {
            Ok(_) => (),
            Err(err) => error!("Unable to lower indicator pin {}: {}", self.pin, err),
        }
    }
}
