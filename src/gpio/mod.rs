// OS-specific. for now Raspberry Pi (BCM2835 GPIO block) on linux only.
mod bcm2835;
mod realtime;

pub use self::bcm2835::{
	Bcm2835Gpio,
	PIN_COUNT,
};

pub use self::realtime::Realtime;

use crate::unio::Eeprom;

/// Open the EEPROM with device address `device` on BCM GPIO `pin`.
pub fn open_eeprom(pin: u8, device: u8) -> crate::AResult<Eeprom<Bcm2835Gpio>> {
	let line = with_context!(("open GPIO {}", pin), {
		Ok(Bcm2835Gpio::open(pin)?)
	})?;
	Ok(Eeprom::new(line, device))
}
