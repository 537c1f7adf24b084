#[macro_use]
extern crate clap;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

extern crate davinci_unio;
use davinci_unio::*;

use std::io::{
	self,
	BufRead,
	Write,
};
use std::process::exit;
use std::time::Duration;

use davinci_unio::cartridge::{
	Cartridge,
	Refill,
};
use davinci_unio::gpio::Bcm2835Gpio;
use davinci_unio::unio::Eeprom;

type Chip = Eeprom<Bcm2835Gpio>;

fn get_param<T>(matches: &clap::ArgMatches, name: &str) -> AResult<T>
where
	T: std::str::FromStr,
	failure::Error: From<<T as std::str::FromStr>::Err>,
{
	let param = match matches.value_of(name) {
		Some(p) => p,
		None => bail!("missing parameter {}", name),
	};
	param.parse::<T>().map_err(|e| {
		let e = failure::Error::from(e);
		let msg = format!("invalid paramater {}: {}", name, e);
		e.context(msg).into()
	})
}

// accepts "0xa0" as well as "160"
fn parse_byte(param: &str) -> Result<u8, std::num::ParseIntError> {
	if param.starts_with("0x") || param.starts_with("0X") {
		u8::from_str_radix(&param[2..], 16)
	} else {
		param.parse::<u8>()
	}
}

fn get_byte(matches: &clap::ArgMatches, name: &str) -> AResult<u8> {
	let param = match matches.value_of(name) {
		Some(p) => p,
		None => bail!("missing parameter {}", name),
	};
	parse_byte(param).map_err(|e| format_err!("invalid parameter {}: {}", name, e))
}

fn open_chip(matches: &clap::ArgMatches) -> AResult<Chip> {
	let pin: u8 = get_param(matches, "pin")?;
	let device = get_byte(matches, "device")?;
	let retries: usize = get_param(matches, "retries")?;

	let mut chip = gpio::open_eeprom(pin, device)?;
	info!("Testing connection to EEPROM 0x{:02x} on GPIO {}", device, pin);
	let status = chip.detect(retries.max(1), Duration::from_secs(1))?;
	info!("EEPROM found (status {:?})", status);
	Ok(chip)
}

fn read_image(chip: &mut Chip, length: usize) -> AResult<Vec<u8>> {
	chip.read(0, length).map_err(|e| {
		let msg = format!("reading EEPROM: {}", e);
		e.context(msg).into()
	})
}

fn status(chip: &mut Chip) -> AResult<()> {
	let status = chip.read_status()?;
	println!("{:?}", status);
	Ok(())
}

fn dump(chip: &mut Chip, sub_m: &clap::ArgMatches) -> AResult<()> {
	let length: usize = get_param(sub_m, "length")?;
	let image = read_image(chip, length)?;
	print!("{}", cartridge::hex_dump(0, &image));
	Ok(())
}

fn info(chip: &mut Chip) -> AResult<()> {
	let image = read_image(chip, cartridge::IMAGE_SIZE)?;
	let (first, second) = image.split_at(cartridge::MIRROR_OFFSET as usize);
	if first != second {
		warn!("Cartridge blocks differ, showing the first one");
	}
	println!("{}", Cartridge::decode(first)?);
	Ok(())
}

fn confirm(question: &str) -> AResult<bool> {
	print!("{} [y/N] ", question);
	io::stdout().flush()?;
	let mut answer = String::new();
	io::stdin().lock().read_line(&mut answer)?;
	Ok(answer.trim().eq_ignore_ascii_case("y"))
}

fn refill(chip: &mut Chip, sub_m: &clap::ArgMatches) -> AResult<()> {
	info!("Reading the EEPROM contents...");
	let image = read_image(chip, cartridge::IMAGE_SIZE)?;
	print!("{}", cartridge::hex_dump(0, &image));
	let current = Cartridge::decode(&image)?;
	println!("{}", current);

	let serial = if sub_m.is_present("keep_serial") {
		current.serial
	} else {
		cartridge::increment_serial(&current.serial)
	};
	let refill = Refill {
		material: get_param(sub_m, "material")?,
		length: cartridge::length_preset(get_param(sub_m, "length")?)?,
		head_temp: get_param(sub_m, "head_temp")?,
		bed_temp: get_param(sub_m, "bed_temp")?,
		serial,
	};
	info!("New cartridge data: {:?}", refill);

	if !sub_m.is_present("yes") && !confirm("Update EEPROM?")? {
		info!("Nothing written");
		return Ok(());
	}

	info!("Updating EEPROM...");
	refill.apply(chip)?;

	info!("Content after modification:");
	let image = read_image(chip, cartridge::IMAGE_SIZE)?;
	print!("{}", cartridge::hex_dump(0, &image));
	Ok(())
}

fn main_app() -> AResult<()> {
	let matches = clap_app!(@app (app_from_crate!())
		(@setting SubcommandRequiredElseHelp)
		(global_setting: clap::AppSettings::VersionlessSubcommands)
		(@arg pin: -p --pin +takes_value default_value("14") "BCM GPIO the EEPROM is wired to (14 is header pin 8)")
		(@arg device: -d --device +takes_value default_value("0xa0") "UNIO device address")
		(@arg retries: -r --retries +takes_value default_value("10") "attempts to find the EEPROM, a second apart")
		(@subcommand status =>
			(about: "show the status register")
		)
		(@subcommand dump =>
			(about: "hex dump the EEPROM")
			(@arg length: -l --length +takes_value default_value("128") "number of bytes to dump")
		)
		(@subcommand info =>
			(about: "show the cartridge data")
		)
		(@subcommand refill =>
			(about: "reset the cartridge to a full one")
			(@arg length: -l --length +takes_value default_value("120") "filament length in meters (120, 240 or 400)")
			(@arg material: -m --material +takes_value default_value("abs") "filament material (abs, pla or flex)")
			(@arg head_temp: --("head-temp") +takes_value default_value("210") "extruder temperature in °C")
			(@arg bed_temp: --("bed-temp") +takes_value default_value("90") "bed temperature in °C")
			(@arg keep_serial: --("keep-serial") "don't bump the serial number")
			(@arg yes: -y --yes "don't ask for confirmation")
		)
	).get_matches();

	let mut chip = open_chip(&matches)?;

	match matches.subcommand() {
		("status", _) => {
			status(&mut chip)
		}
		("dump", Some(sub_m)) => {
			dump(&mut chip, sub_m)
		}
		("info", _) => {
			info(&mut chip)
		}
		("refill", Some(sub_m)) => {
			refill(&mut chip, sub_m)
		}
		("", _) => bail!("no subcommand"),
		(cmd, _) => bail!("not implemented subcommand {:?}", cmd),
	}
}

fn main() {
	env_logger::from_env(env_logger::Env::default().default_filter_or("info")).init();

	if let Err(e) = main_app() {
		error!("Error: {}", e);
		exit(1);
	}
}
