//! A UNIO slave living behind the `Line` trait, for tests.
//!
//! It decodes the traffic per bit slot (two samples per slot), tracks the
//! byte framing (8 data bits, MAK, SAK) and answers like a single EEPROM:
//! memory, status register and write enable latch. Delays don't sleep;
//! long idle-high delays are recognized as standby pulses and gaps.

use std::mem;

use super::frame::START_HEADER;
use super::{
	Line,
	Opcode,
	Timing,
};

pub const MEMORY_SIZE: usize = 0x800;
const PAGE_MASK: usize = 0x0f;

/// Compressed timing; every delay kind has a distinct length so the
/// simulation can tell them apart.
pub fn timing() -> Timing {
	Timing {
		quarter_bit: 1,
		standby_low: 2,
		standby_recovery: 40,
		start_header_hold: 3,
		inter_command_gap: 4,
		fudge: 1,
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Event {
	Standby,
	StartHeader,
	InterCommandGap,
	/// byte sent by the master
	Received { byte: u8, mak: bool },
	/// byte sent by the slave
	Sent { byte: u8, mak: bool },
}

#[derive(Clone, Copy, Debug)]
enum Source {
	Memory(usize),
	Status,
}

#[derive(Debug)]
enum Phase {
	Header,
	Command(Vec<u8>),
	WriteData { address: usize, data: Vec<u8> },
	Transmit { source: Source, byte: u8 },
	Ignore,
}

pub struct SimulatedEeprom {
	timing: Timing,
	device: u8,
	acknowledge: bool,
	memory: Vec<u8>,
	block_protection: u8,
	write_enabled: bool,
	busy_reads: usize,
	busy_after_write: usize,

	// line state
	output: bool,
	level: bool,
	mid_slot: bool,
	driven: Option<bool>,

	// framing
	slot: u8,
	shift: u8,
	sak: bool,
	phase: Phase,

	// observations
	events: Vec<Event>,
	writes: Vec<(usize, Vec<u8>)>,
	slots: usize,
	status_reads: usize,
	critical: usize,
	max_critical: usize,
	unguarded_slots: usize,
	guarded_standbys: usize,
}

impl SimulatedEeprom {
	pub fn new(timing: Timing) -> Self {
		SimulatedEeprom {
			timing,
			device: 0xa0,
			acknowledge: true,
			memory: vec![0xff; MEMORY_SIZE],
			block_protection: 0,
			write_enabled: false,
			busy_reads: 0,
			busy_after_write: 2,
			output: true,
			level: true,
			mid_slot: false,
			driven: None,
			slot: 0,
			shift: 0,
			sak: false,
			phase: Phase::Header,
			events: Vec::new(),
			writes: Vec::new(),
			slots: 0,
			status_reads: 0,
			critical: 0,
			max_critical: 0,
			unguarded_slots: 0,
			guarded_standbys: 0,
		}
	}

	/// a slave that never acknowledges behaves like no slave at all
	pub fn set_acknowledge(&mut self, acknowledge: bool) {
		self.acknowledge = acknowledge;
	}

	/// number of status reads that still report "write in progress"
	pub fn set_busy_reads(&mut self, reads: usize) {
		self.busy_reads = reads;
	}

	pub fn memory(&self) -> &[u8] {
		&self.memory
	}

	pub fn memory_mut(&mut self) -> &mut [u8] {
		&mut self.memory
	}

	pub fn events(&self) -> &[Event] {
		&self.events
	}

	pub fn count(&self, event: Event) -> usize {
		self.events.iter().filter(|e| **e == event).count()
	}

	/// committed writes: (start address, data)
	pub fn writes(&self) -> &[(usize, Vec<u8>)] {
		&self.writes
	}

	pub fn slots(&self) -> usize {
		self.slots
	}

	pub fn status_reads(&self) -> usize {
		self.status_reads
	}

	pub fn status(&self) -> u8 {
		let mut status = self.block_protection;
		if self.busy_reads > 0 {
			status |= 0x01;
		}
		if self.write_enabled {
			status |= 0x02;
		}
		status
	}

	pub fn critical_depth(&self) -> usize {
		self.critical
	}

	pub fn max_critical_depth(&self) -> usize {
		self.max_critical
	}

	/// bit slots clocked while no critical section was held
	pub fn unguarded_slots(&self) -> usize {
		self.unguarded_slots
	}

	/// standby pulses issued while a critical section was held
	pub fn guarded_standbys(&self) -> usize {
		self.guarded_standbys
	}

	fn reset_framing(&mut self) {
		self.mid_slot = false;
		self.slot = 0;
		self.shift = 0;
		self.sak = false;
		self.phase = Phase::Header;
	}

	fn load(&mut self, source: Source) -> u8 {
		match source {
			Source::Memory(address) => self.memory[address % MEMORY_SIZE],
			Source::Status => {
				let status = self.status();
				self.status_reads += 1;
				if self.busy_reads > 0 {
					self.busy_reads -= 1;
				}
				status
			},
		}
	}

	// what the slave drives during the current slot (None: released)
	fn drive(&self) -> Option<bool> {
		match (self.slot, &self.phase) {
			(0..=7, Phase::Transmit { byte, .. }) => Some(0 != byte & (0x80 >> self.slot)),
			(9, _) if self.sak => Some(true),
			_ => None,
		}
	}

	fn end_slot(&mut self, bit: bool) {
		self.slots += 1;
		if 0 == self.critical {
			self.unguarded_slots += 1;
		}
		match self.slot {
			0..=7 => {
				self.shift = (self.shift << 1) | (bit as u8);
				self.slot += 1;
			},
			8 => {
				let byte = self.shift;
				self.sak = self.end_byte(byte, bit);
				self.slot = 9;
			},
			_ => {
				self.slot = 0;
				self.shift = 0;
				self.sak = false;
			},
		}
	}

	// returns whether to acknowledge the byte
	fn end_byte(&mut self, byte: u8, mak: bool) -> bool {
		let (next, ack) = match mem::replace(&mut self.phase, Phase::Ignore) {
			Phase::Header => {
				if START_HEADER == byte {
					self.events.push(Event::StartHeader);
					(Phase::Command(Vec::new()), false)
				} else {
					(Phase::Ignore, false)
				}
			},
			Phase::Command(mut command) => {
				self.events.push(Event::Received { byte, mak });
				command.push(byte);
				self.command(command, mak)
			},
			Phase::WriteData { address, mut data } => {
				self.events.push(Event::Received { byte, mak });
				data.push(byte);
				if mak {
					self.commit(address, data);
					(Phase::Header, true)
				} else {
					(Phase::WriteData { address, data }, true)
				}
			},
			Phase::Transmit { source, byte: sent } => {
				self.events.push(Event::Sent { byte: sent, mak });
				if mak {
					(Phase::Header, true)
				} else {
					let source = match source {
						Source::Memory(address) => Source::Memory(address + 1),
						Source::Status => Source::Status,
					};
					let byte = self.load(source);
					(Phase::Transmit { source, byte }, true)
				}
			},
			Phase::Ignore => (Phase::Ignore, false),
		};
		self.phase = next;
		ack
	}

	fn command(&mut self, command: Vec<u8>, mak: bool) -> (Phase, bool) {
		if command[0] != self.device || !self.acknowledge {
			return (Phase::Ignore, false);
		}
		if command.len() == 1 {
			return (if mak { Phase::Header } else { Phase::Command(command) }, true);
		}
		let opcode = match Opcode::from_byte(command[1]) {
			Some(opcode) => opcode,
			None => return (Phase::Ignore, false),
		};
		if command.len() < opcode.frame_len() {
			return (if mak { Phase::Header } else { Phase::Command(command) }, true);
		}

		let address = if command.len() == 4 {
			((command[2] as usize) << 8) | (command[3] as usize)
		} else {
			0
		};
		let next = match opcode {
			Opcode::Read => {
				let source = Source::Memory(address);
				let byte = self.load(source);
				Phase::Transmit { source, byte }
			},
			Opcode::ReadStatus => {
				let byte = self.load(Source::Status);
				Phase::Transmit { source: Source::Status, byte }
			},
			Opcode::Write => Phase::WriteData { address, data: Vec::new() },
			Opcode::WriteEnable => {
				self.write_enabled = true;
				Phase::Header
			},
			Opcode::WriteDisable => {
				self.write_enabled = false;
				Phase::Header
			},
			Opcode::WriteStatus => {
				if self.write_enabled {
					self.block_protection = command[2] & 0x0c;
					self.finish_write();
				}
				Phase::Header
			},
			Opcode::EraseAll | Opcode::SetAll => {
				if self.write_enabled {
					let fill = if Opcode::SetAll == opcode { 0xff } else { 0x00 };
					for b in self.memory.iter_mut() {
						*b = fill;
					}
					self.finish_write();
				}
				Phase::Header
			},
		};
		if mak {
			// a data phase never started
			match next {
				Phase::Transmit { .. } | Phase::WriteData { .. } => return (Phase::Header, true),
				_ => (),
			}
		}
		(next, true)
	}

	fn finish_write(&mut self) {
		self.write_enabled = false;
		self.busy_reads = self.busy_after_write;
	}

	// like the real chip: without WREN nothing happens, and data wraps
	// around inside the page
	fn commit(&mut self, address: usize, data: Vec<u8>) {
		if !self.write_enabled {
			return;
		}
		let page = address & !PAGE_MASK;
		for (i, b) in data.iter().enumerate() {
			let offset = (address + i) & PAGE_MASK;
			self.memory[(page | offset) % MEMORY_SIZE] = *b;
		}
		self.writes.push((address, data));
		self.finish_write();
	}
}

impl Line for SimulatedEeprom {
	fn set_output(&mut self) {
		self.output = true;
	}

	fn set_input(&mut self) {
		self.output = false;
	}

	fn set_level(&mut self, high: bool) {
		self.level = high;
	}

	fn read_level(&mut self) -> bool {
		let first = !self.mid_slot;
		self.mid_slot = first;

		if first && !self.output {
			self.driven = self.drive();
		}
		let level = if self.output {
			self.level
		} else {
			// "1": low then high, "0": high then low, released: pulled up
			match self.driven {
				Some(true) => !first,
				Some(false) => first,
				None => true,
			}
		};

		if !first {
			let bit = if self.output { self.level } else { Some(true) == self.driven };
			self.end_slot(bit);
		}
		level
	}

	fn delay_us(&mut self, us: u32) {
		if !(self.output && self.level) {
			return;
		}
		if us >= self.timing.standby_recovery_us() {
			if self.critical > 0 {
				self.guarded_standbys += 1;
			}
			self.events.push(Event::Standby);
			self.reset_framing();
		} else if us == self.timing.inter_command_gap_us() {
			self.events.push(Event::InterCommandGap);
		}
	}

	fn suppress_preemption(&mut self) {
		self.critical += 1;
		if self.critical > self.max_critical {
			self.max_critical = self.critical;
		}
	}

	fn restore_preemption(&mut self) {
		assert!(self.critical > 0, "critical section released twice");
		self.critical -= 1;
	}
}
