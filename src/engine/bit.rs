use super::Mode;

// 8 bits, two serial-clock edges per bit; independent of mode
const BITS_PER_BYTE: u8 = 8;
const EDGES_PER_BYTE: u8 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
	mode: Mode,
	half_period: u32,
}

impl Config {
	/// `half_period` is the number of reference-clock ticks per half
	/// serial-clock cycle; the reference clock must run at least twice
	/// as fast as the serial clock.
	pub fn new(mode: Mode, half_period: u32) -> crate::AResult<Config> {
		ensure!(half_period >= 2, "half period must be at least 2 reference ticks (got {})", half_period);
		Ok(Config {
			mode,
			half_period,
		})
	}

	pub fn mode(&self) -> Mode {
		self.mode
	}

	pub fn half_period(&self) -> u32 {
		self.half_period
	}

	/// reference ticks from accepting a load to the last serial-clock
	/// edge of that byte
	pub fn ticks_per_byte(&self) -> u32 {
		self.half_period * EDGES_PER_BYTE as u32
	}
}

/// inputs for one reference-clock tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitInputs {
	/// active-low synchronous reset
	pub reset_n: bool,
	/// one-tick pulse requesting transmission of `tx_byte`; only legal
	/// while the engine reports ready
	pub load: bool,
	pub tx_byte: u8,
	/// MISO line level
	pub rx_line: bool,
}

/// outputs for the same tick the inputs were applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitOutputs {
	/// a new load may be issued
	pub ready: bool,
	/// accumulated inbound byte; complete when `rx_valid` is set
	pub rx_byte: u8,
	/// one-tick pulse: `rx_byte` holds a fully sampled byte
	pub rx_valid: bool,
	/// derived serial clock (SCK)
	pub serial_clock: bool,
	/// outbound serial data (MOSI)
	pub tx_line: bool,
}

/// Shifts one byte out MSB-first while sampling one byte in, driven one
/// reference-clock tick at a time. See the module documentation for the
/// wire protocol.
///
/// All state is explicit; `tick` is a total function of current state
/// and current inputs. A load while the engine is busy is a caller
/// contract violation and silently restarts the transfer.
pub struct BitEngine {
	config: Config,
	serial_clock: bool,
	// reference ticks since the last serial-clock toggle
	tick_count: u32,
	// counts down from 16 per byte; 0 = between bytes
	edges_left: u8,
	// each true for exactly the one tick its edge occurs on
	leading_edge: bool,
	trailing_edge: bool,
	tx_shift: u8,
	tx_bits_left: u8,
	rx_shift: u8,
	rx_bits_left: u8,
	tx_line: bool,
	ready: bool,
	rx_valid: bool,
	// load pulse delayed by one tick
	load_last: bool,
}

impl BitEngine {
	pub fn new(config: Config) -> BitEngine {
		BitEngine {
			serial_clock: config.mode.idle_level(),
			config,
			tick_count: 0,
			edges_left: 0,
			leading_edge: false,
			trailing_edge: false,
			tx_shift: 0,
			tx_bits_left: 0,
			rx_shift: 0,
			rx_bits_left: 0,
			tx_line: false,
			ready: false,
			rx_valid: false,
			load_last: false,
		}
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	/// registered ready flag as produced by the previous tick
	pub fn is_ready(&self) -> bool {
		self.ready
	}

	/// advance the engine by one reference-clock tick
	pub fn tick(&mut self, input: BitInputs) -> BitOutputs {
		// pulses default to low every tick, overridden below
		self.leading_edge = false;
		self.trailing_edge = false;
		self.rx_valid = false;

		if !input.reset_n {
			self.clear();
		} else if input.load {
			self.tx_shift = input.tx_byte;
			self.tx_bits_left = BITS_PER_BYTE;
			self.rx_shift = 0;
			self.rx_bits_left = BITS_PER_BYTE;
			self.edges_left = EDGES_PER_BYTE;
			self.tick_count = 0;
			self.serial_clock = self.config.mode.idle_level();
			self.ready = false;
			if !self.config.mode.cpha() {
				// CPHA=0 puts the first bit on the line right away
				self.drive_next_bit();
			}
		} else if self.edges_left > 0 {
			self.tick_count += 1;
			if self.tick_count == self.config.half_period {
				self.tick_count = 0;
				self.serial_clock = !self.serial_clock;
				// an even remaining count marks the first edge of a bit
				if 0 == self.edges_left % 2 {
					self.leading_edge = true;
				} else {
					self.trailing_edge = true;
				}
				self.edges_left -= 1;

				let drive_edge = if self.config.mode.cpha() {
					self.leading_edge
				} else {
					self.trailing_edge
				};
				if drive_edge {
					self.drive_next_bit();
				} else {
					self.sample_bit(input.rx_line);
				}
			}
		} else if !self.load_last {
			self.ready = true;
		}

		self.load_last = input.reset_n && input.load;

		BitOutputs {
			ready: self.ready,
			rx_byte: self.rx_shift,
			rx_valid: self.rx_valid,
			serial_clock: self.serial_clock,
			tx_line: self.tx_line,
		}
	}

	fn clear(&mut self) {
		self.serial_clock = self.config.mode.idle_level();
		self.tick_count = 0;
		self.edges_left = 0;
		self.tx_shift = 0;
		self.tx_bits_left = 0;
		self.rx_shift = 0;
		self.rx_bits_left = 0;
		self.tx_line = false;
		self.ready = false;
	}

	// MSB first; after bit 0 nothing is driven until the next load
	fn drive_next_bit(&mut self) {
		if self.tx_bits_left > 0 {
			self.tx_bits_left -= 1;
			self.tx_line = 0 != self.tx_shift & (1 << self.tx_bits_left);
		}
	}

	// mirror image of the drive side; the 8th sample completes the byte
	fn sample_bit(&mut self, rx_line: bool) {
		if self.rx_bits_left > 0 {
			self.rx_bits_left -= 1;
			if rx_line {
				self.rx_shift |= 1 << self.rx_bits_left;
			}
			if 0 == self.rx_bits_left {
				self.rx_valid = true;
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const IDLE: BitInputs = BitInputs {
		reset_n: true,
		load: false,
		tx_byte: 0,
		rx_line: false,
	};

	fn engine(mode: Mode, half_period: u32) -> BitEngine {
		let mut eng = BitEngine::new(Config::new(mode, half_period).unwrap());
		// one reset tick, one tick for ready to assert
		let out = eng.tick(BitInputs { reset_n: false, ..IDLE });
		assert!(!out.ready);
		let out = eng.tick(IDLE);
		assert!(out.ready);
		eng
	}

	// load a byte and run until ready reasserts, with MISO looped back
	// to MOSI; returns (edge count, ticks from the last edge to ready,
	// received byte)
	fn transfer_loopback(eng: &mut BitEngine, byte: u8) -> (u32, u32, u8) {
		let mut out = eng.tick(BitInputs { load: true, tx_byte: byte, ..IDLE });
		assert!(!out.ready, "ready must drop on the load tick");

		let mut line = out.tx_line;
		let mut prev_clock = out.serial_clock;
		let mut edges = 0;
		let mut last_edge_tick = 0;
		let mut received = None;
		let limit = eng.config().ticks_per_byte() + 4;
		for t in 1..=limit {
			out = eng.tick(BitInputs { rx_line: line, ..IDLE });
			if out.serial_clock != prev_clock {
				edges += 1;
				last_edge_tick = t;
			}
			prev_clock = out.serial_clock;
			line = out.tx_line;
			if out.rx_valid {
				assert!(received.is_none(), "rx_valid pulsed twice");
				received = Some(out.rx_byte);
			}
			if out.ready {
				return (edges, t - last_edge_tick, received.expect("ready without rx_valid"));
			}
		}
		panic!("ready did not reassert within {} ticks", limit);
	}

	#[test]
	fn sixteen_edges_per_byte_in_every_mode() {
		for &mode in Mode::ALL.iter() {
			for &half_period in [2, 4, 5].iter() {
				let mut eng = engine(mode, half_period);
				let (edges, ready_delay, _) = transfer_loopback(&mut eng, 0xa5);
				assert_eq!(edges, 16, "{}, half period {}", mode, half_period);
				assert_eq!(ready_delay, 1, "{}, half period {}", mode, half_period);
			}
		}
	}

	#[test]
	fn loopback_returns_the_sent_byte() {
		for &mode in Mode::ALL.iter() {
			let mut eng = engine(mode, 3);
			for &byte in [0x00, 0xff, 0xc1, 0x5a, 0x01, 0x80].iter() {
				let (_, _, received) = transfer_loopback(&mut eng, byte);
				assert_eq!(received, byte, "{}", mode);
				// back-to-back transfers: engine is ready again here
				assert!(eng.is_ready());
			}
		}
	}

	#[test]
	fn constant_line_levels_sample_as_expected() {
		let mut eng = engine(Mode::Mode0, 2);
		// MISO stuck low reads 0x00
		eng.tick(BitInputs { load: true, tx_byte: 0xff, ..IDLE });
		let mut out = eng.tick(IDLE);
		while !out.ready {
			if out.rx_valid {
				assert_eq!(out.rx_byte, 0x00);
			}
			out = eng.tick(IDLE);
		}
		// MISO stuck high reads 0xff
		eng.tick(BitInputs { load: true, tx_byte: 0x00, ..IDLE });
		let mut out = eng.tick(BitInputs { rx_line: true, ..IDLE });
		let mut seen = false;
		while !out.ready {
			if out.rx_valid {
				assert_eq!(out.rx_byte, 0xff);
				seen = true;
			}
			out = eng.tick(BitInputs { rx_line: true, ..IDLE });
		}
		assert!(seen);
	}

	#[test]
	fn first_bit_placement_follows_cpha() {
		// CPHA=0: bit 7 goes on the line on the load tick itself
		let mut eng = engine(Mode::Mode0, 4);
		let out = eng.tick(BitInputs { load: true, tx_byte: 0x80, ..IDLE });
		assert!(out.tx_line);

		// CPHA=1: nothing is driven before the first leading edge
		let mut eng = engine(Mode::Mode1, 4);
		let out = eng.tick(BitInputs { load: true, tx_byte: 0x80, ..IDLE });
		assert!(!out.tx_line);
		let out = eng.tick(IDLE); // half period not yet reached
		assert!(!out.tx_line);
		let mut out = eng.tick(IDLE);
		let mut ticks = 2;
		while out.serial_clock == Mode::Mode1.idle_level() {
			out = eng.tick(IDLE);
			ticks += 1;
			assert!(ticks <= 4, "first edge overdue");
		}
		assert!(out.tx_line, "bit 7 must be driven on the first leading edge");
	}

	#[test]
	fn reset_returns_outputs_to_idle() {
		for &mode in Mode::ALL.iter() {
			let mut eng = engine(mode, 2);
			// reset in the middle of a byte
			eng.tick(BitInputs { load: true, tx_byte: 0xc3, ..IDLE });
			for _ in 0..7 {
				eng.tick(IDLE);
			}
			let out = eng.tick(BitInputs { reset_n: false, ..IDLE });
			assert_eq!(out.serial_clock, mode.idle_level(), "{}", mode);
			assert!(!out.ready);
			assert!(!out.rx_valid);
			// ready asserts one tick after release, no rx_valid follows
			let out = eng.tick(IDLE);
			assert!(out.ready);
			assert!(!out.rx_valid);
		}
	}

	#[test]
	fn half_period_below_two_is_rejected() {
		assert!(Config::new(Mode::Mode0, 0).is_err());
		assert!(Config::new(Mode::Mode0, 1).is_err());
		assert!(Config::new(Mode::Mode0, 2).is_ok());
	}
}
