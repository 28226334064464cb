//! Burst sequencer: runs N consecutive byte transfers through the bit
//! engine under a single active-low chip-select assertion, then holds
//! chip-select inactive for a configured settle period before allowing
//! the next burst.
//!
//! The sequencer exclusively owns the bit engine and its control
//! inputs; the engine knows nothing about bursts or chip-select.

use crate::engine::{
	BitEngine,
	BitInputs,
	Config,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurstConfig {
	engine: Config,
	burst_length: usize,
	settle_ticks: u32,
}

impl BurstConfig {
	pub fn new(engine: Config, burst_length: usize, settle_ticks: u32) -> crate::AResult<BurstConfig> {
		ensure!(burst_length >= 1, "burst length must be at least 1 byte (got {})", burst_length);
		Ok(BurstConfig {
			engine,
			burst_length,
			settle_ticks,
		})
	}

	pub fn engine(&self) -> &Config {
		&self.engine
	}

	pub fn burst_length(&self) -> usize {
		self.burst_length
	}

	pub fn settle_ticks(&self) -> u32 {
		self.settle_ticks
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BurstState {
	/// chip-select inactive, waiting for a load
	Idle,
	/// chip-select active, bytes flowing
	Transfer,
	/// chip-select inactive, counting down the inter-burst hold
	Settle,
}

/// inputs for one reference-clock tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurstInputs {
	/// active-low synchronous reset
	pub reset_n: bool,
	/// one-tick pulse: send `tx_byte` (starts a burst when idle)
	pub load: bool,
	pub tx_byte: u8,
	/// MISO line level
	pub rx_line: bool,
}

/// outputs for the same tick the inputs were applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurstOutputs {
	/// a new load may be issued (next burst byte, or a new burst)
	pub ready: bool,
	pub rx_byte: u8,
	/// one-tick pulse: `rx_byte` holds a fully sampled byte
	pub rx_valid: bool,
	/// index of the just-completed byte within the burst, valid
	/// alongside `rx_valid`
	pub rx_count: usize,
	pub serial_clock: bool,
	/// line level; low only while a burst is in flight
	pub chip_select: bool,
	pub tx_line: bool,
}

pub struct BurstSequencer {
	config: BurstConfig,
	engine: BitEngine,
	state: BurstState,
	// bytes still to be loaded after the one in flight
	bytes_left: usize,
	settle_left: u32,
	// resets whenever chip-select is high
	rx_count: usize,
}

impl BurstSequencer {
	pub fn new(config: BurstConfig) -> BurstSequencer {
		BurstSequencer {
			engine: BitEngine::new(*config.engine()),
			config,
			state: BurstState::Idle,
			bytes_left: 0,
			settle_left: 0,
			rx_count: 0,
		}
	}

	pub fn config(&self) -> &BurstConfig {
		&self.config
	}

	pub fn state(&self) -> BurstState {
		self.state
	}

	/// advance sequencer and engine by one reference-clock tick; the
	/// sequencer consumes the engine's outputs of this same tick, so
	/// no extra latency is introduced
	pub fn tick(&mut self, input: BurstInputs) -> BurstOutputs {
		if !input.reset_n {
			let eng = self.engine.tick(BitInputs {
				reset_n: false,
				load: false,
				tx_byte: 0,
				rx_line: input.rx_line,
			});
			self.state = BurstState::Idle;
			self.bytes_left = 0;
			self.settle_left = 0;
			self.rx_count = 0;
			return BurstOutputs {
				ready: false,
				rx_byte: eng.rx_byte,
				rx_valid: false,
				rx_count: 0,
				serial_clock: eng.serial_clock,
				chip_select: true,
				tx_line: eng.tx_line,
			};
		}

		// gate the caller's load before the engine sees it: the engine
		// contract forbids a load while a byte is in flight
		let accept = input.load && match self.state {
			BurstState::Idle => true,
			BurstState::Transfer => self.engine.is_ready() && self.bytes_left > 0,
			BurstState::Settle => false,
		};

		let eng = self.engine.tick(BitInputs {
			reset_n: true,
			load: accept,
			tx_byte: input.tx_byte,
			rx_line: input.rx_line,
		});

		// the index presented alongside rx_valid is the pre-increment one
		let rx_count = self.rx_count;

		match self.state {
			BurstState::Idle => {
				self.rx_count = 0;
				if accept {
					self.state = BurstState::Transfer;
					self.bytes_left = self.config.burst_length - 1;
					debug!("burst start: {} bytes", self.config.burst_length);
				}
			},
			BurstState::Transfer => {
				if eng.rx_valid {
					self.rx_count += 1;
				}
				if accept {
					self.bytes_left -= 1;
				} else if eng.ready && 0 == self.bytes_left {
					self.state = BurstState::Settle;
					self.settle_left = self.config.settle_ticks;
					debug!("burst done, settling for {} ticks", self.config.settle_ticks);
				}
			},
			BurstState::Settle => {
				self.rx_count = 0;
				if self.settle_left > 0 {
					self.settle_left -= 1;
				} else {
					self.state = BurstState::Idle;
				}
			},
		}

		let ready = !input.load && match self.state {
			BurstState::Idle => true,
			BurstState::Transfer => eng.ready && self.bytes_left > 0,
			BurstState::Settle => false,
		};

		BurstOutputs {
			ready,
			rx_byte: eng.rx_byte,
			rx_valid: eng.rx_valid,
			rx_count,
			serial_clock: eng.serial_clock,
			chip_select: BurstState::Transfer != self.state,
			tx_line: eng.tx_line,
		}
	}
}
